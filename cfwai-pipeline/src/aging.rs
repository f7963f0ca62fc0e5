use std::sync::Arc;

use cfwai_library::LibraryClient;
use cfwai_matcher::{date_distance_days, episode_match};
use cfwai_model::{Item, Outcome, Stage};
use cfwai_store::Store;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::Dispatcher;
use crate::policy::{PolicyDecision, check_episode_policy};
use crate::queue::AgingQueue;
use crate::settings::PipelineSettings;

/// Seconds between upstream refresh requests for the same item, per
/// spec §4.7 step 4: prevents refresh storms while an item sits in aging.
const REFRESH_GATE_SECS: i64 = 120;

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn today_datecode() -> String {
    chrono::Utc::now().format("%Y%m%d").to_string()
}

/// Set `ripeness`/`next_aging` the first time an item enters aging, per
/// spec §4.7. Shared by the decision stage (first entry) and the aging
/// stage itself (step 1's "re-initialize if missing", which only ever
/// matters after a crash wiped a partially-written item).
pub fn initialize_ripeness(item: &mut Item, settings: &PipelineSettings) {
    if item.ripeness.is_some() {
        return;
    }
    let days = date_distance_days(&today_datecode(), &item.datecode).max(0);
    item.ripeness = Some(days * settings.aging_ripeness_per_day);
    item.next_aging = Some(unix_now() + 86_400 / settings.aging_ripeness_per_day.max(1));
}

fn set_next_aging(item: &mut Item, settings: &PipelineSettings) {
    item.next_aging = Some(unix_now() + 86_400 / settings.aging_ripeness_per_day.max(1));
}

pub struct AgingStage {
    store: Arc<Store>,
    library: Arc<LibraryClient>,
    dispatcher: Arc<Dispatcher>,
    queue: Arc<AgingQueue>,
    settings: PipelineSettings,
}

impl AgingStage {
    pub fn new(
        store: Arc<Store>,
        library: Arc<LibraryClient>,
        dispatcher: Arc<Dispatcher>,
        queue: Arc<AgingQueue>,
        settings: PipelineSettings,
    ) -> Self {
        Self { store, library, dispatcher, queue, settings }
    }

    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        if let Ok(Some(item)) = self.store.load_current(Stage::Aging) {
            self.process(item).await;
            let _ = self.store.clear_current(Stage::Aging);
        }

        loop {
            if shutdown.is_cancelled() {
                break;
            }
            let Some(item) = self.queue.wait_pop_ready(&shutdown).await else { break };
            if let Err(err) = self.store.save_current(Stage::Aging, &item) {
                tracing::warn!(%err, "failed to persist current aging item");
            }
            self.process(item).await;
            if let Err(err) = self.store.clear_current(Stage::Aging) {
                tracing::warn!(%err, "failed to clear current aging item");
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.aging_interval) => {}
            }
        }
        tracing::info!("aging stage stopped");
    }

    async fn process(&self, mut item: Item) {
        initialize_ripeness(&mut item, &self.settings);
        let ripeness = item.ripeness.unwrap_or(0);
        let ceiling = self.settings.aging_ripeness_per_day * 3;

        if ripeness >= ceiling {
            self.archive(Outcome::ManualIntervention, item);
            return;
        }

        let Some(episode_result) = item.episode_result.clone() else {
            // No prior episode attempt recorded; nothing to re-score against.
            set_next_aging(&mut item, &self.settings);
            if let Err(err) = self.dispatcher.enqueue_to(Stage::Aging, item).await {
                tracing::error!(%err, "failed to re-enqueue aging item");
            }
            return;
        };

        let series_id = episode_result.matched_series_id.clone();
        let rescored = match &series_id {
            Some(id) => self.rescan(&item, id).await,
            None => None,
        };

        if let Some(rescored) = rescored {
            if rescored.score >= 70 {
                if let Some(record) = rescored.full_match.clone() {
                    item.episode_result = Some(rescored);
                    self.archive(Outcome::Requeued, item.clone());
                    match check_episode_policy(&record, &self.settings) {
                        PolicyDecision::UnmonitoredEpisode => self.archive(Outcome::UnmonitoredEpisode, item),
                        PolicyDecision::EpisodeHasFile => self.archive(Outcome::EpisodeHasFile, item),
                        PolicyDecision::EnqueueDownload => {
                            if let Err(err) = self.dispatcher.enqueue_to(Stage::Download, item).await {
                                tracing::error!(%err, "failed to enqueue re-matched item to download stage");
                            }
                        }
                    }
                    return;
                }
            }
        }

        let last_scan = item.last_scan.unwrap_or(0);
        let now = unix_now();
        if now - last_scan > REFRESH_GATE_SECS {
            if let Some(id) = &series_id {
                if let Err(err) = self.library.refresh_series(id).await {
                    tracing::warn!(%err, series_id = %id, "upstream refresh request failed");
                }
            }
            item.last_scan = Some(now);
            set_next_aging(&mut item, &self.settings);
        } else {
            item.ripeness = Some(ripeness + 1);
            set_next_aging(&mut item, &self.settings);
        }

        if let Err(err) = self.dispatcher.enqueue_to(Stage::Aging, item).await {
            tracing::error!(%err, "failed to re-enqueue aging item");
        }
    }

    async fn rescan(&self, item: &Item, series_id: &str) -> Option<cfwai_model::EpisodeMatch> {
        let episodes = match self.library.list_episodes(series_id).await {
            Ok(episodes) => episodes,
            Err(err) => {
                tracing::warn!(%err, series_id, "episode re-scan failed");
                return None;
            }
        };
        let series_title = item
            .episode_result
            .as_ref()
            .and_then(|r| r.matched_show.clone())
            .unwrap_or_default();
        let pool: Vec<cfwai_model::EpisodeRecord> = episodes
            .into_iter()
            .map(|ep| cfwai_model::EpisodeRecord {
                series: series_title.clone(),
                series_id: series_id.to_string(),
                season: ep.season_number,
                episode: ep.episode_number,
                title: ep.title,
                air_date: ep.air_date,
                episode_id: ep.id,
                has_file: ep.episode_file_id.unwrap_or(0) != 0,
                monitored: ep.monitored,
            })
            .collect();
        Some(episode_match(&item.composite_title(), &item.datecode, &pool))
    }

    fn archive(&self, outcome: Outcome, item: Item) {
        if let Err(err) = self.store.archive_append(outcome, &item) {
            tracing::error!(%err, ?outcome, "failed to archive aging item");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_ripeness_scales_with_age_and_per_day_rate() {
        let settings = PipelineSettings { aging_ripeness_per_day: 4, ..PipelineSettings::default() };
        let mut item = Item::new("creator", "title", &today_datecode(), "https://example/x");
        initialize_ripeness(&mut item, &settings);
        assert_eq!(item.ripeness, Some(0));
        assert!(item.next_aging.unwrap() > unix_now());
    }

    #[test]
    fn initialize_ripeness_is_a_no_op_once_set() {
        let settings = PipelineSettings::default();
        let mut item = Item::new("creator", "title", "20200101", "https://example/x");
        item.ripeness = Some(42);
        initialize_ripeness(&mut item, &settings);
        assert_eq!(item.ripeness, Some(42));
    }

    #[test]
    fn twenty_day_old_item_reaches_the_manual_intervention_ceiling() {
        let settings = PipelineSettings { aging_ripeness_per_day: 4, ..PipelineSettings::default() };
        let datecode = (chrono::Utc::now() - chrono::Duration::days(20)).format("%Y%m%d").to_string();
        let mut item = Item::new("creator", "title", &datecode, "https://example/x");
        initialize_ripeness(&mut item, &settings);
        assert_eq!(item.ripeness, Some(80));
        assert!(item.ripeness.unwrap() >= settings.aging_ripeness_per_day * 3);
    }
}
