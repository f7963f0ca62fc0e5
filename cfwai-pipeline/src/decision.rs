use std::collections::HashMap;
use std::sync::Arc;

use cfwai_library::{LibraryClient, Series};
use cfwai_matcher::{ShowCandidate, episode_match, normalize, show_match};
use cfwai_model::{EpisodeRecord, Item, Outcome, Stage};
use cfwai_store::Store;
use tokio_util::sync::CancellationToken;

use crate::aging::initialize_ripeness;
use crate::dispatcher::Dispatcher;
use crate::policy::{PolicyDecision, check_episode_policy};
use crate::queue::ItemQueue;
use crate::settings::PipelineSettings;

const SHOW_SCORE_THRESHOLD: i64 = 80;
const EPISODE_SCORE_THRESHOLD: i64 = 70;

pub struct DecisionStage {
    store: Arc<Store>,
    library: Arc<LibraryClient>,
    dispatcher: Arc<Dispatcher>,
    queue: Arc<ItemQueue>,
    settings: PipelineSettings,
}

impl DecisionStage {
    pub fn new(
        store: Arc<Store>,
        library: Arc<LibraryClient>,
        dispatcher: Arc<Dispatcher>,
        queue: Arc<ItemQueue>,
        settings: PipelineSettings,
    ) -> Self {
        Self { store, library, dispatcher, queue, settings }
    }

    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        if let Ok(Some(item)) = self.store.load_current(Stage::Decision) {
            self.process(item).await;
            let _ = self.store.clear_current(Stage::Decision);
        }

        loop {
            if shutdown.is_cancelled() {
                break;
            }
            let Some(item) = self.queue.wait_pop(&shutdown).await else { break };
            if let Err(err) = self.store.save_current(Stage::Decision, &item) {
                tracing::warn!(%err, "failed to persist current decision item");
            }
            self.process(item).await;
            if let Err(err) = self.store.clear_current(Stage::Decision) {
                tracing::warn!(%err, "failed to clear current decision item");
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.decision_interval) => {}
            }
        }
        tracing::info!("decision stage stopped");
    }

    async fn process(&self, mut item: Item) {
        let series = match self.library.list_series().await {
            Ok(series) => series,
            Err(err) => {
                tracing::warn!(%err, "series lookup failed; treating as no candidates");
                Vec::new()
            }
        };
        let show_candidates: Vec<ShowCandidate> =
            series.iter().map(|s| ShowCandidate { title: s.title.clone(), id: s.id.to_string() }).collect();

        let title_result = show_match(&item.composite_title(), &show_candidates);
        item.title_result = Some(title_result.clone());

        let mut candidate_ids: Vec<String> = Vec::new();
        if title_result.score >= SHOW_SCORE_THRESHOLD {
            if let Some(id) = &title_result.matched_id {
                candidate_ids.push(id.clone());
            }
        }
        match self.tag_shortcut_candidates(&item.creator, &series).await {
            Ok(ids) => {
                for id in ids {
                    if !candidate_ids.contains(&id) {
                        candidate_ids.push(id);
                    }
                }
            }
            Err(err) => tracing::warn!(%err, "tag-shortcut lookup failed; continuing without it"),
        }

        if candidate_ids.is_empty() {
            self.archive(Outcome::SeriesScore, item);
            return;
        }

        let primary_id = title_result.matched_id.clone().unwrap_or_else(|| candidate_ids[0].clone());
        if self.settings.honor_unmon_series {
            match self.library.is_monitored_series(&primary_id).await {
                Ok(false) => {
                    self.archive(Outcome::UnmonitoredSeries, item);
                    return;
                }
                Ok(true) => {}
                Err(err) => tracing::warn!(%err, "monitored-series check failed; proceeding"),
            }
        }

        let id_to_title: HashMap<&str, &str> =
            show_candidates.iter().map(|c| (c.id.as_str(), c.title.as_str())).collect();
        let mut pool: Vec<EpisodeRecord> = Vec::new();
        for id in &candidate_ids {
            match self.library.list_episodes(id).await {
                Ok(episodes) => {
                    let series_title = id_to_title.get(id.as_str()).copied().unwrap_or_default().to_string();
                    pool.extend(episodes.into_iter().map(|ep| EpisodeRecord {
                        series: series_title.clone(),
                        series_id: id.clone(),
                        season: ep.season_number,
                        episode: ep.episode_number,
                        title: ep.title,
                        air_date: ep.air_date,
                        episode_id: ep.id,
                        has_file: ep.episode_file_id.unwrap_or(0) != 0,
                        monitored: ep.monitored,
                    }));
                }
                Err(err) => tracing::warn!(%err, series_id = %id, "episode lookup failed"),
            }
        }

        let episode_result = episode_match(&item.composite_title(), &item.datecode, &pool);
        item.episode_result = Some(episode_result.clone());

        if episode_result.score == -1 {
            self.archive(Outcome::EpisodeScore, item);
            return;
        }
        if episode_result.score < EPISODE_SCORE_THRESHOLD {
            initialize_ripeness(&mut item, &self.settings);
            if let Err(err) = self.dispatcher.enqueue_to(Stage::Aging, item).await {
                tracing::error!(%err, "failed to enqueue item to aging stage");
            }
            return;
        }

        let Some(record) = episode_result.full_match.clone() else {
            self.archive(Outcome::EpisodeScore, item);
            return;
        };

        match check_episode_policy(&record, &self.settings) {
            PolicyDecision::UnmonitoredEpisode => self.archive(Outcome::UnmonitoredEpisode, item),
            PolicyDecision::EpisodeHasFile => self.archive(Outcome::EpisodeHasFile, item),
            PolicyDecision::EnqueueDownload => {
                if let Err(err) = self.dispatcher.enqueue_to(Stage::Download, item).await {
                    tracing::error!(%err, "failed to enqueue item to download stage");
                }
            }
        }
    }

    /// Resolves the `wai-<creator>` tagged-candidate shortcut (spec
    /// §4.6): any series carrying a label matching the item's creator is
    /// added to the candidate set regardless of show-match score.
    async fn tag_shortcut_candidates(&self, creator: &str, series: &[Series]) -> Result<Vec<String>, cfwai_library::LibraryError> {
        let label = shortcut_label(creator);
        let tags = self.library.list_tags().await?;
        let Some(tag_id) = tags.iter().find(|t| t.label.eq_ignore_ascii_case(&label)).map(|t| t.id) else {
            return Ok(Vec::new());
        };
        Ok(series.iter().filter(|s| s.tags.contains(&tag_id)).map(|s| s.id.to_string()).collect())
    }

    fn archive(&self, outcome: Outcome, item: Item) {
        if let Err(err) = self.store.archive_append(outcome, &item) {
            tracing::error!(%err, ?outcome, "failed to archive decision item");
        }
    }
}

/// `wai-<creator>` label a series is tagged with to shortcut the show
/// match threshold, normalized the same way titles are before scoring.
fn shortcut_label(creator: &str) -> String {
    format!("wai-{}", normalize(creator).replace(' ', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcut_label_normalizes_punctuation_and_case() {
        assert_eq!(shortcut_label("Some Creator!"), "wai-some-creator");
    }
}
