use std::path::{Path, PathBuf};
use std::sync::Arc;

use cfwai_downloader::Downloader;
use cfwai_library::LibraryClient;
use cfwai_model::{Item, Outcome, Stage};
use cfwai_store::Store;
use tokio_util::sync::CancellationToken;

use crate::error::StageError;
use crate::queue::ItemQueue;
use crate::settings::PipelineSettings;

/// The `download -> tag -> move -> manual_import -> archive(pass)`
/// pipeline from spec §4.8. Unlike the decision and aging stages, any
/// step failing here terminates the worker loop entirely (after
/// archiving `download_fail`) — this is the documented exit-after-item
/// behavior operators are meant to notice.
pub struct DownloadStage {
    store: Arc<Store>,
    library: Arc<LibraryClient>,
    downloader: Downloader,
    queue: Arc<ItemQueue>,
    settings: PipelineSettings,
}

impl DownloadStage {
    pub fn new(
        store: Arc<Store>,
        library: Arc<LibraryClient>,
        downloader: Downloader,
        queue: Arc<ItemQueue>,
        settings: PipelineSettings,
    ) -> Self {
        Self { store, library, downloader, queue, settings }
    }

    /// Returns once the queue drains under shutdown, or once a single
    /// item fails the pipeline (per §4.8's deliberate worker exit).
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        if let Ok(Some(item)) = self.store.load_current(Stage::Download) {
            if self.process(item).await.is_err() {
                let _ = self.store.clear_current(Stage::Download);
                tracing::error!("download stage exiting after crash-recovered item failed");
                return;
            }
            let _ = self.store.clear_current(Stage::Download);
        }

        loop {
            if shutdown.is_cancelled() {
                break;
            }
            let Some(item) = self.queue.wait_pop(&shutdown).await else { break };
            if let Err(err) = self.store.save_current(Stage::Download, &item) {
                tracing::warn!(%err, "failed to persist current download item");
            }
            let outcome = self.process(item).await;
            if let Err(err) = self.store.clear_current(Stage::Download) {
                tracing::warn!(%err, "failed to clear current download item");
            }
            if outcome.is_err() {
                tracing::error!("download stage exiting after item failure, per spec");
                return;
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.download_interval) => {}
            }
        }
        tracing::info!("download stage stopped");
    }

    async fn process(&self, mut item: Item) -> Result<(), ()> {
        let target_dir = self.settings.wai_out_temp.clone().unwrap_or_else(|| self.settings.wai_out_path.clone());

        let pipeline_result = self.run_pipeline(&item, &target_dir).await;

        let file_name = match pipeline_result {
            Ok(file_name) => file_name,
            Err(err) => {
                tracing::error!(%err, "download pipeline failed");
                self.archive(Outcome::DownloadFail, item);
                return Err(());
            }
        };
        item.file_name = Some(file_name.clone());
        item.download_filename = Some(file_name.clone());

        let series_id = item.episode_result.as_ref().and_then(|r| r.matched_series_id.clone());
        let season = item.episode_result.as_ref().and_then(|r| r.season);
        let episode = item.episode_result.as_ref().and_then(|r| r.episode);

        let import_result = match (series_id, season, episode) {
            (Some(series_id), Some(season), Some(episode)) => {
                let sonarr_folder = self.settings.sonarr_in_path.to_string_lossy().to_string();
                match self
                    .library
                    .import_downloaded_episode(&series_id, season, episode, &file_name, &sonarr_folder)
                    .await
                {
                    Ok(result) => serde_json::to_value(result).ok(),
                    Err(err) => {
                        tracing::warn!(%err, "manual import failed; item still archived to pass");
                        Some(serde_json::json!({ "status": "failed", "error": err.to_string() }))
                    }
                }
            }
            _ => {
                tracing::warn!("no resolved series/season/episode; skipping manual import");
                None
            }
        };
        item.import_result = import_result;

        self.archive(Outcome::Pass, item);
        Ok(())
    }

    /// Runs `download -> tag -> move_into_library` with `?`, folding
    /// every adapter's own error type into one [`StageError`] (spec §7's
    /// ambient error note) and returning the final on-disk file name.
    async fn run_pipeline(&self, item: &Item, target_dir: &Path) -> Result<String, StageError> {
        let downloaded = self
            .downloader
            .download(&item.url, target_dir, |progress| {
                tracing::info!(
                    percent = progress.percent,
                    speed = progress.speed_description.as_deref().unwrap_or("?"),
                    eta = progress.eta_description.as_deref().unwrap_or("?"),
                    "download progress"
                );
            })
            .await?;

        let tagged_path = cfwai_tagger::tag(&downloaded.path)?;
        let final_path = self.move_into_library(&tagged_path)?;

        Ok(final_path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string())
    }

    /// Moves the tagged file (and its sidecar) from the downloader's
    /// output directory into the final library-visible directory, per
    /// §4.8's move semantics, when a separate temp staging path is
    /// configured. No-op (returns the input path) otherwise.
    fn move_into_library(&self, tagged_path: &Path) -> Result<PathBuf, StageError> {
        if self.settings.wai_out_temp.is_none() {
            return Ok(tagged_path.to_path_buf());
        }
        let file_name = tagged_path.file_name().expect("downloader always names its output file");
        let destination = self.settings.wai_out_path.join(file_name);
        cfwai_store::safe_move(tagged_path, &destination)?;

        let sidecar = tagged_path.with_extension("info.json");
        if sidecar.exists() {
            let sidecar_dest = destination.with_extension("info.json");
            cfwai_store::safe_move(&sidecar, &sidecar_dest)?;
        }
        Ok(destination)
    }

    fn archive(&self, outcome: Outcome, item: Item) {
        if let Err(err) = self.store.archive_append(outcome, &item) {
            tracing::error!(%err, ?outcome, "failed to archive download item");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(settings: PipelineSettings) -> DownloadStage {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::new(dir.path()));
        let library = Arc::new(LibraryClient::new("http://localhost:0", "key"));
        let queue = ItemQueue::load(Stage::Download, Arc::clone(&store), false).unwrap();
        DownloadStage::new(store, library, Downloader::new(Default::default()), queue, settings)
    }

    #[test]
    fn move_into_library_is_a_no_op_without_a_staging_dir() {
        let stage = stage(PipelineSettings::default());
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("episode.mkv");
        std::fs::write(&media, b"video").unwrap();

        let result = stage.move_into_library(&media).unwrap();
        assert_eq!(result, media);
    }

    #[test]
    fn move_into_library_relocates_media_and_sidecar_when_staged() {
        let out_dir = tempfile::tempdir().unwrap();
        let settings = PipelineSettings { wai_out_temp: Some(PathBuf::from("/tmp")), wai_out_path: out_dir.path().to_path_buf(), ..PipelineSettings::default() };
        let stage = stage(settings);

        let staging = tempfile::tempdir().unwrap();
        let media = staging.path().join("episode.WEB-DL.1280x720.eng-cfwai.mkv");
        std::fs::write(&media, b"video").unwrap();
        std::fs::write(media.with_extension("info.json"), b"{}").unwrap();

        let result = stage.move_into_library(&media).unwrap();
        assert_eq!(result, out_dir.path().join("episode.WEB-DL.1280x720.eng-cfwai.mkv"));
        assert!(result.exists());
        assert!(result.with_extension("info.json").exists());
        assert!(!media.exists());
    }
}
