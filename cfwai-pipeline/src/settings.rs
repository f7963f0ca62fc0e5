use std::path::PathBuf;
use std::time::Duration;

/// Policy knobs and timing intervals the three stages run under. Carries
/// none of the environment-parsing concerns of `cfwai-server`'s `Config`
/// (C10) — that crate builds one of these and hands it down, keeping the
/// pipeline stages ignorant of `std::env`.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub honor_unmon_series: bool,
    pub honor_unmon_eps: bool,
    pub overwrite_eps: bool,
    /// Decision-queue-only: reverse the remaining tail on every dequeue
    /// (`FLIP_FLOP_QUEUE`), per spec §3/§6. The download queue ignores
    /// this and stays strictly FIFO.
    pub flip_flop_queue: bool,
    pub aging_ripeness_per_day: i64,
    pub decision_interval: Duration,
    pub aging_interval: Duration,
    pub download_interval: Duration,
    /// Directory the library service expects finished imports to live
    /// under (`SONARR_IN_PATH`); used to compose the manual-import path.
    pub sonarr_in_path: PathBuf,
    /// Final directory downloaded files are moved into before import.
    pub wai_out_path: PathBuf,
    /// Optional separate staging directory the downloader writes into;
    /// when set, the download stage moves from here into `wai_out_path`,
    /// exercising the atomic cross-filesystem fallback in §8 scenario 5.
    pub wai_out_temp: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            honor_unmon_series: false,
            honor_unmon_eps: false,
            overwrite_eps: false,
            flip_flop_queue: false,
            aging_ripeness_per_day: 4,
            decision_interval: Duration::from_secs(5 * 60),
            aging_interval: Duration::from_secs(5 * 60),
            download_interval: Duration::from_secs(5 * 60),
            sonarr_in_path: PathBuf::new(),
            wai_out_path: PathBuf::new(),
            wai_out_temp: None,
        }
    }
}
