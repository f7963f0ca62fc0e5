use std::fmt;

/// A terminal (or stage-handoff) classification for an item. The
/// `Display` impl produces the archive file stem the item is appended to
/// under `<DATA_DIR>/history/`, replacing the source's string-typed
/// archive filenames with a closed, exhaustively-matchable enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Show match score below threshold.
    SeriesScore,
    /// Show matched but the series is unmonitored upstream and policy honors that.
    UnmonitoredSeries,
    /// Episode match score below threshold and aging didn't accept it either.
    EpisodeScore,
    /// Episode matched but is unmonitored upstream and policy honors that.
    UnmonitoredEpisode,
    /// Episode matched, is monitored, but already has a file and overwrite is off.
    EpisodeHasFile,
    /// Aged past the ripeness ceiling without a successful re-match.
    ManualIntervention,
    /// An aging item re-matched successfully and was handed back to the
    /// decision pipeline.
    Requeued,
    /// Reached the download stage and was recorded as accepted for download,
    /// independent of whether the download itself ultimately succeeds.
    AllProcessed,
    /// Accepted onto the download queue (decision-stage handoff record).
    DownloadEnqueue,
    /// Download, tag, move, or import completed; terminal success.
    Pass,
    /// The download stage failed to produce a file.
    DownloadFail,
}

impl Outcome {
    /// The archive file stem (no extension) this outcome is appended to.
    pub fn archive_name(self) -> &'static str {
        match self {
            Outcome::SeriesScore => "series_score",
            Outcome::UnmonitoredSeries => "unmonitored_series",
            Outcome::EpisodeScore => "episode_score",
            Outcome::UnmonitoredEpisode => "unmonitored_episode",
            Outcome::EpisodeHasFile => "episode_has_file",
            Outcome::ManualIntervention => "manual_intervention",
            Outcome::Requeued => "requeued",
            Outcome::AllProcessed => "all_processed",
            Outcome::DownloadEnqueue => "download_enqueue",
            Outcome::Pass => "pass",
            Outcome::DownloadFail => "download_fail",
        }
    }

    /// Inverse of [`Self::archive_name`], used by the `GET /get_item`
    /// ingress route to resolve the `datafrom` query parameter.
    pub fn from_archive_name(name: &str) -> Option<Self> {
        Some(match name {
            "series_score" => Outcome::SeriesScore,
            "unmonitored_series" => Outcome::UnmonitoredSeries,
            "episode_score" => Outcome::EpisodeScore,
            "unmonitored_episode" => Outcome::UnmonitoredEpisode,
            "episode_has_file" => Outcome::EpisodeHasFile,
            "manual_intervention" => Outcome::ManualIntervention,
            "requeued" => Outcome::Requeued,
            "all_processed" => Outcome::AllProcessed,
            "download_enqueue" => Outcome::DownloadEnqueue,
            "pass" => Outcome::Pass,
            "download_fail" => Outcome::DownloadFail,
            _ => return None,
        })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.archive_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_names_match_spec_filenames() {
        assert_eq!(Outcome::SeriesScore.to_string(), "series_score");
        assert_eq!(Outcome::ManualIntervention.to_string(), "manual_intervention");
        assert_eq!(Outcome::DownloadFail.to_string(), "download_fail");
    }

    #[test]
    fn from_archive_name_is_the_inverse_of_archive_name() {
        assert_eq!(Outcome::from_archive_name("manual_intervention"), Some(Outcome::ManualIntervention));
        assert_eq!(Outcome::from_archive_name("not_a_real_outcome"), None);
    }
}
