use cfwai_model::EpisodeRecord;

use crate::settings::PipelineSettings;

/// The `CHECK_POLICY` state from spec §4.6, factored out as a pure
/// function so both the decision stage and the aging stage's promotion
/// path (§4.7 step 3, "via the same policy checks") share one
/// implementation instead of drifting apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    EnqueueDownload,
    UnmonitoredEpisode,
    EpisodeHasFile,
}

pub fn check_episode_policy(episode: &EpisodeRecord, settings: &PipelineSettings) -> PolicyDecision {
    if settings.honor_unmon_eps && !episode.monitored {
        return PolicyDecision::UnmonitoredEpisode;
    }
    if !settings.overwrite_eps && episode.has_file {
        return PolicyDecision::EpisodeHasFile;
    }
    PolicyDecision::EnqueueDownload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(monitored: bool, has_file: bool) -> EpisodeRecord {
        EpisodeRecord {
            series: "Show".to_string(),
            series_id: "1".to_string(),
            season: 1,
            episode: 1,
            title: "Ep".to_string(),
            air_date: None,
            episode_id: 1,
            has_file,
            monitored,
        }
    }

    #[test]
    fn unmonitored_episode_is_rejected_only_when_policy_honors_it() {
        let mut settings = PipelineSettings { honor_unmon_eps: true, ..PipelineSettings::default() };
        assert_eq!(check_episode_policy(&episode(false, false), &settings), PolicyDecision::UnmonitoredEpisode);
        settings.honor_unmon_eps = false;
        assert_eq!(check_episode_policy(&episode(false, false), &settings), PolicyDecision::EnqueueDownload);
    }

    #[test]
    fn existing_file_blocks_download_unless_overwrite_is_on() {
        let mut settings = PipelineSettings::default();
        assert_eq!(check_episode_policy(&episode(true, true), &settings), PolicyDecision::EpisodeHasFile);
        settings.overwrite_eps = true;
        assert_eq!(check_episode_policy(&episode(true, true), &settings), PolicyDecision::EnqueueDownload);
    }
}
