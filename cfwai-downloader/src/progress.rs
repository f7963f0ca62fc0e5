use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;

/// A single progress sample parsed from the downloader's `--newline`
/// output (`[download]  42.0% of ~123.45MiB at 1.23MiB/s ETA 00:10`).
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    pub percent: f64,
    pub speed_description: Option<String>,
    pub eta_description: Option<String>,
}

static PROGRESS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[download\]\s+([\d.]+)% of.*?(?:at\s+(\S+))?(?:\s+ETA\s+(\S+))?\s*$").unwrap()
});

pub fn parse_line(line: &str) -> Option<DownloadProgress> {
    let caps = PROGRESS_LINE.captures(line)?;
    let percent: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(DownloadProgress {
        percent,
        speed_description: caps.get(2).map(|m| m.as_str().to_string()),
        eta_description: caps.get(3).map(|m| m.as_str().to_string()),
    })
}

/// Tracks whether a progress sample is due to be surfaced, per spec
/// §4.4: at least every 60 seconds or every 25% of completion,
/// whichever occurs first. Mirrors
/// `original_source/ytdlp_interface.py::handle_downloading`'s
/// `last_print_time`/`last_print_percent` bookkeeping.
pub struct ProgressGate {
    last_reported_at: Option<Instant>,
    last_reported_percent_bucket: i64,
}

impl ProgressGate {
    pub fn new() -> Self {
        Self { last_reported_at: None, last_reported_percent_bucket: -1 }
    }

    pub fn should_report(&mut self, progress: &DownloadProgress) -> bool {
        let now = Instant::now();
        let time_due = match self.last_reported_at {
            None => true,
            Some(last) => now.duration_since(last) >= Duration::from_secs(60),
        };
        let bucket = (progress.percent / 25.0) as i64;
        let percent_due = bucket > self.last_reported_percent_bucket;

        if time_due || percent_due {
            self.last_reported_at = Some(now);
            self.last_reported_percent_bucket = bucket;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_typical_progress_line() {
        let progress = parse_line("[download]  42.0% of ~123.45MiB at 1.23MiB/s ETA 00:10").unwrap();
        assert_eq!(progress.percent, 42.0);
        assert_eq!(progress.speed_description.as_deref(), Some("1.23MiB/s"));
        assert_eq!(progress.eta_description.as_deref(), Some("00:10"));
    }

    #[test]
    fn ignores_unrelated_lines() {
        assert!(parse_line("[info] Writing video metadata").is_none());
    }

    #[test]
    fn gate_reports_on_first_sample_and_on_25_percent_steps() {
        let mut gate = ProgressGate::new();
        assert!(gate.should_report(&DownloadProgress { percent: 1.0, speed_description: None, eta_description: None }));
        assert!(!gate.should_report(&DownloadProgress { percent: 10.0, speed_description: None, eta_description: None }));
        assert!(gate.should_report(&DownloadProgress { percent: 26.0, speed_description: None, eta_description: None }));
    }
}
