//! Adapter over an external video-download tool (yt-dlp-shaped CLI):
//! invoke it, surface progress, and report the produced file plus its
//! sidecar metadata document.

mod progress;

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

pub use progress::DownloadProgress;
use progress::ProgressGate;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to launch downloader process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("downloader exited with status {0}")]
    NonZeroExit(std::process::ExitStatus),
    #[error("downloader reported success but produced no output file")]
    MissingOutputFile,
    #[error("downloader produced no sidecar metadata file")]
    MissingMetadata,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The file the downloader produced and its sidecar `.info.json`.
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub path: PathBuf,
    pub info_json_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Path or bare name of the downloader binary (`yt-dlp` on `PATH` by default).
    pub binary: String,
    pub config_file: Option<PathBuf>,
    pub netrc_file: Option<PathBuf>,
    pub cookies_file: Option<PathBuf>,
    /// Fragment worker cap, per spec §4.4.
    pub concurrent_fragments: u32,
    /// Rate limit in bytes/sec, per spec §4.4 (5 MB/s default).
    pub rate_limit_bytes: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            config_file: None,
            netrc_file: None,
            cookies_file: None,
            concurrent_fragments: 3,
            rate_limit_bytes: 5_000_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Downloader {
    config: DownloaderConfig,
}

impl Downloader {
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    /// Download `url` into `target_dir`, invoking `on_progress` at least
    /// every 60 seconds or every 25% of completion, whichever comes
    /// first (the gate lives in [`ProgressGate`]).
    pub async fn download(
        &self,
        url: &str,
        target_dir: &Path,
        mut on_progress: impl FnMut(DownloadProgress),
    ) -> Result<DownloadOutcome, DownloadError> {
        tokio::fs::create_dir_all(target_dir).await?;

        let output_template = target_dir.join("%(title)s.%(ext)s");
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg(url)
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg("--write-info-json")
            .arg("--newline")
            .arg("--concurrent-fragments")
            .arg(self.config.concurrent_fragments.to_string())
            .arg("--limit-rate")
            .arg(self.config.rate_limit_bytes.to_string())
            .arg("--print")
            .arg("after_move:filepath")
            .arg("-o")
            .arg(output_template.to_string_lossy().to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        if let Some(config_file) = &self.config.config_file {
            cmd.arg("--config-locations").arg(config_file);
        }
        if let Some(netrc_file) = &self.config.netrc_file {
            cmd.arg("--netrc-location").arg(netrc_file).arg("--netrc");
        }
        if let Some(cookies_file) = &self.config.cookies_file {
            cmd.arg("--cookies").arg(cookies_file);
        }

        tracing::info!(%url, target = %target_dir.display(), "starting download");

        let mut child = cmd.spawn().map_err(DownloadError::Spawn)?;
        let stdout = child.stdout.take().expect("piped stdout");
        let mut lines = BufReader::new(stdout).lines();

        let mut gate = ProgressGate::new();
        let mut reported_path: Option<PathBuf> = None;

        while let Some(line) = lines.next_line().await? {
            if let Some(progress) = progress::parse_line(&line) {
                if gate.should_report(&progress) {
                    on_progress(progress);
                }
            } else if !line.trim().is_empty() {
                // `--print after_move:filepath` writes the bare final path.
                reported_path = Some(PathBuf::from(line.trim()));
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(DownloadError::NonZeroExit(status));
        }

        let path = reported_path.ok_or(DownloadError::MissingOutputFile)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(DownloadError::MissingOutputFile);
        }

        let info_json_path = path.with_extension("info.json");
        if !tokio::fs::try_exists(&info_json_path).await? {
            return Err(DownloadError::MissingMetadata);
        }

        Ok(DownloadOutcome { path, info_json_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_limits() {
        let config = DownloaderConfig::default();
        assert_eq!(config.concurrent_fragments, 3);
        assert_eq!(config.rate_limit_bytes, 5_000_000);
    }
}
