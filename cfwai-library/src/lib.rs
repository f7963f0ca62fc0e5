//! REST adapter for the external library-management service (the
//! Sonarr-shaped catalog, monitored-state, refresh, and manual-import
//! surface named in spec §4.3/§6).
//!
//! Every call carries a 10-second timeout and surfaces network/HTTP
//! failures as a typed [`LibraryError`]; callers decide how to fold that
//! into their own outcome (the decision stage treats it as "no
//! candidates" and archives accordingly).

mod types;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;

pub use types::{Episode, ManualImportResult, QualityAndLanguages, Series, Tag};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("request to library service failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("library service returned status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("no manual-import candidate found for path {0}")]
    NoManualImportCandidate(String),
    #[error("episode S{season:02}E{episode:02} not found for series {series_id}")]
    EpisodeNotFound { series_id: String, season: i64, episode: i64 },
}

/// Thin REST client over the library service's `/api/v3/*` surface.
#[derive(Debug, Clone)]
pub struct LibraryClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LibraryClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(CONNECT_TIMEOUT)
            .build()
            .expect("reqwest client builds with static TLS config");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, LibraryError> {
        let response = self
            .client
            .get(self.url(path))
            .header("X-Api-Key", &self.api_key)
            .query(query)
            .send()
            .await?;
        Self::into_json(response).await
    }

    async fn into_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, LibraryError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LibraryError::UnexpectedStatus { status, body });
        }
        Ok(response.json().await?)
    }

    /// `GET /api/v3/health` — used at startup to validate `SONARR_URL`/`SONARR_API`.
    pub async fn validate_config(&self) -> Result<(), LibraryError> {
        let response = self
            .client
            .get(self.url("/api/v3/health"))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(LibraryError::UnexpectedStatus { status, body: String::new() })
        }
    }

    pub async fn list_series(&self) -> Result<Vec<Series>, LibraryError> {
        self.get_json("/api/v3/series", &[]).await
    }

    /// `GET /api/v3/tag` — the full label set, used to resolve the
    /// `wai-<creator>` tagged-candidate shortcut in the decision stage.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, LibraryError> {
        self.get_json("/api/v3/tag", &[]).await
    }

    pub async fn list_episodes(&self, series_id: &str) -> Result<Vec<Episode>, LibraryError> {
        self.get_json("/api/v3/episode", &[("seriesId", series_id)]).await
    }

    pub async fn is_monitored_series(&self, series_id: &str) -> Result<bool, LibraryError> {
        Ok(self
            .list_series()
            .await?
            .into_iter()
            .any(|s| s.id.to_string() == series_id && s.monitored))
    }

    async fn find_episode(&self, series_id: &str, season: i64, episode: i64) -> Result<Option<Episode>, LibraryError> {
        Ok(self
            .list_episodes(series_id)
            .await?
            .into_iter()
            .find(|ep| ep.season_number == season && ep.episode_number == episode))
    }

    pub async fn is_monitored_episode(&self, series_id: &str, season: i64, episode: i64) -> Result<bool, LibraryError> {
        Ok(self
            .find_episode(series_id, season, episode)
            .await?
            .map(|ep| ep.monitored)
            .unwrap_or(true))
    }

    pub async fn is_episode_file(&self, series_id: &str, season: i64, episode: i64) -> Result<bool, LibraryError> {
        Ok(self
            .find_episode(series_id, season, episode)
            .await?
            .map(|ep| ep.episode_file_id.unwrap_or(0) != 0)
            .unwrap_or(false))
    }

    /// Triggers a `RefreshSeries` command so the library service re-scans
    /// upstream metadata; used by the aging stage's refresh gate.
    pub async fn refresh_series(&self, series_id: &str) -> Result<(), LibraryError> {
        let response = self
            .client
            .post(self.url("/api/v3/command"))
            .header("X-Api-Key", &self.api_key)
            .json(&serde_json::json!({ "name": "RefreshSeries", "seriesId": series_id }))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(LibraryError::UnexpectedStatus { status, body })
        }
    }

    /// `GET /api/v3/manualimport?folder=&filterExistingFiles=false`, then
    /// picks the entry whose `path` exactly matches `file_path`.
    pub async fn get_file_quality_and_language(&self, file_path: &str) -> Result<QualityAndLanguages, LibraryError> {
        let folder = std::path::Path::new(file_path)
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        let candidates: Vec<types::ManualImportCandidate> = self
            .get_json("/api/v3/manualimport", &[("folder", folder.as_str()), ("filterExistingFiles", "false")])
            .await?;

        candidates
            .into_iter()
            .find(|c| c.path == file_path)
            .map(|c| QualityAndLanguages { quality: c.quality, languages: c.languages })
            .ok_or_else(|| LibraryError::NoManualImportCandidate(file_path.to_string()))
    }

    /// `POST /api/v3/command` with a `manualImport` payload. Resolves
    /// quality/language via [`Self::get_file_quality_and_language`] first,
    /// matching the source's `import_downloaded_episode`.
    pub async fn import_downloaded_episode(
        &self,
        series_id: &str,
        season: i64,
        episode: i64,
        file_name: &str,
        sonarr_folder: &str,
    ) -> Result<ManualImportResult, LibraryError> {
        let episode_record = self
            .find_episode(series_id, season, episode)
            .await?
            .ok_or_else(|| LibraryError::EpisodeNotFound {
                series_id: series_id.to_string(),
                season,
                episode,
            })?;

        let file_path = std::path::Path::new(sonarr_folder).join(file_name);
        let file_path = file_path.to_string_lossy().to_string();
        let quality_and_languages = self.get_file_quality_and_language(&file_path).await?;

        let payload = serde_json::json!({
            "name": "manualImport",
            "files": [{
                "path": file_path,
                "seriesId": series_id,
                "episodeIds": [episode_record.id],
                "releaseGroup": "cfwai",
                "quality": quality_and_languages.quality,
                "languages": quality_and_languages.languages,
                "releaseType": "singleEpisode",
            }],
            "importMode": "Move",
        });

        let response = self
            .client
            .post(self.url("/api/v3/command"))
            .header("X-Api-Key", &self.api_key)
            .json(&payload)
            .send()
            .await?;
        Self::into_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn validate_config_accepts_2xx_health_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/health"))
            .and(header("X-Api-Key", "secret"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = LibraryClient::new(server.uri(), "secret");
        client.validate_config().await.unwrap();
    }

    #[tokio::test]
    async fn validate_config_surfaces_non_2xx_as_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/health"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = LibraryClient::new(server.uri(), "bad-key");
        let err = client.validate_config().await.unwrap_err();
        assert!(matches!(err, LibraryError::UnexpectedStatus { status, .. } if status == 401));
    }

    #[tokio::test]
    async fn is_monitored_series_reads_series_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/series"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 42, "title": "Jet Lag: The Game", "monitored": true }
            ])))
            .mount(&server)
            .await;

        let client = LibraryClient::new(server.uri(), "secret");
        assert!(client.is_monitored_series("42").await.unwrap());
        assert!(!client.is_monitored_series("99").await.unwrap());
    }
}
