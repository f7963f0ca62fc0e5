use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Series {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub tags: Vec<i64>,
}

/// A label the library service lets operators attach to a series; used
/// to recognize the `wai-<creator>` tagged-candidate shortcut (spec §4.6).
#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: i64,
    pub series_id: i64,
    pub season_number: i64,
    pub episode_number: i64,
    pub title: String,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub episode_file_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualImportCandidate {
    pub path: String,
    pub quality: serde_json::Value,
    #[serde(default)]
    pub languages: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct QualityAndLanguages {
    pub quality: serde_json::Value,
    pub languages: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManualImportResult {
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
