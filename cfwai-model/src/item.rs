use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The single unit of work that flows through the decision, aging, and
/// download queues. Fields accumulate as the item advances through stages;
/// the four ingress fields never mutate after creation.
///
/// Fields the source's free-form dictionary carried that this struct
/// doesn't name explicitly are preserved in `extra` and round-tripped
/// verbatim through (de)serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub creator: String,
    pub title: String,
    /// Publication date of the source video, in whatever form ingress
    /// supplied it (YYYYMMDD or any other human-parseable string).
    pub datecode: String,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title_result: Option<ShowMatch>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub episode_result: Option<EpisodeMatch>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ripeness: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_aging: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_scan: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub download_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub import_result: Option<Value>,

    /// Unknown fields preserved verbatim across persistence round-trips.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(creator: impl Into<String>, title: impl Into<String>, datecode: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            creator: creator.into(),
            title: title.into(),
            datecode: datecode.into(),
            url: url.into(),
            title_result: None,
            episode_result: None,
            ripeness: None,
            next_aging: None,
            last_scan: None,
            download_filename: None,
            file_name: None,
            import_result: None,
            extra: Map::new(),
        }
    }

    /// The composite string the matcher scores against, `"{creator} :: {title}"`.
    pub fn composite_title(&self) -> String {
        format!("{} :: {}", self.creator, self.title)
    }
}

/// Result of matching an item's composite title against the show catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowMatch {
    pub input: String,
    pub matched_show: Option<String>,
    pub matched_id: Option<String>,
    pub score: i64,
    pub reason: String,
}

impl ShowMatch {
    /// The "no candidates" edge case from spec §4.2.
    pub fn no_candidates(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            matched_show: None,
            matched_id: None,
            score: -1,
            reason: "no candidates".to_string(),
        }
    }
}

/// Result of matching an item's composite title + airdate against a
/// series' episode list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeMatch {
    pub input: String,
    pub matched_show: Option<String>,
    pub matched_series_id: Option<String>,
    pub season: Option<i64>,
    pub episode: Option<i64>,
    pub episode_title: Option<String>,
    pub episode_orig_title: Option<String>,
    pub score: i64,
    pub reason: String,
    pub full_match: Option<EpisodeRecord>,
}

impl EpisodeMatch {
    pub fn no_candidates(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            matched_show: None,
            matched_series_id: None,
            season: None,
            episode: None,
            episode_title: None,
            episode_orig_title: None,
            score: -1,
            reason: "no candidates".to_string(),
            full_match: None,
        }
    }
}

/// A single episode as reported by the library service, enriched with the
/// series it belongs to so the matcher can score against a flattened pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeRecord {
    pub series: String,
    pub series_id: String,
    pub season: i64,
    pub episode: i64,
    pub title: String,
    /// Airdate as reported upstream; `None` when the library service has
    /// none on file yet (the source's sentinel `-1`/`0`).
    pub air_date: Option<String>,
    pub episode_id: i64,
    pub has_file: bool,
    pub monitored: bool,
}
