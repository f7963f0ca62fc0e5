use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use cfwai_model::{Item, Outcome, Stage};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/notify", post(notify_handler))
        .route("/enqueue", post(enqueue_handler))
        .route("/get_item", get(get_item_handler))
        .route("/dequeue_item", post(dequeue_item_handler))
        .route("/api/start_{stage}", post(start_stage_handler))
        .route("/api/stop_{stage}", post(stop_stage_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct NotifyParams {
    creator: String,
    title: String,
    datecode: String,
    url: String,
}

async fn notify_handler(State(state): State<AppState>, Query(params): Query<NotifyParams>) -> AppResult<Json<Value>> {
    let item = Item::new(params.creator, params.title, params.datecode, params.url);
    state.decision_queue.push(item).await?;
    Ok(Json(serde_json::json!({ "status": "queued" })))
}

#[derive(Debug, Deserialize)]
pub struct EnqueueBody {
    message: String,
}

async fn enqueue_handler(State(state): State<AppState>, Json(body): Json<EnqueueBody>) -> Json<Value> {
    let Some(item) = parse_enqueue_message(&body.message) else {
        return Json(serde_json::json!({ "error": "Unable to process message" }));
    };
    match state.decision_queue.push(item).await {
        Ok(()) => Json(serde_json::json!({ "status": "queued" })),
        Err(err) => {
            tracing::error!(%err, "failed to enqueue parsed message");
            Json(serde_json::json!({ "error": "Unable to process message" }))
        }
    }
}

/// Parses `"<CREATOR> :: <YYYYMMDD> :: <TITLE>\n\n<URL>"` into an [`Item`],
/// per spec §6's `/enqueue` format. `None` on any malformed shape.
fn parse_enqueue_message(message: &str) -> Option<Item> {
    let (header, url) = message.split_once("\n\n")?;
    let mut parts = header.splitn(3, " :: ");
    let creator = parts.next()?.trim();
    let datecode = parts.next()?.trim();
    let title = parts.next()?.trim();
    if creator.is_empty() || datecode.is_empty() || title.is_empty() || url.trim().is_empty() {
        return None;
    }
    Some(Item::new(creator, title, datecode, url.trim()))
}

#[derive(Debug, Deserialize)]
pub struct GetItemParams {
    datafrom: String,
    name: Option<String>,
    value: Option<String>,
}

async fn get_item_handler(State(state): State<AppState>, Query(params): Query<GetItemParams>) -> AppResult<Json<Vec<Value>>> {
    let outcome = Outcome::from_archive_name(&params.datafrom)
        .ok_or_else(|| AppError::not_found(format!("unknown archive {}", params.datafrom)))?;
    let items = state.store.load_archive(outcome)?;

    let filtered = items
        .into_iter()
        .filter_map(|item| serde_json::to_value(&item).ok())
        .filter(|value| matches_filter(value, params.name.as_deref(), params.value.as_deref()))
        .collect();
    Ok(Json(filtered))
}

/// Applies `/get_item`'s three filter combinations (spec §6): both
/// `name`+`value` requires exact equality on that field; `name` alone
/// requires the field to be present; `value` alone requires it to appear
/// among the item's stringified field values.
fn matches_filter(value: &Value, name: Option<&str>, filter_value: Option<&str>) -> bool {
    let Value::Object(fields) = value else { return false };
    match (name, filter_value) {
        (Some(name), Some(filter_value)) => {
            fields.get(name).is_some_and(|field| stringify(field) == filter_value)
        }
        (Some(name), None) => fields.contains_key(name),
        (None, Some(filter_value)) => fields.values().any(|field| stringify(field) == filter_value),
        (None, None) => true,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn dequeue_item_handler(State(state): State<AppState>, Json(item): Json<Item>) -> AppResult<Json<bool>> {
    let removed = state.decision_queue.remove_matching(&item).await?;
    Ok(Json(removed))
}

fn parse_stage(name: &str) -> Option<Stage> {
    match name {
        "decision" => Some(Stage::Decision),
        "aging" => Some(Stage::Aging),
        "download" => Some(Stage::Download),
        _ => None,
    }
}

async fn start_stage_handler(State(state): State<AppState>, Path(stage): Path<String>) -> AppResult<Json<Value>> {
    let stage = parse_stage(&stage).ok_or_else(|| AppError::bad_request(format!("unknown stage {stage}")))?;
    state.supervisor.start(stage).await;
    Ok(Json(serde_json::json!({ "status": "started", "stage": stage.to_string() })))
}

async fn stop_stage_handler(State(state): State<AppState>, Path(stage): Path<String>) -> AppResult<Json<Value>> {
    let stage = parse_stage(&stage).ok_or_else(|| AppError::bad_request(format!("unknown stage {stage}")))?;
    state.supervisor.stop(stage).await;
    Ok(Json(serde_json::json!({ "status": "stopped", "stage": stage.to_string() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_enqueue_message_accepts_the_documented_shape() {
        let item = parse_enqueue_message("Some Creator :: 20250101 :: Some Title\n\nhttps://example/x").unwrap();
        assert_eq!(item.creator, "Some Creator");
        assert_eq!(item.datecode, "20250101");
        assert_eq!(item.title, "Some Title");
        assert_eq!(item.url, "https://example/x");
    }

    #[test]
    fn parse_enqueue_message_rejects_missing_url_separator() {
        assert!(parse_enqueue_message("Some Creator :: 20250101 :: Some Title https://example/x").is_none());
    }

    #[test]
    fn parse_enqueue_message_rejects_too_few_fields() {
        assert!(parse_enqueue_message("Some Creator :: 20250101\n\nhttps://example/x").is_none());
    }

    #[test]
    fn matches_filter_requires_exact_equality_when_both_given() {
        let value = serde_json::json!({ "creator": "Alice", "score": 70 });
        assert!(matches_filter(&value, Some("score"), Some("70")));
        assert!(!matches_filter(&value, Some("score"), Some("71")));
    }

    #[test]
    fn matches_filter_checks_presence_with_name_only() {
        let value = serde_json::json!({ "creator": "Alice" });
        assert!(matches_filter(&value, Some("creator"), None));
        assert!(!matches_filter(&value, Some("title"), None));
    }

    #[test]
    fn matches_filter_checks_any_field_with_value_only() {
        let value = serde_json::json!({ "creator": "Alice", "title": "Other" });
        assert!(matches_filter(&value, None, Some("Alice")));
        assert!(!matches_filter(&value, None, Some("Bob")));
    }
}
