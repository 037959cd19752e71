//! HTTP route handlers.

use crate::error::ServerError;
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::DateTime;
use log::{debug, info};
use mizan_rs_memory::{
    DecayReport, HealthStatus, ListOptions, MemoryCategory, MemoryInput, MemoryRecord,
    SearchOptions, SearchResult, SummarizeReport, ValidationError,
};
use serde::Deserialize;

/// Body for `POST /memories`. Category stays a string so unknown values get a 400.
#[derive(Debug, Deserialize)]
pub struct AddMemoryRequest {
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub importance: Option<f64>,
}

/// Query for `GET /memories/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub category: Option<String>,
    /// Comma-separated required tags.
    #[serde(default)]
    pub tags: Option<String>,
}

/// Query for `GET /memories`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    /// RFC 3339 or epoch millis.
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub until: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthStatus>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.health()?))
}

pub async fn add_memory(
    State(state): State<AppState>,
    body: Result<Json<AddMemoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MemoryRecord>), ServerError> {
    let Json(request) = body.map_err(|err| ServerError::BadRequest(err.body_text()))?;
    let category = parse_category(&request.category)?;
    let input = MemoryInput {
        content: request.content,
        category,
        tags: request.tags,
        timestamp: request.timestamp,
        importance: request.importance,
    };
    let mut engine = state.engine.lock().await;
    let record = engine.add_memory(input).await?;
    info!(
        "memory added via http (id={}, category={})",
        record.id, record.category
    );
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<SearchResult>>, ServerError> {
    let Query(params) = params.map_err(|err| ServerError::BadRequest(err.body_text()))?;
    let options = SearchOptions {
        limit: params.limit,
        category: parse_optional_category(params.category.as_deref())?,
        tags: split_tags(params.tags.as_deref()),
        keyword: None,
    };
    let query = params.q.unwrap_or_default();
    let mut engine = state.engine.lock().await;
    let results = engine.search(&query, &options).await?;
    debug!("search served (results={})", results.len());
    Ok(Json(results))
}

pub async fn list_memories(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<MemoryRecord>>, ServerError> {
    let Query(params) = params.map_err(|err| ServerError::BadRequest(err.body_text()))?;
    let options = ListOptions {
        category: parse_optional_category(params.category.as_deref())?,
        tags: split_tags(params.tags.as_deref()),
        since: params.since.as_deref().map(parse_time).transpose()?,
        until: params.until.as_deref().map(parse_time).transpose()?,
        limit: params.limit,
        offset: params.offset,
    };
    let engine = state.engine.lock().await;
    Ok(Json(engine.list(&options)?))
}

pub async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MemoryRecord>, ServerError> {
    let mut engine = state.engine.lock().await;
    engine
        .get(&id)?
        .map(Json)
        .ok_or(ServerError::NotFound(id))
}

pub async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let mut engine = state.engine.lock().await;
    if engine.delete(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound(id))
    }
}

pub async fn summarize(State(state): State<AppState>) -> Result<Json<SummarizeReport>, ServerError> {
    let mut engine = state.engine.lock().await;
    Ok(Json(engine.summarize().await?))
}

pub async fn decay(State(state): State<AppState>) -> Result<Json<DecayReport>, ServerError> {
    let mut engine = state.engine.lock().await;
    Ok(Json(engine.decay()?))
}

pub async fn flush_wal(State(state): State<AppState>) -> Result<StatusCode, ServerError> {
    let mut engine = state.engine.lock().await;
    engine.flush_wal()?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_category(value: &str) -> Result<MemoryCategory, ServerError> {
    value
        .parse::<MemoryCategory>()
        .map_err(|err: ValidationError| ServerError::Memory(err.into()))
}

fn parse_optional_category(value: Option<&str>) -> Result<Option<MemoryCategory>, ServerError> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(parse_category)
        .transpose()
}

fn split_tags(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse epoch millis or an RFC 3339 timestamp.
fn parse_time(value: &str) -> Result<i64, ServerError> {
    let value = value.trim();
    if let Ok(millis) = value.parse::<i64>() {
        return Ok(millis);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.timestamp_millis())
        .map_err(|err| ServerError::BadRequest(format!("invalid timestamp '{value}': {err}")))
}
