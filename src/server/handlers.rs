//! HTTP request handlers for the web server.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::aggregation::DateRange;
use crate::models::EntityType;
use crate::query::{parse_day, NetworkQuery, PhraseQuery, QueryError, TrendQuery};

/// Query string shared by the three aggregation endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SignalParams {
    pub entity: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Phrases only.
    pub limit: Option<usize>,
    /// Network only.
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    /// Comma-separated entity type tags.
    pub groups: Option<String>,
    /// Comma-separated entity surfaces.
    pub exclude: Option<String>,
    pub include_queried: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RunsParams {
    pub limit: Option<i64>,
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

/// Malformed query strings get the same `{"error"}` body as invalid queries.
fn rejection_response(rejection: QueryRejection) -> Response {
    error_response(StatusCode::BAD_REQUEST, rejection.body_text())
}

fn query_error_response(err: QueryError) -> Response {
    match err {
        QueryError::InvalidQuery(_) => error_response(StatusCode::BAD_REQUEST, err),
        QueryError::Database(ref e) => {
            tracing::error!("Query failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    }
}

fn split_list(raw: Option<&str>) -> Vec<&str> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

impl SignalParams {
    fn entity(&self) -> Result<String, QueryError> {
        self.entity
            .clone()
            .ok_or_else(|| QueryError::InvalidQuery("entity is required".to_string()))
    }

    /// Missing end means today; missing start means `window_days` before end.
    fn dates(&self, window_days: u32) -> Result<(NaiveDate, NaiveDate), QueryError> {
        let end = match self.end_date.as_deref() {
            Some(s) => parse_day(s)?,
            None => Utc::now().date_naive(),
        };
        let start = match self.start_date.as_deref() {
            Some(s) => parse_day(s)?,
            None => DateRange::ending_on(end, window_days).start,
        };
        Ok((start, end))
    }

    fn entity_types(&self) -> Result<Vec<EntityType>, QueryError> {
        split_list(self.groups.as_deref())
            .into_iter()
            .map(|tag| {
                EntityType::from_str(tag)
                    .ok_or_else(|| QueryError::InvalidQuery(format!("unknown entity type '{}'", tag)))
            })
            .collect()
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Sentiment trend: `[{day, label, count}]`.
pub async fn api_trends(
    State(state): State<AppState>,
    params: Result<Query<SignalParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return rejection_response(rejection),
    };
    let query = match (params.entity(), params.dates(state.default_window_days)) {
        (Ok(entity), Ok((start, end))) => TrendQuery { entity, start, end },
        (Err(e), _) | (_, Err(e)) => return query_error_response(e),
    };

    match state.queries.trend(&query).await {
        Ok(points) => Json(points).into_response(),
        Err(e) => query_error_response(e),
    }
}

/// Ranked framing phrases: `[{phrase, count}]`.
pub async fn api_phrases(
    State(state): State<AppState>,
    params: Result<Query<SignalParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return rejection_response(rejection),
    };
    let query = match (params.entity(), params.dates(state.default_window_days)) {
        (Ok(entity), Ok((start, end))) => PhraseQuery {
            entity,
            start,
            end,
            limit: params.limit,
        },
        (Err(e), _) | (_, Err(e)) => return query_error_response(e),
    };

    match state.queries.phrases(&query).await {
        Ok(phrases) => Json(phrases).into_response(),
        Err(e) => query_error_response(e),
    }
}

/// Co-occurrence graph: `{nodes, edges}`.
pub async fn api_network(
    State(state): State<AppState>,
    params: Result<Query<SignalParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return rejection_response(rejection),
    };
    let build = || -> Result<NetworkQuery, QueryError> {
        let (start, end) = params.dates(state.default_window_days)?;
        let mut query = NetworkQuery::new(params.entity()?, start, end);
        query.min_confidence = params.min_score.unwrap_or(0.0);
        query.max_confidence = params.max_score.unwrap_or(1.0);
        query.allowed_types = params.entity_types()?;
        query.excluded_entities = split_list(params.exclude.as_deref())
            .into_iter()
            .map(str::to_string)
            .collect();
        query.include_queried = params.include_queried.unwrap_or(true);
        Ok(query)
    };

    let query = match build() {
        Ok(q) => q,
        Err(e) => return query_error_response(e),
    };

    match state.queries.network(&query).await {
        Ok(graph) => Json(graph).into_response(),
        Err(e) => query_error_response(e),
    }
}

/// Recent runs, newest first.
pub async fn api_runs(
    State(state): State<AppState>,
    params: Result<Query<RunsParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return rejection_response(rejection),
    };
    let limit = params.limit.unwrap_or(20).clamp(1, 500);

    match state.runs.list_recent(limit).await {
        Ok(runs) => Json(runs).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// One run with its statistics.
pub async fn api_run_detail(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    let run = match state.runs.get(&run_id).await {
        Ok(Some(run)) => run,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, format!("run '{}' not found", run_id))
        }
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    };

    let statistics = match state.runs.statistics(&run_id).await {
        Ok(statistics) => statistics,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    };
    let sources = match state.runs.source_statistics(&run_id).await {
        Ok(sources) => sources,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    };
    let duration_secs = run.duration().map(|d| d.num_seconds());

    Json(json!({
        "run": run,
        "durationSecs": duration_secs,
        "statistics": statistics,
        "sources": sources,
    }))
    .into_response()
}
