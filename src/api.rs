//! Thin HTTP surface over the pipeline and the store.
//! Handlers only translate pipeline results into JSON.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::PipelineError;
use crate::live::{LiveBoards, LiveSnapshot};
use crate::model::{Board, Category, TrendItem};
use crate::pipeline::Pipeline;
use crate::store::TrendStore;

const DEFAULT_READ_LIMIT: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<dyn TrendStore>,
    /// Live boards keyed by lowercase region tag.
    pub regions: Arc<BTreeMap<String, Arc<LiveBoards>>>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let store = pipeline.store();
        Self {
            pipeline,
            store,
            regions: Arc::new(BTreeMap::new()),
        }
    }

    pub fn with_region(mut self, boards: LiveBoards) -> Self {
        Arc::make_mut(&mut self.regions).insert(boards.region().to_string(), Arc::new(boards));
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/trends", get(all_boards))
        .route("/api/trends/{board}", get(one_board))
        .route("/api/cron/fetch/{category}", post(cron_fetch))
        .route("/api/cron/fetch-all", post(cron_fetch_all))
        .route("/api/cron/analyze-overall", post(cron_overall))
        .route("/api/regions/{region}/trends", get(region_boards))
        .route("/api/ai/summarize", post(summarize))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrendResponse {
    category: &'static str,
    category_label: &'static str,
    updated_at: Option<DateTime<Utc>>,
    items: Vec<TrendItem>,
}

#[derive(Debug, Deserialize)]
struct ReadQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct LiveQuery {
    category: Option<String>,
    refresh: Option<String>,
}

fn error_json(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "success": false, "error": msg.into() }))).into_response()
}

async fn read_board(store: &dyn TrendStore, board: Board, limit: usize) -> Result<TrendResponse, Response> {
    let items = store
        .read_top(board, limit)
        .await
        .map_err(|e| error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let updated_at = store
        .last_updated(board)
        .await
        .map_err(|e| error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(TrendResponse {
        category: board.as_str(),
        category_label: board.label(),
        updated_at,
        items,
    })
}

async fn all_boards(State(state): State<AppState>, Query(q): Query<ReadQuery>) -> Response {
    let limit = q.limit.unwrap_or(DEFAULT_READ_LIMIT);
    let boards = std::iter::once(Board::Overall).chain(Category::ALL.into_iter().map(Board::from));
    let mut out = Vec::new();
    for b in boards {
        match read_board(state.store.as_ref(), b, limit).await {
            Ok(r) => out.push(r),
            Err(resp) => return resp,
        }
    }
    Json(json!({ "boards": out })).into_response()
}

async fn one_board(
    State(state): State<AppState>,
    Path(board): Path<String>,
    Query(q): Query<ReadQuery>,
) -> Response {
    let Ok(board) = board.parse::<Board>() else {
        return error_json(StatusCode::NOT_FOUND, format!("unknown board {board:?}"));
    };
    match read_board(state.store.as_ref(), board, q.limit.unwrap_or(DEFAULT_READ_LIMIT)).await {
        Ok(r) => Json(r).into_response(),
        Err(resp) => resp,
    }
}

fn run_error(e: &PipelineError) -> Value {
    json!({ "success": false, "error": e.to_string() })
}

async fn cron_fetch(State(state): State<AppState>, Path(category): Path<String>) -> Response {
    let Ok(category) = category.parse::<Category>() else {
        return error_json(StatusCode::BAD_REQUEST, format!("unknown category {category:?}"));
    };
    match state.pipeline.run_category(category).await {
        Ok(report) => Json(json!({
            "success": true,
            "category": category,
            "count": report.items.len(),
            "items": report.items,
        }))
        .into_response(),
        Err(e) if e.is_hard_failure() => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(run_error(&e))).into_response()
        }
        Err(e) => Json(run_error(&e)).into_response(),
    }
}

async fn cron_fetch_all(State(state): State<AppState>) -> Response {
    let results = state.pipeline.run_all().await;
    let all_ok = results.iter().all(|(_, r)| r.is_ok());
    let rows: Vec<Value> = results
        .iter()
        .map(|(c, r)| match r {
            Ok(report) => json!({ "category": c, "success": true, "count": report.items.len() }),
            Err(e) => json!({ "category": c, "success": false, "error": e.to_string() }),
        })
        .collect();
    Json(json!({ "success": all_ok, "results": rows })).into_response()
}

async fn cron_overall(State(state): State<AppState>) -> Response {
    match state.pipeline.run_overall().await {
        Ok(report) if report.items.is_empty() => Json(json!({
            "success": false,
            "message": "No trends to analyze",
            "persisted": false,
        }))
        .into_response(),
        Ok(report) => Json(json!({
            "success": true,
            "persisted": report.persisted,
            "metaAnalysis": report.meta_analysis,
            "items": report.items,
        }))
        .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(run_error(&e))).into_response(),
    }
}

fn live_board(snapshot: &LiveSnapshot, category: Category) -> TrendResponse {
    TrendResponse {
        category: category.as_str(),
        category_label: category.label(),
        updated_at: Some(snapshot.fetched_at),
        items: snapshot
            .board(category)
            .map(|b| b.items.clone())
            .unwrap_or_default(),
    }
}

/// `?category=` narrows the answer to one board; `?refresh=true` skips the cache.
async fn region_boards(
    State(state): State<AppState>,
    Path(region): Path<String>,
    Query(q): Query<LiveQuery>,
) -> Response {
    let Some(live) = state.regions.get(&region.to_ascii_lowercase()).cloned() else {
        return error_json(StatusCode::NOT_FOUND, format!("unknown region {region:?}"));
    };
    let category = match q.category.as_deref() {
        None => None,
        Some(raw) => match raw.parse::<Category>() {
            Ok(c) => Some(c),
            Err(_) => return error_json(StatusCode::BAD_REQUEST, format!("unknown category {raw:?}")),
        },
    };

    let snapshot = live.snapshot(q.refresh.as_deref() == Some("true")).await;
    match category {
        Some(c) => Json(live_board(&snapshot, c)).into_response(),
        None => {
            let boards: Vec<TrendResponse> = Category::ALL
                .into_iter()
                .map(|c| live_board(&snapshot, c))
                .collect();
            Json(json!({
                "region": snapshot.region,
                "lastUpdated": snapshot.fetched_at,
                "boards": boards,
            }))
            .into_response()
        }
    }
}

/// One-off summary for a keyword. The body is read as loose JSON so a missing
/// or non-string keyword gets the same 400 as an empty one.
async fn summarize(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let keyword = body
        .get("keyword")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|k| !k.is_empty());
    let Some(keyword) = keyword else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "keyword is required" })),
        )
            .into_response();
    };
    let context = body.get("context").and_then(Value::as_str).unwrap_or("");

    match state.pipeline.summarizer().summarize_item(keyword, context).await {
        Some(summary) => Json(json!({ "summary": summary })).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to generate summary" })),
        )
            .into_response(),
    }
}
