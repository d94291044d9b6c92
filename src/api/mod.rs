//! Control API: a thin axum adapter around [`CrawlEngine`]. Transport
//! plumbing only — the engine's own public API is usable directly by
//! non-HTTP callers and is exercised that way in tests.

mod registry;

pub use registry::TaskRegistry;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::types::{
    CrawlAccepted, CrawlRequest, ErrorResponse, HealthResponse, TaskView, UrlsResponse,
};
use crate::engine::CrawlEngine;
use crate::storage::Storage;

pub struct ApiState {
    pub engine: Arc<CrawlEngine>,
    pub storage: Arc<dyn Storage>,
    pub registry: TaskRegistry,
}

impl ApiState {
    pub fn new(engine: Arc<CrawlEngine>, storage: Arc<dyn Storage>) -> Self {
        Self {
            engine,
            storage,
            registry: TaskRegistry::new(),
        }
    }
}

pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/crawl", post(post_crawl))
        .route("/task/{task_id}", get(get_task).delete(delete_task))
        .route("/urls/{task_id}/{domain}", get(get_urls))
        .route("/health", get(get_health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

async fn post_crawl(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<CrawlRequest>,
) -> Result<(StatusCode, Json<CrawlAccepted>), ApiError> {
    if request.domains.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "domains must not be empty"));
    }
    if let Some(depth) = request.max_depth {
        if depth < 1 {
            return Err(error(StatusCode::BAD_REQUEST, "max_depth must be >= 1"));
        }
    }

    let task_id = Uuid::new_v4().to_string();
    let max_depth = request.max_depth.unwrap_or_else(|| state.engine.default_max_depth());
    let domains = request.domains.clone();

    let cancel = CancellationToken::new();
    let spawn_cancel = cancel.clone();
    let spawn_state = Arc::clone(&state);
    let spawn_task_id = task_id.clone();
    let spawn_domains = domains.clone();
    let handle = tokio::spawn(async move {
        spawn_state.registry.mark_started(&spawn_task_id).await;

        let registry = spawn_state.registry.clone();
        let progress_task_id = spawn_task_id.clone();
        let progress = {
            let registry = registry.clone();
            let task_id = progress_task_id.clone();
            Arc::new(move |event: crate::core::types::ProgressEvent| {
                let registry = registry.clone();
                let task_id = task_id.clone();
                tokio::spawn(async move {
                    registry
                        .mark_progress(&task_id, serde_json::to_value(event).unwrap_or_default())
                        .await;
                });
            })
        };

        let result = spawn_state
            .engine
            .crawl(&spawn_task_id, spawn_domains, Some(max_depth), Some(progress), Some(spawn_cancel))
            .await;

        match result {
            Ok(report) => spawn_state.registry.mark_success(&spawn_task_id, report).await,
            Err(e) => {
                warn!(task_id = %spawn_task_id, error = %e, "crawl task failed");
                spawn_state.registry.mark_failure(&spawn_task_id, e.to_string()).await;
            }
        }
    });

    state.registry.register(&task_id, handle.abort_handle(), cancel).await;
    info!(task_id = %task_id, ?domains, max_depth, "crawl dispatched");

    Ok((
        StatusCode::OK,
        Json(CrawlAccepted {
            task_id,
            status: "Crawling started".to_string(),
            domains,
            max_depth,
        }),
    ))
}

async fn get_task(
    State(state): State<Arc<ApiState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskView>, ApiError> {
    state
        .registry
        .view(&task_id)
        .await
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "unknown task_id"))
}

#[derive(Debug, Deserialize)]
struct DeleteParams {
    #[serde(default)]
    terminate: bool,
}

async fn delete_task(
    State(state): State<Arc<ApiState>>,
    Path(task_id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<TaskView>, ApiError> {
    state
        .registry
        .revoke(&task_id, params.terminate)
        .await
        .map(|(view, _revoked)| Json(view))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "unknown task_id"))
}

async fn get_urls(
    State(state): State<Arc<ApiState>>,
    Path((task_id, domain)): Path<(String, String)>,
) -> Result<Json<UrlsResponse>, ApiError> {
    let fast = state
        .storage
        .get_fast(&domain, &task_id)
        .await
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if !fast.is_empty() {
        return Ok(Json(UrlsResponse {
            source: "fast",
            task_id,
            domain,
            urls_count: fast.len(),
            urls: fast,
            timestamp: None,
        }));
    }

    let durable = state
        .storage
        .get_durable(&domain, &task_id)
        .await
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    match durable {
        Some(record) => Ok(Json(UrlsResponse {
            source: "durable",
            task_id,
            domain,
            urls_count: record.urls.len(),
            urls: record.urls,
            timestamp: Some(record.timestamp),
        })),
        None => Err(error(StatusCode::NOT_FOUND, "no urls for this task/domain")),
    }
}

async fn get_health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let fast_store_reachable = state.storage.get_fast("__health__", "__health__").await.is_ok();
    Json(HealthResponse {
        status: "healthy",
        fast_store_reachable,
    })
}
