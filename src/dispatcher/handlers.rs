use super::handler::RequestHandler;
use super::protocol::*;
use super::types::{ExecuteRequest, ExecuteResponse};
use crate::storage::handlers::handle_get_object;
use crate::storage::protocol::ENDPOINT_GET_OBJECT;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::{delete, get, post},
};
use std::sync::Arc;
use std::time::Duration;

/// All node endpoints, wired to one request handler and its session.
pub fn router(handler: Arc<RequestHandler>, request_timeout: Duration) -> Router {
    let context = handler.context().clone();

    Router::new()
        .route(ENDPOINT_REGISTER, post(handle_register))
        .route(ENDPOINT_EXECUTE, post(handle_execute))
        .route(&format!("{}/:name", ENDPOINT_PROGRAM), delete(handle_evict_program))
        .route(ENDPOINT_GET_OBJECT, post(handle_get_object))
        .route(ENDPOINT_TEARDOWN, post(handle_teardown))
        .route(ENDPOINT_STATS, get(handle_stats))
        .layer(Extension(handler))
        .layer(Extension(context))
        .layer(Extension(RequestTimeout(request_timeout)))
}

pub async fn handle_register(
    Extension(handler): Extension<Arc<RequestHandler>>,
    Json(req): Json<RegisterRequest>,
) -> (StatusCode, Json<RegisterResponse>) {
    // Compilation is CPU-bound; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || {
        handler.register(&req.program_name, &req.program, req.disable_optional_sections)
    })
    .await;

    match result {
        Ok(Ok(())) => (
            StatusCode::OK,
            Json(RegisterResponse {
                success: true,
                error: None,
            }),
        ),
        Ok(Err(e)) => (
            StatusCode::BAD_REQUEST,
            Json(RegisterResponse {
                success: false,
                error: Some(e.to_string()),
            }),
        ),
        Err(e) => {
            tracing::error!("Register task panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RegisterResponse {
                    success: false,
                    error: Some("registration aborted".to_string()),
                }),
            )
        }
    }
}

pub async fn handle_execute(
    Extension(handler): Extension<Arc<RequestHandler>>,
    Extension(RequestTimeout(timeout)): Extension<RequestTimeout>,
    Json(req): Json<ExecuteRequest>,
) -> (StatusCode, Json<ExecuteResponse>) {
    let program_name = req.program_name.clone();
    let (tx, rx) = tokio::sync::oneshot::channel();

    handler.execute(req, move |response| {
        // The receiver is gone if the HTTP request timed out; nothing to do then.
        let _ = tx.send(response);
    });

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(response)) => {
            let status = if response.ok {
                StatusCode::OK
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            (status, Json(response))
        }
        Ok(Err(_)) => {
            tracing::error!("Execute of {} dropped its completion", program_name);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExecuteResponse {
                    ok: false,
                    metadata: Vec::new(),
                    error: Some("completion dropped".to_string()),
                }),
            )
        }
        Err(_) => {
            tracing::warn!("Execute of {} timed out after {:?}", program_name, timeout);
            (
                StatusCode::GATEWAY_TIMEOUT,
                Json(ExecuteResponse {
                    ok: false,
                    metadata: Vec::new(),
                    error: Some(format!("timed out after {:?}", timeout)),
                }),
            )
        }
    }
}

pub async fn handle_evict_program(
    Extension(handler): Extension<Arc<RequestHandler>>,
    Path(program_name): Path<String>,
) -> (StatusCode, Json<EvictProgramResponse>) {
    if handler.programs().remove(&program_name) {
        (StatusCode::OK, Json(EvictProgramResponse { removed: true }))
    } else {
        tracing::debug!("Program not found for eviction: {}", program_name);
        (
            StatusCode::NOT_FOUND,
            Json(EvictProgramResponse { removed: false }),
        )
    }
}

pub async fn handle_teardown(
    Extension(handler): Extension<Arc<RequestHandler>>,
    Json(req): Json<TeardownRequest>,
) -> Json<TeardownResponse> {
    let (objects_removed, programs_removed) = handler.teardown(req.prefix_id);
    Json(TeardownResponse {
        objects_removed,
        programs_removed,
    })
}

pub async fn handle_stats(
    Extension(handler): Extension<Arc<RequestHandler>>,
) -> Json<StatsResponse> {
    Json(handler.stats())
}
