use axum::{Json, extract::Extension, http::StatusCode};
use std::sync::Arc;
use std::time::Duration;

use super::protocol::{GetObjectRequest, GetObjectResponse};
use crate::host::context::DistributedContext;

pub async fn handle_get_object(
    Extension(context): Extension<Arc<DistributedContext>>,
    Json(req): Json<GetObjectRequest>,
) -> (StatusCode, Json<GetObjectResponse>) {
    let id = match req.id.resolve(context.host().device_manager()) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to resolve object id: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(GetObjectResponse::unknown(e.to_string())),
            );
        }
    };

    let value = match context.remote_objects().lookup(&id) {
        Some(value) => value,
        None => {
            tracing::debug!("Object {} not found", id);
            return (
                StatusCode::NOT_FOUND,
                Json(GetObjectResponse::unknown(format!("Unknown remote object: {}", id))),
            );
        }
    };

    if let Some(wait_ms) = req.wait_ms
        && !value.is_ready()
    {
        if tokio::time::timeout(Duration::from_millis(wait_ms), value.wait())
            .await
            .is_err()
        {
            tracing::debug!("Object {} still pending after {}ms", id, wait_ms);
        }
    }

    let response = match value.get() {
        None => GetObjectResponse {
            status: "pending".to_string(),
            value: None,
            error: None,
        },
        Some(Ok(value)) => GetObjectResponse {
            status: "available".to_string(),
            value: Some(value.to_json()),
            error: None,
        },
        Some(Err(e)) => GetObjectResponse {
            status: "error".to_string(),
            value: None,
            error: Some(e.to_string()),
        },
    };

    (StatusCode::OK, Json(response))
}
