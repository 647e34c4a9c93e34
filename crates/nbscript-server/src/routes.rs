//! HTTP routes for the batch server.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Form, Query, State, rejection::FormRejection},
    http::{HeaderMap, header::AUTHORIZATION},
    response::Json,
    routing::get,
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::BatchConfig;
use crate::batch::{BatchResponse, run_batch};
use crate::error::{ServerError, ServerResult};

/// Application state shared across handlers.
pub struct AppState {
    pub config: BatchConfig,
}

/// Request arguments, from the query string or a form body.
#[derive(Debug, Default, Deserialize)]
pub struct BatchParams {
    pub path: Option<String>,
}

/// Create the router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/nbscript/batch", get(batch_get_handler).post(batch_post_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Health check handler.
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn batch_get_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<BatchParams>,
) -> ServerResult<Json<BatchResponse>> {
    authorize(state.config.token.as_deref(), &headers)?;
    let path = params.path.ok_or(ServerError::MissingPath)?;
    Ok(Json(run_batch(&state.config, &path).await?))
}

/// POST takes `path` from a form body, falling back to the query string.
async fn batch_post_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<BatchParams>,
    form: Result<Form<BatchParams>, FormRejection>,
) -> ServerResult<Json<BatchResponse>> {
    authorize(state.config.token.as_deref(), &headers)?;
    let path = form
        .ok()
        .and_then(|Form(body)| body.path)
        .or(params.path)
        .ok_or(ServerError::MissingPath)?;
    Ok(Json(run_batch(&state.config, &path).await?))
}

/// Check the `Authorization` header against the configured token.
///
/// Accepts `token <T>` and `Bearer <T>`. With no token configured every
/// request is allowed.
pub fn authorize(expected: Option<&str>, headers: &HeaderMap) -> ServerResult<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let given = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("token ")
                .or_else(|| value.strip_prefix("Bearer "))
        })
        .map(str::trim);
    match given {
        Some(token) if token == expected => Ok(()),
        _ => Err(ServerError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_authorize() {
        assert!(authorize(None, &HeaderMap::new()).is_ok());
        assert!(authorize(Some("s3cret"), &headers("token s3cret")).is_ok());
        assert!(authorize(Some("s3cret"), &headers("Bearer s3cret")).is_ok());
        assert!(authorize(Some("s3cret"), &headers("token wrong")).is_err());
        assert!(authorize(Some("s3cret"), &headers("s3cret")).is_err());
        assert!(authorize(Some("s3cret"), &HeaderMap::new()).is_err());
    }
}
