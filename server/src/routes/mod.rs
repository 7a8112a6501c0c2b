//! HTTP routes. Each resource module contributes a router merged under `/api`.

pub mod locations;
pub mod machines;
pub mod operations;
pub mod ranges;
pub mod work_orders;

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

/// Builds the application router with every route and middleware.
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(locations::routes())
        .merge(machines::routes())
        .merge(operations::routes())
        .merge(ranges::routes())
        .merge(work_orders::routes());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(create_cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins. `*` allows any origin.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Serves `app` until `shutdown` resolves.
pub async fn run_server(
    app: Router,
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);
    tracing::info!("- API: http://{}/api", addr);
    tracing::info!("- Health: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) fn ok_json<T: Serialize>(result: Result<T, ApiError>) -> Result<Json<T>, ApiError> {
    result.map(Json)
}

pub(crate) fn created<T: Serialize>(
    result: Result<T, ApiError>,
) -> Result<(StatusCode, Json<T>), ApiError> {
    result.map(|v| (StatusCode::CREATED, Json(v)))
}

/// Unwraps a JSON body, turning malformed input into a 400.
pub(crate) fn body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    let Json(value) = payload?;
    Ok(value)
}

pub(crate) fn deleted(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "message": message.into() }))
}
