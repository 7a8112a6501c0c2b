use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use maintdesk::model::Operation;
use maintdesk::service::operations;
use maintdesk::{Page, PageQuery};
use serde_json::Value;

use super::{body, created, deleted, ok_json};
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/operations", get(list_operations).post(create_operation))
        .route(
            "/operations/:id",
            get(get_operation)
                .put(update_operation)
                .delete(delete_operation),
        )
}

async fn list_operations(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Page<Operation>>, ApiError> {
    let Query(query) = query?;
    let search = query.search_term().map(str::to_string);
    let window = state.window(&query);
    ok_json(
        state
            .run(move |db| operations::list(db, search.as_deref(), window))
            .await,
    )
}

async fn get_operation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Operation>, ApiError> {
    ok_json(state.run(move |db| operations::get(db, &id)).await)
}

async fn create_operation(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Operation>), ApiError> {
    let payload = body(payload)?;
    created(state.run(move |db| operations::create(db, payload)).await)
}

async fn update_operation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Operation>, ApiError> {
    let payload = body(payload)?;
    ok_json(state.run(move |db| operations::update(db, &id, payload)).await)
}

async fn delete_operation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.run(move |db| operations::delete(db, &id)).await?;
    Ok(deleted("Operation deleted"))
}
