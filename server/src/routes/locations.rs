use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use maintdesk::model::{Location, LocationNode};
use maintdesk::service::locations;
use maintdesk::{Page, PageQuery};
use serde_json::Value;

use super::{body, created, deleted, ok_json};
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/locations", get(list_locations).post(create_location))
        .route("/locations/tree", get(location_tree))
        .route(
            "/locations/:id",
            get(get_location).put(update_location).delete(delete_location),
        )
        .route("/locations/:id/children", get(location_children))
}

async fn list_locations(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Page<Location>>, ApiError> {
    let Query(query) = query?;
    let search = query.search_term().map(str::to_string);
    let window = state.window(&query);
    ok_json(
        state
            .run(move |db| locations::list(db, search.as_deref(), window))
            .await,
    )
}

async fn location_tree(State(state): State<AppState>) -> Result<Json<Vec<LocationNode>>, ApiError> {
    ok_json(state.run(locations::tree).await)
}

async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Location>, ApiError> {
    ok_json(state.run(move |db| locations::get(db, &id)).await)
}

async fn location_children(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Location>>, ApiError> {
    ok_json(state.run(move |db| locations::children(db, &id)).await)
}

async fn create_location(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    let payload = body(payload)?;
    created(state.run(move |db| locations::create(db, payload)).await)
}

async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Location>, ApiError> {
    let payload = body(payload)?;
    ok_json(state.run(move |db| locations::update(db, &id, payload)).await)
}

async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.run(move |db| locations::delete(db, &id)).await?;
    Ok(deleted("Location deleted"))
}
