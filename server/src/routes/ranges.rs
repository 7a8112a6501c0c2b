use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use maintdesk::model::{MaintenanceRange, MaintenanceRangeDetail, MaintenanceType};
use maintdesk::service::ranges;
use maintdesk::{Page, PageQuery};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{body, created, ok_json};
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/maintenance-ranges", get(list_ranges).post(create_range))
        .route(
            "/maintenance-ranges/:id",
            get(get_range).put(update_range).delete(delete_range),
        )
}

#[derive(Debug, Default, Deserialize)]
struct RangeListQuery {
    page: Option<u64>,
    limit: Option<u64>,
    search: Option<String>,
    #[serde(rename = "type")]
    range_type: Option<MaintenanceType>,
}

async fn list_ranges(
    State(state): State<AppState>,
    query: Result<Query<RangeListQuery>, QueryRejection>,
) -> Result<Json<Page<MaintenanceRange>>, ApiError> {
    let Query(query) = query?;
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
        search: query.search,
    };
    let search = page.search_term().map(str::to_string);
    let range_type = query.range_type;
    let window = state.window(&page);
    ok_json(
        state
            .run(move |db| ranges::list(db, search.as_deref(), range_type, window))
            .await,
    )
}

async fn get_range(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MaintenanceRangeDetail>, ApiError> {
    ok_json(state.run(move |db| ranges::get_detail(db, &id)).await)
}

async fn create_range(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<MaintenanceRange>), ApiError> {
    let payload = body(payload)?;
    created(state.run(move |db| ranges::create(db, payload)).await)
}

async fn update_range(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MaintenanceRange>, ApiError> {
    let payload = body(payload)?;
    ok_json(state.run(move |db| ranges::update(db, &id, payload)).await)
}

async fn delete_range(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let detached = state.run(move |db| ranges::delete(db, &id)).await?;
    Ok(Json(json!({
        "message": "Maintenance range deleted",
        "machinesUpdated": detached,
    })))
}
