use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use maintdesk::model::{MaintenanceType, WorkOrder, WorkOrderDetail, WorkOrderStatus};
use maintdesk::service::work_orders::{self, ListFilter, WorkOrderSummary};
use maintdesk::{AggregatedOperation, Page, PageQuery};
use serde::Deserialize;
use serde_json::Value;

use super::{body, created, deleted, ok_json};
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/work-orders", get(list_work_orders).post(create_work_order))
        .route(
            "/work-orders/:id",
            get(get_work_order)
                .put(update_work_order)
                .delete(delete_work_order),
        )
        .route("/work-orders/:id/status", post(change_status))
        .route("/work-orders/:id/summary", get(work_order_summary))
        .route(
            "/work-orders/:id/machines/:machine_id/operations",
            get(machine_operations),
        )
        .route(
            "/work-orders/:id/machines/:machine_id/operations/:operation_id",
            put(fill_operation),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkOrderListQuery {
    page: Option<u64>,
    limit: Option<u64>,
    status: Option<WorkOrderStatus>,
    #[serde(rename = "type")]
    order_type: Option<MaintenanceType>,
    machine_id: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

async fn list_work_orders(
    State(state): State<AppState>,
    query: Result<Query<WorkOrderListQuery>, QueryRejection>,
) -> Result<Json<Page<WorkOrder>>, ApiError> {
    let Query(query) = query?;
    let window = state.window(&PageQuery {
        page: query.page,
        limit: query.limit,
        search: None,
    });
    let filter = ListFilter {
        status: query.status,
        order_type: query.order_type,
        machine_id: query.machine_id.filter(|s| !s.is_empty()),
        from: query.from,
        to: query.to,
    };
    ok_json(
        state
            .run(move |db| work_orders::list(db, &filter, window))
            .await,
    )
}

async fn get_work_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkOrderDetail>, ApiError> {
    ok_json(state.run(move |db| work_orders::get_detail(db, &id)).await)
}

async fn create_work_order(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<WorkOrder>), ApiError> {
    let payload = body(payload)?;
    created(state.run(move |db| work_orders::create(db, payload)).await)
}

async fn update_work_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WorkOrder>, ApiError> {
    let payload = body(payload)?;
    ok_json(state.run(move |db| work_orders::update(db, &id, payload)).await)
}

async fn delete_work_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.run(move |db| work_orders::delete(db, &id)).await?;
    Ok(deleted("Work order deleted"))
}

async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WorkOrder>, ApiError> {
    let payload = body(payload)?;
    ok_json(state.run(move |db| work_orders::set_status(db, &id, payload)).await)
}

async fn work_order_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkOrderSummary>, ApiError> {
    ok_json(state.run(move |db| work_orders::summary(db, &id)).await)
}

async fn machine_operations(
    State(state): State<AppState>,
    Path((id, machine_id)): Path<(String, String)>,
) -> Result<Json<Vec<AggregatedOperation>>, ApiError> {
    ok_json(
        state
            .run(move |db| work_orders::machine_operations(db, &id, &machine_id))
            .await,
    )
}

async fn fill_operation(
    State(state): State<AppState>,
    Path((id, machine_id, operation_id)): Path<(String, String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WorkOrder>, ApiError> {
    let payload = body(payload)?;
    ok_json(
        state
            .run(move |db| {
                work_orders::fill_operation(db, &id, &machine_id, &operation_id, payload)
            })
            .await,
    )
}
