use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use maintdesk::model::{Machine, MachineDetail, MaintenanceRangeDetail, MaintenanceType};
use maintdesk::service::{machines, ranges};
use maintdesk::{Page, PageQuery};
use serde::Deserialize;
use serde_json::Value;

use super::{body, created, deleted, ok_json};
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/machines", get(list_machines).post(create_machine))
        .route(
            "/machines/:id",
            get(get_machine).put(update_machine).delete(delete_machine),
        )
        .route("/machines/:id/maintenance-ranges", get(machine_ranges))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MachineListQuery {
    page: Option<u64>,
    limit: Option<u64>,
    search: Option<String>,
    location_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RangeTypeQuery {
    #[serde(rename = "type")]
    range_type: Option<MaintenanceType>,
}

async fn list_machines(
    State(state): State<AppState>,
    query: Result<Query<MachineListQuery>, QueryRejection>,
) -> Result<Json<Page<Machine>>, ApiError> {
    let Query(query) = query?;
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
        search: query.search,
    };
    let search = page.search_term().map(str::to_string);
    let location_id = query.location_id.filter(|s| !s.is_empty());
    let window = state.window(&page);
    ok_json(
        state
            .run(move |db| {
                machines::list(db, search.as_deref(), location_id.as_deref(), window)
            })
            .await,
    )
}

async fn get_machine(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MachineDetail>, ApiError> {
    ok_json(state.run(move |db| machines::get_detail(db, &id)).await)
}

async fn machine_ranges(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<RangeTypeQuery>, QueryRejection>,
) -> Result<Json<Vec<MaintenanceRangeDetail>>, ApiError> {
    let Query(query) = query?;
    let range_type = query.range_type;
    ok_json(
        state
            .run(move |db| ranges::for_machine(db, &id, range_type))
            .await,
    )
}

async fn create_machine(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Machine>), ApiError> {
    let payload = body(payload)?;
    created(state.run(move |db| machines::create(db, payload)).await)
}

async fn update_machine(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Machine>, ApiError> {
    let payload = body(payload)?;
    ok_json(state.run(move |db| machines::update(db, &id, payload)).await)
}

async fn delete_machine(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.run(move |db| machines::delete(db, &id)).await?;
    Ok(deleted("Machine deleted"))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_ranges_filtered_by_type() {
        let app = app();
        let (_, preventive) = post(
            &app,
            "/api/maintenance-ranges",
            json!({"name": "Weekly", "type": "preventive"}),
        )
        .await;
        let (_, corrective) = post(
            &app,
            "/api/maintenance-ranges",
            json!({"name": "Repair", "type": "corrective"}),
        )
        .await;
        let (status, machine) = post(
            &app,
            "/api/machines",
            json!({
                "name": "Press",
                "maintenanceRanges": [preventive["id"], corrective["id"]]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = machine["id"].as_str().unwrap();

        let (_, all) = get(&app, &format!("/api/machines/{}/maintenance-ranges", id)).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (_, only) = get(
            &app,
            &format!("/api/machines/{}/maintenance-ranges?type=corrective", id),
        )
        .await;
        assert_eq!(only.as_array().unwrap().len(), 1);
        assert_eq!(only[0]["name"], "Repair");

        let (status, _) = get(
            &app,
            &format!("/api/machines/{}/maintenance-ranges?type=weekly", id),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_detail_and_delete() {
        let app = app();
        let (_, hall) = post(&app, "/api/locations", json!({"name": "Hall"})).await;
        let (_, machine) = post(
            &app,
            "/api/machines",
            json!({"name": "Lathe", "locationId": hall["id"]}),
        )
        .await;
        let uri = format!("/api/machines/{}", machine["id"].as_str().unwrap());

        let (status, detail) = get(&app, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["location"]["name"], "Hall");

        let (_, page) = get(
            &app,
            &format!("/api/machines?locationId={}", hall["id"].as_str().unwrap()),
        )
        .await;
        assert_eq!(page["totalItems"], 1);

        let (status, body) = delete(&app, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Machine deleted");
        assert_eq!(get(&app, &uri).await.0, StatusCode::NOT_FOUND);
    }
}
