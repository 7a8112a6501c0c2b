use chrono::Utc;
use serde_json::Value;

use super::ensure_all_found;
use crate::db::{machine_repo, operation_repo, range_repo, Database};
use crate::error::{MaintError, Result};
use crate::model::{
    dedup_ids, new_id, non_blank, MaintenanceRange, MaintenanceRangeDetail,
    MaintenanceRangeInput, MaintenanceType,
};
use crate::pagination::{Page, PageWindow};
use crate::validation::{self, rules, Payload};

const KIND: &str = "Maintenance range";

pub fn list(
    db: &Database,
    search: Option<&str>,
    range_type: Option<MaintenanceType>,
    window: PageWindow,
) -> Result<Page<MaintenanceRange>> {
    let filter = range_repo::RangeFilter {
        search: search.map(str::to_string),
        range_type,
        limit: Some(window.limit),
        offset: Some(window.offset()),
    };
    let (items, total) = range_repo::query(db, &filter)?;
    Ok(Page::new(items, total, window))
}

pub fn get(db: &Database, id: &str) -> Result<MaintenanceRange> {
    range_repo::find_by_id(db, id)?.ok_or_else(|| MaintError::not_found(KIND, id))
}

pub fn get_detail(db: &Database, id: &str) -> Result<MaintenanceRangeDetail> {
    let range = get(db, id)?;
    let mut details = resolve_details(db, vec![range])?;
    details
        .pop()
        .ok_or_else(|| MaintError::not_found(KIND, id))
}

/// Resolves the operations of every range with a single lookup.
pub(crate) fn resolve_details(
    db: &Database,
    ranges: Vec<MaintenanceRange>,
) -> Result<Vec<MaintenanceRangeDetail>> {
    let op_ids = dedup_ids(
        ranges
            .iter()
            .flat_map(|r| r.operations.iter().cloned())
            .collect(),
    );
    let operations = operation_repo::find_many(db, &op_ids)?;
    Ok(ranges
        .into_iter()
        .map(|r| MaintenanceRangeDetail::from_parts(r, &operations))
        .collect())
}

/// The machine's maintenance ranges, optionally restricted to one type.
pub fn for_machine(
    db: &Database,
    machine_id: &str,
    range_type: Option<MaintenanceType>,
) -> Result<Vec<MaintenanceRangeDetail>> {
    let machine = machine_repo::find_by_id(db, machine_id)?
        .ok_or_else(|| MaintError::not_found("Machine", machine_id))?;
    let ranges: Vec<MaintenanceRange> = range_repo::find_many(db, &machine.maintenance_ranges)?
        .into_iter()
        .filter(|r| range_type.map_or(true, |t| r.range_type == t))
        .collect();
    resolve_details(db, ranges)
}

fn parse(db: &Database, payload: Value) -> Result<MaintenanceRangeInput> {
    let mut input: MaintenanceRangeInput = validation::parse(Payload::MaintenanceRange, payload)?;
    rules::maintenance_range(&input)?;

    input.operations = dedup_ids(input.operations);
    let found: Vec<String> = operation_repo::find_many(db, &input.operations)?
        .into_iter()
        .map(|o| o.id)
        .collect();
    ensure_all_found("operations", &input.operations, &found)?;

    input.days_of_week.sort();
    input.days_of_week.dedup();
    Ok(input)
}

pub fn create(db: &Database, payload: Value) -> Result<MaintenanceRange> {
    let _span = tracing::info_span!("range.create").entered();
    let input = parse(db, payload)?;
    let now = Utc::now();
    let range = MaintenanceRange {
        id: new_id(),
        name: input.name.trim().to_string(),
        description: non_blank(input.description),
        range_type: input.range_type,
        operations: input.operations,
        frequency: input.frequency,
        start_date: input.start_date,
        start_time: non_blank(input.start_time),
        days_of_week: input.days_of_week,
        created_at: now,
        updated_at: now,
    };
    range_repo::insert(db, &range)?;
    log::info!("Created maintenance range {} ({})", range.id, range.name);
    Ok(range)
}

/// Updates a range. Its type is fixed once a work order references it.
pub fn update(db: &Database, id: &str, payload: Value) -> Result<MaintenanceRange> {
    let _span = tracing::info_span!("range.update", id).entered();
    let mut range = get(db, id)?;
    let input = parse(db, payload)?;

    if input.range_type != range.range_type {
        let work_orders = range_repo::count_work_orders_using(db, id)?;
        if work_orders > 0 {
            return Err(MaintError::Conflict {
                message: format!(
                    "Cannot change the type of a maintenance range used by {} work order(s)",
                    work_orders
                ),
                blocking: vec![("workOrdersCount", work_orders)],
            });
        }
    }

    range.name = input.name.trim().to_string();
    range.description = non_blank(input.description);
    range.range_type = input.range_type;
    range.operations = input.operations;
    range.frequency = input.frequency;
    range.start_date = input.start_date;
    range.start_time = non_blank(input.start_time);
    range.days_of_week = input.days_of_week;
    range.updated_at = Utc::now();
    range_repo::update(db, &range)?;
    Ok(range)
}

/// Deletes a range that no work order references and detaches it from
/// every machine. Returns the number of machines it was removed from.
pub fn delete(db: &Database, id: &str) -> Result<u64> {
    let _span = tracing::info_span!("range.delete", id).entered();
    get(db, id)?;

    let work_orders = range_repo::count_work_orders_using(db, id)?;
    if work_orders > 0 {
        return Err(MaintError::Conflict {
            message: format!(
                "Maintenance range is used by {} work order(s) and cannot be deleted",
                work_orders
            ),
            blocking: vec![("workOrdersCount", work_orders)],
        });
    }

    let detached = range_repo::delete_and_detach(db, id)?
        .ok_or_else(|| MaintError::not_found(KIND, id))?;
    log::info!(
        "Deleted maintenance range {} (detached from {} machine(s))",
        id,
        detached
    );
    Ok(detached)
}
