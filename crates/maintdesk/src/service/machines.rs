use chrono::Utc;
use serde_json::Value;

use super::{ensure_all_found, ranges};
use crate::db::{location_repo, machine_repo, operation_repo, range_repo, Database};
use crate::error::{MaintError, Result};
use crate::model::{dedup_ids, new_id, non_blank, Machine, MachineDetail, MachineInput};
use crate::pagination::{Page, PageWindow};
use crate::validation::{self, rules, Payload};

const KIND: &str = "Machine";

pub fn list(
    db: &Database,
    search: Option<&str>,
    location_id: Option<&str>,
    window: PageWindow,
) -> Result<Page<Machine>> {
    let filter = machine_repo::MachineFilter {
        search: search.map(str::to_string),
        location_id: location_id.map(str::to_string),
        limit: Some(window.limit),
        offset: Some(window.offset()),
    };
    let (items, total) = machine_repo::query(db, &filter)?;
    Ok(Page::new(items, total, window))
}

pub fn get(db: &Database, id: &str) -> Result<Machine> {
    machine_repo::find_by_id(db, id)?.ok_or_else(|| MaintError::not_found(KIND, id))
}

/// The machine with its location, operations and ranges resolved.
pub fn get_detail(db: &Database, id: &str) -> Result<MachineDetail> {
    let machine = get(db, id)?;
    let location = match machine.location_id {
        Some(ref location_id) => location_repo::find_by_id(db, location_id)?,
        None => None,
    };
    let operations = operation_repo::find_many(db, &machine.operations)?;
    let maintenance_ranges =
        ranges::resolve_details(db, range_repo::find_many(db, &machine.maintenance_ranges)?)?;

    Ok(MachineDetail {
        id: machine.id,
        name: machine.name,
        brand: machine.brand,
        model: machine.model,
        serial_number: machine.serial_number,
        description: machine.description,
        location,
        operations,
        maintenance_ranges,
        created_at: machine.created_at,
        updated_at: machine.updated_at,
    })
}

/// Validates the payload and checks that every reference exists.
fn parse(db: &Database, payload: Value) -> Result<MachineInput> {
    let mut input: MachineInput = validation::parse(Payload::Machine, payload)?;
    rules::machine(&input)?;

    input.location_id = non_blank(input.location_id);
    if let Some(ref location_id) = input.location_id {
        if location_repo::find_by_id(db, location_id)?.is_none() {
            return Err(MaintError::invalid(format!(
                "Location '{}' does not exist",
                location_id
            )));
        }
    }

    input.operations = dedup_ids(input.operations);
    let found: Vec<String> = operation_repo::find_many(db, &input.operations)?
        .into_iter()
        .map(|o| o.id)
        .collect();
    ensure_all_found("operations", &input.operations, &found)?;

    input.maintenance_ranges = dedup_ids(input.maintenance_ranges);
    let found: Vec<String> = range_repo::find_many(db, &input.maintenance_ranges)?
        .into_iter()
        .map(|r| r.id)
        .collect();
    ensure_all_found("maintenance ranges", &input.maintenance_ranges, &found)?;

    Ok(input)
}

pub fn create(db: &Database, payload: Value) -> Result<Machine> {
    let _span = tracing::info_span!("machine.create").entered();
    let input = parse(db, payload)?;
    let now = Utc::now();
    let machine = Machine {
        id: new_id(),
        name: input.name.trim().to_string(),
        brand: non_blank(input.brand),
        model: non_blank(input.model),
        serial_number: non_blank(input.serial_number),
        description: non_blank(input.description),
        location_id: input.location_id,
        operations: input.operations,
        maintenance_ranges: input.maintenance_ranges,
        created_at: now,
        updated_at: now,
    };
    machine_repo::insert(db, &machine)?;
    log::info!("Created machine {} ({})", machine.id, machine.name);
    Ok(machine)
}

pub fn update(db: &Database, id: &str, payload: Value) -> Result<Machine> {
    let _span = tracing::info_span!("machine.update", id).entered();
    let mut machine = get(db, id)?;
    let input = parse(db, payload)?;

    machine.name = input.name.trim().to_string();
    machine.brand = non_blank(input.brand);
    machine.model = non_blank(input.model);
    machine.serial_number = non_blank(input.serial_number);
    machine.description = non_blank(input.description);
    machine.location_id = input.location_id;
    machine.operations = input.operations;
    machine.maintenance_ranges = input.maintenance_ranges;
    machine.updated_at = Utc::now();
    machine_repo::update(db, &machine)?;
    Ok(machine)
}

/// Deletes a machine no work order refers to.
pub fn delete(db: &Database, id: &str) -> Result<()> {
    let _span = tracing::info_span!("machine.delete", id).entered();
    get(db, id)?;

    let work_orders = machine_repo::count_work_orders_using(db, id)?;
    if work_orders > 0 {
        return Err(MaintError::Conflict {
            message: format!(
                "Machine is part of {} work order(s) and cannot be deleted",
                work_orders
            ),
            blocking: vec![("workOrdersCount", work_orders)],
        });
    }

    machine_repo::delete(db, id)?;
    log::info!("Deleted machine {}", id);
    Ok(())
}
