use chrono::Utc;
use serde_json::Value;

use crate::db::{operation_repo, Database};
use crate::error::{MaintError, Result};
use crate::model::{new_id, non_blank, Operation, OperationInput};
use crate::pagination::{Page, PageWindow};
use crate::validation::{self, rules, Payload};

const KIND: &str = "Operation";

pub fn list(db: &Database, search: Option<&str>, window: PageWindow) -> Result<Page<Operation>> {
    let filter = operation_repo::OperationFilter {
        search: search.map(str::to_string),
        limit: Some(window.limit),
        offset: Some(window.offset()),
    };
    let (items, total) = operation_repo::query(db, &filter)?;
    Ok(Page::new(items, total, window))
}

pub fn get(db: &Database, id: &str) -> Result<Operation> {
    operation_repo::find_by_id(db, id)?.ok_or_else(|| MaintError::not_found(KIND, id))
}

fn parse(payload: Value) -> Result<OperationInput> {
    let input: OperationInput = validation::parse(Payload::Operation, payload)?;
    rules::operation(&input)?;
    Ok(input)
}

pub fn create(db: &Database, payload: Value) -> Result<Operation> {
    let _span = tracing::info_span!("operation.create").entered();
    let input = parse(payload)?;
    let now = Utc::now();
    let op = Operation {
        id: new_id(),
        name: input.name.trim().to_string(),
        description: non_blank(input.description),
        operation_type: input.operation_type,
        order: input.order,
        created_at: now,
        updated_at: now,
    };
    operation_repo::insert(db, &op)?;
    log::info!("Created operation {} ({})", op.id, op.name);
    Ok(op)
}

/// Updates an operation. Its type is fixed once a work order lists it or
/// holds a value for it.
pub fn update(db: &Database, id: &str, payload: Value) -> Result<Operation> {
    let _span = tracing::info_span!("operation.update", id).entered();
    let mut op = get(db, id)?;
    let input = parse(payload)?;

    if input.operation_type != op.operation_type {
        let orders = operation_repo::count_work_orders_using(db, id)?;
        if orders > 0 {
            return Err(MaintError::Conflict {
                message: format!(
                    "Cannot change the type of an operation used by {} work order(s)",
                    orders
                ),
                blocking: vec![("workOrdersCount", orders)],
            });
        }
    }

    op.name = input.name.trim().to_string();
    op.description = non_blank(input.description);
    op.operation_type = input.operation_type;
    op.order = input.order;
    op.updated_at = Utc::now();
    operation_repo::update(db, &op)?;
    Ok(op)
}

/// Deletes an operation no maintenance range, machine or work order refers to.
pub fn delete(db: &Database, id: &str) -> Result<()> {
    let _span = tracing::info_span!("operation.delete", id).entered();
    get(db, id)?;

    let ranges = operation_repo::count_ranges_using(db, id)?;
    let machines = operation_repo::count_machines_using(db, id)?;
    let orders = operation_repo::count_work_orders_using(db, id)?;
    if ranges > 0 || machines > 0 || orders > 0 {
        return Err(MaintError::Conflict {
            message: format!(
                "Operation is used by {} maintenance range(s), {} machine(s) and {} work order(s)",
                ranges, machines, orders
            ),
            blocking: vec![
                ("maintenanceRangesCount", ranges),
                ("machinesCount", machines),
                ("workOrdersCount", orders),
            ],
        });
    }

    operation_repo::delete(db, id)?;
    log::info!("Deleted operation {}", id);
    Ok(())
}
