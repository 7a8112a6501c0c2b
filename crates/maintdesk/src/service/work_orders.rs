use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ensure_all_found, ranges};
use crate::db::{machine_repo, operation_repo, range_repo, work_order_repo, Database};
use crate::error::{MaintError, Result};
use crate::model::{
    dedup_ids, new_id, non_blank, FilledValue, MaintenanceType, WorkOrder, WorkOrderDetail,
    WorkOrderInput, WorkOrderMachine, WorkOrderMachineDetail, WorkOrderMachineInput,
    WorkOrderStatus,
};
use crate::pagination::{Page, PageWindow};
use crate::validation::{self, rules, Payload};
use crate::workorder::{
    aggregate_operations, with_filled, AggregatedOperation, MachineProgress, MaterialTotal,
};

const KIND: &str = "Work order";

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<WorkOrderStatus>,
    pub order_type: Option<MaintenanceType>,
    pub machine_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct StatusChange {
    status: WorkOrderStatus,
}

#[derive(Debug, Deserialize)]
struct FillOperationInput {
    value: FilledValue,
}

/// Totals of a work order, as shown on its closing report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderSummary {
    pub id: String,
    pub status: WorkOrderStatus,
    pub labor_minutes: i64,
    pub materials: Vec<MaterialTotal>,
    pub machines: Vec<MachineProgress>,
    pub filled_operations: usize,
    pub total_operations: usize,
    pub has_maintenance_data: bool,
    pub can_delete: bool,
}

pub fn list(db: &Database, filter: &ListFilter, window: PageWindow) -> Result<Page<WorkOrder>> {
    let filter = work_order_repo::WorkOrderFilter {
        status: filter.status,
        order_type: filter.order_type,
        machine_id: filter.machine_id.clone(),
        from: filter.from,
        to: filter.to,
        limit: Some(window.limit),
        offset: Some(window.offset()),
    };
    let (items, total) = work_order_repo::query(db, &filter)?;
    Ok(Page::new(items, total, window))
}

pub fn get(db: &Database, id: &str) -> Result<WorkOrder> {
    work_order_repo::find_by_id(db, id)?.ok_or_else(|| MaintError::not_found(KIND, id))
}

/// The work order with machines, ranges and operations resolved.
pub fn get_detail(db: &Database, id: &str) -> Result<WorkOrderDetail> {
    let order = get(db, id)?;
    let mut machines = Vec::with_capacity(order.machines.len());
    for m in order.machines {
        let maintenance_ranges =
            ranges::resolve_details(db, range_repo::find_many(db, &m.maintenance_ranges)?)?;
        machines.push(WorkOrderMachineDetail {
            machine: machine_repo::find_by_id(db, &m.machine_id)?,
            operations: operation_repo::find_many(db, &m.operations)?,
            machine_id: m.machine_id,
            maintenance_ranges,
            filled_operations: m.filled_operations,
            images: m.images,
            maintenance_description: m.maintenance_description,
        });
    }

    Ok(WorkOrderDetail {
        id: order.id,
        order_type: order.order_type,
        status: order.status,
        machines,
        scheduled_date: order.scheduled_date,
        completed_date: order.completed_date,
        labor: order.labor,
        materials: order.materials,
        images: order.images,
        operator_signature: order.operator_signature,
        client_signature: order.client_signature,
        custom_properties: order.custom_properties,
        created_at: order.created_at,
        updated_at: order.updated_at,
    })
}

/// Aggregated operations of one machine section, without recorded values.
fn aggregated_for(
    db: &Database,
    order_type: MaintenanceType,
    machine: &WorkOrderMachine,
) -> Result<Vec<AggregatedOperation>> {
    let ranges = ranges::resolve_details(db, range_repo::find_many(db, &machine.maintenance_ranges)?)?;
    let additional = operation_repo::find_many(db, &machine.operations)?;
    Ok(aggregate_operations(order_type, &ranges, &additional))
}

fn parse(payload: Value) -> Result<WorkOrderInput> {
    let input: WorkOrderInput = validation::parse(Payload::WorkOrder, payload)?;
    rules::work_order(&input)?;
    Ok(input)
}

/// Resolves one machine section of a payload.
///
/// When `maintenanceRanges` is omitted, the ranges stored on `previous` are
/// kept, or else the machine's own ranges of the order type are used.
fn build_machine(
    db: &Database,
    order_type: MaintenanceType,
    input: WorkOrderMachineInput,
    previous: Option<&WorkOrderMachine>,
) -> Result<WorkOrderMachine> {
    let machine = machine_repo::find_by_id(db, &input.machine_id)?.ok_or_else(|| {
        MaintError::invalid(format!("Machine '{}' does not exist", input.machine_id))
    })?;

    let range_ids = match (input.maintenance_ranges, previous) {
        (Some(ids), _) => dedup_ids(ids),
        (None, Some(prev)) => prev.maintenance_ranges.clone(),
        (None, None) => range_repo::find_many(db, &machine.maintenance_ranges)?
            .into_iter()
            .filter(|r| r.range_type == order_type)
            .map(|r| r.id)
            .collect(),
    };
    let found = range_repo::find_many(db, &range_ids)?;
    ensure_all_found(
        "maintenance ranges",
        &range_ids,
        &found.iter().map(|r| r.id.clone()).collect::<Vec<_>>(),
    )?;
    let mismatched: Vec<&str> = found
        .iter()
        .filter(|r| r.range_type != order_type)
        .map(|r| r.name.as_str())
        .collect();
    if !mismatched.is_empty() {
        return Err(MaintError::invalid(format!(
            "Maintenance ranges of another type than {}: {}",
            order_type,
            mismatched.join(", ")
        )));
    }

    let operation_ids = dedup_ids(input.operations);
    let found_ops = operation_repo::find_many(db, &operation_ids)?;
    ensure_all_found(
        "operations",
        &operation_ids,
        &found_ops.iter().map(|o| o.id.clone()).collect::<Vec<_>>(),
    )?;

    let section = WorkOrderMachine {
        machine_id: machine.id,
        maintenance_ranges: range_ids,
        operations: operation_ids,
        filled_operations: Vec::new(),
        images: input.images,
        maintenance_description: non_blank(input.maintenance_description),
    };

    if input.filled_operations.is_empty() {
        return Ok(section);
    }
    let available = aggregate_operations(
        order_type,
        &ranges::resolve_details(db, found)?,
        &found_ops,
    );
    let mut errors = Vec::new();
    for filled in &input.filled_operations {
        match available.iter().find(|a| a.operation.id == filled.operation_id) {
            None => errors.push(format!(
                "Operation '{}' does not apply to machine '{}'",
                filled.operation_id, section.machine_id
            )),
            Some(a) if !filled.value.matches(a.operation.operation_type) => errors.push(format!(
                "Value for operation '{}' does not match its {} type",
                a.operation.name,
                a.operation.operation_type.as_str()
            )),
            Some(_) => {}
        }
    }
    if !errors.is_empty() {
        return Err(crate::error::ValidationError::Rules(errors).into());
    }
    Ok(WorkOrderMachine {
        filled_operations: input.filled_operations,
        ..section
    })
}

/// Copies the payload onto `order`, resolving every machine section.
fn apply_input(db: &Database, order: &mut WorkOrder, input: WorkOrderInput) -> Result<()> {
    let type_changed = order.order_type != input.order_type;
    let mut machines = Vec::with_capacity(input.machines.len());
    for m in input.machines {
        let previous = if type_changed {
            None
        } else {
            order.machines.iter().find(|p| p.machine_id == m.machine_id)
        };
        machines.push(build_machine(db, input.order_type, m, previous)?);
    }

    order.order_type = input.order_type;
    order.machines = machines;
    order.scheduled_date = input.scheduled_date;
    order.completed_date = input.completed_date;
    order.labor = input
        .labor
        .into_iter()
        .map(|mut l| {
            if l.id.trim().is_empty() {
                l.id = new_id();
            }
            l
        })
        .collect();
    order.materials = input
        .materials
        .into_iter()
        .map(|mut m| {
            if m.id.trim().is_empty() {
                m.id = new_id();
            }
            m
        })
        .collect();
    order.images = input.images;
    order.operator_signature = input.operator_signature;
    order.client_signature = input.client_signature;
    order.custom_properties = input.custom_properties;
    Ok(())
}

/// Creates a work order. New orders always start as pending.
pub fn create(db: &Database, payload: Value) -> Result<WorkOrder> {
    let _span = tracing::info_span!("work_order.create").entered();
    let input = parse(payload)?;
    if input.status.is_some_and(|s| s != WorkOrderStatus::Pending) {
        log::debug!("Ignoring requested status on create; new work orders start as pending");
    }

    let now = Utc::now();
    let mut order = WorkOrder {
        id: new_id(),
        order_type: input.order_type,
        status: WorkOrderStatus::Pending,
        machines: Vec::new(),
        scheduled_date: None,
        completed_date: None,
        labor: Vec::new(),
        materials: Vec::new(),
        images: Vec::new(),
        operator_signature: None,
        client_signature: None,
        custom_properties: Default::default(),
        created_at: now,
        updated_at: now,
    };
    apply_input(db, &mut order, input)?;
    work_order_repo::insert(db, &order)?;
    log::info!(
        "Created {} work order {} for {} machine(s)",
        order.order_type,
        order.id,
        order.machines.len()
    );
    Ok(order)
}

pub fn update(db: &Database, id: &str, payload: Value) -> Result<WorkOrder> {
    let _span = tracing::info_span!("work_order.update", id).entered();
    let mut order = get(db, id)?;
    order.ensure_editable()?;

    let input = parse(payload)?;
    let status = input.status;
    apply_input(db, &mut order, input)?;
    if let Some(status) = status {
        order.transition(status)?;
    }

    order.updated_at = Utc::now();
    work_order_repo::update(db, &order)?;
    Ok(order)
}

/// Moves a work order along `pending → in_progress → completed`.
pub fn set_status(db: &Database, id: &str, payload: Value) -> Result<WorkOrder> {
    let _span = tracing::info_span!("work_order.set_status", id).entered();
    let change: StatusChange = validation::parse(Payload::StatusChange, payload)?;
    let mut order = get(db, id)?;
    let from = order.status;
    order.transition(change.status)?;
    if from != order.status {
        order.updated_at = Utc::now();
        work_order_repo::update(db, &order)?;
        log::info!("Work order {} moved from {} to {}", id, from, order.status);
    }
    Ok(order)
}

/// Deletes a pending work order with nothing recorded on it.
pub fn delete(db: &Database, id: &str) -> Result<()> {
    let _span = tracing::info_span!("work_order.delete", id).entered();
    let order = get(db, id)?;
    if !order.can_delete() {
        let message = if order.status != WorkOrderStatus::Pending {
            format!("Work order is {} and cannot be deleted", order.status)
        } else {
            "Work order has recorded maintenance data and cannot be deleted".to_string()
        };
        return Err(MaintError::Conflict {
            message,
            blocking: Vec::new(),
        });
    }
    work_order_repo::delete(db, id)?;
    log::info!("Deleted work order {}", id);
    Ok(())
}

/// Aggregated operations of one machine in the order, with recorded values.
pub fn machine_operations(
    db: &Database,
    id: &str,
    machine_id: &str,
) -> Result<Vec<AggregatedOperation>> {
    let order = get(db, id)?;
    let machine = order.machine(machine_id)?;
    let available = aggregated_for(db, order.order_type, machine)?;
    Ok(with_filled(available, machine))
}

/// Records a value for one operation of one machine.
pub fn fill_operation(
    db: &Database,
    id: &str,
    machine_id: &str,
    operation_id: &str,
    payload: Value,
) -> Result<WorkOrder> {
    let _span = tracing::info_span!("work_order.fill_operation", id, machine_id, operation_id)
        .entered();
    let input: FillOperationInput = validation::parse(Payload::FillOperation, payload)?;
    let mut order = get(db, id)?;
    order.ensure_editable()?;

    let available = aggregated_for(db, order.order_type, order.machine(machine_id)?)?;
    order.fill_operation(machine_id, &available, operation_id, input.value)?;
    order.updated_at = Utc::now();
    work_order_repo::update(db, &order)?;
    Ok(order)
}

pub fn summary(db: &Database, id: &str) -> Result<WorkOrderSummary> {
    let order = get(db, id)?;
    let mut aggregated = HashMap::new();
    for machine in &order.machines {
        aggregated.insert(
            machine.machine_id.clone(),
            aggregated_for(db, order.order_type, machine)?,
        );
    }
    let machines = order.progress(&aggregated);

    Ok(WorkOrderSummary {
        id: order.id.clone(),
        status: order.status,
        labor_minutes: order.total_labor_minutes(),
        materials: order.material_totals(),
        filled_operations: machines.iter().map(|m| m.filled).sum(),
        total_operations: machines.iter().map(|m| m.total).sum(),
        machines,
        has_maintenance_data: order.has_maintenance_data(),
        can_delete: order.can_delete(),
    })
}
