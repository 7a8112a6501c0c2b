//! Integration tests for work orders: range resolution by type, operation
//! aggregation, the status lifecycle and deletion rules.

mod common;

use std::collections::HashSet;

use chrono::NaiveDate;
use common::*;
use maintdesk::model::{FilledValue, WorkOrderStatus};
use maintdesk::service::work_orders::{self, ListFilter};
use maintdesk::service::{machines, ranges};
use maintdesk::{MaintError, OperationSource};
use serde_json::json;

/// A machine with one preventive and one corrective range.
struct Plant {
    h: TestHarness,
    machine_id: String,
    preventive_id: String,
    corrective_id: String,
    inspect_id: String,
    lubricate_id: String,
    repair_id: String,
}

fn plant() -> Plant {
    let h = TestHarness::new();
    let inspect = h.operation(OperationBuilder::new("Inspect").order(1).build());
    let lubricate = h.operation(OperationBuilder::new("Lubricate").timed().order(2).build());
    let repair = h.operation(OperationBuilder::new("Repair notes").text().build());
    let preventive = h.range(
        RangeBuilder::new("Weekly")
            .operation(&inspect.id)
            .operation(&lubricate.id)
            .build(),
    );
    let corrective = h.range(
        RangeBuilder::new("Breakdown")
            .corrective()
            .operation(&repair.id)
            .build(),
    );
    let machine = h.machine(
        MachineBuilder::new("Press")
            .range(&preventive.id)
            .range(&corrective.id)
            .build(),
    );
    Plant {
        machine_id: machine.id,
        preventive_id: preventive.id,
        corrective_id: corrective.id,
        inspect_id: inspect.id,
        lubricate_id: lubricate.id,
        repair_id: repair.id,
        h,
    }
}

#[test]
fn test_only_ranges_of_matching_type_are_used() {
    let p = plant();

    let preventive = p
        .h
        .work_order(WorkOrderBuilder::new().machine(&p.machine_id).build());
    assert_eq!(
        preventive.machines[0].maintenance_ranges,
        vec![p.preventive_id.clone()]
    );

    let corrective = p.h.work_order(
        WorkOrderBuilder::new()
            .corrective()
            .machine(&p.machine_id)
            .build(),
    );
    assert_eq!(
        corrective.machines[0].maintenance_ranges,
        vec![p.corrective_id.clone()]
    );

    let ops = work_orders::machine_operations(&p.h.db, &corrective.id, &p.machine_id).unwrap();
    let ids: Vec<&str> = ops.iter().map(|o| o.id()).collect();
    assert_eq!(ids, vec![p.repair_id.as_str()]);

    let ranges = ranges::for_machine(
        &p.h.db,
        &p.machine_id,
        Some(maintdesk::model::MaintenanceType::Preventive),
    )
    .unwrap();
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].id, p.preventive_id);
}

#[test]
fn test_explicit_range_of_other_type_rejected() {
    let p = plant();
    let err = work_orders::create(
        &p.h.db,
        WorkOrderBuilder::new()
            .corrective()
            .machine_with(&p.machine_id, &[p.preventive_id.as_str()], &[])
            .build(),
    )
    .unwrap_err();
    assert!(matches!(err, MaintError::Validation(_)));
    assert!(err.to_string().contains("Weekly"));
}

#[test]
fn test_aggregation_has_no_duplicates_and_prefers_range() {
    let p = plant();
    let extra = p.h.operation(OperationBuilder::new("Clean").text().build());
    let order = p.h.work_order(
        WorkOrderBuilder::new()
            .machine_with(
                &p.machine_id,
                &[p.preventive_id.as_str()],
                &[p.lubricate_id.as_str(), extra.id.as_str()],
            )
            .build(),
    );

    let ops = work_orders::machine_operations(&p.h.db, &order.id, &p.machine_id).unwrap();
    let ids: Vec<&str> = ops.iter().map(|o| o.id()).collect();
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len());
    assert_eq!(
        ids,
        vec![p.inspect_id.as_str(), p.lubricate_id.as_str(), extra.id.as_str()]
    );

    let lubricate = ops.iter().find(|o| o.id() == p.lubricate_id).unwrap();
    assert!(matches!(
        lubricate.source,
        OperationSource::MaintenanceRange { ref range_name, .. } if range_name == "Weekly"
    ));
    assert_eq!(ops[2].source, OperationSource::Additional);
}

#[test]
fn test_requested_status_ignored_on_create() {
    let p = plant();
    let order = p.h.work_order(
        WorkOrderBuilder::new()
            .status("completed")
            .machine(&p.machine_id)
            .build(),
    );
    assert_eq!(order.status, WorkOrderStatus::Pending);
    assert!(order.completed_date.is_none());
}

#[test]
fn test_status_moves_forward_one_step() {
    let p = plant();
    let order = p
        .h
        .work_order(WorkOrderBuilder::new().machine(&p.machine_id).build());

    let err = work_orders::set_status(&p.h.db, &order.id, json!({"status": "completed"}))
        .unwrap_err();
    assert!(matches!(err, MaintError::InvalidTransition { .. }));

    let started =
        work_orders::set_status(&p.h.db, &order.id, json!({"status": "in_progress"})).unwrap();
    assert_eq!(started.status, WorkOrderStatus::InProgress);

    let err = work_orders::set_status(&p.h.db, &order.id, json!({"status": "pending"}))
        .unwrap_err();
    assert!(matches!(err, MaintError::InvalidTransition { .. }));

    let done =
        work_orders::set_status(&p.h.db, &order.id, json!({"status": "completed"})).unwrap();
    assert_eq!(done.status, WorkOrderStatus::Completed);
    assert!(done.completed_date.is_some());

    let err = work_orders::set_status(&p.h.db, &order.id, json!({"status": "in_progress"}))
        .unwrap_err();
    assert!(matches!(err, MaintError::InvalidTransition { .. }));
}

#[test]
fn test_completed_order_is_read_only() {
    let p = plant();
    let order = p
        .h
        .work_order(WorkOrderBuilder::new().machine(&p.machine_id).build());
    work_orders::set_status(&p.h.db, &order.id, json!({"status": "in_progress"})).unwrap();
    work_orders::set_status(&p.h.db, &order.id, json!({"status": "completed"})).unwrap();

    let err = work_orders::update(
        &p.h.db,
        &order.id,
        WorkOrderBuilder::new().machine(&p.machine_id).build(),
    )
    .unwrap_err();
    assert!(matches!(err, MaintError::ReadOnly(_)));

    let err = work_orders::fill_operation(
        &p.h.db,
        &order.id,
        &p.machine_id,
        &p.inspect_id,
        json!({"value": true}),
    )
    .unwrap_err();
    assert!(matches!(err, MaintError::ReadOnly(_)));

    let err = work_orders::delete(&p.h.db, &order.id).unwrap_err();
    assert!(matches!(err, MaintError::Conflict { .. }));
}

#[test]
fn test_fill_operation_checks_type_and_applicability() {
    let p = plant();
    let order = p
        .h
        .work_order(WorkOrderBuilder::new().machine(&p.machine_id).build());

    let err = work_orders::fill_operation(
        &p.h.db,
        &order.id,
        &p.machine_id,
        &p.lubricate_id,
        json!({"value": "long"}),
    )
    .unwrap_err();
    assert!(matches!(err, MaintError::Validation(_)));

    let err = work_orders::fill_operation(
        &p.h.db,
        &order.id,
        &p.machine_id,
        &p.repair_id,
        json!({"value": "fixed"}),
    )
    .unwrap_err();
    assert!(err.to_string().contains("does not apply"));

    let updated = work_orders::fill_operation(
        &p.h.db,
        &order.id,
        &p.machine_id,
        &p.lubricate_id,
        json!({"value": 30}),
    )
    .unwrap();
    assert_eq!(
        updated.machines[0].filled_operations[0].value,
        FilledValue::Minutes(30)
    );

    // Filling again replaces the recorded value.
    let updated = work_orders::fill_operation(
        &p.h.db,
        &order.id,
        &p.machine_id,
        &p.lubricate_id,
        json!({"value": 45}),
    )
    .unwrap();
    assert_eq!(updated.machines[0].filled_operations.len(), 1);

    let ops = work_orders::machine_operations(&p.h.db, &order.id, &p.machine_id).unwrap();
    let lubricate = ops.iter().find(|o| o.id() == p.lubricate_id).unwrap();
    assert_eq!(
        lubricate.filled.as_ref().map(|f| &f.value),
        Some(&FilledValue::Minutes(45))
    );
}

#[test]
fn test_deletion_rules() {
    let p = plant();

    let empty = p
        .h
        .work_order(WorkOrderBuilder::new().machine(&p.machine_id).build());
    work_orders::delete(&p.h.db, &empty.id).unwrap();
    assert!(matches!(
        work_orders::get(&p.h.db, &empty.id),
        Err(MaintError::NotFound { .. })
    ));

    let with_labor = p.h.work_order(
        WorkOrderBuilder::new()
            .machine(&p.machine_id)
            .labor("Ana", "2024-05-01T08:00:00Z", None)
            .build(),
    );
    assert!(matches!(
        work_orders::delete(&p.h.db, &with_labor.id),
        Err(MaintError::Conflict { .. })
    ));

    let started = p
        .h
        .work_order(WorkOrderBuilder::new().machine(&p.machine_id).build());
    work_orders::set_status(&p.h.db, &started.id, json!({"status": "in_progress"})).unwrap();
    assert!(matches!(
        work_orders::delete(&p.h.db, &started.id),
        Err(MaintError::Conflict { .. })
    ));
}

#[test]
fn test_update_keeps_ranges_when_omitted() {
    let p = plant();
    let order = p
        .h
        .work_order(WorkOrderBuilder::new().machine(&p.machine_id).build());

    // Detach the range from the machine; the order keeps what it was created with.
    machines::update(&p.h.db, &p.machine_id, MachineBuilder::new("Press").build()).unwrap();
    let updated = work_orders::update(
        &p.h.db,
        &order.id,
        WorkOrderBuilder::new()
            .machine(&p.machine_id)
            .scheduled("2024-06-01")
            .build(),
    )
    .unwrap();
    assert_eq!(
        updated.machines[0].maintenance_ranges,
        vec![p.preventive_id.clone()]
    );
    assert_eq!(
        updated.scheduled_date,
        NaiveDate::from_ymd_opt(2024, 6, 1)
    );

    // A type change resolves the ranges again from the machine.
    let switched = work_orders::update(
        &p.h.db,
        &order.id,
        WorkOrderBuilder::new()
            .corrective()
            .machine(&p.machine_id)
            .build(),
    )
    .unwrap();
    assert!(switched.machines[0].maintenance_ranges.is_empty());
}

#[test]
fn test_summary_totals() {
    let p = plant();
    let order = p.h.work_order(
        WorkOrderBuilder::new()
            .machine(&p.machine_id)
            .labor("Ana", "2024-05-01T08:00:00Z", Some("2024-05-01T09:30:00Z"))
            .labor("Luis", "2024-05-01T10:00:00Z", Some("2024-05-01T10:20:00Z"))
            .labor("Eva", "2024-05-01T11:00:00Z", None)
            .material("Grease", "kg", 1.5)
            .material("Grease", "kg", 0.5)
            .material("Filter", "unit", 2.0)
            .build(),
    );
    work_orders::fill_operation(
        &p.h.db,
        &order.id,
        &p.machine_id,
        &p.inspect_id,
        json!({"value": true}),
    )
    .unwrap();

    let summary = work_orders::summary(&p.h.db, &order.id).unwrap();
    assert_eq!(summary.labor_minutes, 110);
    assert_eq!(summary.materials.len(), 2);
    assert_eq!(summary.materials[0].quantity, 2.0);
    assert_eq!(summary.filled_operations, 1);
    assert_eq!(summary.total_operations, 2);
    assert!(summary.has_maintenance_data);
    assert!(!summary.can_delete);
}

#[test]
fn test_list_filters() {
    let p = plant();
    let other = p.h.machine(MachineBuilder::new("Lathe").build());
    p.h.work_order(
        WorkOrderBuilder::new()
            .machine(&p.machine_id)
            .scheduled("2024-03-10")
            .build(),
    );
    p.h.work_order(
        WorkOrderBuilder::new()
            .corrective()
            .machine(&other.id)
            .scheduled("2024-04-02")
            .build(),
    );
    let window = TestHarness::window(1, 10);

    let by_machine = ListFilter {
        machine_id: Some(other.id.clone()),
        ..Default::default()
    };
    let page = work_orders::list(&p.h.db, &by_machine, window).unwrap();
    assert_eq!(page.total_items, 1);

    let march = ListFilter {
        from: NaiveDate::from_ymd_opt(2024, 3, 1),
        to: NaiveDate::from_ymd_opt(2024, 3, 31),
        ..Default::default()
    };
    let page = work_orders::list(&p.h.db, &march, window).unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].machines[0].machine_id, p.machine_id);

    let corrective = ListFilter {
        order_type: Some(maintdesk::model::MaintenanceType::Corrective),
        ..Default::default()
    };
    assert_eq!(
        work_orders::list(&p.h.db, &corrective, window)
            .unwrap()
            .total_items,
        1
    );
}
