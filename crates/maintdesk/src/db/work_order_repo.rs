//! Work order repository: CRUD operations for the `work_orders` table.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{
    date_column, enum_column, format_date, format_timestamp, json_column, json_column_opt,
    timestamp_column, to_json, Database, DatabaseError, WhereClause,
};
use crate::model::{MaintenanceType, WorkOrder, WorkOrderStatus};

fn from_row(row: &Row<'_>) -> Result<WorkOrder, rusqlite::Error> {
    Ok(WorkOrder {
        id: row.get("id")?,
        order_type: enum_column(row, "type")?,
        status: enum_column(row, "status")?,
        machines: json_column(row, "machines")?,
        scheduled_date: date_column(row, "scheduled_date")?,
        completed_date: date_column(row, "completed_date")?,
        labor: json_column(row, "labor")?,
        materials: json_column(row, "materials")?,
        images: json_column(row, "images")?,
        operator_signature: json_column_opt(row, "operator_signature")?,
        client_signature: json_column_opt(row, "client_signature")?,
        custom_properties: json_column(row, "custom_properties")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

/// Query filter parameters for work order listing.
#[derive(Debug, Default, Clone)]
pub struct WorkOrderFilter {
    pub status: Option<WorkOrderStatus>,
    pub order_type: Option<MaintenanceType>,
    pub machine_id: Option<String>,
    /// Inclusive lower bound on the scheduled date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the scheduled date.
    pub to: Option<NaiveDate>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// JSON-encoded document columns, shared by insert and update.
struct Encoded {
    machines: String,
    labor: String,
    materials: String,
    images: String,
    operator_signature: Option<String>,
    client_signature: Option<String>,
    custom_properties: String,
}

impl Encoded {
    fn new(order: &WorkOrder) -> Result<Self, DatabaseError> {
        Ok(Self {
            machines: to_json(&order.machines)?,
            labor: to_json(&order.labor)?,
            materials: to_json(&order.materials)?,
            images: to_json(&order.images)?,
            operator_signature: order.operator_signature.as_ref().map(to_json).transpose()?,
            client_signature: order.client_signature.as_ref().map(to_json).transpose()?,
            custom_properties: to_json(&order.custom_properties)?,
        })
    }
}

pub fn insert(db: &Database, order: &WorkOrder) -> Result<(), DatabaseError> {
    let enc = Encoded::new(order)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO work_orders (id, type, status, machines, scheduled_date, completed_date,
             labor, materials, images, operator_signature, client_signature, custom_properties,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                order.id,
                order.order_type.as_str(),
                order.status.as_str(),
                enc.machines,
                format_date(&order.scheduled_date),
                format_date(&order.completed_date),
                enc.labor,
                enc.materials,
                enc.images,
                enc.operator_signature,
                enc.client_signature,
                enc.custom_properties,
                format_timestamp(&order.created_at),
                format_timestamp(&order.updated_at),
            ],
        )?;
        Ok(())
    })
}

/// Overwrites every field except `id` and `created_at`.
pub fn update(db: &Database, order: &WorkOrder) -> Result<(), DatabaseError> {
    let enc = Encoded::new(order)?;
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE work_orders SET type=?2, status=?3, machines=?4, scheduled_date=?5,
             completed_date=?6, labor=?7, materials=?8, images=?9, operator_signature=?10,
             client_signature=?11, custom_properties=?12, updated_at=?13
             WHERE id=?1",
            params![
                order.id,
                order.order_type.as_str(),
                order.status.as_str(),
                enc.machines,
                format_date(&order.scheduled_date),
                format_date(&order.completed_date),
                enc.labor,
                enc.materials,
                enc.images,
                enc.operator_signature,
                enc.client_signature,
                enc.custom_properties,
                format_timestamp(&order.updated_at),
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<WorkOrder>, DatabaseError> {
    db.with_conn(|conn| {
        let order = conn
            .query_row("SELECT * FROM work_orders WHERE id = ?1", params![id], from_row)
            .optional()?;
        Ok(order)
    })
}

pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let n = conn.execute("DELETE FROM work_orders WHERE id = ?1", params![id])?;
        Ok(n > 0)
    })
}

/// Lists work orders, newest first.
pub fn query(
    db: &Database,
    filter: &WorkOrderFilter,
) -> Result<(Vec<WorkOrder>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut clause = WhereClause::default();
        if let Some(status) = filter.status {
            clause.push("status = {}", status.as_str());
        }
        if let Some(order_type) = filter.order_type {
            clause.push("type = {}", order_type.as_str());
        }
        if let Some(ref machine_id) = filter.machine_id {
            clause.push(
                "EXISTS (SELECT 1 FROM json_each(work_orders.machines) m
                         WHERE json_extract(m.value, '$.machineId') = {})",
                machine_id.clone(),
            );
        }
        if let Some(from) = filter.from {
            clause.push("scheduled_date >= {}", from.format("%Y-%m-%d").to_string());
        }
        if let Some(to) = filter.to {
            clause.push("scheduled_date <= {}", to.format("%Y-%m-%d").to_string());
        }

        let total = clause.count(conn, "work_orders")?;
        let rows = clause.select(
            conn,
            "work_orders",
            "created_at DESC, id ASC",
            filter.limit.unwrap_or(100),
            filter.offset.unwrap_or(0),
            from_row,
        )?;
        Ok((rows, total))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FilledOperation, FilledValue, Signature, WorkOrderMachine};
    use chrono::{Duration, Utc};
    use std::collections::BTreeMap;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample(id: &str, machine_id: &str) -> WorkOrder {
        let now = Utc::now();
        WorkOrder {
            id: id.to_string(),
            order_type: MaintenanceType::Preventive,
            status: WorkOrderStatus::Pending,
            machines: vec![WorkOrderMachine::new(machine_id)],
            scheduled_date: None,
            completed_date: None,
            labor: Vec::new(),
            materials: Vec::new(),
            images: Vec::new(),
            operator_signature: None,
            client_signature: None,
            custom_properties: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_and_find_round_trips_documents() {
        let db = test_db();
        let mut order = sample("w1", "m1");
        order.machines[0].filled_operations.push(FilledOperation {
            operation_id: "o1".into(),
            value: FilledValue::Minutes(30),
            filled_at: Utc::now(),
        });
        order.operator_signature = Some(Signature {
            data: "data:image/png;base64,AAAA".into(),
            signed_by: Some("Ana".into()),
            signed_at: Utc::now(),
        });
        order
            .custom_properties
            .insert("priority".into(), serde_json::json!("high"));
        insert(&db, &order).unwrap();

        let found = find_by_id(&db, "w1").unwrap().unwrap();
        assert_eq!(found.machines[0].filled_operations.len(), 1);
        assert_eq!(
            found.machines[0].filled_operations[0].value,
            FilledValue::Minutes(30)
        );
        assert_eq!(
            found.operator_signature.unwrap().signed_by.as_deref(),
            Some("Ana")
        );
        assert!(found.client_signature.is_none());
        assert_eq!(found.custom_properties["priority"], "high");
    }

    #[test]
    fn test_update_status() {
        let db = test_db();
        let mut order = sample("w1", "m1");
        insert(&db, &order).unwrap();

        order.status = WorkOrderStatus::InProgress;
        update(&db, &order).unwrap();

        let found = find_by_id(&db, "w1").unwrap().unwrap();
        assert_eq!(found.status, WorkOrderStatus::InProgress);
    }

    #[test]
    fn test_query_filters() {
        let db = test_db();
        let base = Utc::now();

        let mut a = sample("w1", "m1");
        a.scheduled_date = NaiveDate::from_ymd_opt(2026, 3, 1);
        a.created_at = base - Duration::minutes(2);
        insert(&db, &a).unwrap();

        let mut b = sample("w2", "m2");
        b.order_type = MaintenanceType::Corrective;
        b.scheduled_date = NaiveDate::from_ymd_opt(2026, 3, 15);
        b.created_at = base - Duration::minutes(1);
        insert(&db, &b).unwrap();

        let mut c = sample("w3", "m1");
        c.status = WorkOrderStatus::Completed;
        c.created_at = base;
        insert(&db, &c).unwrap();

        let (rows, total) = query(&db, &WorkOrderFilter::default()).unwrap();
        assert_eq!(total, 3);
        let ids: Vec<_> = rows.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["w3", "w2", "w1"]);

        let (rows, _) = query(
            &db,
            &WorkOrderFilter {
                machine_id: Some("m1".into()),
                status: Some(WorkOrderStatus::Pending),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "w1");

        let (rows, _) = query(
            &db,
            &WorkOrderFilter {
                from: NaiveDate::from_ymd_opt(2026, 3, 10),
                to: NaiveDate::from_ymd_opt(2026, 3, 31),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "w2");

        let (_, total) = query(
            &db,
            &WorkOrderFilter {
                order_type: Some(MaintenanceType::Corrective),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_delete() {
        let db = test_db();
        insert(&db, &sample("w1", "m1")).unwrap();
        assert!(delete(&db, "w1").unwrap());
        assert!(!delete(&db, "w1").unwrap());
    }
}
