//! Operation repository: CRUD operations for the `operations` table.

use rusqlite::{params, OptionalExtension, Row};

use super::{count, enum_column, format_timestamp, timestamp_column, Database, DatabaseError, WhereClause};
use crate::model::Operation;

fn from_row(row: &Row<'_>) -> Result<Operation, rusqlite::Error> {
    Ok(Operation {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        operation_type: enum_column(row, "type")?,
        order: row.get("sort_order")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

const ORDER_BY: &str = "sort_order IS NULL, sort_order ASC, name COLLATE NOCASE ASC, id ASC";

#[derive(Debug, Default, Clone)]
pub struct OperationFilter {
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub fn insert(db: &Database, op: &Operation) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO operations (id, name, description, type, sort_order, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                op.id,
                op.name,
                op.description,
                op.operation_type.as_str(),
                op.order,
                format_timestamp(&op.created_at),
                format_timestamp(&op.updated_at),
            ],
        )?;
        Ok(())
    })
}

pub fn update(db: &Database, op: &Operation) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE operations SET name=?2, description=?3, type=?4, sort_order=?5, updated_at=?6
             WHERE id=?1",
            params![
                op.id,
                op.name,
                op.description,
                op.operation_type.as_str(),
                op.order,
                format_timestamp(&op.updated_at),
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Operation>, DatabaseError> {
    db.with_conn(|conn| {
        let op = conn
            .query_row("SELECT * FROM operations WHERE id = ?1", params![id], from_row)
            .optional()?;
        Ok(op)
    })
}

/// Loads the operations with the given ids. Unknown ids are skipped;
/// the result follows the order of `ids`.
pub fn find_many(db: &Database, ids: &[String]) -> Result<Vec<Operation>, DatabaseError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT o.* FROM operations o
             JOIN json_each(?1) j ON j.value = o.id
             ORDER BY j.key",
        )?;
        let rows = stmt
            .query_map(params![super::to_json(ids)?], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let n = conn.execute("DELETE FROM operations WHERE id = ?1", params![id])?;
        Ok(n > 0)
    })
}

pub fn query(
    db: &Database,
    filter: &OperationFilter,
) -> Result<(Vec<Operation>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut clause = WhereClause::default();
        if let Some(ref term) = filter.search {
            clause.push_search(&["name", "description"], term);
        }

        let total = clause.count(conn, "operations")?;
        let rows = clause.select(
            conn,
            "operations",
            ORDER_BY,
            filter.limit.unwrap_or(100),
            filter.offset.unwrap_or(0),
            from_row,
        )?;
        Ok((rows, total))
    })
}

/// Number of maintenance ranges listing the operation.
pub fn count_ranges_using(db: &Database, id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        count(
            conn,
            "SELECT COUNT(*) FROM maintenance_ranges r
             WHERE EXISTS (SELECT 1 FROM json_each(r.operations) j WHERE j.value = ?1)",
            params![id],
        )
    })
}

/// Number of machines with the operation assigned directly.
pub fn count_machines_using(db: &Database, id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        count(
            conn,
            "SELECT COUNT(*) FROM machines m
             WHERE EXISTS (SELECT 1 FROM json_each(m.operations) j WHERE j.value = ?1)",
            params![id],
        )
    })
}

/// Number of work orders listing the operation on a machine or holding a
/// recorded value for it.
pub fn count_work_orders_using(db: &Database, id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        count(
            conn,
            "SELECT COUNT(*) FROM work_orders w
             WHERE EXISTS (
                 SELECT 1 FROM json_each(w.machines) m
                 WHERE EXISTS (
                     SELECT 1 FROM json_each(json_extract(m.value, '$.operations')) o
                     WHERE o.value = ?1
                 )
                 OR EXISTS (
                     SELECT 1 FROM json_each(json_extract(m.value, '$.filledOperations')) f
                     WHERE json_extract(f.value, '$.operationId') = ?1
                 )
             )",
            params![id],
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OperationType;
    use chrono::Utc;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample(id: &str, name: &str, order: Option<u32>) -> Operation {
        let now = Utc::now();
        Operation {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            operation_type: OperationType::Boolean,
            order,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_find_update() {
        let db = test_db();
        insert(&db, &sample("o1", "Check oil", None)).unwrap();

        let mut op = find_by_id(&db, "o1").unwrap().unwrap();
        assert_eq!(op.operation_type, OperationType::Boolean);
        op.operation_type = OperationType::Time;
        op.order = Some(3);
        update(&db, &op).unwrap();

        let found = find_by_id(&db, "o1").unwrap().unwrap();
        assert_eq!(found.operation_type, OperationType::Time);
        assert_eq!(found.order, Some(3));
    }

    #[test]
    fn test_query_orders_by_sort_order_then_name() {
        let db = test_db();
        insert(&db, &sample("o1", "Zeta", None)).unwrap();
        insert(&db, &sample("o2", "Alpha", None)).unwrap();
        insert(&db, &sample("o3", "Later", Some(2))).unwrap();
        insert(&db, &sample("o4", "First", Some(1))).unwrap();

        let (rows, total) = query(&db, &OperationFilter::default()).unwrap();
        assert_eq!(total, 4);
        let ids: Vec<_> = rows.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["o4", "o3", "o2", "o1"]);
    }

    #[test]
    fn test_find_many_keeps_requested_order() {
        let db = test_db();
        insert(&db, &sample("o1", "A", None)).unwrap();
        insert(&db, &sample("o2", "B", None)).unwrap();

        let ids = vec!["o2".to_string(), "missing".to_string(), "o1".to_string()];
        let found = find_many(&db, &ids).unwrap();
        let got: Vec<_> = found.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(got, vec!["o2", "o1"]);
        assert!(find_many(&db, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let db = test_db();
        insert(&db, &sample("o1", "Grease 100%", None)).unwrap();
        insert(&db, &sample("o2", "Grease 1000", None)).unwrap();

        let (rows, total) = query(
            &db,
            &OperationFilter {
                search: Some("100%".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, "o1");
    }

    #[test]
    fn test_count_work_orders_using_sees_manual_and_filled() {
        use crate::db::work_order_repo;
        use crate::model::{
            FilledOperation, FilledValue, MaintenanceType, WorkOrder, WorkOrderMachine,
            WorkOrderStatus,
        };

        let db = test_db();
        let now = Utc::now();
        let order = |id: &str, machine: WorkOrderMachine| WorkOrder {
            id: id.to_string(),
            order_type: MaintenanceType::Corrective,
            status: WorkOrderStatus::Pending,
            machines: vec![machine],
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

        let mut listed = WorkOrderMachine::new("m1");
        listed.operations.push("o1".into());
        work_order_repo::insert(&db, &order("w1", listed)).unwrap();

        let mut filled = WorkOrderMachine::new("m1");
        filled.filled_operations.push(FilledOperation {
            operation_id: "o1".into(),
            value: FilledValue::Boolean(true),
            filled_at: now,
        });
        work_order_repo::insert(&db, &order("w2", filled)).unwrap();
        work_order_repo::insert(&db, &order("w3", WorkOrderMachine::new("m1"))).unwrap();

        assert_eq!(count_work_orders_using(&db, "o1").unwrap(), 2);
        assert_eq!(count_work_orders_using(&db, "o2").unwrap(), 0);
    }
}
