//! Machine repository: CRUD operations for the `machines` table.

use rusqlite::{params, OptionalExtension, Row};

use super::{
    count, format_timestamp, json_column, timestamp_column, to_json, Database, DatabaseError,
    WhereClause,
};
use crate::model::Machine;

fn from_row(row: &Row<'_>) -> Result<Machine, rusqlite::Error> {
    Ok(Machine {
        id: row.get("id")?,
        name: row.get("name")?,
        brand: row.get("brand")?,
        model: row.get("model")?,
        serial_number: row.get("serial_number")?,
        description: row.get("description")?,
        location_id: row.get("location_id")?,
        operations: json_column(row, "operations")?,
        maintenance_ranges: json_column(row, "maintenance_ranges")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

#[derive(Debug, Default, Clone)]
pub struct MachineFilter {
    pub search: Option<String>,
    pub location_id: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub fn insert(db: &Database, machine: &Machine) -> Result<(), DatabaseError> {
    let operations = to_json(&machine.operations)?;
    let ranges = to_json(&machine.maintenance_ranges)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO machines (id, name, brand, model, serial_number, description,
             location_id, operations, maintenance_ranges, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                machine.id,
                machine.name,
                machine.brand,
                machine.model,
                machine.serial_number,
                machine.description,
                machine.location_id,
                operations,
                ranges,
                format_timestamp(&machine.created_at),
                format_timestamp(&machine.updated_at),
            ],
        )?;
        Ok(())
    })
}

pub fn update(db: &Database, machine: &Machine) -> Result<(), DatabaseError> {
    let operations = to_json(&machine.operations)?;
    let ranges = to_json(&machine.maintenance_ranges)?;
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE machines SET name=?2, brand=?3, model=?4, serial_number=?5, description=?6,
             location_id=?7, operations=?8, maintenance_ranges=?9, updated_at=?10
             WHERE id=?1",
            params![
                machine.id,
                machine.name,
                machine.brand,
                machine.model,
                machine.serial_number,
                machine.description,
                machine.location_id,
                operations,
                ranges,
                format_timestamp(&machine.updated_at),
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Machine>, DatabaseError> {
    db.with_conn(|conn| {
        let machine = conn
            .query_row("SELECT * FROM machines WHERE id = ?1", params![id], from_row)
            .optional()?;
        Ok(machine)
    })
}

/// Loads the machines with the given ids, in the order of `ids`.
pub fn find_many(db: &Database, ids: &[String]) -> Result<Vec<Machine>, DatabaseError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT m.* FROM machines m
             JOIN json_each(?1) j ON j.value = m.id
             ORDER BY j.key",
        )?;
        let rows = stmt
            .query_map(params![to_json(ids)?], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let n = conn.execute("DELETE FROM machines WHERE id = ?1", params![id])?;
        Ok(n > 0)
    })
}

pub fn query(db: &Database, filter: &MachineFilter) -> Result<(Vec<Machine>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut clause = WhereClause::default();
        if let Some(ref term) = filter.search {
            clause.push_search(&["name", "brand", "model", "serial_number"], term);
        }
        if let Some(ref location_id) = filter.location_id {
            clause.push("location_id = {}", location_id.clone());
        }

        let total = clause.count(conn, "machines")?;
        let rows = clause.select(
            conn,
            "machines",
            "name COLLATE NOCASE ASC, id ASC",
            filter.limit.unwrap_or(100),
            filter.offset.unwrap_or(0),
            from_row,
        )?;
        Ok((rows, total))
    })
}

pub fn count_by_location(db: &Database, location_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        count(
            conn,
            "SELECT COUNT(*) FROM machines WHERE location_id = ?1",
            params![location_id],
        )
    })
}

/// Number of work orders that include the machine.
pub fn count_work_orders_using(db: &Database, id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        count(
            conn,
            "SELECT COUNT(*) FROM work_orders w
             WHERE EXISTS (
                 SELECT 1 FROM json_each(w.machines) m
                 WHERE json_extract(m.value, '$.machineId') = ?1
             )",
            params![id],
        )
    })
}
