//! Maintenance range repository: CRUD operations for the `maintenance_ranges` table.

use rusqlite::{params, OptionalExtension, Row};

use super::{
    count, date_column, enum_column, enum_column_opt, format_date, format_timestamp,
    json_column, timestamp_column, to_json, Database, DatabaseError, WhereClause,
};
use crate::model::{MaintenanceRange, MaintenanceType};

fn from_row(row: &Row<'_>) -> Result<MaintenanceRange, rusqlite::Error> {
    Ok(MaintenanceRange {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        range_type: enum_column(row, "type")?,
        operations: json_column(row, "operations")?,
        frequency: enum_column_opt(row, "frequency")?,
        start_date: date_column(row, "start_date")?,
        start_time: row.get("start_time")?,
        days_of_week: json_column(row, "days_of_week")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

#[derive(Debug, Default, Clone)]
pub struct RangeFilter {
    pub search: Option<String>,
    pub range_type: Option<MaintenanceType>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub fn insert(db: &Database, range: &MaintenanceRange) -> Result<(), DatabaseError> {
    let operations = to_json(&range.operations)?;
    let days = to_json(&range.days_of_week)?;
    let frequency = range.frequency.map(|f| f.as_str());
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO maintenance_ranges (id, name, description, type, operations, frequency,
             start_date, start_time, days_of_week, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                range.id,
                range.name,
                range.description,
                range.range_type.as_str(),
                operations,
                frequency,
                format_date(&range.start_date),
                range.start_time,
                days,
                format_timestamp(&range.created_at),
                format_timestamp(&range.updated_at),
            ],
        )?;
        Ok(())
    })
}

pub fn update(db: &Database, range: &MaintenanceRange) -> Result<(), DatabaseError> {
    let operations = to_json(&range.operations)?;
    let days = to_json(&range.days_of_week)?;
    let frequency = range.frequency.map(|f| f.as_str());
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE maintenance_ranges SET name=?2, description=?3, type=?4, operations=?5,
             frequency=?6, start_date=?7, start_time=?8, days_of_week=?9, updated_at=?10
             WHERE id=?1",
            params![
                range.id,
                range.name,
                range.description,
                range.range_type.as_str(),
                operations,
                frequency,
                format_date(&range.start_date),
                range.start_time,
                days,
                format_timestamp(&range.updated_at),
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<MaintenanceRange>, DatabaseError> {
    db.with_conn(|conn| {
        let range = conn
            .query_row(
                "SELECT * FROM maintenance_ranges WHERE id = ?1",
                params![id],
                from_row,
            )
            .optional()?;
        Ok(range)
    })
}

/// Loads the ranges with the given ids, in the order of `ids`.
pub fn find_many(db: &Database, ids: &[String]) -> Result<Vec<MaintenanceRange>, DatabaseError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT r.* FROM maintenance_ranges r
             JOIN json_each(?1) j ON j.value = r.id
             ORDER BY j.key",
        )?;
        let rows = stmt
            .query_map(params![to_json(ids)?], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn query(
    db: &Database,
    filter: &RangeFilter,
) -> Result<(Vec<MaintenanceRange>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut clause = WhereClause::default();
        if let Some(ref term) = filter.search {
            clause.push_search(&["name", "description"], term);
        }
        if let Some(range_type) = filter.range_type {
            clause.push("type = {}", range_type.as_str());
        }

        let total = clause.count(conn, "maintenance_ranges")?;
        let rows = clause.select(
            conn,
            "maintenance_ranges",
            "name COLLATE NOCASE ASC, id ASC",
            filter.limit.unwrap_or(100),
            filter.offset.unwrap_or(0),
            from_row,
        )?;
        Ok((rows, total))
    })
}

/// Number of work orders whose machines reference the range.
pub fn count_work_orders_using(db: &Database, id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        count(
            conn,
            "SELECT COUNT(*) FROM work_orders w
             WHERE EXISTS (
                 SELECT 1 FROM json_each(w.machines) m,
                      json_each(json_extract(m.value, '$.maintenanceRanges')) r
                 WHERE r.value = ?1
             )",
            params![id],
        )
    })
}

/// Deletes the range and pulls its id from every machine, in one transaction.
/// Returns the number of machines that referenced it, or `None` when the
/// range did not exist.
pub fn delete_and_detach(db: &Database, id: &str) -> Result<Option<u64>, DatabaseError> {
    db.with_tx(|tx| {
        let detached = tx.execute(
            "UPDATE machines SET maintenance_ranges = (
                 SELECT COALESCE(json_group_array(j.value), '[]')
                 FROM (SELECT value FROM json_each(machines.maintenance_ranges)
                       WHERE value != ?1 ORDER BY key) j
             )
             WHERE EXISTS (SELECT 1 FROM json_each(machines.maintenance_ranges) WHERE value = ?1)",
            params![id],
        )?;
        let removed = tx.execute("DELETE FROM maintenance_ranges WHERE id = ?1", params![id])?;
        Ok((removed > 0).then_some(detached as u64))
    })
}
