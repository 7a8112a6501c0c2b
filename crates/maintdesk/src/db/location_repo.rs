//! Location repository: CRUD operations for the `locations` table.

use rusqlite::{params, OptionalExtension, Row};

use super::{count, format_timestamp, timestamp_column, Database, DatabaseError, WhereClause};
use crate::model::Location;

fn from_row(row: &Row<'_>) -> Result<Location, rusqlite::Error> {
    Ok(Location {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        parent_id: row.get("parent_id")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

/// Query filter parameters for location listing.
#[derive(Debug, Default, Clone)]
pub struct LocationFilter {
    pub search: Option<String>,
    pub parent_id: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub fn insert(db: &Database, location: &Location) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO locations (id, name, description, parent_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                location.id,
                location.name,
                location.description,
                location.parent_id,
                format_timestamp(&location.created_at),
                format_timestamp(&location.updated_at),
            ],
        )?;
        Ok(())
    })
}

/// Updates an existing location. All fields except `id` and `created_at` are overwritten.
pub fn update(db: &Database, location: &Location) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE locations SET name=?2, description=?3, parent_id=?4, updated_at=?5
             WHERE id=?1",
            params![
                location.id,
                location.name,
                location.description,
                location.parent_id,
                format_timestamp(&location.updated_at),
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Location>, DatabaseError> {
    db.with_conn(|conn| {
        let location = conn
            .query_row("SELECT * FROM locations WHERE id = ?1", params![id], from_row)
            .optional()?;
        Ok(location)
    })
}

/// Deletes a location, returning whether a row was removed.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let n = conn.execute("DELETE FROM locations WHERE id = ?1", params![id])?;
        Ok(n > 0)
    })
}

/// Queries locations with filters, returning (rows, total_count).
pub fn query(
    db: &Database,
    filter: &LocationFilter,
) -> Result<(Vec<Location>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut clause = WhereClause::default();
        if let Some(ref term) = filter.search {
            clause.push_search(&["name", "description"], term);
        }
        if let Some(ref parent_id) = filter.parent_id {
            clause.push("parent_id = {}", parent_id.clone());
        }

        let total = clause.count(conn, "locations")?;
        let rows = clause.select(
            conn,
            "locations",
            "name COLLATE NOCASE ASC, id ASC",
            filter.limit.unwrap_or(100),
            filter.offset.unwrap_or(0),
            from_row,
        )?;
        Ok((rows, total))
    })
}

/// Every location, ordered by name. Used to build the tree.
pub fn list_all(db: &Database) -> Result<Vec<Location>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM locations ORDER BY name COLLATE NOCASE ASC")?;
        let rows = stmt
            .query_map([], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Direct children of a location, ordered by name.
pub fn list_children(db: &Database, parent_id: &str) -> Result<Vec<Location>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM locations WHERE parent_id = ?1 ORDER BY name COLLATE NOCASE ASC",
        )?;
        let rows = stmt
            .query_map(params![parent_id], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn count_children(db: &Database, id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        count(
            conn,
            "SELECT COUNT(*) FROM locations WHERE parent_id = ?1",
            params![id],
        )
    })
}

/// Ancestor ids of a location, nearest first.
pub fn ancestor_ids(db: &Database, id: &str) -> Result<Vec<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "WITH RECURSIVE ancestors(id, parent_id, depth) AS (
                 SELECT id, parent_id, 0 FROM locations WHERE id = ?1
                 UNION
                 SELECT l.id, l.parent_id, a.depth + 1
                 FROM locations l JOIN ancestors a ON l.id = a.parent_id
             )
             SELECT id FROM ancestors WHERE depth > 0 ORDER BY depth",
        )?;
        let ids = stmt
            .query_map(params![id], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    })
}
