//! Document store on top of SQLite.
//!
//! Uses rusqlite (SQLite) with a thread-safe `Database` handle.
//! All access is serialized through a `Mutex<Connection>`. Scalar fields are
//! plain columns; nested lists and maps are stored as JSON text.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod error;
pub mod location_repo;
pub mod machine_repo;
pub mod migrations;
pub mod operation_repo;
pub mod range_repo;
pub mod work_order_repo;

pub use error::DatabaseError;

/// Thread-safe database handle wrapping a single rusqlite connection.
///
/// Cloning is cheap (inner `Arc`). All access is serialized through
/// a `Mutex`, which is fine for SQLite (which serializes writes anyway).
/// WAL mode is enabled for concurrent read performance.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database at the given path and runs all
    /// pending migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        log::info!("Database opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database for testing. Runs all migrations.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Provides locked access to the underlying connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    /// Runs `f` inside a transaction, committing when it returns `Ok`.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T, DatabaseError>,
    {
        let mut conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Returns the canonical database path: `~/.maintdesk/data/maintdesk.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".maintdesk").join("data").join("maintdesk.db"))
}

// ─── Column codecs ──────────────────────────────────────────────────────────

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(DatabaseError::Json)
}

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn column_index(row: &Row<'_>, name: &str) -> Result<usize, rusqlite::Error> {
    row.as_ref().column_index(name)
}

/// Reads a JSON text column into `T`.
pub(crate) fn json_column<T: DeserializeOwned>(
    row: &Row<'_>,
    name: &str,
) -> Result<T, rusqlite::Error> {
    let idx = column_index(row, name)?;
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

/// Reads an optional JSON text column into `T`.
pub(crate) fn json_column_opt<T: DeserializeOwned>(
    row: &Row<'_>,
    name: &str,
) -> Result<Option<T>, rusqlite::Error> {
    let idx = column_index(row, name)?;
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn timestamp_column(row: &Row<'_>, name: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    let idx = column_index(row, name)?;
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn date_column(row: &Row<'_>, name: &str) -> Result<Option<NaiveDate>, rusqlite::Error> {
    let idx = column_index(row, name)?;
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse::<NaiveDate>().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Error for enum columns holding an unknown value.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct UnknownVariant(String);

pub(crate) fn enum_column<T: FromStr<Err = String>>(
    row: &Row<'_>,
    name: &str,
) -> Result<T, rusqlite::Error> {
    let idx = column_index(row, name)?;
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| conversion_error(idx, UnknownVariant(e)))
}

pub(crate) fn enum_column_opt<T: FromStr<Err = String>>(
    row: &Row<'_>,
    name: &str,
) -> Result<Option<T>, rusqlite::Error> {
    let idx = column_index(row, name)?;
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse::<T>()
            .map_err(|e| conversion_error(idx, UnknownVariant(e)))
    })
    .transpose()
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
pub(crate) fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn format_date(date: &Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Accumulates `AND`-joined conditions with positional parameters.
#[derive(Default)]
pub(crate) struct WhereClause {
    conditions: Vec<String>,
    params: Vec<Box<dyn rusqlite::types::ToSql>>,
}

impl WhereClause {
    /// Adds a condition; `{}` in `template` is replaced by the next `?N` placeholder.
    pub fn push(&mut self, template: &str, value: impl rusqlite::types::ToSql + 'static) {
        self.params.push(Box::new(value));
        let placeholder = format!("?{}", self.params.len());
        self.conditions.push(template.replace("{}", &placeholder));
    }

    /// Adds a case-insensitive substring match over any of `columns`.
    pub fn push_search(&mut self, columns: &[&str], term: &str) {
        self.params
            .push(Box::new(crate::pagination::like_pattern(term)));
        let placeholder = format!("?{}", self.params.len());
        let any: Vec<String> = columns
            .iter()
            .map(|c| format!("LOWER(COALESCE({}, '')) LIKE {} ESCAPE '\\'", c, placeholder))
            .collect();
        self.conditions.push(format!("({})", any.join(" OR ")));
    }

    pub fn sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// Counts the rows of `table` matching the clause.
    pub fn count(&self, conn: &Connection, table: &str) -> Result<u64, DatabaseError> {
        let sql = format!("SELECT COUNT(*) FROM {} {}", table, self.sql());
        let params: Vec<&dyn rusqlite::types::ToSql> =
            self.params.iter().map(|p| p.as_ref()).collect();
        count(conn, &sql, params.as_slice())
    }

    /// Fetches one window of matching rows.
    pub fn select<T>(
        mut self,
        conn: &Connection,
        table: &str,
        order_by: &str,
        limit: u64,
        offset: u64,
        map: impl FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
    ) -> Result<Vec<T>, DatabaseError> {
        self.params.push(Box::new(limit as i64));
        self.params.push(Box::new(offset as i64));
        let sql = format!(
            "SELECT * FROM {} {} ORDER BY {} LIMIT ?{} OFFSET ?{}",
            table,
            self.sql(),
            order_by,
            self.params.len() - 1,
            self.params.len()
        );
        let params: Vec<&dyn rusqlite::types::ToSql> =
            self.params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params.as_slice(), map)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Runs a `SELECT COUNT(*)`-style query returning a single integer.
pub(crate) fn count(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<u64, DatabaseError> {
    let n: i64 = conn.query_row(sql, params, |r| r.get(0))?;
    Ok(n.max(0) as u64)
}
