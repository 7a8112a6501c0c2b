//! Test harness for isolated test execution.
//!
//! Every `TestHarness` owns a temporary directory holding its own SQLite
//! file, so tests can run in parallel and reopen the store to check what
//! was persisted.

#![allow(dead_code)]

use std::path::PathBuf;

use serde_json::Value;
use tempfile::TempDir;

use maintdesk::model::{Location, Machine, MaintenanceRange, Operation, WorkOrder};
use maintdesk::service::{locations, machines, operations, ranges, work_orders};
use maintdesk::{Database, PageWindow};

pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub db: Database,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("data").join("maintdesk.db");
        let db = Database::open(&db_path).expect("Failed to open database");
        Self {
            temp_dir,
            db_path,
            db,
        }
    }

    /// Opens a second handle on the same file.
    pub fn reopen(&self) -> Database {
        Database::open(&self.db_path).expect("Failed to reopen database")
    }

    pub fn window(page: u64, limit: u64) -> PageWindow {
        PageWindow { page, limit }
    }

    pub fn location(&self, payload: Value) -> Location {
        locations::create(&self.db, payload).expect("Failed to create location")
    }

    pub fn operation(&self, payload: Value) -> Operation {
        operations::create(&self.db, payload).expect("Failed to create operation")
    }

    pub fn range(&self, payload: Value) -> MaintenanceRange {
        ranges::create(&self.db, payload).expect("Failed to create maintenance range")
    }

    pub fn machine(&self, payload: Value) -> Machine {
        machines::create(&self.db, payload).expect("Failed to create machine")
    }

    pub fn work_order(&self, payload: Value) -> WorkOrder {
        work_orders::create(&self.db, payload).expect("Failed to create work order")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
