pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod pagination;
pub mod service;
pub mod validation;
pub mod workorder;

pub use config::{load_config, LogFormat, ServerConfig};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, MaintError, Result, ValidationError};
pub use pagination::{Page, PageQuery, PageWindow};
pub use workorder::{aggregate_operations, AggregatedOperation, OperationSource};
