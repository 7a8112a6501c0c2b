use std::path::PathBuf;
use thiserror::Error;

use crate::model::WorkOrderStatus;

#[derive(Error, Debug)]
pub enum MaintError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{message}")]
    Conflict {
        message: String,
        /// Named counts of the documents blocking the operation.
        blocking: Vec<(&'static str, u64)>,
    },

    #[error("{0}")]
    ReadOnly(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: WorkOrderStatus,
        to: WorkOrderStatus,
    },
}

impl MaintError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        MaintError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        MaintError::Validation(ValidationError::single(message))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Payload rejected by schema or business validation.
///
/// Carries every collected message so a client sees all problems at once.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid payload: {}", .0.join("; "))]
    Schema(Vec<String>),

    #[error("{}", .0.join("; "))]
    Rules(Vec<String>),
}

impl ValidationError {
    pub fn single(message: impl Into<String>) -> Self {
        ValidationError::Rules(vec![message.into()])
    }

    pub fn messages(&self) -> &[String] {
        match self {
            ValidationError::Schema(m) | ValidationError::Rules(m) => m,
        }
    }
}

pub type Result<T> = std::result::Result<T, MaintError>;
