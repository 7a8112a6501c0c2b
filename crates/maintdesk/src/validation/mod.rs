//! Payload validation.
//!
//! Incoming JSON is first checked against an embedded JSON Schema, then
//! deserialized, then run through the business rules in [`rules`].

pub mod rules;

use std::collections::HashMap;
use std::sync::LazyLock;

use jsonschema::Validator;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ValidationError;

/// Kinds of payload accepted by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Payload {
    Location,
    Machine,
    Operation,
    MaintenanceRange,
    WorkOrder,
    StatusChange,
    FillOperation,
}

impl Payload {
    pub const ALL: [Payload; 7] = [
        Payload::Location,
        Payload::Machine,
        Payload::Operation,
        Payload::MaintenanceRange,
        Payload::WorkOrder,
        Payload::StatusChange,
        Payload::FillOperation,
    ];

    fn schema_source(self) -> &'static str {
        match self {
            Payload::Location => include_str!("../../schema/location.json"),
            Payload::Machine => include_str!("../../schema/machine.json"),
            Payload::Operation => include_str!("../../schema/operation.json"),
            Payload::MaintenanceRange => include_str!("../../schema/maintenance_range.json"),
            Payload::WorkOrder => include_str!("../../schema/work_order.json"),
            Payload::StatusChange => include_str!("../../schema/status_change.json"),
            Payload::FillOperation => include_str!("../../schema/fill_operation.json"),
        }
    }
}

fn compile(kind: Payload) -> Result<Validator, String> {
    let schema: Value = serde_json::from_str(kind.schema_source())
        .map_err(|e| format!("Invalid embedded schema JSON for {:?}: {}", kind, e))?;
    jsonschema::validator_for(&schema)
        .map_err(|e| format!("Failed to compile JSON schema for {:?}: {}", kind, e))
}

// Compiled once on first use.
static VALIDATORS: LazyLock<HashMap<Payload, Result<Validator, String>>> = LazyLock::new(|| {
    Payload::ALL
        .iter()
        .map(|kind| (*kind, compile(*kind)))
        .collect()
});

/// Checks `value` against the schema for `kind`, collecting every violation.
pub fn check_schema(kind: Payload, value: &Value) -> Result<(), ValidationError> {
    let validator = match VALIDATORS.get(&kind) {
        Some(Ok(validator)) => validator,
        Some(Err(reason)) => return Err(ValidationError::Schema(vec![reason.clone()])),
        None => {
            return Err(ValidationError::Schema(vec![format!(
                "No schema registered for {:?}",
                kind
            )]))
        }
    };

    let errors: Vec<String> = validator.iter_errors(value).map(|e| e.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Schema(errors))
    }
}

/// Schema-checks and deserializes a payload.
pub fn parse<T: DeserializeOwned>(kind: Payload, value: Value) -> Result<T, ValidationError> {
    check_schema(kind, &value)?;
    serde_json::from_value(value).map_err(|e| ValidationError::Schema(vec![e.to_string()]))
}
