use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the result of an operation is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// A yes/no check.
    Boolean,
    /// A timed task, recorded in minutes.
    Time,
    /// Free text.
    Text,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Boolean => "boolean",
            OperationType::Time => "time",
            OperationType::Text => "text",
        }
    }
}

impl std::str::FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(OperationType::Boolean),
            "time" => Ok(OperationType::Time),
            "text" => Ok(OperationType::Text),
            other => Err(format!("Unknown operation type: {}", other)),
        }
    }
}

/// A unit of maintenance work attachable to machines and maintenance ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    #[serde(default)]
    pub order: Option<u32>,
}
