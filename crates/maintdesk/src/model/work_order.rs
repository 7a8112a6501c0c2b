use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Machine, MaintenanceRangeDetail, MaintenanceType, Operation, OperationType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Pending,
    InProgress,
    Completed,
}

impl WorkOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Pending => "pending",
            WorkOrderStatus::InProgress => "in_progress",
            WorkOrderStatus::Completed => "completed",
        }
    }

    /// The only status this one may advance to.
    pub fn next(&self) -> Option<WorkOrderStatus> {
        match self {
            WorkOrderStatus::Pending => Some(WorkOrderStatus::InProgress),
            WorkOrderStatus::InProgress => Some(WorkOrderStatus::Completed),
            WorkOrderStatus::Completed => None,
        }
    }
}

impl std::fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WorkOrderStatus::Pending),
            "in_progress" => Ok(WorkOrderStatus::InProgress),
            "completed" => Ok(WorkOrderStatus::Completed),
            other => Err(format!("Unknown work order status: {}", other)),
        }
    }
}

/// Recorded result of an operation. The variant must match the
/// operation's [`OperationType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilledValue {
    Boolean(bool),
    /// Minutes spent on a timed operation.
    Minutes(u64),
    Text(String),
}

impl FilledValue {
    pub fn matches(&self, operation_type: OperationType) -> bool {
        matches!(
            (self, operation_type),
            (FilledValue::Boolean(_), OperationType::Boolean)
                | (FilledValue::Minutes(_), OperationType::Time)
                | (FilledValue::Text(_), OperationType::Text)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilledOperation {
    pub operation_id: String,
    pub value: FilledValue,
    #[serde(default = "Utc::now")]
    pub filled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborEntry {
    /// Assigned on insert when left empty.
    #[serde(default)]
    pub id: String,
    pub operator: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl LaborEntry {
    /// Worked minutes, or `None` while the entry is still open.
    pub fn minutes(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_minutes().max(0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default)]
    pub id: String,
    pub description: String,
    pub unit: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// Encoded signature image, usually a data URL.
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_by: Option<String>,
    #[serde(default = "Utc::now")]
    pub signed_at: DateTime<Utc>,
}

/// Per-machine section of a work order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderMachine {
    pub machine_id: String,
    #[serde(default)]
    pub maintenance_ranges: Vec<String>,
    /// Operations added by hand on top of the ranges.
    #[serde(default)]
    pub operations: Vec<String>,
    #[serde(default)]
    pub filled_operations: Vec<FilledOperation>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_description: Option<String>,
}

impl WorkOrderMachine {
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            maintenance_ranges: Vec::new(),
            operations: Vec::new(),
            filled_operations: Vec::new(),
            images: Vec::new(),
            maintenance_description: None,
        }
    }

    pub fn filled(&self, operation_id: &str) -> Option<&FilledOperation> {
        self.filled_operations
            .iter()
            .find(|f| f.operation_id == operation_id)
    }

    pub fn has_recorded_data(&self) -> bool {
        !self.filled_operations.is_empty()
            || !self.images.is_empty()
            || self
                .maintenance_description
                .as_deref()
                .is_some_and(|d| !d.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
    pub id: String,
    #[serde(rename = "type")]
    pub order_type: MaintenanceType,
    pub status: WorkOrderStatus,
    pub machines: Vec<WorkOrderMachine>,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub labor: Vec<LaborEntry>,
    pub materials: Vec<Material>,
    pub images: Vec<String>,
    pub operator_signature: Option<Signature>,
    pub client_signature: Option<Signature>,
    pub custom_properties: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderMachineInput {
    pub machine_id: String,
    /// Defaults to the machine's ranges of the work-order type when absent.
    #[serde(default)]
    pub maintenance_ranges: Option<Vec<String>>,
    #[serde(default)]
    pub operations: Vec<String>,
    #[serde(default)]
    pub filled_operations: Vec<FilledOperation>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub maintenance_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderInput {
    #[serde(rename = "type")]
    pub order_type: MaintenanceType,
    #[serde(default)]
    pub status: Option<WorkOrderStatus>,
    pub machines: Vec<WorkOrderMachineInput>,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed_date: Option<NaiveDate>,
    #[serde(default)]
    pub labor: Vec<LaborEntry>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub operator_signature: Option<Signature>,
    #[serde(default)]
    pub client_signature: Option<Signature>,
    #[serde(default)]
    pub custom_properties: BTreeMap<String, Value>,
}

/// A work-order machine with the referenced documents resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderMachineDetail {
    pub machine_id: String,
    pub machine: Option<Machine>,
    pub maintenance_ranges: Vec<MaintenanceRangeDetail>,
    pub operations: Vec<Operation>,
    pub filled_operations: Vec<FilledOperation>,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderDetail {
    pub id: String,
    #[serde(rename = "type")]
    pub order_type: MaintenanceType,
    pub status: WorkOrderStatus,
    pub machines: Vec<WorkOrderMachineDetail>,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub labor: Vec<LaborEntry>,
    pub materials: Vec<Material>,
    pub images: Vec<String>,
    pub operator_signature: Option<Signature>,
    pub client_signature: Option<Signature>,
    pub custom_properties: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&WorkOrderStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(
            "in_progress".parse::<WorkOrderStatus>().unwrap(),
            WorkOrderStatus::InProgress
        );
    }

    #[test]
    fn test_status_next() {
        assert_eq!(
            WorkOrderStatus::Pending.next(),
            Some(WorkOrderStatus::InProgress)
        );
        assert_eq!(
            WorkOrderStatus::InProgress.next(),
            Some(WorkOrderStatus::Completed)
        );
        assert_eq!(WorkOrderStatus::Completed.next(), None);
    }

    #[test]
    fn test_filled_value_deserializes_by_shape() {
        let v: FilledValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, FilledValue::Boolean(true));
        let v: FilledValue = serde_json::from_str("45").unwrap();
        assert_eq!(v, FilledValue::Minutes(45));
        let v: FilledValue = serde_json::from_str("\"belt replaced\"").unwrap();
        assert_eq!(v, FilledValue::Text("belt replaced".into()));
        assert!(serde_json::from_str::<FilledValue>("-3").is_err());
    }

    #[test]
    fn test_filled_value_matches_type() {
        assert!(FilledValue::Boolean(false).matches(OperationType::Boolean));
        assert!(FilledValue::Minutes(5).matches(OperationType::Time));
        assert!(!FilledValue::Text("5".into()).matches(OperationType::Time));
    }

    #[test]
    fn test_labor_minutes() {
        let start = "2026-03-01T08:00:00Z".parse().unwrap();
        let mut entry = LaborEntry {
            id: "l1".into(),
            operator: "Ana".into(),
            start_time: start,
            end_time: None,
        };
        assert_eq!(entry.minutes(), None);
        entry.end_time = Some("2026-03-01T09:30:00Z".parse().unwrap());
        assert_eq!(entry.minutes(), Some(90));
    }

    #[test]
    fn test_machine_recorded_data() {
        let mut m = WorkOrderMachine::new("m1");
        assert!(!m.has_recorded_data());
        m.maintenance_description = Some("   ".into());
        assert!(!m.has_recorded_data());
        m.images.push("img.png".into());
        assert!(m.has_recorded_data());
    }
}
