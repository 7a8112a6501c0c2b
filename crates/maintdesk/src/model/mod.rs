//! Domain documents stored by maintdesk.
//!
//! Every document serializes to camelCase JSON, the shape the HTTP API
//! exchanges with clients.

pub mod location;
pub mod machine;
pub mod maintenance_range;
pub mod operation;
pub mod work_order;

pub use location::{Location, LocationInput, LocationNode};
pub use machine::{Machine, MachineDetail, MachineInput};
pub use maintenance_range::{
    DayOfWeek, Frequency, MaintenanceRange, MaintenanceRangeDetail, MaintenanceRangeInput,
};
pub use operation::{Operation, OperationInput, OperationType};
pub use work_order::{
    FilledOperation, FilledValue, LaborEntry, Material, Signature, WorkOrder, WorkOrderDetail,
    WorkOrderInput, WorkOrderMachine, WorkOrderMachineDetail, WorkOrderMachineInput,
    WorkOrderStatus,
};

use serde::{Deserialize, Serialize};

/// Kind of maintenance, shared by maintenance ranges and work orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceType {
    Preventive,
    Corrective,
}

impl MaintenanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceType::Preventive => "preventive",
            MaintenanceType::Corrective => "corrective",
        }
    }
}

impl std::fmt::Display for MaintenanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MaintenanceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preventive" => Ok(MaintenanceType::Preventive),
            "corrective" => Ok(MaintenanceType::Corrective),
            other => Err(format!("Unknown maintenance type: {}", other)),
        }
    }
}

/// Generates a new document id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Drops repeated ids while keeping first-seen order.
pub fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Trims a string, mapping blank values to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
