//! Operation aggregation for a machine within a work order.
//!
//! A machine's applicable operations come from two places: the maintenance
//! ranges attached to it (filtered by the work-order type) and operations
//! added by hand. This module merges both into one de-duplicated list while
//! recording where each operation came from.

use std::collections::HashSet;

use serde::Serialize;

use crate::model::{
    FilledOperation, MaintenanceRangeDetail, MaintenanceType, Operation, WorkOrderMachine,
};

/// Where an aggregated operation came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum OperationSource {
    #[serde(rename_all = "camelCase")]
    MaintenanceRange { range_id: String, range_name: String },
    Additional,
}

/// An operation applicable to a work-order machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedOperation {
    #[serde(flatten)]
    pub operation: Operation,
    #[serde(flatten)]
    pub source: OperationSource,
    /// Recorded value, when the operation has been filled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled: Option<FilledOperation>,
}

impl AggregatedOperation {
    pub fn id(&self) -> &str {
        &self.operation.id
    }

    pub fn is_from_range(&self) -> bool {
        matches!(self.source, OperationSource::MaintenanceRange { .. })
    }
}

/// Merges range and additional operations for a work order of type `order_type`.
///
/// Only ranges of the same type contribute. Range operations come first and
/// the first range listing an operation is its source; additional operations
/// not already present follow. The result is then stable-sorted by `order`,
/// unordered operations last.
pub fn aggregate_operations(
    order_type: MaintenanceType,
    ranges: &[MaintenanceRangeDetail],
    additional: &[Operation],
) -> Vec<AggregatedOperation> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut result = Vec::new();

    for range in ranges.iter().filter(|r| r.range_type == order_type) {
        for op in &range.operations {
            if seen.insert(op.id.as_str()) {
                result.push(AggregatedOperation {
                    operation: op.clone(),
                    source: OperationSource::MaintenanceRange {
                        range_id: range.id.clone(),
                        range_name: range.name.clone(),
                    },
                    filled: None,
                });
            }
        }
    }

    for op in additional {
        if seen.insert(op.id.as_str()) {
            result.push(AggregatedOperation {
                operation: op.clone(),
                source: OperationSource::Additional,
                filled: None,
            });
        }
    }

    result.sort_by_key(|a| (a.operation.order.is_none(), a.operation.order));
    result
}

/// Attaches the machine's recorded values to the aggregated list.
pub fn with_filled(
    mut operations: Vec<AggregatedOperation>,
    machine: &WorkOrderMachine,
) -> Vec<AggregatedOperation> {
    for op in &mut operations {
        op.filled = machine.filled(&op.operation.id).cloned();
    }
    operations
}
