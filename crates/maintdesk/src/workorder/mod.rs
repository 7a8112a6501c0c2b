//! Work-order domain logic: operation aggregation and state transformations.

pub mod operations;
pub mod state;

pub use operations::{aggregate_operations, with_filled, AggregatedOperation, OperationSource};
pub use state::{MachineProgress, MaterialTotal};
