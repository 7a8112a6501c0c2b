//! Business rules applied after schema validation.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::model::{
    LaborEntry, LocationInput, MachineInput, MaintenanceRangeInput, Material, OperationInput,
    Signature, WorkOrderInput,
};

static RE_START_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap());

/// Collects rule violations so a client sees all of them at once.
#[derive(Debug, Default)]
pub struct Rules {
    errors: Vec<String>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, message: impl Into<String>) {
        if !ok {
            self.errors.push(message.into());
        }
    }

    pub fn non_blank(&mut self, field: &str, value: &str) {
        self.check(!value.trim().is_empty(), format!("{} must not be empty", field));
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Rules(self.errors))
        }
    }

    pub fn labor_entry(&mut self, field: &str, entry: &LaborEntry) {
        self.non_blank(&format!("{}.operator", field), &entry.operator);
        if let Some(end) = entry.end_time {
            self.check(
                end >= entry.start_time,
                format!("{}.endTime must not be before startTime", field),
            );
        }
    }

    pub fn material(&mut self, field: &str, material: &Material) {
        self.non_blank(&format!("{}.description", field), &material.description);
        self.non_blank(&format!("{}.unit", field), &material.unit);
        self.check(
            material.quantity.is_finite() && material.quantity > 0.0,
            format!("{}.quantity must be greater than 0", field),
        );
    }

    pub fn signature(&mut self, field: &str, signature: &Signature) {
        self.non_blank(&format!("{}.data", field), &signature.data);
    }

    fn unique<'a>(&mut self, field: &str, ids: impl IntoIterator<Item = &'a String>) {
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id.as_str()) {
                self.errors
                    .push(format!("{} contains '{}' more than once", field, id));
            }
        }
    }
}

pub fn location(input: &LocationInput) -> Result<(), ValidationError> {
    let mut rules = Rules::new();
    rules.non_blank("name", &input.name);
    rules.finish()
}

pub fn machine(input: &MachineInput) -> Result<(), ValidationError> {
    let mut rules = Rules::new();
    rules.non_blank("name", &input.name);
    rules.finish()
}

pub fn operation(input: &OperationInput) -> Result<(), ValidationError> {
    let mut rules = Rules::new();
    rules.non_blank("name", &input.name);
    rules.finish()
}

pub fn maintenance_range(input: &MaintenanceRangeInput) -> Result<(), ValidationError> {
    let mut rules = Rules::new();
    rules.non_blank("name", &input.name);
    if let Some(ref time) = input.start_time {
        rules.check(
            RE_START_TIME.is_match(time),
            format!("startTime '{}' must use HH:MM", time),
        );
    }
    rules.finish()
}

pub fn work_order(input: &WorkOrderInput) -> Result<(), ValidationError> {
    let mut rules = Rules::new();

    rules.check(
        !input.machines.is_empty(),
        "A work order needs at least one machine",
    );
    rules.unique("machines", input.machines.iter().map(|m| &m.machine_id));
    for (i, machine) in input.machines.iter().enumerate() {
        rules.unique(
            &format!("machines[{}].filledOperations", i),
            machine.filled_operations.iter().map(|f| &f.operation_id),
        );
    }

    if let (Some(scheduled), Some(completed)) = (input.scheduled_date, input.completed_date) {
        rules.check(
            completed >= scheduled,
            "completedDate must not be before scheduledDate",
        );
    }
    for (i, entry) in input.labor.iter().enumerate() {
        rules.labor_entry(&format!("labor[{}]", i), entry);
    }
    for (i, material) in input.materials.iter().enumerate() {
        rules.material(&format!("materials[{}]", i), material);
    }
    if let Some(ref sig) = input.operator_signature {
        rules.signature("operatorSignature", sig);
    }
    if let Some(ref sig) = input.client_signature {
        rules.signature("clientSignature", sig);
    }
    for key in input.custom_properties.keys() {
        rules.non_blank("customProperties key", key);
    }

    rules.finish()
}
