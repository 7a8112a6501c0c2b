//! In-memory state transformations of a work order.
//!
//! Every mutation checks that the order is still editable. Persisting the
//! result is the caller's job.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use super::operations::AggregatedOperation;
use crate::error::{MaintError, Result};
use crate::model::{
    new_id, non_blank, FilledOperation, FilledValue, LaborEntry, Material, Signature, WorkOrder,
    WorkOrderMachine, WorkOrderStatus,
};
use crate::validation::rules::Rules;

/// Summed quantity of one material, keyed by description and unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialTotal {
    pub description: String,
    pub unit: String,
    pub quantity: f64,
}

/// Filled vs applicable operations of one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineProgress {
    pub machine_id: String,
    pub filled: usize,
    pub total: usize,
}

impl WorkOrder {
    /// Completed work orders are read-only.
    pub fn ensure_editable(&self) -> Result<()> {
        if self.status == WorkOrderStatus::Completed {
            return Err(MaintError::ReadOnly(format!(
                "Work order '{}' is completed and can no longer be modified",
                self.id
            )));
        }
        Ok(())
    }

    pub fn is_transition_allowed(&self, to: WorkOrderStatus) -> bool {
        self.status == to || self.status.next() == Some(to)
    }

    /// Moves the order to `to`. Completing an order stamps `completed_date`
    /// with today's date unless one is already set.
    pub fn transition(&mut self, to: WorkOrderStatus) -> Result<()> {
        if !self.is_transition_allowed(to) {
            return Err(MaintError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        if to == WorkOrderStatus::Completed && self.completed_date.is_none() {
            self.completed_date = Some(Utc::now().date_naive());
        }
        self.status = to;
        Ok(())
    }

    pub fn machine(&self, machine_id: &str) -> Result<&WorkOrderMachine> {
        self.machines
            .iter()
            .find(|m| m.machine_id == machine_id)
            .ok_or_else(|| MaintError::not_found("Work order machine", machine_id))
    }

    fn machine_mut(&mut self, machine_id: &str) -> Result<&mut WorkOrderMachine> {
        self.ensure_editable()?;
        self.machines
            .iter_mut()
            .find(|m| m.machine_id == machine_id)
            .ok_or_else(|| MaintError::not_found("Work order machine", machine_id))
    }

    pub fn add_machine(&mut self, machine_id: &str, ranges: Vec<String>) -> Result<()> {
        self.ensure_editable()?;
        if self.machines.iter().any(|m| m.machine_id == machine_id) {
            return Err(MaintError::invalid(format!(
                "Machine '{}' is already part of the work order",
                machine_id
            )));
        }
        let mut machine = WorkOrderMachine::new(machine_id);
        machine.maintenance_ranges = crate::model::dedup_ids(ranges);
        self.machines.push(machine);
        Ok(())
    }

    pub fn remove_machine(&mut self, machine_id: &str) -> Result<WorkOrderMachine> {
        self.ensure_editable()?;
        let idx = self
            .machines
            .iter()
            .position(|m| m.machine_id == machine_id)
            .ok_or_else(|| MaintError::not_found("Work order machine", machine_id))?;
        if self.machines.len() == 1 {
            return Err(MaintError::invalid(
                "A work order needs at least one machine",
            ));
        }
        Ok(self.machines.remove(idx))
    }

    /// Adds a manual operation. Returns `false` when it was already listed.
    pub fn add_operation(&mut self, machine_id: &str, operation_id: &str) -> Result<bool> {
        let machine = self.machine_mut(machine_id)?;
        if machine.operations.iter().any(|id| id == operation_id) {
            return Ok(false);
        }
        machine.operations.push(operation_id.to_string());
        Ok(true)
    }

    /// Removes a manual operation. Its recorded value is dropped unless one of
    /// the machine's ranges in `available` still provides the operation.
    pub fn remove_operation(
        &mut self,
        machine_id: &str,
        available: &[AggregatedOperation],
        operation_id: &str,
    ) -> Result<bool> {
        let machine = self.machine_mut(machine_id)?;
        let before = machine.operations.len();
        machine.operations.retain(|id| id != operation_id);
        let removed = machine.operations.len() != before;
        let from_range = available
            .iter()
            .any(|a| a.id() == operation_id && a.is_from_range());
        if removed && !from_range {
            machine
                .filled_operations
                .retain(|f| f.operation_id != operation_id);
        }
        Ok(removed)
    }

    /// Records `value` for an operation, replacing any earlier value.
    ///
    /// `available` is the machine's aggregated operation list; the operation
    /// must be part of it and the value must match its type.
    pub fn fill_operation(
        &mut self,
        machine_id: &str,
        available: &[AggregatedOperation],
        operation_id: &str,
        value: FilledValue,
    ) -> Result<FilledOperation> {
        let machine = self.machine_mut(machine_id)?;
        let operation = available
            .iter()
            .find(|a| a.operation.id == operation_id)
            .ok_or_else(|| {
                MaintError::invalid(format!(
                    "Operation '{}' does not apply to machine '{}' in this work order",
                    operation_id, machine_id
                ))
            })?;
        if !value.matches(operation.operation.operation_type) {
            return Err(MaintError::invalid(format!(
                "Value does not match the {} type of operation '{}'",
                operation.operation.operation_type.as_str(),
                operation.operation.name
            )));
        }

        let filled = FilledOperation {
            operation_id: operation_id.to_string(),
            value,
            filled_at: Utc::now(),
        };
        match machine
            .filled_operations
            .iter_mut()
            .find(|f| f.operation_id == operation_id)
        {
            Some(existing) => *existing = filled.clone(),
            None => machine.filled_operations.push(filled.clone()),
        }
        Ok(filled)
    }

    pub fn clear_filled_operation(&mut self, machine_id: &str, operation_id: &str) -> Result<bool> {
        let machine = self.machine_mut(machine_id)?;
        let before = machine.filled_operations.len();
        machine
            .filled_operations
            .retain(|f| f.operation_id != operation_id);
        Ok(machine.filled_operations.len() != before)
    }

    pub fn set_maintenance_description(
        &mut self,
        machine_id: &str,
        text: Option<String>,
    ) -> Result<()> {
        let machine = self.machine_mut(machine_id)?;
        machine.maintenance_description = non_blank(text);
        Ok(())
    }

    pub fn add_machine_image(&mut self, machine_id: &str, image: String) -> Result<()> {
        let image = require_image(image)?;
        self.machine_mut(machine_id)?.images.push(image);
        Ok(())
    }

    pub fn remove_machine_image(&mut self, machine_id: &str, index: usize) -> Result<String> {
        let machine = self.machine_mut(machine_id)?;
        if index >= machine.images.len() {
            return Err(MaintError::invalid(format!(
                "Machine '{}' has no image at index {}",
                machine_id, index
            )));
        }
        Ok(machine.images.remove(index))
    }

    /// Adds a labor entry, assigning an id when it has none. Returns the id.
    pub fn add_labor(&mut self, mut entry: LaborEntry) -> Result<String> {
        self.ensure_editable()?;
        let mut rules = Rules::new();
        rules.labor_entry("labor", &entry);
        rules.finish()?;

        if entry.id.trim().is_empty() {
            entry.id = new_id();
        }
        let id = entry.id.clone();
        self.labor.push(entry);
        Ok(id)
    }

    pub fn remove_labor(&mut self, id: &str) -> Result<LaborEntry> {
        self.ensure_editable()?;
        let idx = self
            .labor
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| MaintError::not_found("Labor entry", id))?;
        Ok(self.labor.remove(idx))
    }

    /// Minutes over closed labor entries.
    pub fn total_labor_minutes(&self) -> i64 {
        self.labor.iter().filter_map(LaborEntry::minutes).sum()
    }

    pub fn add_material(&mut self, mut material: Material) -> Result<String> {
        self.ensure_editable()?;
        let mut rules = Rules::new();
        rules.material("material", &material);
        rules.finish()?;

        if material.id.trim().is_empty() {
            material.id = new_id();
        }
        let id = material.id.clone();
        self.materials.push(material);
        Ok(id)
    }

    pub fn remove_material(&mut self, id: &str) -> Result<Material> {
        self.ensure_editable()?;
        let idx = self
            .materials
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| MaintError::not_found("Material", id))?;
        Ok(self.materials.remove(idx))
    }

    /// Quantities summed per description and unit, in first-seen order.
    pub fn material_totals(&self) -> Vec<MaterialTotal> {
        let mut totals: Vec<MaterialTotal> = Vec::new();
        for m in &self.materials {
            match totals
                .iter_mut()
                .find(|t| t.description == m.description && t.unit == m.unit)
            {
                Some(total) => total.quantity += m.quantity,
                None => totals.push(MaterialTotal {
                    description: m.description.clone(),
                    unit: m.unit.clone(),
                    quantity: m.quantity,
                }),
            }
        }
        totals
    }

    pub fn add_image(&mut self, image: String) -> Result<()> {
        self.ensure_editable()?;
        self.images.push(require_image(image)?);
        Ok(())
    }

    pub fn remove_image(&mut self, index: usize) -> Result<String> {
        self.ensure_editable()?;
        if index >= self.images.len() {
            return Err(MaintError::invalid(format!(
                "Work order has no image at index {}",
                index
            )));
        }
        Ok(self.images.remove(index))
    }

    pub fn sign_operator(&mut self, signature: Signature) -> Result<()> {
        self.ensure_editable()?;
        self.operator_signature = Some(checked_signature("operatorSignature", signature)?);
        Ok(())
    }

    pub fn sign_client(&mut self, signature: Signature) -> Result<()> {
        self.ensure_editable()?;
        self.client_signature = Some(checked_signature("clientSignature", signature)?);
        Ok(())
    }

    pub fn clear_signatures(&mut self) -> Result<()> {
        self.ensure_editable()?;
        self.operator_signature = None;
        self.client_signature = None;
        Ok(())
    }

    pub fn set_custom_property(&mut self, key: &str, value: Value) -> Result<Option<Value>> {
        self.ensure_editable()?;
        let key = key.trim();
        if key.is_empty() {
            return Err(MaintError::invalid("customProperties key must not be empty"));
        }
        Ok(self.custom_properties.insert(key.to_string(), value))
    }

    pub fn remove_custom_property(&mut self, key: &str) -> Result<Option<Value>> {
        self.ensure_editable()?;
        Ok(self.custom_properties.remove(key))
    }

    /// Whether anything has been recorded on the order.
    pub fn has_maintenance_data(&self) -> bool {
        self.machines.iter().any(WorkOrderMachine::has_recorded_data)
            || !self.labor.is_empty()
            || !self.materials.is_empty()
            || !self.images.is_empty()
            || self.operator_signature.is_some()
            || self.client_signature.is_some()
    }

    /// Only pending orders with nothing recorded may be deleted.
    pub fn can_delete(&self) -> bool {
        self.status == WorkOrderStatus::Pending && !self.has_maintenance_data()
    }

    /// Progress of every machine against its aggregated operations.
    ///
    /// Filled records for operations that no longer apply are not counted.
    pub fn progress(
        &self,
        aggregated: &HashMap<String, Vec<AggregatedOperation>>,
    ) -> Vec<MachineProgress> {
        self.machines
            .iter()
            .map(|machine| {
                let available = aggregated
                    .get(&machine.machine_id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let filled = available
                    .iter()
                    .filter(|a| machine.filled(&a.operation.id).is_some())
                    .count();
                MachineProgress {
                    machine_id: machine.machine_id.clone(),
                    filled,
                    total: available.len(),
                }
            })
            .collect()
    }
}

fn require_image(image: String) -> Result<String> {
    if image.trim().is_empty() {
        return Err(MaintError::invalid("image must not be empty"));
    }
    Ok(image)
}

fn checked_signature(field: &str, signature: Signature) -> Result<Signature> {
    let mut rules = Rules::new();
    rules.signature(field, &signature);
    rules.finish()?;
    Ok(signature)
}
