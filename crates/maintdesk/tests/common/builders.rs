//! Builders for request payloads.
//!
//! Each builder renders the camelCase JSON a client would send, so tests
//! exercise the same validation path as the HTTP API.

#![allow(dead_code)]

use serde_json::{json, Map, Value};

/// Builder for location payloads.
pub struct LocationBuilder {
    name: String,
    description: Option<String>,
    parent_id: Option<String>,
}

impl LocationBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            parent_id: None,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn parent(mut self, parent_id: &str) -> Self {
        self.parent_id = Some(parent_id.to_string());
        self
    }

    pub fn build(self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parentId": self.parent_id,
        })
    }
}

/// Builder for operation payloads.
pub struct OperationBuilder {
    name: String,
    operation_type: &'static str,
    order: Option<u32>,
}

impl OperationBuilder {
    /// A boolean check.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            operation_type: "boolean",
            order: None,
        }
    }

    pub fn timed(mut self) -> Self {
        self.operation_type = "time";
        self
    }

    pub fn text(mut self) -> Self {
        self.operation_type = "text";
        self
    }

    pub fn order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn build(self) -> Value {
        json!({
            "name": self.name,
            "type": self.operation_type,
            "order": self.order,
        })
    }
}

/// Builder for maintenance range payloads. Defaults to a preventive range.
pub struct RangeBuilder {
    name: String,
    range_type: &'static str,
    operations: Vec<String>,
    frequency: Option<&'static str>,
    start_time: Option<String>,
    days_of_week: Vec<&'static str>,
}

impl RangeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            range_type: "preventive",
            operations: vec![],
            frequency: None,
            start_time: None,
            days_of_week: vec![],
        }
    }

    pub fn corrective(mut self) -> Self {
        self.range_type = "corrective";
        self
    }

    pub fn operation(mut self, id: &str) -> Self {
        self.operations.push(id.to_string());
        self
    }

    pub fn frequency(mut self, frequency: &'static str) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn start_time(mut self, time: &str) -> Self {
        self.start_time = Some(time.to_string());
        self
    }

    pub fn day(mut self, day: &'static str) -> Self {
        self.days_of_week.push(day);
        self
    }

    pub fn build(self) -> Value {
        json!({
            "name": self.name,
            "type": self.range_type,
            "operations": self.operations,
            "frequency": self.frequency,
            "startTime": self.start_time,
            "daysOfWeek": self.days_of_week,
        })
    }
}

/// Builder for machine payloads.
pub struct MachineBuilder {
    name: String,
    brand: Option<String>,
    serial_number: Option<String>,
    location_id: Option<String>,
    operations: Vec<String>,
    ranges: Vec<String>,
}

impl MachineBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            brand: None,
            serial_number: None,
            location_id: None,
            operations: vec![],
            ranges: vec![],
        }
    }

    pub fn brand(mut self, brand: &str) -> Self {
        self.brand = Some(brand.to_string());
        self
    }

    pub fn serial_number(mut self, serial: &str) -> Self {
        self.serial_number = Some(serial.to_string());
        self
    }

    pub fn location(mut self, id: &str) -> Self {
        self.location_id = Some(id.to_string());
        self
    }

    pub fn operation(mut self, id: &str) -> Self {
        self.operations.push(id.to_string());
        self
    }

    pub fn range(mut self, id: &str) -> Self {
        self.ranges.push(id.to_string());
        self
    }

    pub fn build(self) -> Value {
        json!({
            "name": self.name,
            "brand": self.brand,
            "serialNumber": self.serial_number,
            "locationId": self.location_id,
            "operations": self.operations,
            "maintenanceRanges": self.ranges,
        })
    }
}

/// Builder for work order payloads. Defaults to a preventive order.
pub struct WorkOrderBuilder {
    order_type: &'static str,
    status: Option<&'static str>,
    machines: Vec<Value>,
    scheduled_date: Option<String>,
    labor: Vec<Value>,
    materials: Vec<Value>,
    custom: Map<String, Value>,
}

impl WorkOrderBuilder {
    pub fn new() -> Self {
        Self {
            order_type: "preventive",
            status: None,
            machines: vec![],
            scheduled_date: None,
            labor: vec![],
            materials: vec![],
            custom: Map::new(),
        }
    }

    pub fn corrective(mut self) -> Self {
        self.order_type = "corrective";
        self
    }

    pub fn status(mut self, status: &'static str) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a machine whose ranges are resolved from the machine itself.
    pub fn machine(mut self, machine_id: &str) -> Self {
        self.machines.push(json!({ "machineId": machine_id }));
        self
    }

    /// Adds a machine section with explicit ranges and additional operations.
    pub fn machine_with(mut self, machine_id: &str, ranges: &[&str], operations: &[&str]) -> Self {
        self.machines.push(json!({
            "machineId": machine_id,
            "maintenanceRanges": ranges,
            "operations": operations,
        }));
        self
    }

    /// Adds a raw machine section.
    pub fn machine_section(mut self, section: Value) -> Self {
        self.machines.push(section);
        self
    }

    pub fn scheduled(mut self, date: &str) -> Self {
        self.scheduled_date = Some(date.to_string());
        self
    }

    pub fn labor(mut self, operator: &str, start: &str, end: Option<&str>) -> Self {
        self.labor.push(json!({
            "operator": operator,
            "startTime": start,
            "endTime": end,
        }));
        self
    }

    pub fn material(mut self, description: &str, unit: &str, quantity: f64) -> Self {
        self.materials.push(json!({
            "description": description,
            "unit": unit,
            "quantity": quantity,
        }));
        self
    }

    pub fn custom(mut self, key: &str, value: Value) -> Self {
        self.custom.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Value {
        let mut payload = json!({
            "type": self.order_type,
            "machines": self.machines,
            "scheduledDate": self.scheduled_date,
            "labor": self.labor,
            "materials": self.materials,
            "customProperties": self.custom,
        });
        if let Some(status) = self.status {
            payload["status"] = json!(status);
        }
        payload
    }
}

impl Default for WorkOrderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
