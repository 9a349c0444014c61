//! JSON netlist ingest: the adapter between a transport payload and the
//! circuit model. The request is an object with a `components` list; each
//! record carries `type`, `value`, `nodeA`, `nodeB`. The reference node is
//! fixed to 0 for this entry point.

use log::debug;
use serde_json::Value;

use crate::circuit::{Circuit, Component, ComponentKind, NodeId, GROUND};
use crate::error::{CircuitError, Result};

const REQUIRED_FIELDS: [&str; 4] = ["type", "value", "nodeA", "nodeB"];

/// Build a circuit from a JSON request body.
pub fn circuit_from_str(body: &str) -> Result<Circuit> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| CircuitError::shape(format!("request body is not valid JSON: {}", e)))?;
    circuit_from_json(&value)
}

/// Build a circuit from a parsed JSON request.
pub fn circuit_from_json(request: &Value) -> Result<Circuit> {
    let components = request
        .get("components")
        .ok_or_else(|| CircuitError::shape("'components' key is missing"))?;
    let entries = components
        .as_array()
        .ok_or_else(|| CircuitError::shape("'components' must be a list"))?;

    let mut circuit = Circuit::new();

    for (index, entry) in entries.iter().enumerate() {
        let record = entry.as_object().ok_or_else(|| {
            CircuitError::shape(format!("component at index {} is not an object", index))
        })?;

        for field in REQUIRED_FIELDS {
            if !record.contains_key(field) {
                return Err(CircuitError::MissingField { index, field });
            }
        }

        let kind = parse_kind(&record["type"], index)?;
        let value = parse_value(&record["value"], index)?;
        let node1 = parse_node(&record["nodeA"], index, "nodeA")?;
        let node2 = parse_node(&record["nodeB"], index, "nodeB")?;

        let component = match kind {
            ComponentKind::Resistor => Component::resistor(value, node1, node2),
            ComponentKind::VoltageSource => Component::voltage_source(value, node1, node2),
            ComponentKind::CurrentSource => Component::current_source(value, node1, node2),
        };
        circuit.add_component(component)?;
    }

    circuit.set_reference(GROUND);
    debug!(
        "netlist ingested: {} components, {} nodes",
        circuit.component_count(),
        circuit.node_count()
    );
    Ok(circuit)
}

fn parse_kind(tag: &Value, index: usize) -> Result<ComponentKind> {
    let tag = tag.as_str().ok_or_else(|| {
        CircuitError::value(format!(
            "'type' for component at index {} must be a string",
            index
        ))
    })?;

    match tag.trim().to_uppercase().as_str() {
        "RESISTOR" | "R" => Ok(ComponentKind::Resistor),
        "VOLTAGE SOURCE" | "VS" | "VOLTAGE" => Ok(ComponentKind::VoltageSource),
        "CURRENT SOURCE" | "CS" | "CURRENT" => Ok(ComponentKind::CurrentSource),
        _ => Err(CircuitError::UnknownType {
            index,
            type_tag: tag.to_string(),
        }),
    }
}

fn parse_value(raw: &Value, index: usize) -> Result<f64> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(CircuitError::value(format!(
            "'value' for component at index {}: {}. Must be a finite number.",
            index, raw
        ))),
    }
}

fn parse_node(raw: &Value, index: usize, field: &'static str) -> Result<NodeId> {
    let parsed = match raw {
        Value::Number(n) => n.as_u64().and_then(|v| NodeId::try_from(v).ok()),
        Value::String(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("gnd") {
                Some(GROUND)
            } else {
                s.parse::<NodeId>().ok()
            }
        }
        _ => None,
    };

    parsed.ok_or_else(|| {
        CircuitError::value(format!(
            "'{}' for component at index {}: {}. Must be a non-negative integer or GND.",
            field, index, raw
        ))
    })
}
