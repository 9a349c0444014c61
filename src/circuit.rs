use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CircuitError, Result};

/// Node identifier. `0` is ground by default; any node can be chosen as the
/// reference via [`Circuit::set_reference`].
pub type NodeId = u32;

/// Stable component identifier, assigned at construction.
pub type ComponentId = Uuid;

/// The reference node used when none is chosen explicitly.
pub const GROUND: NodeId = 0;

/// Kinds of circuit components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Resistor,
    VoltageSource,
    CurrentSource,
}

impl ComponentKind {
    /// Returns true if this component is a source
    pub fn is_source(&self) -> bool {
        matches!(
            self,
            ComponentKind::VoltageSource | ComponentKind::CurrentSource
        )
    }

    /// Display name used in result payloads
    pub fn display_name(&self) -> &'static str {
        match self {
            ComponentKind::Resistor => "Resistor",
            ComponentKind::VoltageSource => "Voltage Source",
            ComponentKind::CurrentSource => "Current Source",
        }
    }

    /// Prefix for canonical display identifiers (R1, VS1, CS1, ...)
    pub fn prefix(&self) -> &'static str {
        match self {
            ComponentKind::Resistor => "R",
            ComponentKind::VoltageSource => "VS",
            ComponentKind::CurrentSource => "CS",
        }
    }

    /// Physical unit of the component value
    pub fn unit(&self) -> &'static str {
        match self {
            ComponentKind::Resistor => "Ω",
            ComponentKind::VoltageSource => "V",
            ComponentKind::CurrentSource => "A",
        }
    }

    /// Ordering rank for canonical display-id assignment
    pub fn rank(&self) -> u8 {
        match self {
            ComponentKind::Resistor => 0,
            ComponentKind::VoltageSource => 1,
            ComponentKind::CurrentSource => 2,
        }
    }
}

/// Circuit component.
///
/// Conventions: resistor current flows node1 → node2; a voltage source
/// constrains V(node1) − V(node2) = value; a current source forces `value`
/// amperes from node1 to node2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub kind: ComponentKind,
    pub value: f64,
    pub node1: NodeId,
    pub node2: NodeId,
}

impl Component {
    fn new(kind: ComponentKind, value: f64, node1: NodeId, node2: NodeId) -> Self {
        Component {
            id: Uuid::new_v4(),
            kind,
            value,
            node1,
            node2,
        }
    }

    pub fn resistor(resistance: f64, node1: NodeId, node2: NodeId) -> Self {
        Self::new(ComponentKind::Resistor, resistance, node1, node2)
    }

    pub fn voltage_source(voltage: f64, node_pos: NodeId, node_neg: NodeId) -> Self {
        Self::new(ComponentKind::VoltageSource, voltage, node_pos, node_neg)
    }

    pub fn current_source(current: f64, node_from: NodeId, node_to: NodeId) -> Self {
        Self::new(ComponentKind::CurrentSource, current, node_from, node_to)
    }

    /// Get the conductance for resistive elements
    pub fn conductance(&self) -> Result<f64> {
        match self.kind {
            ComponentKind::Resistor => {
                if self.value <= 0.0 {
                    Err(CircuitError::NonPositiveResistance { value: self.value })
                } else {
                    Ok(1.0 / self.value)
                }
            }
            _ => Err(CircuitError::value(format!(
                "component {} is not a resistor",
                self.id
            ))),
        }
    }

    /// The terminal opposite `node`, if this component touches `node`.
    pub fn other_terminal(&self, node: NodeId) -> Option<NodeId> {
        if self.node1 == node {
            Some(self.node2)
        } else if self.node2 == node {
            Some(self.node1)
        } else {
            None
        }
    }

    /// True if the component's terminals are `{a, b}` in either orientation.
    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        (self.node1 == a && self.node2 == b) || (self.node1 == b && self.node2 == a)
    }

    /// Validate terminal and value invariants
    pub fn validate(&self) -> Result<()> {
        if self.node1 == self.node2 {
            return Err(CircuitError::SelfLoop { node: self.node1 });
        }
        if !self.value.is_finite() {
            return Err(CircuitError::value(format!(
                "component value must be finite, got {}",
                self.value
            )));
        }
        if self.kind == ComponentKind::Resistor && self.value <= 0.0 {
            return Err(CircuitError::NonPositiveResistance { value: self.value });
        }
        Ok(())
    }
}

/// Complete circuit representation: a multigraph of components over integer
/// nodes plus a single reference node.
///
/// Components keep their insertion order (voltage-source branch currents are
/// indexed by it); parallel components between the same node pair are
/// permitted and distinct. Once analysis begins the circuit is treated as
/// immutable.
#[derive(Debug, Clone)]
pub struct Circuit {
    components: Vec<Component>,
    ids: HashMap<ComponentId, usize>,
    nodes: BTreeSet<NodeId>,
    reference: NodeId,
}

impl Circuit {
    pub fn new() -> Self {
        let mut nodes = BTreeSet::new();
        nodes.insert(GROUND);
        Circuit {
            components: Vec::new(),
            ids: HashMap::new(),
            nodes,
            reference: GROUND,
        }
    }

    /// Add a component to the circuit, updating the node set.
    pub fn add_component(&mut self, component: Component) -> Result<()> {
        component.validate()?;
        if self.ids.contains_key(&component.id) {
            return Err(CircuitError::DuplicateComponentId { id: component.id });
        }

        self.nodes.insert(component.node1);
        self.nodes.insert(component.node2);
        self.ids.insert(component.id, self.components.len());
        self.components.push(component);
        Ok(())
    }

    /// Mark `node` as the reference (ground), adding it to the node set if
    /// no component touches it.
    pub fn set_reference(&mut self, node: NodeId) {
        self.nodes.insert(node);
        self.reference = node;
    }

    pub fn reference(&self) -> NodeId {
        self.reference
    }

    /// All nodes, reference included, ascending.
    pub fn nodes(&self) -> &BTreeSet<NodeId> {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Components in insertion order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Get a component by id
    pub fn get(&self, id: &ComponentId) -> Option<&Component> {
        self.ids.get(id).map(|&i| &self.components[i])
    }

    /// Non-reference nodes, sorted ascending. Downstream solver indexing
    /// depends on this ordering for reproducibility.
    pub fn non_reference_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .copied()
            .filter(|&n| n != self.reference)
            .collect()
    }

    /// Every component touching `node`, paired with its other terminal.
    /// The component is returned as-is; node1/node2 keep their original
    /// orientation.
    pub fn components_incident_to(&self, node: NodeId) -> Vec<(&Component, NodeId)> {
        self.components
            .iter()
            .filter_map(|c| c.other_terminal(node).map(|other| (c, other)))
            .collect()
    }

    /// All voltage sources whose terminals are `{a, b}` in either orientation.
    pub fn voltage_sources_between(&self, a: NodeId, b: NodeId) -> Vec<&Component> {
        self.components
            .iter()
            .filter(|c| c.kind == ComponentKind::VoltageSource && c.connects(a, b))
            .collect()
    }

    /// Get all resistors
    pub fn resistors(&self) -> Vec<&Component> {
        self.of_kind(ComponentKind::Resistor)
    }

    /// Get all voltage sources, in insertion order
    pub fn voltage_sources(&self) -> Vec<&Component> {
        self.of_kind(ComponentKind::VoltageSource)
    }

    /// Get all current sources
    pub fn current_sources(&self) -> Vec<&Component> {
        self.of_kind(ComponentKind::CurrentSource)
    }

    fn of_kind(&self, kind: ComponentKind) -> Vec<&Component> {
        self.components.iter().filter(|c| c.kind == kind).collect()
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_creation() {
        let resistor = Component::resistor(1000.0, 1, 2);
        assert_eq!(resistor.kind, ComponentKind::Resistor);
        assert_eq!(resistor.value, 1000.0);
        assert_eq!(resistor.conductance().unwrap(), 0.001);
        assert_eq!(resistor.other_terminal(1), Some(2));
        assert_eq!(resistor.other_terminal(3), None);
    }

    #[test]
    fn test_fresh_ids_are_unique() {
        let a = Component::resistor(100.0, 1, 0);
        let b = Component::resistor(100.0, 1, 0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut circuit = Circuit::new();
        let err = circuit
            .add_component(Component::resistor(100.0, 3, 3))
            .unwrap_err();
        assert!(matches!(err, CircuitError::SelfLoop { node: 3 }));

        let err = circuit
            .add_component(Component::voltage_source(5.0, 2, 2))
            .unwrap_err();
        assert!(matches!(err, CircuitError::SelfLoop { node: 2 }));
    }

    #[test]
    fn test_non_positive_resistance_rejected() {
        let mut circuit = Circuit::new();
        let err = circuit
            .add_component(Component::resistor(0.0, 1, 0))
            .unwrap_err();
        assert!(matches!(err, CircuitError::NonPositiveResistance { .. }));

        let err = circuit
            .add_component(Component::resistor(-10.0, 1, 0))
            .unwrap_err();
        assert!(matches!(err, CircuitError::NonPositiveResistance { .. }));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut circuit = Circuit::new();
        let resistor = Component::resistor(100.0, 1, 0);
        let twin = resistor.clone();
        circuit.add_component(resistor).unwrap();
        let err = circuit.add_component(twin).unwrap_err();
        assert!(matches!(err, CircuitError::DuplicateComponentId { .. }));
    }

    #[test]
    fn test_reference_always_in_node_set() {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::resistor(100.0, 1, 2))
            .unwrap();
        assert!(circuit.nodes().contains(&GROUND));

        circuit.set_reference(7);
        assert!(circuit.nodes().contains(&7));
        assert_eq!(circuit.reference(), 7);
    }

    #[test]
    fn test_non_reference_nodes_sorted() {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::resistor(100.0, 4, 1))
            .unwrap();
        circuit
            .add_component(Component::resistor(100.0, 2, 0))
            .unwrap();
        assert_eq!(circuit.non_reference_nodes(), vec![1, 2, 4]);
    }

    #[test]
    fn test_incident_components_keep_orientation() {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::resistor(100.0, 1, 2))
            .unwrap();
        circuit
            .add_component(Component::current_source(0.5, 3, 1))
            .unwrap();

        let incident = circuit.components_incident_to(1);
        assert_eq!(incident.len(), 2);
        assert_eq!(incident[0].1, 2);
        assert_eq!(incident[0].0.node1, 1);
        assert_eq!(incident[1].1, 3);
        // orientation preserved: the current source still points 3 -> 1
        assert_eq!(incident[1].0.node1, 3);
        assert_eq!(incident[1].0.node2, 1);
    }

    #[test]
    fn test_voltage_sources_between_either_orientation() {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::voltage_source(5.0, 1, 2))
            .unwrap();
        circuit
            .add_component(Component::voltage_source(3.0, 2, 1))
            .unwrap();
        circuit
            .add_component(Component::resistor(50.0, 1, 2))
            .unwrap();

        assert_eq!(circuit.voltage_sources_between(1, 2).len(), 2);
        assert_eq!(circuit.voltage_sources_between(2, 1).len(), 2);
        assert_eq!(circuit.voltage_sources_between(1, 3).len(), 0);
    }

    #[test]
    fn test_parallel_components_are_distinct() {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::resistor(100.0, 1, 0))
            .unwrap();
        circuit
            .add_component(Component::resistor(100.0, 1, 0))
            .unwrap();
        assert_eq!(circuit.component_count(), 2);
        assert_eq!(circuit.components_incident_to(1).len(), 2);
    }
}
