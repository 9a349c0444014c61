use serde::Serialize;

use crate::circuit::{Circuit, Component, ComponentKind, NodeId};
use crate::topology::Topology;

/// Tag identifying what an emitted equation states. The presentation layer
/// formats titles from this tag; nothing downstream parses the rendered
/// string back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EquationKind {
    /// KCL at a regular non-reference node
    Kcl { node: NodeId },
    /// KCL across the boundary of an ungrounded supernode
    SupernodeKcl { nodes: Vec<NodeId> },
    /// Voltage-source constraint V(node1) − V(node2) = value
    Constraint {
        node1: NodeId,
        node2: NodeId,
        value: f64,
    },
}

impl EquationKind {
    /// Step tag used in the structured derivation
    pub fn tag(&self) -> &'static str {
        match self {
            EquationKind::Kcl { .. } => "kcl",
            EquationKind::SupernodeKcl { .. } => "supernode_kcl",
            EquationKind::Constraint { .. } => "constraint",
        }
    }
}

/// One human-readable equation of the MNA system.
#[derive(Debug, Clone, Serialize)]
pub struct Equation {
    #[serde(flatten)]
    pub kind: EquationKind,
    pub latex: String,
}

/// Emit the symbolic equations defining the MNA system, in presentation
/// order: KCL at regular nodes, KCL at ungrounded supernodes, then one
/// constraint per voltage source in insertion order.
pub fn build_equations(circuit: &Circuit, topology: &Topology) -> Vec<Equation> {
    let mut equations = Vec::new();
    equations.extend(regular_node_equations(circuit, topology));
    equations.extend(ungrounded_supernode_equations(circuit, topology));
    equations.extend(voltage_source_constraints(circuit));
    equations
}

fn regular_node_equations(circuit: &Circuit, topology: &Topology) -> Vec<Equation> {
    let reference = circuit.reference();
    let mut equations = Vec::new();

    for &node in &topology.regular_nodes {
        let mut terms = Vec::new();
        for (component, neighbor) in circuit.components_incident_to(node) {
            match component.kind {
                // handled by constraint equations
                ComponentKind::VoltageSource => continue,
                ComponentKind::Resistor => {
                    terms.push(resistor_term(component, node, neighbor, reference));
                }
                ComponentKind::CurrentSource => {
                    if let Some(term) = current_source_term(component, node) {
                        terms.push(term);
                    }
                }
            }
        }

        if !terms.is_empty() {
            equations.push(Equation {
                kind: EquationKind::Kcl { node },
                latex: join_terms(&terms),
            });
        }
    }

    equations
}

fn ungrounded_supernode_equations(circuit: &Circuit, topology: &Topology) -> Vec<Equation> {
    let reference = circuit.reference();
    let mut equations = Vec::new();

    for supernode in &topology.ungrounded_supernodes {
        let mut terms = Vec::new();

        // Sum currents leaving the supernode boundary: sources inside are
        // skipped, components whose other endpoint is inside are internal.
        for &node in supernode {
            for (component, neighbor) in circuit.components_incident_to(node) {
                if component.kind == ComponentKind::VoltageSource || supernode.contains(&neighbor)
                {
                    continue;
                }
                match component.kind {
                    ComponentKind::Resistor => {
                        terms.push(resistor_term(component, node, neighbor, reference));
                    }
                    ComponentKind::CurrentSource => {
                        if let Some(term) = current_source_term(component, node) {
                            terms.push(term);
                        }
                    }
                    ComponentKind::VoltageSource => {}
                }
            }
        }

        if !terms.is_empty() {
            equations.push(Equation {
                kind: EquationKind::SupernodeKcl {
                    nodes: supernode.iter().copied().collect(),
                },
                latex: join_terms(&terms),
            });
        }
    }

    equations
}

fn voltage_source_constraints(circuit: &Circuit) -> Vec<Equation> {
    let reference = circuit.reference();

    circuit
        .voltage_sources()
        .into_iter()
        .map(|vs| {
            let latex = if vs.node1 == reference {
                format!("V_{{{}}} = {:.1}", vs.node2, -vs.value)
            } else if vs.node2 == reference {
                format!("V_{{{}}} = {:.1}", vs.node1, vs.value)
            } else {
                format!("V_{{{}}} - V_{{{}}} = {:.1}", vs.node1, vs.node2, vs.value)
            };
            Equation {
                kind: EquationKind::Constraint {
                    node1: vs.node1,
                    node2: vs.node2,
                    value: vs.value,
                },
                latex,
            }
        })
        .collect()
}

/// Current through a resistor leaving `node` toward `neighbor`:
/// (V(node) − V(neighbor)) / R, with the neighbor term dropped at the
/// reference.
fn resistor_term(resistor: &Component, node: NodeId, neighbor: NodeId, reference: NodeId) -> String {
    if neighbor == reference {
        format!("\\frac{{V_{{{}}}}}{{{:.1}}}", node, resistor.value)
    } else {
        format!(
            "\\frac{{V_{{{}}} - V_{{{}}}}}{{{:.1}}}",
            node, neighbor, resistor.value
        )
    }
}

/// Current-source contribution at `node`: positive when the source current
/// leaves the node (node == node1), negative when it enters.
fn current_source_term(source: &Component, node: NodeId) -> Option<String> {
    if source.node1 == node {
        Some(format!("{:.1}", source.value))
    } else if source.node2 == node {
        Some(format!("(-{:.1})", source.value))
    } else {
        None
    }
}

fn join_terms(terms: &[String]) -> String {
    terms.join(" + ").replace("+ -", "- ") + " = 0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Component;

    fn divider() -> Circuit {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::voltage_source(12.0, 1, 0))
            .unwrap();
        circuit
            .add_component(Component::resistor(1000.0, 1, 2))
            .unwrap();
        circuit
            .add_component(Component::resistor(2000.0, 2, 0))
            .unwrap();
        circuit
    }

    #[test]
    fn test_divider_equations() {
        let circuit = divider();
        let topology = Topology::analyze(&circuit);
        let equations = build_equations(&circuit, &topology);

        // Node 1 sits in the grounded supernode {0,1}: constraint only.
        assert_eq!(equations.len(), 2);
        assert_eq!(equations[0].kind, EquationKind::Kcl { node: 2 });
        assert_eq!(
            equations[0].latex,
            "\\frac{V_{2} - V_{1}}{1000.0} + \\frac{V_{2}}{2000.0} = 0"
        );
        assert_eq!(equations[0].kind.tag(), "kcl");

        assert_eq!(equations[1].latex, "V_{1} = 12.0");
        assert_eq!(equations[1].kind.tag(), "constraint");
    }

    #[test]
    fn test_constraint_forms() {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::voltage_source(9.0, 1, 0))
            .unwrap();
        circuit
            .add_component(Component::voltage_source(3.0, 0, 2))
            .unwrap();
        circuit
            .add_component(Component::voltage_source(4.0, 3, 4))
            .unwrap();
        circuit
            .add_component(Component::resistor(10.0, 1, 3))
            .unwrap();
        circuit
            .add_component(Component::resistor(10.0, 2, 4))
            .unwrap();

        let topology = Topology::analyze(&circuit);
        let equations = build_equations(&circuit, &topology);

        let constraints: Vec<&str> = equations
            .iter()
            .filter(|e| e.kind.tag() == "constraint")
            .map(|e| e.latex.as_str())
            .collect();
        assert_eq!(
            constraints,
            vec!["V_{1} = 9.0", "V_{2} = -3.0", "V_{3} - V_{4} = 4.0"]
        );
    }

    #[test]
    fn test_current_source_signs() {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::current_source(0.5, 1, 2))
            .unwrap();
        circuit
            .add_component(Component::resistor(100.0, 1, 0))
            .unwrap();
        circuit
            .add_component(Component::resistor(100.0, 2, 0))
            .unwrap();

        let topology = Topology::analyze(&circuit);
        let equations = build_equations(&circuit, &topology);

        assert_eq!(equations.len(), 2);
        // current leaves node 1 (positive) and enters node 2 (negative);
        // terms follow component insertion order
        assert_eq!(equations[0].latex, "0.5 + \\frac{V_{1}}{100.0} = 0");
        assert_eq!(equations[1].latex, "(-0.5) + \\frac{V_{2}}{100.0} = 0");
    }

    #[test]
    fn test_ungrounded_supernode_boundary_only() {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::voltage_source(250.0, 1, 0))
            .unwrap();
        circuit
            .add_component(Component::voltage_source(4.0, 4, 2))
            .unwrap();
        circuit
            .add_component(Component::resistor(50.0, 1, 3))
            .unwrap();
        circuit
            .add_component(Component::resistor(10.0, 3, 2))
            .unwrap();
        circuit
            .add_component(Component::resistor(10.0, 4, 3))
            .unwrap();
        circuit
            .add_component(Component::resistor(40.0, 4, 0))
            .unwrap();
        circuit
            .add_component(Component::current_source(0.2, 2, 0))
            .unwrap();
        circuit
            .add_component(Component::current_source(5.0, 0, 2))
            .unwrap();

        let topology = Topology::analyze(&circuit);
        let equations = build_equations(&circuit, &topology);

        // one regular KCL (node 3), one supernode KCL ({2,4}), two constraints
        assert_eq!(equations.len(), 4);
        assert_eq!(equations[0].kind, EquationKind::Kcl { node: 3 });
        assert_eq!(
            equations[1].kind,
            EquationKind::SupernodeKcl { nodes: vec![2, 4] }
        );
        assert_eq!(
            equations[1].latex,
            "\\frac{V_{2} - V_{3}}{10.0} + 0.2 + (-5.0) + \\frac{V_{4} - V_{3}}{10.0} + \\frac{V_{4}}{40.0} = 0"
        );
        // the grounded supernode {0,1} emits no KCL equation
        assert!(equations
            .iter()
            .all(|e| e.kind != EquationKind::Kcl { node: 1 }));
    }

    #[test]
    fn test_grounded_supernode_emits_no_kcl() {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::voltage_source(10.0, 1, 0))
            .unwrap();
        circuit
            .add_component(Component::resistor(1000.0, 1, 0))
            .unwrap();

        let topology = Topology::analyze(&circuit);
        let equations = build_equations(&circuit, &topology);

        assert_eq!(equations.len(), 1);
        assert_eq!(equations[0].kind.tag(), "constraint");
        assert_eq!(equations[0].latex, "V_{1} = 10.0");
    }
}
