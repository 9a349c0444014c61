//! Structured derivation report: the step-by-step explanation of how the
//! node-voltage method applies to a circuit. Everything here is built from
//! the structured equation tags, never by re-parsing rendered strings.

use serde::Serialize;

use crate::circuit::{Circuit, Component, ComponentKind, NodeId};
use crate::equations::{Equation, EquationKind};
use crate::topology::{Conventions, Topology};

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub overview: Overview,
    #[serde(rename = "circuitStatistics")]
    pub circuit_statistics: CircuitStatistics,
    pub components: Vec<ComponentSummary>,
    #[serde(rename = "analysisMethod")]
    pub analysis_method: AnalysisMethod,
    #[serde(rename = "solutionSteps")]
    pub solution_steps: Vec<SolutionStep>,
    #[serde(rename = "matrixFormulation")]
    pub matrix_formulation: MatrixFormulation,
    #[serde(rename = "nextSteps")]
    pub next_steps: NextSteps,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitStatistics {
    #[serde(rename = "totalNodes")]
    pub total_nodes: usize,
    #[serde(rename = "referenceNode")]
    pub reference_node: NodeId,
    #[serde(rename = "nonReferenceNodes")]
    pub non_reference_nodes: Vec<NodeId>,
    pub supernodes: Vec<Vec<NodeId>>,
    pub components: ComponentCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentCounts {
    pub resistors: usize,
    #[serde(rename = "voltageSources")]
    pub voltage_sources: usize,
    #[serde(rename = "currentSources")]
    pub current_sources: usize,
    pub total: usize,
}

/// One circuit element as presented in the derivation, under its canonical
/// display id (R1, VS1, CS1, ... in sorted (kind, node1, node2) order).
#[derive(Debug, Clone, Serialize)]
pub struct ComponentSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: String,
    pub nodes: String,
    pub description: String,
    #[serde(rename = "currentFlow", skip_serializing_if = "Option::is_none")]
    pub current_flow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMethod {
    pub name: &'static str,
    pub description: &'static str,
    pub steps: Vec<String>,
    pub conventions: Conventions,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolutionStep {
    #[serde(rename = "type")]
    pub step_type: &'static str,
    #[serde(rename = "stepNumber", skip_serializing_if = "Option::is_none")]
    pub step_number: Option<usize>,
    pub title: String,
    pub description: String,
    pub equation: String,
    pub explanation: String,
    #[serde(rename = "keyPoint")]
    pub key_point: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixFormulation {
    pub description: &'static str,
    pub equation: &'static str,
    pub explanation: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct NextSteps {
    pub description: &'static str,
    pub actions: Vec<&'static str>,
}

/// Build the full derivation report.
pub fn build_analysis(circuit: &Circuit, topology: &Topology, equations: &[Equation]) -> Analysis {
    let summary = topology.summary(circuit);

    Analysis {
        overview: Overview {
            title: "Circuit Analysis Solution",
            subtitle: "Step-by-Step Node Voltage Method",
            summary: format!(
                "This circuit has {} nodes and {} components. We'll use Modified Nodal Analysis to solve for {} node voltages and {} voltage source currents.",
                circuit.node_count(),
                circuit.component_count(),
                summary.num_non_reference_nodes,
                summary.num_voltage_sources
            ),
        },
        circuit_statistics: CircuitStatistics {
            total_nodes: circuit.node_count(),
            reference_node: circuit.reference(),
            non_reference_nodes: summary.non_reference_nodes.clone(),
            supernodes: summary.supernodes.clone(),
            components: ComponentCounts {
                resistors: circuit.resistors().len(),
                voltage_sources: circuit.voltage_sources().len(),
                current_sources: circuit.current_sources().len(),
                total: circuit.component_count(),
            },
        },
        components: build_components_list(circuit),
        analysis_method: AnalysisMethod {
            name: "Node Voltage Method (MNA)",
            description: "We analyze the circuit by applying Kirchhoff's Current Law (KCL) at each non-reference node and solving for the node voltages. Voltage sources are handled using Modified Nodal Analysis (MNA).",
            steps: vec![
                format!("Select Node {} as the reference (ground) node", circuit.reference()),
                "Identify all non-reference nodes".to_string(),
                "Find supernodes (nodes connected by voltage sources)".to_string(),
                "Write KCL equations for all regular nodes and ungrounded supernodes".to_string(),
                "Add constraint equations for all voltage sources".to_string(),
                "Solve the resulting system of linear equations".to_string(),
            ],
            conventions: summary.conventions,
        },
        solution_steps: build_solution_steps(equations),
        matrix_formulation: MatrixFormulation {
            description: "The system of equations is represented in matrix form (Modified Nodal Analysis):",
            equation: "[G][X] = [Z]",
            explanation: "Where [G] is the MNA matrix, [X] is the solution vector (containing unknown node voltages and voltage source currents), and [Z] is the source vector.",
        },
        next_steps: NextSteps {
            description: "To complete the analysis:",
            actions: vec![
                "Set up the MNA matrix based on all components",
                "Construct the source vector",
                "Solve the linear system for all unknown voltages and currents",
                "Verify the solution satisfies all KCL/KVL equations",
            ],
        },
    }
}

/// Canonical display ids in deterministic order: components sorted by
/// (kind, node1, node2), numbered per kind.
pub fn canonical_order(circuit: &Circuit) -> Vec<&Component> {
    let mut ordered: Vec<&Component> = circuit.components().iter().collect();
    ordered.sort_by_key(|c| (c.kind.rank(), c.node1, c.node2));
    ordered
}

fn build_components_list(circuit: &Circuit) -> Vec<ComponentSummary> {
    let mut counts = [0usize; 3];
    let mut list = Vec::new();

    for component in canonical_order(circuit) {
        let slot = component.kind.rank() as usize;
        counts[slot] += 1;
        let id = format!("{}{}", component.kind.prefix(), counts[slot]);

        let summary = match component.kind {
            ComponentKind::Resistor => ComponentSummary {
                kind: component.kind.display_name(),
                value: format!("{} Ω", component.value),
                nodes: format!("{} → {}", component.node1, component.node2),
                description: "Obeys Ohm's Law: V = I × R".to_string(),
                current_flow: Some(format!(
                    "Current (I={}) flows from node {} to node {}",
                    id, component.node1, component.node2
                )),
                constraint: None,
                id,
            },
            ComponentKind::VoltageSource => ComponentSummary {
                kind: component.kind.display_name(),
                value: format!("{} V", component.value),
                nodes: format!("{}(+) → {}(-)", component.node1, component.node2),
                description: format!(
                    "Maintains constant voltage: V({}) - V({}) = {}V",
                    component.node1, component.node2, component.value
                ),
                current_flow: None,
                constraint: Some("This source defines a voltage constraint equation."),
                id,
            },
            ComponentKind::CurrentSource => ComponentSummary {
                kind: component.kind.display_name(),
                value: format!("{} A", component.value),
                nodes: format!("{} → {}", component.node1, component.node2),
                description: format!("Provides constant current: I = {}A", component.value),
                current_flow: Some(format!(
                    "Current flows from node {} to node {}",
                    component.node1, component.node2
                )),
                constraint: None,
                id,
            },
        };
        list.push(summary);
    }

    list
}

fn build_solution_steps(equations: &[Equation]) -> Vec<SolutionStep> {
    let mut steps = Vec::new();
    let mut step_number = 0usize;

    for equation in equations {
        let step = match &equation.kind {
            EquationKind::Kcl { node } => {
                step_number += 1;
                SolutionStep {
                    step_type: "kcl",
                    step_number: Some(step_number),
                    title: format!("Step {}: KCL at Node {}", step_number, node),
                    description: format!(
                        "Applying Kirchhoff's Current Law at Node {} - the sum of all currents leaving the node equals zero.",
                        node
                    ),
                    equation: equation.latex.clone(),
                    explanation: format!(
                        "This equation ensures current conservation at Node {}. We sum all currents leaving the node.",
                        node
                    ),
                    key_point: "Convention: Currents leaving the node are positive, currents entering are negative.",
                }
            }
            EquationKind::SupernodeKcl { nodes } => {
                step_number += 1;
                let label = supernode_label(nodes);
                SolutionStep {
                    step_type: "supernode_kcl",
                    step_number: Some(step_number),
                    title: format!("Step {}: KCL for Supernode {}", step_number, label),
                    description: format!(
                        "Applying KCL to the entire supernode {} - the sum of currents leaving the supernode boundary equals zero.",
                        label
                    ),
                    equation: equation.latex.clone(),
                    explanation: "A supernode combines multiple nodes connected by voltage sources. We treat them as a single entity for KCL.".to_string(),
                    key_point: "We only sum currents flowing from a node inside the supernode to a node outside it.",
                }
            }
            EquationKind::Constraint { .. } => SolutionStep {
                step_type: "constraint",
                step_number: None,
                title: "Voltage Source Constraint".to_string(),
                description: "This equation comes from a voltage source in the circuit.".to_string(),
                equation: equation.latex.clone(),
                explanation: "Voltage sources define fixed potential differences between nodes, providing essential constraints for our system.".to_string(),
                key_point: "Each voltage source adds one constraint equation.",
            },
        };
        steps.push(step);
    }

    steps
}

fn supernode_label(nodes: &[NodeId]) -> String {
    let joined: Vec<String> = nodes.iter().map(|n| n.to_string()).collect();
    format!("{{{}}}", joined.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Component;
    use crate::equations::build_equations;

    fn mixed_circuit() -> Circuit {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::current_source(0.2, 2, 0))
            .unwrap();
        circuit
            .add_component(Component::voltage_source(12.0, 1, 0))
            .unwrap();
        circuit
            .add_component(Component::resistor(2000.0, 2, 0))
            .unwrap();
        circuit
            .add_component(Component::resistor(1000.0, 1, 2))
            .unwrap();
        circuit
    }

    #[test]
    fn test_canonical_ids_sorted_by_kind_and_nodes() {
        let circuit = mixed_circuit();
        let list = build_components_list(&circuit);

        let ids: Vec<&str> = list.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["R1", "R2", "VS1", "CS1"]);
        // R1 is the (1,2) resistor, inserted after the (2,0) one
        assert_eq!(list[0].nodes, "1 → 2");
        assert_eq!(list[1].nodes, "2 → 0");
        assert_eq!(list[2].nodes, "1(+) → 0(-)");
    }

    #[test]
    fn test_solution_steps_tagged_and_numbered() {
        let circuit = mixed_circuit();
        let topology = Topology::analyze(&circuit);
        let equations = build_equations(&circuit, &topology);
        let steps = build_solution_steps(&equations);

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step_type, "kcl");
        assert_eq!(steps[0].step_number, Some(1));
        assert!(steps[0].title.contains("Node 2"));
        assert_eq!(steps[1].step_type, "constraint");
        assert_eq!(steps[1].step_number, None);
    }

    #[test]
    fn test_overview_counts() {
        let circuit = mixed_circuit();
        let topology = Topology::analyze(&circuit);
        let equations = build_equations(&circuit, &topology);
        let analysis = build_analysis(&circuit, &topology, &equations);

        assert_eq!(analysis.circuit_statistics.total_nodes, 3);
        assert_eq!(analysis.circuit_statistics.components.total, 4);
        assert_eq!(analysis.circuit_statistics.components.resistors, 2);
        assert!(analysis.overview.summary.contains("3 nodes"));
        assert!(analysis.overview.summary.contains("1 voltage source currents"));
    }
}
