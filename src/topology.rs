use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::graph::UnGraph;
use petgraph::unionfind::UnionFind;
use petgraph::visit::{EdgeRef, NodeIndexable};
use serde::Serialize;

use crate::circuit::{Circuit, NodeId};

/// Supernode partition of a circuit.
///
/// A supernode is a connected component of size ≥ 2 in the subgraph whose
/// edges are exactly the voltage-source pairs. Grounded supernodes contain
/// the reference node; their voltages are pinned by the source constraints,
/// so they contribute no KCL equation.
#[derive(Debug, Clone, Serialize)]
pub struct Topology {
    /// All supernodes, sorted by smallest member
    pub supernodes: Vec<BTreeSet<NodeId>>,
    /// Supernodes containing the reference node
    pub grounded_supernodes: Vec<BTreeSet<NodeId>>,
    /// Supernodes not containing the reference node
    pub ungrounded_supernodes: Vec<BTreeSet<NodeId>>,
    /// Non-reference nodes outside every supernode, sorted ascending
    pub regular_nodes: Vec<NodeId>,
    reference: NodeId,
}

impl Topology {
    /// Analyze a circuit: find connected components of the voltage-source
    /// subgraph (edges deduplicated; parallel sources collapse to one edge).
    pub fn analyze(circuit: &Circuit) -> Self {
        let mut graph: UnGraph<NodeId, ()> = UnGraph::new_undirected();
        let mut vertex = HashMap::new();
        for &node in circuit.nodes() {
            vertex.insert(node, graph.add_node(node));
        }

        let mut seen = HashSet::new();
        for vs in circuit.voltage_sources() {
            let key = (vs.node1.min(vs.node2), vs.node1.max(vs.node2));
            if seen.insert(key) {
                graph.add_edge(vertex[&vs.node1], vertex[&vs.node2], ());
            }
        }

        let mut sets = UnionFind::new(graph.node_bound());
        for edge in graph.edge_references() {
            sets.union(
                graph.to_index(edge.source()),
                graph.to_index(edge.target()),
            );
        }

        let mut groups: BTreeMap<usize, BTreeSet<NodeId>> = BTreeMap::new();
        for index in graph.node_indices() {
            groups
                .entry(sets.find(graph.to_index(index)))
                .or_default()
                .insert(graph[index]);
        }

        let mut supernodes: Vec<BTreeSet<NodeId>> = groups
            .into_values()
            .filter(|nodes| nodes.len() > 1)
            .collect();
        supernodes.sort_by_key(|nodes| nodes.iter().next().copied());

        let reference = circuit.reference();
        let grounded_supernodes: Vec<_> = supernodes
            .iter()
            .filter(|nodes| nodes.contains(&reference))
            .cloned()
            .collect();
        let ungrounded_supernodes: Vec<_> = supernodes
            .iter()
            .filter(|nodes| !nodes.contains(&reference))
            .cloned()
            .collect();

        let members: BTreeSet<NodeId> = supernodes.iter().flatten().copied().collect();
        let regular_nodes = circuit
            .non_reference_nodes()
            .into_iter()
            .filter(|node| !members.contains(node))
            .collect();

        Topology {
            supernodes,
            grounded_supernodes,
            ungrounded_supernodes,
            regular_nodes,
            reference,
        }
    }

    /// KCL equations: one per regular node plus one per ungrounded supernode.
    pub fn kcl_equation_count(&self) -> usize {
        self.regular_nodes.len() + self.ungrounded_supernodes.len()
    }

    /// Build the statistics block reported to the presentation layer.
    pub fn summary(&self, circuit: &Circuit) -> AnalysisSummary {
        let non_reference_nodes = circuit.non_reference_nodes();
        let num_voltage_sources = circuit.voltage_sources().len();
        let num_kcl_equations = self.kcl_equation_count();

        AnalysisSummary {
            reference_node: self.reference,
            num_non_reference_nodes: non_reference_nodes.len(),
            non_reference_nodes,
            supernodes: self.supernodes.iter().map(as_vec).collect(),
            grounded_supernodes: self.grounded_supernodes.iter().map(as_vec).collect(),
            ungrounded_supernodes: self.ungrounded_supernodes.iter().map(as_vec).collect(),
            regular_nodes: self.regular_nodes.clone(),
            num_kcl_equations,
            num_constraint_equations: num_voltage_sources,
            num_voltage_sources,
            total_equations: num_kcl_equations + num_voltage_sources,
            conventions: Conventions::default(),
        }
    }
}

fn as_vec(nodes: &BTreeSet<NodeId>) -> Vec<NodeId> {
    nodes.iter().copied().collect()
}

/// Circuit statistics for nodal analysis, shaped for the derivation report.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub reference_node: NodeId,
    pub non_reference_nodes: Vec<NodeId>,
    pub num_non_reference_nodes: usize,
    pub supernodes: Vec<Vec<NodeId>>,
    pub grounded_supernodes: Vec<Vec<NodeId>>,
    pub ungrounded_supernodes: Vec<Vec<NodeId>>,
    pub regular_nodes: Vec<NodeId>,
    pub num_kcl_equations: usize,
    pub num_constraint_equations: usize,
    pub num_voltage_sources: usize,
    pub total_equations: usize,
    pub conventions: Conventions,
}

/// Sign conventions stated alongside the derivation.
#[derive(Debug, Clone, Serialize)]
pub struct Conventions {
    #[serde(rename = "Resistor")]
    pub resistor: &'static str,
    #[serde(rename = "VoltageSource")]
    pub voltage_source: &'static str,
    #[serde(rename = "CurrentSource")]
    pub current_source: &'static str,
}

impl Default for Conventions {
    fn default() -> Self {
        Conventions {
            resistor: "Current flows from node1 to node2.",
            voltage_source: "Voltage at node1 is higher than node2 (V(node1) - V(node2) = value).",
            current_source: "Current (value) flows from node1 to node2.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Component;

    fn supernode_scenario() -> Circuit {
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
        circuit
    }

    #[test]
    fn test_supernode_partition() {
        let circuit = supernode_scenario();
        let topology = Topology::analyze(&circuit);

        let grounded: BTreeSet<NodeId> = [0, 1].into_iter().collect();
        let ungrounded: BTreeSet<NodeId> = [2, 4].into_iter().collect();

        assert_eq!(topology.supernodes, vec![grounded.clone(), ungrounded.clone()]);
        assert_eq!(topology.grounded_supernodes, vec![grounded]);
        assert_eq!(topology.ungrounded_supernodes, vec![ungrounded]);
        assert_eq!(topology.regular_nodes, vec![3]);
    }

    #[test]
    fn test_every_non_reference_node_classified_once() {
        let circuit = supernode_scenario();
        let topology = Topology::analyze(&circuit);

        for node in circuit.non_reference_nodes() {
            let regular = topology.regular_nodes.contains(&node) as usize;
            let grounded = topology
                .grounded_supernodes
                .iter()
                .filter(|s| s.contains(&node))
                .count();
            let ungrounded = topology
                .ungrounded_supernodes
                .iter()
                .filter(|s| s.contains(&node))
                .count();
            assert_eq!(regular + grounded + ungrounded, 1, "node {}", node);
        }
    }

    #[test]
    fn test_equation_count_matches_unknown_node_voltages() {
        // KCL + constraints = non-reference nodes whenever the deduplicated
        // voltage-source subgraph is acyclic.
        let circuit = supernode_scenario();
        let topology = Topology::analyze(&circuit);
        let summary = topology.summary(&circuit);

        assert_eq!(summary.num_kcl_equations, 2);
        assert_eq!(summary.num_constraint_equations, 2);
        assert_eq!(
            summary.total_equations,
            circuit.non_reference_nodes().len()
        );
    }

    #[test]
    fn test_parallel_voltage_sources_deduplicated() {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::voltage_source(5.0, 1, 2))
            .unwrap();
        circuit
            .add_component(Component::voltage_source(5.0, 2, 1))
            .unwrap();
        circuit
            .add_component(Component::resistor(100.0, 1, 0))
            .unwrap();
        circuit
            .add_component(Component::resistor(100.0, 2, 0))
            .unwrap();

        let topology = Topology::analyze(&circuit);
        assert_eq!(topology.supernodes.len(), 1);
        assert_eq!(
            topology.supernodes[0],
            [1, 2].into_iter().collect::<BTreeSet<NodeId>>()
        );
        assert!(topology.grounded_supernodes.is_empty());
    }

    #[test]
    fn test_no_voltage_sources_means_no_supernodes() {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::resistor(100.0, 1, 2))
            .unwrap();
        circuit
            .add_component(Component::current_source(0.1, 2, 0))
            .unwrap();

        let topology = Topology::analyze(&circuit);
        assert!(topology.supernodes.is_empty());
        assert_eq!(topology.regular_nodes, vec![1, 2]);
        assert_eq!(topology.kcl_equation_count(), 2);
    }

    #[test]
    fn test_chained_sources_form_one_supernode() {
        let mut circuit = Circuit::new();
        circuit
            .add_component(Component::voltage_source(1.0, 1, 2))
            .unwrap();
        circuit
            .add_component(Component::voltage_source(2.0, 2, 3))
            .unwrap();
        circuit
            .add_component(Component::resistor(100.0, 1, 0))
            .unwrap();
        circuit
            .add_component(Component::resistor(100.0, 3, 0))
            .unwrap();

        let topology = Topology::analyze(&circuit);
        assert_eq!(topology.supernodes.len(), 1);
        assert_eq!(
            topology.supernodes[0],
            [1, 2, 3].into_iter().collect::<BTreeSet<NodeId>>()
        );
        assert_eq!(topology.regular_nodes, Vec::<NodeId>::new());
    }
}
