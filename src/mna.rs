use std::collections::HashMap;

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::circuit::{Circuit, ComponentId, NodeId};
use crate::error::{CircuitError, Result};

/// Solver lifecycle: `Ready → Assembled → Solved`. Failures surface as
/// errors and leave the system unusable, there is no retry path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Ready,
    Assembled,
    Solved,
}

/// MNA system representation: [G][X] = [Z].
///
/// The unknown vector X has length N + M: the first N entries are voltages
/// of the non-reference nodes in ascending node order, the next M entries
/// are voltage-source branch currents in insertion order. Terminals at the
/// reference node contribute no row or column.
#[derive(Debug, Clone)]
pub struct MnaSystem {
    /// System matrix G
    pub matrix: DMatrix<f64>,
    /// Source vector Z
    pub rhs: DVector<f64>,
    /// Solution vector X, zero until solved
    pub unknowns: DVector<f64>,
    node_index: HashMap<NodeId, usize>,
    node_order: Vec<NodeId>,
    source_ids: Vec<ComponentId>,
    pub size: usize,
    pub num_nodes: usize,
    pub num_sources: usize,
    status: SolverStatus,
}

impl MnaSystem {
    /// Create an empty MNA system sized for the given circuit.
    pub fn new(circuit: &Circuit) -> Result<Self> {
        let node_order = circuit.non_reference_nodes();
        let num_nodes = node_order.len();
        let source_ids: Vec<ComponentId> =
            circuit.voltage_sources().iter().map(|vs| vs.id).collect();
        let num_sources = source_ids.len();
        let size = num_nodes + num_sources;

        if size == 0 {
            return Err(CircuitError::assembly(
                "circuit has no nodes or voltage sources to analyze",
            ));
        }

        let node_index = node_order
            .iter()
            .enumerate()
            .map(|(i, &node)| (node, i))
            .collect();

        Ok(MnaSystem {
            matrix: DMatrix::zeros(size, size),
            rhs: DVector::zeros(size),
            unknowns: DVector::zeros(size),
            node_index,
            node_order,
            source_ids,
            size,
            num_nodes,
            num_sources,
            status: SolverStatus::Ready,
        })
    }

    /// Assemble G and Z directly from the component model.
    pub fn assemble(&mut self, circuit: &Circuit) -> Result<()> {
        self.matrix.fill(0.0);
        self.rhs.fill(0.0);

        for resistor in circuit.resistors() {
            self.stamp_resistor(resistor.conductance()?, resistor.node1, resistor.node2);
        }
        for source in circuit.current_sources() {
            self.stamp_current_source(source.value, source.node1, source.node2);
        }
        for (k, source) in circuit.voltage_sources().iter().enumerate() {
            self.stamp_voltage_source(k, source.value, source.node1, source.node2);
        }

        debug!(
            "assembled MNA system: {} nodes + {} sources = {} unknowns",
            self.num_nodes, self.num_sources, self.size
        );
        self.status = SolverStatus::Assembled;
        Ok(())
    }

    fn stamp_resistor(&mut self, conductance: f64, node1: NodeId, node2: NodeId) {
        let i = self.node_index.get(&node1).copied();
        let j = self.node_index.get(&node2).copied();

        if let Some(i) = i {
            self.matrix[(i, i)] += conductance;
        }
        if let Some(j) = j {
            self.matrix[(j, j)] += conductance;
        }
        if let (Some(i), Some(j)) = (i, j) {
            self.matrix[(i, j)] -= conductance;
            self.matrix[(j, i)] -= conductance;
        }
    }

    fn stamp_current_source(&mut self, current: f64, node1: NodeId, node2: NodeId) {
        // current leaves node1, enters node2
        if let Some(&i) = self.node_index.get(&node1) {
            self.rhs[i] -= current;
        }
        if let Some(&j) = self.node_index.get(&node2) {
            self.rhs[j] += current;
        }
    }

    fn stamp_voltage_source(&mut self, k: usize, voltage: f64, node1: NodeId, node2: NodeId) {
        let row = self.num_nodes + k;

        // constraint row V(node1) − V(node2) = value, plus the branch
        // current entering the KCL columns
        if let Some(&i) = self.node_index.get(&node1) {
            self.matrix[(row, i)] += 1.0;
            self.matrix[(i, row)] += 1.0;
        }
        if let Some(&j) = self.node_index.get(&node2) {
            self.matrix[(row, j)] -= 1.0;
            self.matrix[(j, row)] -= 1.0;
        }
        self.rhs[row] = voltage;
    }

    /// Install the solution vector.
    pub fn set_solution(&mut self, solution: DVector<f64>) -> Result<()> {
        if self.status != SolverStatus::Assembled {
            return Err(CircuitError::assembly(
                "solution installed before the system was assembled",
            ));
        }
        if solution.len() != self.size {
            return Err(CircuitError::assembly(format!(
                "solution vector size mismatch: expected {}, got {}",
                self.size,
                solution.len()
            )));
        }
        self.unknowns = solution;
        self.status = SolverStatus::Solved;
        Ok(())
    }

    pub fn status(&self) -> SolverStatus {
        self.status
    }

    /// Non-reference nodes in matrix order
    pub fn node_order(&self) -> &[NodeId] {
        &self.node_order
    }

    /// Voltage-source ids in branch-current order
    pub fn source_ids(&self) -> &[ComponentId] {
        &self.source_ids
    }

    /// Voltage at a node; the reference (or any unknown node) reads 0.
    pub fn node_voltage(&self, node: NodeId) -> f64 {
        match self.node_index.get(&node) {
            Some(&i) => self.unknowns[i],
            None => 0.0,
        }
    }

    /// Branch current of the k-th voltage source
    pub fn source_current(&self, k: usize) -> f64 {
        self.unknowns[self.num_nodes + k]
    }

    /// Branch-current index of a voltage source by component id
    pub fn source_index_of(&self, id: &ComponentId) -> Option<usize> {
        self.source_ids.iter().position(|sid| sid == id)
    }

    /// Residual G·X − Z of the current solution
    pub fn residual(&self) -> DVector<f64> {
        &self.matrix * &self.unknowns - &self.rhs
    }

    /// Largest absolute residual entry
    pub fn max_residual(&self) -> f64 {
        self.residual().amax()
    }
}
