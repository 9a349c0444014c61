use std::collections::BTreeMap;
use std::fs::File;

use log::{debug, info};
use serde::Serialize;

use crate::analysis::{build_analysis, Analysis};
use crate::circuit::{Circuit, ComponentKind, NodeId};
use crate::cli::OutputFormat;
use crate::equations::build_equations;
use crate::error::{CircuitError, Result};
use crate::mna::MnaSystem;
use crate::solver::LinearSolver;
use crate::topology::Topology;

/// Per-component solved quantities.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentResult {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: f64,
    pub node1: NodeId,
    pub node2: NodeId,
    /// V(node1) − V(node2)
    pub voltage: f64,
    pub current: f64,
    /// Positive absorbs, negative supplies
    pub power: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    pub residual: Vec<f64>,
    pub max_error: f64,
}

/// Raw matrix data backing the solution, for display and verification.
#[derive(Debug, Clone, Serialize)]
pub struct MatrixReport {
    pub conductance_matrix: Vec<Vec<f64>>,
    pub current_vector: Vec<f64>,
    pub voltage_solution: Vec<f64>,
    pub matrix_equation: &'static str,
    pub solution_method: &'static str,
    pub steps: Vec<&'static str>,
    pub verification: Verification,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolutionSummary {
    pub total_components: usize,
    pub solved_nodes: usize,
    pub power_balance: bool,
}

/// Numerical solution of a circuit.
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub status: &'static str,
    /// Node → volts, reference included at exactly 0
    pub voltages: BTreeMap<NodeId, f64>,
    pub components: Vec<ComponentResult>,
    pub total_power: f64,
    pub matrix_solution: MatrixReport,
    pub summary: SolutionSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitInfo {
    pub total_components: usize,
    pub total_nodes: usize,
    pub non_reference_nodes: Vec<NodeId>,
    pub reference_node: NodeId,
    pub supernodes: Vec<Vec<NodeId>>,
}

/// Full response envelope: derivation, numbers, and topology summary.
#[derive(Debug, Clone, Serialize)]
pub struct SolveResponse {
    pub success: bool,
    pub analysis: Analysis,
    pub solution: Solution,
    pub circuit_info: CircuitInfo,
}

/// Failure envelope mirroring the success shape.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ErrorResponse {
    pub fn from_error(error: &CircuitError) -> Self {
        ErrorResponse {
            success: false,
            error: error.to_string(),
            suggestion: error.suggestion().map(str::to_string),
        }
    }
}

/// Analyze and solve a circuit: topology, symbolic derivation, numerical
/// solution, and the packaged response. Re-entrant; the circuit is not
/// mutated.
pub fn solve_circuit(circuit: &Circuit) -> Result<SolveResponse> {
    info!(
        "solving circuit: {} nodes, {} components",
        circuit.node_count(),
        circuit.component_count()
    );

    let topology = Topology::analyze(circuit);
    debug!(
        "topology: {} supernodes, {} regular nodes",
        topology.supernodes.len(),
        topology.regular_nodes.len()
    );

    let equations = build_equations(circuit, &topology);
    let solution = solve_numeric(circuit)?;
    let analysis = build_analysis(circuit, &topology, &equations);

    let circuit_info = CircuitInfo {
        total_components: circuit.component_count(),
        total_nodes: circuit.node_count(),
        non_reference_nodes: circuit.non_reference_nodes(),
        reference_node: circuit.reference(),
        supernodes: topology
            .supernodes
            .iter()
            .map(|s| s.iter().copied().collect())
            .collect(),
    };

    Ok(SolveResponse {
        success: true,
        analysis,
        solution,
        circuit_info,
    })
}

/// Numerical pipeline only: assemble, solve, back-substitute.
pub fn solve_numeric(circuit: &Circuit) -> Result<Solution> {
    let mut system = MnaSystem::new(circuit)?;
    system.assemble(circuit)?;

    let solver = LinearSolver::new();
    let (solution, report) = solver.solve(&system.matrix, &system.rhs)?;
    system.set_solution(solution)?;
    debug!("solve complete, max residual {:.3e}", report.max_residual);

    package_solution(circuit, &system)
}

fn package_solution(circuit: &Circuit, system: &MnaSystem) -> Result<Solution> {
    // voltages for every node; the reference is pinned to exactly zero
    let mut voltages: BTreeMap<NodeId, f64> = BTreeMap::new();
    voltages.insert(circuit.reference(), 0.0);
    for &node in system.node_order() {
        voltages.insert(node, system.node_voltage(node));
    }

    let mut components = Vec::with_capacity(circuit.component_count());
    let mut total_power = 0.0;
    let mut max_voltage: f64 = 0.0;
    let mut max_current: f64 = 0.0;

    for component in circuit.components() {
        let v1 = voltages.get(&component.node1).copied().unwrap_or(0.0);
        let v2 = voltages.get(&component.node2).copied().unwrap_or(0.0);
        let voltage = v1 - v2;

        let current = match component.kind {
            ComponentKind::Resistor => voltage / component.value,
            ComponentKind::CurrentSource => component.value,
            ComponentKind::VoltageSource => {
                let k = system.source_index_of(&component.id).ok_or_else(|| {
                    CircuitError::assembly(format!(
                        "voltage source {} missing from branch-current index",
                        component.id
                    ))
                })?;
                system.source_current(k)
            }
        };

        // keep the response well formed even if an intermediate degenerated
        let current = clamp_finite(current);
        let power = clamp_finite(voltage * current);

        max_voltage = max_voltage.max(voltage.abs());
        max_current = max_current.max(current.abs());
        total_power += power;

        components.push(ComponentResult {
            id: component.id.to_string(),
            kind: component.kind.display_name(),
            value: component.value,
            node1: component.node1,
            node2: component.node2,
            voltage,
            current,
            power,
            description: power_description(power),
        });
    }

    let residual = system.residual();
    let max_error = system.max_residual();
    let balance_tolerance = 1e-6 * (1.0 + max_voltage * max_current);

    Ok(Solution {
        status: "success",
        summary: SolutionSummary {
            total_components: components.len(),
            solved_nodes: voltages.len(),
            power_balance: total_power.abs() < balance_tolerance,
        },
        matrix_solution: MatrixReport {
            conductance_matrix: (0..system.size)
                .map(|i| (0..system.size).map(|j| system.matrix[(i, j)]).collect())
                .collect(),
            current_vector: system.rhs.iter().copied().collect(),
            voltage_solution: system.unknowns.iter().copied().collect(),
            matrix_equation: "[G][X] = [Z]",
            solution_method: "Modified Nodal Analysis (MNA)",
            steps: vec![
                "Constructed conductance matrix from resistors",
                "Added current source contributions to source vector",
                "Added voltage source constraints and variables",
                "Solved system using LU decomposition with partial pivoting",
                "Verified solution with residual analysis",
            ],
            verification: Verification {
                residual: residual.iter().copied().collect(),
                max_error,
            },
        },
        voltages,
        components,
        total_power,
    })
}

fn clamp_finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn power_description(power: f64) -> String {
    if power < -1e-12 {
        format!("Supplying {:.6} W", power.abs())
    } else if power > 1e-12 {
        format!("Absorbing {:.6} W", power)
    } else {
        "0 W".to_string()
    }
}

/// Export the response to a file.
pub fn export_results(response: &SolveResponse, filename: &str, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => export_json(response, filename),
        OutputFormat::Csv => export_csv(response, filename),
    }
}

fn export_json(response: &SolveResponse, filename: &str) -> Result<()> {
    let file = File::create(filename)?;
    serde_json::to_writer_pretty(file, response)?;
    info!("results exported to JSON: {}", filename);
    Ok(())
}

/// CSV export of the per-component result table.
fn export_csv(response: &SolveResponse, filename: &str) -> Result<()> {
    let file = File::create(filename)?;
    let mut writer = csv::Writer::from_writer(file);

    writer.write_record([
        "id", "type", "value", "node1", "node2", "voltage", "current", "power",
    ])?;
    for component in &response.solution.components {
        writer.write_record([
            component.id.clone(),
            component.kind.to_string(),
            component.value.to_string(),
            component.node1.to_string(),
            component.node2.to_string(),
            component.voltage.to_string(),
            component.current.to_string(),
            component.power.to_string(),
        ])?;
    }
    writer.flush()?;
    info!("results exported to CSV: {}", filename);
    Ok(())
}

/// Print a human-readable summary to stdout.
pub fn print_summary(response: &SolveResponse) {
    println!("\n=== Circuit Analysis ===");
    println!("{}", response.analysis.overview.summary);

    if !response.circuit_info.supernodes.is_empty() {
        println!("Supernodes: {:?}", response.circuit_info.supernodes);
    }

    println!("\nEquations:");
    for step in &response.analysis.solution_steps {
        println!("  {}: {}", step.title, step.equation);
    }

    println!("\nNode voltages:");
    for (node, voltage) in &response.solution.voltages {
        println!("  V({}): {:.6} V", node, voltage);
    }

    println!("\nComponents:");
    for component in &response.solution.components {
        println!(
            "  {} ({} -> {}): V = {:.6} V, I = {:.6} A, P = {:.6} W  [{}]",
            component.kind,
            component.node1,
            component.node2,
            component.voltage,
            component.current,
            component.power,
            component.description
        );
    }

    println!("\nTotal power: {:.9} W", response.solution.total_power);
    println!(
        "Power balanced: {}",
        response.solution.summary.power_balance
    );
    println!(
        "Max residual: {:.3e}",
        response.solution.matrix_solution.verification.max_error
    );
}
