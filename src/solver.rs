use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::error::{CircuitError, Result};

/// Solver configuration
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Relative residual above which the system is declared singular
    pub residual_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            residual_tolerance: 1e-6,
        }
    }
}

/// Outcome statistics of a solve
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub residual_norm: f64,
    pub max_residual: f64,
}

/// Direct dense solver for the MNA system, LU with partial pivoting.
pub struct LinearSolver {
    config: SolverConfig,
}

impl LinearSolver {
    pub fn new() -> Self {
        LinearSolver {
            config: SolverConfig::default(),
        }
    }

    pub fn with_config(config: SolverConfig) -> Self {
        LinearSolver { config }
    }

    /// Solve G·X = Z. Fails with `SingularMatrix` when the decomposition
    /// breaks down or the residual shows the system has no reliable unique
    /// solution (floating subgraph, conflicting sources).
    pub fn solve(&self, matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> Result<(DVector<f64>, SolveReport)> {
        if matrix.nrows() != matrix.ncols() {
            return Err(CircuitError::assembly("matrix must be square"));
        }
        if matrix.nrows() != rhs.len() {
            return Err(CircuitError::assembly(
                "matrix and source vector dimensions don't match",
            ));
        }

        let lu = matrix.clone().lu();
        let solution = lu.solve(rhs).ok_or(CircuitError::SingularMatrix)?;

        if !solution.iter().all(|v| v.is_finite()) {
            return Err(CircuitError::NonFiniteResult);
        }

        let residual = matrix * &solution - rhs;
        let max_residual = residual.amax();
        let residual_norm = residual.norm();

        // a near-singular matrix can survive the decomposition; the residual
        // exposes it
        let scale = matrix.amax().max(rhs.amax()).max(1.0);
        if max_residual > self.config.residual_tolerance * scale {
            debug!(
                "residual {:.3e} exceeds tolerance at scale {:.3e}",
                max_residual, scale
            );
            return Err(CircuitError::SingularMatrix);
        }

        Ok((
            solution,
            SolveReport {
                residual_norm,
                max_residual,
            },
        ))
    }
}

impl Default for LinearSolver {
    fn default() -> Self {
        Self::new()
    }
}
