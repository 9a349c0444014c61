pub mod analysis;
pub mod circuit;
pub mod cli;
pub mod engine;
pub mod equations;
pub mod error;
pub mod mna;
pub mod netlist;
pub mod solver;
pub mod topology;

// Re-export commonly used types
pub use circuit::{Circuit, Component, ComponentKind};
pub use engine::{solve_circuit, ErrorResponse, SolveResponse};
pub use error::{CircuitError, Result};
pub use netlist::{circuit_from_json, circuit_from_str};
pub use topology::Topology;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
