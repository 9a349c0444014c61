use thiserror::Error;

use crate::circuit::{ComponentId, NodeId};

/// Result type alias using [`CircuitError`].
pub type Result<T> = std::result::Result<T, CircuitError>;

/// Unified error type for netlist ingest, circuit modeling, and the
/// numerical solve.
#[derive(Error, Debug)]
pub enum CircuitError {
    // ============ Input Errors ============
    /// Request body has the wrong structure (missing or non-list components)
    #[error("invalid input: {message}")]
    InvalidShape { message: String },

    /// A component record is missing a required field
    #[error("component at index {index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    /// Component type tag not in the synonym table
    #[error("unknown component type '{type_tag}' at index {index}. Supported: RESISTOR, R, VOLTAGE SOURCE, VS, VOLTAGE, CURRENT SOURCE, CS, CURRENT")]
    UnknownType { index: usize, type_tag: String },

    /// A field holds a value that cannot be interpreted
    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    /// Both terminals of a component reference the same node
    #[error("component connects node {node} to itself")]
    SelfLoop { node: NodeId },

    /// Resistance must be strictly positive; shorts are node merges upstream
    #[error("resistor must have positive resistance, got {value}")]
    NonPositiveResistance { value: f64 },

    // ============ Modeling Errors ============
    /// Component id already present in the circuit
    #[error("duplicate component id {id}")]
    DuplicateComponentId { id: ComponentId },

    // ============ Numerical Errors ============
    /// The MNA system could not be formed
    #[error("cannot assemble MNA system: {message}")]
    Assembly { message: String },

    /// The MNA matrix has no unique solution (floating subgraph,
    /// short-circuited source, conflicting parallel sources)
    #[error("singular matrix: the circuit has no unique DC solution")]
    SingularMatrix,

    /// The solve produced non-finite values
    #[error("solution contains non-finite values")]
    NonFiniteResult,

    // ============ I/O Errors ============
    /// Error reading or writing result files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error serializing results to JSON
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Error writing CSV output
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),
}

impl CircuitError {
    /// Create an invalid-shape error
    pub fn shape(message: impl Into<String>) -> Self {
        Self::InvalidShape {
            message: message.into(),
        }
    }

    /// Create an invalid-value error
    pub fn value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }

    /// Create an assembly error
    pub fn assembly(message: impl Into<String>) -> Self {
        Self::Assembly {
            message: message.into(),
        }
    }

    /// True for errors caused by the request (client status code semantics),
    /// false for solver-side failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidShape { .. }
                | Self::MissingField { .. }
                | Self::UnknownType { .. }
                | Self::InvalidValue { .. }
                | Self::SelfLoop { .. }
                | Self::NonPositiveResistance { .. }
                | Self::DuplicateComponentId { .. }
        )
    }

    /// Hint attached to structured solver failures.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::SingularMatrix | Self::Assembly { .. } | Self::NonFiniteResult => {
                Some("Check circuit connectivity and component values")
            }
            _ => None,
        }
    }
}
