use std::{error::Error, fmt::Display};

/// Errors that can arise anywhere in the construction or solve protocol of a
/// factor graph.
///
/// A single enum is used here, rather than one error type per concern as the
/// teacher crate's `FGBuilderError`/`MessagePassingError` split does, because
/// the protocol this enum guards (variable/table/factor construction, graph
/// templating, and the solve loop) is all one exception type in the reference
/// implementation this crate follows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GraphError {
    /// A structural mutation (`create_factor`, `add_graph`, ...) was attempted
    /// on a graph that has already been frozen.
    Frozen,

    /// An argument list's length did not match what was expected.
    Arity { expected: usize, got: usize },

    /// An argument variable's alphabet size did not match the template's
    /// corresponding boundary variable.
    DomainMismatch { expected: usize, got: usize },

    /// A vector's length did not match a declared shape (prior length vs.
    /// alphabet size, or table row width vs. factor degree).
    Shape { expected: usize, got: usize },

    /// A combination table row carried a weight that was negative, NaN, or
    /// infinite.
    InvalidWeight { row: usize, weight: f64 },

    /// A prior vector did not sum to 1 within tolerance.
    Normalization { sum: f64 },

    /// A factor inside a template referenced a variable unreachable through
    /// the arg-or-owned mapping during instantiation.
    Reference,

    /// `solve` was invoked with `num_iterations <= 0`.
    Config,

    /// Belief normalization encountered an all-zero sum.
    Degenerate,

    /// An id did not resolve to anything in the registry.
    NotFound,
}

impl Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::Frozen => {
                write!(f, "cannot mutate the topology of a graph that is already frozen")
            }
            GraphError::Arity { expected, got } => write!(
                f,
                "argument list length mismatch: expected {}, got {}",
                expected, got
            ),
            GraphError::DomainMismatch { expected, got } => write!(
                f,
                "argument variable domain length {} does not match template's {}",
                got, expected
            ),
            GraphError::Shape { expected, got } => {
                write!(f, "shape mismatch: expected length {}, got {}", expected, got)
            }
            GraphError::InvalidWeight { row, weight } => write!(
                f,
                "table row {} has a non-finite or negative weight ({})",
                row, weight
            ),
            GraphError::Normalization { sum } => {
                write!(f, "prior does not sum to 1 (got sum {})", sum)
            }
            GraphError::Reference => write!(
                f,
                "factor references a variable not reachable through the template's argument-or-owned mapping"
            ),
            GraphError::Config => write!(f, "num_iterations must be set and greater than 0"),
            GraphError::Degenerate => {
                write!(f, "belief normalization sum is zero (all-zero evidence)")
            }
            GraphError::NotFound => write!(f, "id not found in registry"),
        }
    }
}

impl Error for GraphError {}

/// Result type used throughout the graph construction and solve protocol.
pub type GraphResult<T> = Result<T, GraphError>;
