//! Error types for phase stability analysis.
//!
//! Missing data inside a dataset (an element without a reference, a point
//! outside the hull footprint) is reported as `None` by the numeric
//! functions. The variants below are reserved for caller-contract violations,
//! degenerate geometry at the quickhull level and configuration IO.

use thiserror::Error;

/// Errors that can occur while building or querying phase hulls.
#[derive(Debug, Error)]
pub enum PhaseHullError {
    /// The reference set handed to a hull entry point is empty.
    #[error("references cannot be empty")]
    EmptyReferences,

    /// An entry uses elements that the references do not cover.
    #[error("entry {entry} contains elements not present in reference system: {missing:?}")]
    ElementsNotInReferenceSystem {
        /// Identifier (or positional label) of the offending entry
        entry: String,
        /// Elements without a counterpart in the references
        missing: Vec<String>,
    },

    /// Only unary through quaternary systems have a hull specialization.
    #[error("unsupported arity {arity}: only 1 to 4 element systems are supported")]
    UnsupportedArity {
        /// Number of elements in the requested system
        arity: usize,
    },

    /// Composition coordinates do not match the hull dimensionality.
    #[error("composition dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected number of coordinates
        expected: usize,
        /// Number of coordinates provided
        got: usize,
    },

    /// Too few distinct points to span a full-dimensional simplex.
    #[error("not enough points to form a hull (minimum {required} required, got {got})")]
    InsufficientPoints {
        /// Minimum number of unique points
        required: usize,
        /// Number of unique points after deduplication
        got: usize,
    },

    /// All points lie in a lower-dimensional affine subspace.
    #[error("points are coplanar or otherwise degenerate")]
    DegenerateConfiguration,

    /// Quickhull did not terminate within the configured iteration budget.
    #[error("maximum iterations exceeded ({0})")]
    MaxIterationsExceeded(usize),

    /// IO error while reading or writing configuration or geometry.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration or entry data could not be parsed.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Configuration or geometry could not be serialized.
    #[error("serialize error: {0}")]
    SerializeError(String),

    /// File extension is neither `.json` nor `.toml`.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// A specialized `Result` type for phase hull operations.
pub type Result<T> = std::result::Result<T, PhaseHullError>;

impl PhaseHullError {
    /// Returns `true` if the error comes from an invalid reference set.
    pub fn is_reference_error(&self) -> bool {
        matches!(
            self,
            PhaseHullError::EmptyReferences | PhaseHullError::ElementsNotInReferenceSystem { .. }
        )
    }

    /// Returns `true` if the error comes from the hull geometry itself.
    ///
    /// The hull model turns these into an empty lower hull instead of
    /// surfacing them to callers.
    pub fn is_geometry_error(&self) -> bool {
        matches!(
            self,
            PhaseHullError::InsufficientPoints { .. }
                | PhaseHullError::DegenerateConfiguration
                | PhaseHullError::MaxIterationsExceeded(_)
        )
    }

    /// Returns `true` if the error comes from configuration or entry IO.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            PhaseHullError::Io(_)
                | PhaseHullError::ParseError(_)
                | PhaseHullError::SerializeError(_)
                | PhaseHullError::UnsupportedFormat(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PhaseHullError::ElementsNotInReferenceSystem {
            entry: "mp-1".to_string(),
            missing: vec!["C".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "entry mp-1 contains elements not present in reference system: [\"C\"]"
        );
        assert_eq!(
            PhaseHullError::EmptyReferences.to_string(),
            "references cannot be empty"
        );
    }

    #[test]
    fn test_categories() {
        assert!(PhaseHullError::EmptyReferences.is_reference_error());
        assert!(!PhaseHullError::EmptyReferences.is_geometry_error());
        assert!(PhaseHullError::DegenerateConfiguration.is_geometry_error());
        assert!(
            PhaseHullError::InsufficientPoints {
                required: 4,
                got: 3
            }
            .is_geometry_error()
        );
        assert!(PhaseHullError::ParseError("bad".into()).is_io_error());
        assert!(!PhaseHullError::UnsupportedArity { arity: 5 }.is_io_error());
    }
}
