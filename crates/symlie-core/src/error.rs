//! Error types for symbolic construction, evaluation and manifold operations.
//!
//! Every failure of the engine is surfaced as a typed [`SymbolicError`]; nothing
//! is silently coerced into NaN or zero.

use thiserror::Error;

/// Errors that can occur while building, transforming or evaluating expressions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SymbolicError {
    /// Malformed construction or substitution.
    ///
    /// Raised at graph-build time, e.g. when substituting or differentiating
    /// with respect to something that is not a symbol.
    #[error("Type error: {reason}")]
    Type {
        /// Description of the mismatch
        reason: String,
    },

    /// A symbol had no numeric binding during evaluation.
    #[error("Unbound symbol during evaluation: {name}")]
    UnboundSymbol {
        /// Name of the unbound symbol
        name: String,
    },

    /// Domain violation during numeric evaluation.
    ///
    /// Negative square roots, division by exact zero, logarithms of
    /// non-positive numbers and non-finite results end up here.
    #[error("Evaluation error: {reason}")]
    Evaluation {
        /// Description of the domain violation
        reason: String,
    },

    /// The expression contains a node without a known derivative.
    #[error("Cannot differentiate {function}")]
    NotDifferentiable {
        /// Name of the offending function
        function: String,
    },

    /// A storage sequence of the wrong length was supplied.
    #[error("Storage dimension mismatch for {datatype}: expected {expected}, got {actual}")]
    StorageDimension {
        /// Type being reconstructed
        datatype: String,
        /// Expected number of scalars
        expected: usize,
        /// Actual number of scalars
        actual: usize,
    },

    /// A tangent vector of the wrong length was supplied.
    #[error("Tangent dimension mismatch for {datatype}: expected {expected}, got {actual}")]
    TangentDimension {
        /// Type being perturbed
        datatype: String,
        /// Expected tangent dimension
        expected: usize,
        /// Actual tangent dimension
        actual: usize,
    },

    /// Shapes of two operands do not agree.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape
        expected: String,
        /// Actual shape
        actual: String,
    },

    /// Invalid key or key path in a container.
    #[error("Key error: {reason}")]
    Key {
        /// Description of the key problem
        reason: String,
    },

    /// Key already present in a container.
    #[error("Duplicate key: {key}")]
    DuplicateKey {
        /// The duplicated key
        key: String,
    },

    /// Method or feature not implemented.
    #[error("Feature not implemented: {feature}")]
    NotImplemented {
        /// Name of the unimplemented feature
        feature: String,
    },
}

impl SymbolicError {
    /// Create a Type error with a custom reason.
    pub fn type_error<S: Into<String>>(reason: S) -> Self {
        Self::Type {
            reason: reason.into(),
        }
    }

    /// Create an UnboundSymbol error.
    pub fn unbound_symbol<S: Into<String>>(name: S) -> Self {
        Self::UnboundSymbol { name: name.into() }
    }

    /// Create an Evaluation error with a custom reason.
    pub fn evaluation<S: Into<String>>(reason: S) -> Self {
        Self::Evaluation {
            reason: reason.into(),
        }
    }

    /// Create a NotDifferentiable error.
    pub fn not_differentiable<S: Into<String>>(function: S) -> Self {
        Self::NotDifferentiable {
            function: function.into(),
        }
    }

    /// Create a StorageDimension error.
    pub fn storage_dimension<S: Into<String>>(datatype: S, expected: usize, actual: usize) -> Self {
        Self::StorageDimension {
            datatype: datatype.into(),
            expected,
            actual,
        }
    }

    /// Create a TangentDimension error.
    pub fn tangent_dimension<S: Into<String>>(datatype: S, expected: usize, actual: usize) -> Self {
        Self::TangentDimension {
            datatype: datatype.into(),
            expected,
            actual,
        }
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a Key error with a custom reason.
    pub fn key<S: Into<String>>(reason: S) -> Self {
        Self::Key {
            reason: reason.into(),
        }
    }

    /// Create a DuplicateKey error.
    pub fn duplicate_key<S: Into<String>>(key: S) -> Self {
        Self::DuplicateKey { key: key.into() }
    }

    /// Create a NotImplemented error for a specific feature.
    pub fn not_implemented<S: Into<String>>(feature: S) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }
}

/// Result type alias for symbolic operations.
pub type Result<T> = std::result::Result<T, SymbolicError>;
