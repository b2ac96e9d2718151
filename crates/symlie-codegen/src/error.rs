//! Error types for code generation.

use symlie_core::error::SymbolicError;
use thiserror::Error;

/// Errors raised while validating, rendering or writing a generated function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    /// The target language cannot express a node of the output graph.
    #[error("{language} backend cannot emit {expression}")]
    UnsupportedExpression {
        /// Backend that rejected the expression
        language: String,
        /// The offending expression or construct
        expression: String,
    },

    /// A generated identifier is invalid, reserved or already taken.
    #[error("Name collision on `{name}`: {reason}")]
    NameCollision {
        /// The identifier
        name: String,
        /// Why it cannot be used
        reason: String,
    },

    /// An output depends on a symbol that is not part of the inputs.
    #[error("Output depends on `{name}`, which is not an input storage symbol")]
    UnboundSymbol {
        /// Name of the free symbol
        name: String,
    },

    /// Inconsistent codegen request.
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the problem
        reason: String,
    },

    /// Filesystem failure while staging or moving generated files.
    #[error("I/O error: {message}")]
    Io {
        /// The rendered `std::io::Error`
        message: String,
    },

    /// Failure inside the symbolic engine, e.g. while differentiating.
    #[error(transparent)]
    Symbolic(#[from] SymbolicError),
}

impl CodegenError {
    /// Create an UnsupportedExpression error.
    pub fn unsupported<S1: Into<String>, S2: Into<String>>(language: S1, expression: S2) -> Self {
        Self::UnsupportedExpression {
            language: language.into(),
            expression: expression.into(),
        }
    }

    /// Create a NameCollision error.
    pub fn name_collision<S1: Into<String>, S2: Into<String>>(name: S1, reason: S2) -> Self {
        Self::NameCollision {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnboundSymbol error.
    pub fn unbound_symbol<S: Into<String>>(name: S) -> Self {
        Self::UnboundSymbol { name: name.into() }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S: Into<String>>(reason: S) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for CodegenError {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

/// Result type for code generation.
pub type CodegenResult<T> = std::result::Result<T, CodegenError>;
