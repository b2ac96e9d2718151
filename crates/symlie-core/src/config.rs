//! Runtime configuration of the symbolic engine.
//!
//! The process-wide default lives behind a lazily initialized global; custom
//! configurations are assembled with [`SymbolicConfigBuilder`] and passed
//! explicitly where they matter.

use once_cell::sync::Lazy;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::expr::Expr;

/// Default numeric epsilon, a few ulps above zero.
pub const DEFAULT_NUMERIC_EPSILON: f64 = 10.0 * f64::EPSILON;

/// Default name of the epsilon symbol in generated functions.
pub const DEFAULT_EPSILON_SYMBOL: &str = "epsilon";

/// How the epsilon fed to singular primitives is produced.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EpsilonMode {
    /// Exact zero: singularities are not guarded
    Zero,
    /// A fixed small number baked into expressions
    Numeric(f64),
    /// A free symbol, typically an input of generated code
    Symbol(String),
}

impl EpsilonMode {
    /// Numeric mode with [`DEFAULT_NUMERIC_EPSILON`].
    pub fn numeric() -> Self {
        Self::Numeric(DEFAULT_NUMERIC_EPSILON)
    }

    /// Symbol mode with [`DEFAULT_EPSILON_SYMBOL`].
    pub fn symbol() -> Self {
        Self::Symbol(DEFAULT_EPSILON_SYMBOL.to_string())
    }

    /// The epsilon expression for this mode.
    pub fn to_expr(&self) -> Expr {
        match self {
            Self::Zero => Expr::zero(),
            Self::Numeric(value) => Expr::constant(*value),
            Self::Symbol(name) => Expr::symbol(name),
        }
    }
}

impl Default for EpsilonMode {
    fn default() -> Self {
        Self::symbol()
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SymbolicConfig {
    /// Epsilon policy for singular primitives.
    pub epsilon: EpsilonMode,
    /// Whether outputs are simplified before emission by default.
    pub simplify: bool,
    /// Upper bound on simplifier passes over one expression.
    pub max_simplify_passes: usize,
}

impl Default for SymbolicConfig {
    fn default() -> Self {
        Self {
            epsilon: EpsilonMode::default(),
            simplify: false,
            max_simplify_passes: 4,
        }
    }
}

impl SymbolicConfig {
    /// Starts a builder from the defaults.
    pub fn builder() -> SymbolicConfigBuilder {
        SymbolicConfigBuilder::new()
    }

    /// The epsilon expression for this configuration.
    pub fn epsilon_expr(&self) -> Expr {
        self.epsilon.to_expr()
    }
}

/// Global default configuration.
pub static SYMBOLIC_CONFIG: Lazy<Arc<SymbolicConfig>> =
    Lazy::new(|| Arc::new(SymbolicConfig::default()));

/// Get the global default configuration.
pub fn symbolic_config() -> &'static SymbolicConfig {
    &SYMBOLIC_CONFIG
}

/// Builder for creating a custom [`SymbolicConfig`].
pub struct SymbolicConfigBuilder {
    config: SymbolicConfig,
}

impl SymbolicConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: SymbolicConfig::default(),
        }
    }

    /// Set the epsilon policy.
    pub fn epsilon(mut self, epsilon: EpsilonMode) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    /// Enable or disable simplification before emission.
    pub fn simplify(mut self, simplify: bool) -> Self {
        self.config.simplify = simplify;
        self
    }

    /// Set the maximum number of simplifier passes.
    pub fn max_simplify_passes(mut self, passes: usize) -> Self {
        self.config.max_simplify_passes = passes.max(1);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> SymbolicConfig {
        self.config
    }
}

impl Default for SymbolicConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
