//! Core symbolic engine for geometric residual compilation.
//!
//! This crate provides the hash-consed expression graph and everything that
//! operates directly on it: numeric evaluation, substitution, symbolic
//! differentiation, simplification and common subexpression elimination. It
//! also defines the capability traits implemented by manifold-valued types
//! and the epsilon conventions used to keep generated code finite at
//! singular points.
//!
//! # Modules
//!
//! - [`expr`]: The `Expr` node, canonicalizing construction and printing
//! - [`eval`]: Numeric evaluation against symbol bindings
//! - [`subs`]: Symbol substitution
//! - [`diff`]: Symbolic derivatives
//! - [`simplify`]: Pluggable rewrite-rule simplifier
//! - [`cse`]: Common subexpression elimination
//! - [`ops`]: `StorageOps`, `GroupOps` and `LieGroupOps`
//! - [`aggregate`]: Those traits for `Vec<T>` and pairs
//! - [`epsilon`]: Singularity-safe primitives and continuity checks
//! - [`scope`]: Explicit name scoping for symbol creation
//! - [`types`]: Symbolic matrix alias and dense helpers
//! - [`config`]: Epsilon policy and engine defaults
//! - [`error`]: Error types

pub mod aggregate;
pub mod config;
pub mod cse;
pub mod diff;
pub mod epsilon;
pub mod error;
pub mod eval;
pub mod expr;
pub mod ops;
pub mod scope;
pub mod simplify;
pub mod subs;
pub mod types;

// Re-export commonly used items at the crate root
pub use error::{Result, SymbolicError};
pub use eval::Bindings;
pub use expr::Expr;

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use symlie_core::prelude::*;
///
/// let scope = NameScope::new();
/// let x = scope.symbol("x");
/// let f = sinc(&x, &Expr::symbol("epsilon"));
/// assert!(f.diff(&x).is_ok());
/// ```
pub mod prelude {
    pub use crate::config::{symbolic_config, EpsilonMode, SymbolicConfig, SymbolicConfigBuilder};
    pub use crate::cse::{cse, CseResult};
    pub use crate::epsilon::{
        add_with_sign, check_continuity, default_epsilon, safe_acos, safe_asin, safe_atan2,
        safe_norm, safe_normalize, sign_no_zero, sinc, ContinuityReport,
    };
    pub use crate::error::{Result, SymbolicError};
    pub use crate::eval::Bindings;
    pub use crate::expr::{BinaryFn, Expr, ExprKind, UnaryFn};
    pub use crate::ops::{GroupOps, LieGroupOps, StorageOps};
    pub use crate::scope::{NameScope, ScopeGuard};
    pub use crate::simplify::{RewriteRule, Simplifier};
    pub use crate::subs::Substitution;
    pub use crate::types::SymMatrix;
}
