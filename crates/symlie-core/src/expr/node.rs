//! Node kinds and the process-wide hash-consing interner.
//!
//! Every expression node is stored exactly once. The interner maps a
//! structural hash to weak references of the live nodes with that hash, so
//! dropping the last [`Expr`] handle frees the node and the next lookup prunes
//! the dead entry.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use super::Expr;
use crate::error::{Result, SymbolicError};

/// Elementary functions of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnaryFn {
    /// Sine
    Sin,
    /// Cosine
    Cos,
    /// Tangent
    Tan,
    /// Inverse sine, domain [-1, 1]
    Asin,
    /// Inverse cosine, domain [-1, 1]
    Acos,
    /// Inverse tangent
    Atan,
    /// Hyperbolic sine
    Sinh,
    /// Hyperbolic cosine
    Cosh,
    /// Hyperbolic tangent
    Tanh,
    /// Natural exponential
    Exp,
    /// Natural logarithm, domain (0, inf)
    Log,
    /// Absolute value
    Abs,
    /// Sign with `sign(0) = 0`
    Sign,
    /// Round towards negative infinity
    Floor,
}

impl UnaryFn {
    /// Lower-case function name as printed.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Abs => "abs",
            Self::Sign => "sign",
            Self::Floor => "floor",
        }
    }

    /// Evaluates the function, rejecting arguments outside its real domain.
    pub fn evaluate(self, x: f64) -> Result<f64> {
        let value = match self {
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Asin | Self::Acos if !(-1.0..=1.0).contains(&x) => {
                return Err(SymbolicError::evaluation(format!(
                    "{}({x}) is outside the domain [-1, 1]",
                    self.name()
                )));
            }
            Self::Asin => x.asin(),
            Self::Acos => x.acos(),
            Self::Atan => x.atan(),
            Self::Sinh => x.sinh(),
            Self::Cosh => x.cosh(),
            Self::Tanh => x.tanh(),
            Self::Exp => x.exp(),
            Self::Log if x <= 0.0 => {
                return Err(SymbolicError::evaluation(format!(
                    "log of non-positive number {x}"
                )));
            }
            Self::Log => x.ln(),
            Self::Abs => x.abs(),
            Self::Sign => {
                if x > 0.0 {
                    1.0
                } else if x < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            Self::Floor => x.floor(),
        };
        Ok(value)
    }
}

impl fmt::Display for UnaryFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Elementary functions of two arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryFn {
    /// Two-argument arctangent `atan2(y, x)`
    Atan2,
    /// Minimum
    Min,
    /// Maximum
    Max,
}

impl BinaryFn {
    /// Lower-case function name as printed.
    pub fn name(self) -> &'static str {
        match self {
            Self::Atan2 => "atan2",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Evaluates the function.
    pub fn evaluate(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Atan2 => a.atan2(b),
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }
}

impl fmt::Display for BinaryFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The shape of a single expression node.
///
/// Children are themselves interned, so two kinds are structurally equal
/// exactly when their children are pointer-equal.
#[derive(Debug)]
pub enum ExprKind {
    /// Numeric literal
    Constant(f64),
    /// Named free variable
    Symbol(Arc<str>),
    /// Flattened sum, sorted, at most one constant term (first)
    Add(Vec<Expr>),
    /// Flattened product, sorted, at most one constant coefficient (first)
    Mul(Vec<Expr>),
    /// `base ^ exponent`
    Pow(Expr, Expr),
    /// Elementary function of one argument
    Unary(UnaryFn, Expr),
    /// Elementary function of two arguments
    Binary(BinaryFn, Expr, Expr),
    /// Uninterpreted function, neither differentiable nor emittable
    Opaque(Arc<str>, Vec<Expr>),
}

impl ExprKind {
    /// Ordering rank used by the canonical sort of sum and product operands.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::Constant(_) => 0,
            Self::Symbol(_) => 1,
            Self::Mul(_) => 2,
            Self::Pow(..) => 3,
            Self::Unary(..) => 4,
            Self::Binary(..) => 5,
            Self::Add(_) => 6,
            Self::Opaque(..) => 7,
        }
    }

    fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Constant(a), Self::Constant(b)) => a.to_bits() == b.to_bits(),
            (Self::Symbol(a), Self::Symbol(b)) => a == b,
            (Self::Add(a), Self::Add(b)) | (Self::Mul(a), Self::Mul(b)) => a == b,
            (Self::Pow(b1, e1), Self::Pow(b2, e2)) => b1 == b2 && e1 == e2,
            (Self::Unary(f1, a1), Self::Unary(f2, a2)) => f1 == f2 && a1 == a2,
            (Self::Binary(f1, a1, b1), Self::Binary(f2, a2, b2)) => {
                f1 == f2 && a1 == a2 && b1 == b2
            }
            (Self::Opaque(n1, a1), Self::Opaque(n2, a2)) => n1 == n2 && a1 == a2,
            _ => false,
        }
    }

    fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.rank().hash(&mut hasher);
        match self {
            Self::Constant(v) => v.to_bits().hash(&mut hasher),
            Self::Symbol(name) => name.hash(&mut hasher),
            Self::Add(args) | Self::Mul(args) => args.hash(&mut hasher),
            Self::Pow(base, exponent) => {
                base.hash(&mut hasher);
                exponent.hash(&mut hasher);
            }
            Self::Unary(f, arg) => {
                f.hash(&mut hasher);
                arg.hash(&mut hasher);
            }
            Self::Binary(f, a, b) => {
                f.hash(&mut hasher);
                a.hash(&mut hasher);
                b.hash(&mut hasher);
            }
            Self::Opaque(name, args) => {
                name.hash(&mut hasher);
                args.hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}

/// Interned storage behind an [`Expr`] handle.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) kind: ExprKind,
    pub(crate) hash: u64,
}

impl Drop for Node {
    fn drop(&mut self) {
        INTERNER.remove_if_mut(&self.hash, |_, bucket| {
            bucket.retain(|weak| weak.strong_count() > 0);
            bucket.is_empty()
        });
    }
}

static INTERNER: Lazy<DashMap<u64, Vec<Weak<Node>>>> = Lazy::new(DashMap::new);

/// Returns the unique node for `kind`, allocating it on first sight.
///
/// Callers are responsible for handing in canonical kinds; this function
/// performs no rewriting.
pub(crate) fn intern(kind: ExprKind) -> Expr {
    let kind = match kind {
        // -0.0 and every NaN payload collapse onto a single node.
        ExprKind::Constant(v) if v == 0.0 => ExprKind::Constant(0.0),
        ExprKind::Constant(v) if v.is_nan() => ExprKind::Constant(f64::NAN),
        other => other,
    };
    let hash = kind.structural_hash();

    // Upgraded neighbours are released after the shard guard: dropping the
    // last handle to one runs `Node::drop`, which locks the same shard.
    let mut neighbours = Vec::new();
    let mut bucket = INTERNER.entry(hash).or_default();
    let mut found = None;
    bucket.retain(|weak| match weak.upgrade() {
        Some(node) => {
            if found.is_none() && node.kind.same_shape(&kind) {
                found = Some(node);
            } else {
                neighbours.push(node);
            }
            true
        }
        None => false,
    });
    let node = match found {
        Some(node) => node,
        None => {
            let node = Arc::new(Node { kind, hash });
            bucket.push(Arc::downgrade(&node));
            node
        }
    };
    drop(bucket);
    drop(neighbours);
    Expr(node)
}

/// Number of live interned nodes.
pub fn live_node_count() -> usize {
    INTERNER
        .iter()
        .map(|bucket| bucket.iter().filter(|w| w.strong_count() > 0).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unary_domain() {
        assert!(UnaryFn::Log.evaluate(0.0).is_err());
        assert!(UnaryFn::Acos.evaluate(1.5).is_err());
        assert!(UnaryFn::Asin.evaluate(-1.0).is_ok());
        assert_eq!(UnaryFn::Sign.evaluate(0.0).unwrap(), 0.0);
        assert_eq!(UnaryFn::Sign.evaluate(-3.0).unwrap(), -1.0);
    }

    #[test]
    fn test_interning_collapses_signed_zero() {
        let a = intern(ExprKind::Constant(0.0));
        let b = intern(ExprKind::Constant(-0.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_dead_nodes_are_pruned() {
        let name: Arc<str> = Arc::from("__interner_prune_symbol");
        let first = intern(ExprKind::Symbol(name.clone()));
        let hash = first.0.hash;
        drop(first);
        let again = intern(ExprKind::Symbol(name));
        let bucket = INTERNER.get(&hash).map(|b| b.len()).unwrap_or(0);
        assert_eq!(bucket, 1);
        drop(again);
    }

    #[test]
    fn test_last_drop_removes_bucket() {
        let name: Arc<str> = Arc::from("__interner_bucket_removal");
        let leaf = intern(ExprKind::Symbol(name));
        let parent = intern(ExprKind::Unary(UnaryFn::Sin, leaf.clone()));
        let (leaf_hash, parent_hash) = (leaf.0.hash, parent.0.hash);
        assert!(INTERNER.contains_key(&parent_hash));

        drop(parent);
        assert!(!INTERNER.contains_key(&parent_hash));
        assert!(INTERNER.contains_key(&leaf_hash));
        drop(leaf);
        assert!(!INTERNER.contains_key(&leaf_hash));
    }
}
