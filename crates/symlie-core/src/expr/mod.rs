//! Hash-consed symbolic expressions.
//!
//! An [`Expr`] is a cheap handle (one `Arc`) to an immutable node of a shared
//! DAG. Structurally identical expressions are the same allocation, so
//! equality and hashing are O(1) and every pass over the graph can memoize on
//! the handle itself.
//!
//! # Example
//!
//! ```
//! use symlie_core::Expr;
//!
//! let x = Expr::symbol("x");
//! let y = Expr::symbol("y");
//! let e = &x * &y + 2.0 * &x * &y;
//! assert_eq!(e, 3.0 * &x * &y);
//! ```

mod arith;
mod display;
mod node;

pub use node::{live_node_count, BinaryFn, ExprKind, UnaryFn};
pub(crate) use node::intern;

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use node::Node;

/// A node of the symbolic expression graph.
#[derive(Clone)]
pub struct Expr(pub(crate) Arc<Node>);

impl Expr {
    /// Creates a named symbol.
    pub fn symbol(name: impl AsRef<str>) -> Self {
        intern(ExprKind::Symbol(Arc::from(name.as_ref())))
    }

    /// Creates one symbol per whitespace-separated name.
    pub fn symbols(names: &str) -> Vec<Self> {
        names.split_whitespace().map(Self::symbol).collect()
    }

    /// Creates a numeric constant.
    pub fn constant(value: f64) -> Self {
        intern(ExprKind::Constant(value))
    }

    /// The constant 0.
    pub fn zero() -> Self {
        Self::constant(0.0)
    }

    /// The constant 1.
    pub fn one() -> Self {
        Self::constant(1.0)
    }

    /// Creates an uninterpreted function application.
    ///
    /// Opaque nodes can be substituted into and printed, but evaluating,
    /// differentiating through or emitting them is an error.
    pub fn opaque(name: impl AsRef<str>, args: Vec<Expr>) -> Self {
        intern(ExprKind::Opaque(Arc::from(name.as_ref()), args))
    }

    /// The kind of this node.
    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    /// Whether this node is a numeric constant.
    pub fn is_constant(&self) -> bool {
        matches!(self.kind(), ExprKind::Constant(_))
    }

    /// The value of a constant node.
    pub fn as_constant(&self) -> Option<f64> {
        match self.kind() {
            ExprKind::Constant(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this is exactly the constant 0.
    pub fn is_zero(&self) -> bool {
        self.as_constant() == Some(0.0)
    }

    /// Whether this is exactly the constant 1.
    pub fn is_one(&self) -> bool {
        self.as_constant() == Some(1.0)
    }

    /// Whether this node is a symbol.
    pub fn is_symbol(&self) -> bool {
        matches!(self.kind(), ExprKind::Symbol(_))
    }

    /// The name of a symbol node.
    pub fn symbol_name(&self) -> Option<&str> {
        match self.kind() {
            ExprKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind(), ExprKind::Constant(_) | ExprKind::Symbol(_))
    }

    /// The direct children of this node, in canonical order.
    pub fn args(&self) -> Vec<Expr> {
        match self.kind() {
            ExprKind::Constant(_) | ExprKind::Symbol(_) => Vec::new(),
            ExprKind::Add(args) | ExprKind::Mul(args) | ExprKind::Opaque(_, args) => args.clone(),
            ExprKind::Pow(base, exponent) => vec![base.clone(), exponent.clone()],
            ExprKind::Unary(_, arg) => vec![arg.clone()],
            ExprKind::Binary(_, a, b) => vec![a.clone(), b.clone()],
        }
    }

    /// Rebuilds a node of the same kind over new children.
    ///
    /// The result goes through the canonicalizing constructors, so it may
    /// fold into a different kind.
    pub(crate) fn with_args(&self, args: Vec<Expr>) -> Expr {
        match self.kind() {
            ExprKind::Constant(_) | ExprKind::Symbol(_) => self.clone(),
            ExprKind::Add(_) => Expr::add_all(args),
            ExprKind::Mul(_) => Expr::mul_all(args),
            ExprKind::Opaque(name, _) => intern(ExprKind::Opaque(name.clone(), args)),
            ExprKind::Pow(..) | ExprKind::Unary(..) | ExprKind::Binary(..) => {
                let mut it = args.into_iter();
                let a = it.next().unwrap_or_else(Expr::zero);
                let b = it.next().unwrap_or_else(Expr::zero);
                match self.kind() {
                    ExprKind::Pow(..) => a.pow(b),
                    ExprKind::Unary(f, _) => Expr::unary(*f, &a),
                    ExprKind::Binary(f, ..) => Expr::binary(*f, &a, &b),
                    _ => self.clone(),
                }
            }
        }
    }

    /// All symbols this expression depends on, ordered by name.
    pub fn free_symbols(&self) -> BTreeSet<Expr> {
        let mut symbols = BTreeSet::new();
        let mut seen = HashSet::new();
        self.collect_symbols(&mut symbols, &mut seen);
        symbols
    }

    pub(crate) fn collect_symbols(&self, symbols: &mut BTreeSet<Expr>, seen: &mut HashSet<Expr>) {
        if !seen.insert(self.clone()) {
            return;
        }
        if self.is_symbol() {
            symbols.insert(self.clone());
            return;
        }
        for child in self.args() {
            child.collect_symbols(symbols, seen);
        }
    }

    /// Whether `symbol` occurs anywhere in this expression.
    pub fn contains(&self, symbol: &Expr) -> bool {
        fn walk(expr: &Expr, symbol: &Expr, memo: &mut HashMap<Expr, bool>) -> bool {
            if expr == symbol {
                return true;
            }
            if let Some(hit) = memo.get(expr) {
                return *hit;
            }
            let hit = expr.args().iter().any(|child| walk(child, symbol, memo));
            memo.insert(expr.clone(), hit);
            hit
        }
        walk(self, symbol, &mut HashMap::new())
    }

    /// Number of distinct operation nodes in this expression.
    ///
    /// Shared subexpressions are counted once, which is what generated code
    /// pays after common subexpression elimination.
    pub fn count_ops(&self) -> usize {
        count_ops(std::slice::from_ref(self))
    }
}

/// Number of distinct operation nodes across several expressions.
pub fn count_ops(exprs: &[Expr]) -> usize {
    let mut seen = HashSet::new();
    let mut stack: Vec<Expr> = exprs.to_vec();
    let mut count = 0;
    while let Some(expr) = stack.pop() {
        if expr.is_leaf() || !seen.insert(expr.clone()) {
            continue;
        }
        count += match expr.kind() {
            ExprKind::Add(args) | ExprKind::Mul(args) => args.len().saturating_sub(1),
            _ => 1,
        };
        stack.extend(expr.args());
    }
    count
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl PartialOrd for Expr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Expr {
    /// Deterministic total order used to sort sum and product operands.
    ///
    /// Constants come first, then symbols by name, then composite nodes by
    /// structural hash with a structural tie-break.
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            return Ordering::Equal;
        }
        let (a, b) = (self.kind(), other.kind());
        a.rank().cmp(&b.rank()).then_with(|| match (a, b) {
            (ExprKind::Constant(x), ExprKind::Constant(y)) => x.total_cmp(y),
            (ExprKind::Symbol(x), ExprKind::Symbol(y)) => x.cmp(y),
            _ => self
                .0
                .hash
                .cmp(&other.0.hash)
                .then_with(|| self.args().cmp(&other.args())),
        })
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Self::constant(f64::from(value))
    }
}

impl From<&Expr> for Expr {
    fn from(value: &Expr) -> Self {
        value.clone()
    }
}

impl num_traits::Zero for Expr {
    fn zero() -> Self {
        Expr::zero()
    }

    fn is_zero(&self) -> bool {
        Expr::is_zero(self)
    }
}

impl num_traits::One for Expr {
    fn one() -> Self {
        Expr::one()
    }
}
