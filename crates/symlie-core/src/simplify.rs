//! Best-effort algebraic simplification.
//!
//! A [`Simplifier`] rebuilds an expression bottom-up through the
//! canonicalizing constructors and offers every node to its list of
//! [`RewriteRule`]s. Passes repeat until a fixed point or the pass limit.
//! The result is not guaranteed to be canonical.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use crate::config::{symbolic_config, SymbolicConfig};
use crate::expr::{Expr, ExprKind, UnaryFn};

/// A local rewrite applied to a single node.
pub trait RewriteRule: Send + Sync {
    /// Short identifier used in traces.
    fn name(&self) -> &'static str;

    /// Returns the rewritten node, or `None` if the rule does not apply.
    fn rewrite(&self, expr: &Expr) -> Option<Expr>;
}

/// `c*sin(u)^2 + c*cos(u)^2 -> c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythagoreanIdentity;

impl RewriteRule for PythagoreanIdentity {
    fn name(&self) -> &'static str {
        "pythagorean"
    }

    fn rewrite(&self, expr: &Expr) -> Option<Expr> {
        let ExprKind::Add(terms) = expr.kind() else {
            return None;
        };
        let split: Vec<(f64, Expr)> = terms.iter().map(Expr::split_coefficient).collect();
        for (i, (c, rest)) in split.iter().enumerate() {
            let ExprKind::Pow(base, exponent) = rest.kind() else {
                continue;
            };
            if exponent.as_constant() != Some(2.0) {
                continue;
            }
            let ExprKind::Unary(UnaryFn::Sin, u) = base.kind() else {
                continue;
            };
            let partner = u.cos().squared();
            if let Some(j) = split.iter().position(|(c2, r2)| c2 == c && *r2 == partner) {
                let mut kept: Vec<Expr> = terms
                    .iter()
                    .enumerate()
                    .filter(|(k, _)| *k != i && *k != j)
                    .map(|(_, t)| t.clone())
                    .collect();
                kept.push(Expr::constant(*c));
                return Some(Expr::add_all(kept));
            }
        }
        None
    }
}

/// `exp(log(x)) -> x` and `log(exp(x)) -> x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InverseFunctions;

impl RewriteRule for InverseFunctions {
    fn name(&self) -> &'static str {
        "inverse-functions"
    }

    fn rewrite(&self, expr: &Expr) -> Option<Expr> {
        let ExprKind::Unary(outer, arg) = expr.kind() else {
            return None;
        };
        let ExprKind::Unary(inner, x) = arg.kind() else {
            return None;
        };
        match (outer, inner) {
            (UnaryFn::Exp, UnaryFn::Log) | (UnaryFn::Log, UnaryFn::Exp) => Some(x.clone()),
            _ => None,
        }
    }
}

/// `abs(abs(x)) -> abs(x)` and the same for `sign` and `floor`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Idempotent;

impl RewriteRule for Idempotent {
    fn name(&self) -> &'static str {
        "idempotent"
    }

    fn rewrite(&self, expr: &Expr) -> Option<Expr> {
        let ExprKind::Unary(outer, arg) = expr.kind() else {
            return None;
        };
        match (outer, arg.kind()) {
            (UnaryFn::Abs, ExprKind::Unary(UnaryFn::Abs, _))
            | (UnaryFn::Sign, ExprKind::Unary(UnaryFn::Sign, _))
            | (UnaryFn::Floor, ExprKind::Unary(UnaryFn::Floor, _)) => Some(arg.clone()),
            _ => None,
        }
    }
}

/// `abs(x^n) -> x^n` for even integer `n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsOfEvenPower;

impl RewriteRule for AbsOfEvenPower {
    fn name(&self) -> &'static str {
        "abs-even-power"
    }

    fn rewrite(&self, expr: &Expr) -> Option<Expr> {
        let ExprKind::Unary(UnaryFn::Abs, arg) = expr.kind() else {
            return None;
        };
        let ExprKind::Pow(_, exponent) = arg.kind() else {
            return None;
        };
        let n = exponent.as_constant()?;
        (n.fract() == 0.0 && n % 2.0 == 0.0).then(|| arg.clone())
    }
}

/// Ordered collection of rewrite rules.
pub struct Simplifier {
    rules: Vec<Box<dyn RewriteRule>>,
    max_passes: usize,
}

impl Simplifier {
    /// A simplifier that only re-canonicalizes.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            max_passes: 4,
        }
    }

    /// The built-in rule set.
    pub fn standard() -> Self {
        Self::new()
            .with_rule(PythagoreanIdentity)
            .with_rule(InverseFunctions)
            .with_rule(Idempotent)
            .with_rule(AbsOfEvenPower)
    }

    /// The built-in rule set with the pass limit from `config`.
    pub fn from_config(config: &SymbolicConfig) -> Self {
        Self::standard().max_passes(config.max_simplify_passes)
    }

    /// Appends a rule.
    pub fn with_rule(mut self, rule: impl RewriteRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Sets the pass limit.
    pub fn max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes.max(1);
        self
    }

    /// Names of the registered rules, in application order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Simplifies one expression.
    pub fn simplify(&self, expr: &Expr) -> Expr {
        let mut current = expr.clone();
        for pass in 0..self.max_passes {
            let mut memo = HashMap::new();
            let next = self.rewrite_node(&current, &mut memo);
            if next == current {
                trace!(pass, "simplifier reached a fixed point");
                break;
            }
            current = next;
        }
        current
    }

    fn rewrite_node(&self, expr: &Expr, memo: &mut HashMap<Expr, Expr>) -> Expr {
        if expr.is_leaf() {
            return expr.clone();
        }
        if let Some(done) = memo.get(expr) {
            return done.clone();
        }
        let args: Vec<Expr> = expr
            .args()
            .iter()
            .map(|a| self.rewrite_node(a, memo))
            .collect();
        let mut out = expr.with_args(args);
        for rule in &self.rules {
            if let Some(rewritten) = rule.rewrite(&out) {
                trace!(rule = rule.name(), "rewrite applied");
                out = rewritten;
            }
        }
        memo.insert(expr.clone(), out.clone());
        out
    }
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::from_config(symbolic_config())
    }
}

impl fmt::Debug for Simplifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simplifier")
            .field("rules", &self.rule_names())
            .field("max_passes", &self.max_passes)
            .finish()
    }
}

impl Expr {
    /// Simplifies with the default rule set.
    pub fn simplify(&self) -> Expr {
        Simplifier::default().simplify(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pythagorean() {
        let x = Expr::symbol("x");
        let y = Expr::symbol("y");
        let e = 2.0 * x.sin().squared() + 2.0 * x.cos().squared() + &y;
        assert_eq!(e.simplify(), &y + 2.0);

        let unrelated = x.sin().squared() + y.cos().squared();
        assert_eq!(unrelated.simplify(), unrelated);
    }

    #[test]
    fn test_nested_rules() {
        let x = Expr::symbol("x");
        assert_eq!(x.log().exp().simplify(), x);
        assert_eq!(x.exp().log().simplify(), x);
        assert_eq!(x.abs().abs().simplify(), x.abs());
        assert_eq!(x.sign().sign().simplify(), x.sign());
        assert_eq!(x.squared().abs().simplify(), x.squared());
        // Rules compose across levels.
        let y = Expr::symbol("y");
        let e = (x.sin().squared() + x.cos().squared() + &y).exp().log();
        assert_eq!(e.simplify(), &y + 1.0);
    }

    #[test]
    fn test_custom_rule() {
        struct DropTan;
        impl RewriteRule for DropTan {
            fn name(&self) -> &'static str {
                "drop-tan"
            }
            fn rewrite(&self, expr: &Expr) -> Option<Expr> {
                match expr.kind() {
                    ExprKind::Unary(UnaryFn::Tan, u) => Some(u.sin() / u.cos()),
                    _ => None,
                }
            }
        }
        let x = Expr::symbol("x");
        let s = Simplifier::new().with_rule(DropTan);
        assert_eq!(s.rule_names(), vec!["drop-tan"]);
        assert_eq!(s.simplify(&x.tan()), x.sin() / x.cos());
    }
}
