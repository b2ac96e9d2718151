//! Symbolic differentiation.
//!
//! Derivatives are taken with respect to a single symbol and memoized over
//! the shared DAG. Non-smooth functions use subgradient conventions at their
//! kinks: `abs'(0) = sign(0) = 0`, `sign' = floor' = 0`, and `min`/`max`
//! average the two branch derivatives when the arguments tie.

use std::collections::HashMap;

use crate::error::{Result, SymbolicError};
use crate::expr::{BinaryFn, Expr, ExprKind, UnaryFn};

/// Derivative of `f(u)` with respect to `u`.
fn unary_derivative(f: UnaryFn, u: &Expr) -> Expr {
    match f {
        UnaryFn::Sin => u.cos(),
        UnaryFn::Cos => -u.sin(),
        UnaryFn::Tan => 1.0 + u.tan().squared(),
        UnaryFn::Asin => (1.0 - u.squared()).pow(-0.5),
        UnaryFn::Acos => -(1.0 - u.squared()).pow(-0.5),
        UnaryFn::Atan => (1.0 + u.squared()).recip(),
        UnaryFn::Sinh => u.cosh(),
        UnaryFn::Cosh => u.sinh(),
        UnaryFn::Tanh => 1.0 - u.tanh().squared(),
        UnaryFn::Exp => u.exp(),
        UnaryFn::Log => u.recip(),
        UnaryFn::Abs => u.sign(),
        UnaryFn::Sign | UnaryFn::Floor => Expr::zero(),
    }
}

impl Expr {
    /// Derivative with respect to the symbol `var`.
    pub fn diff(&self, var: &Expr) -> Result<Expr> {
        if !var.is_symbol() {
            return Err(SymbolicError::type_error(format!(
                "cannot differentiate with respect to non-symbol {var}"
            )));
        }
        let mut memo = HashMap::new();
        self.diff_memo(var, &mut memo)
    }

    fn diff_memo(&self, var: &Expr, memo: &mut HashMap<Expr, Expr>) -> Result<Expr> {
        if let Some(d) = memo.get(self) {
            return Ok(d.clone());
        }
        let d = match self.kind() {
            ExprKind::Constant(_) => Expr::zero(),
            ExprKind::Symbol(_) => {
                if self == var {
                    Expr::one()
                } else {
                    Expr::zero()
                }
            }
            ExprKind::Add(args) => {
                let mut terms = Vec::with_capacity(args.len());
                for arg in args {
                    terms.push(arg.diff_memo(var, memo)?);
                }
                Expr::add_all(terms)
            }
            ExprKind::Mul(args) => {
                let mut terms = Vec::new();
                for (i, arg) in args.iter().enumerate() {
                    let darg = arg.diff_memo(var, memo)?;
                    if darg.is_zero() {
                        continue;
                    }
                    let mut factors: Vec<Expr> = args
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .map(|(_, a)| a.clone())
                        .collect();
                    factors.push(darg);
                    terms.push(Expr::mul_all(factors));
                }
                Expr::add_all(terms)
            }
            ExprKind::Pow(base, exponent) => {
                let db = base.diff_memo(var, memo)?;
                let de = exponent.diff_memo(var, memo)?;
                match (db.is_zero(), de.is_zero()) {
                    (true, true) => Expr::zero(),
                    (false, true) => exponent * base.pow(exponent - 1.0) * db,
                    (true, false) => self * base.log() * de,
                    (false, false) => self * (de * base.log() + exponent * db / base),
                }
            }
            ExprKind::Unary(f, arg) => {
                let darg = arg.diff_memo(var, memo)?;
                if darg.is_zero() {
                    Expr::zero()
                } else {
                    unary_derivative(*f, arg) * darg
                }
            }
            ExprKind::Binary(f, a, b) => {
                let da = a.diff_memo(var, memo)?;
                let db = b.diff_memo(var, memo)?;
                if da.is_zero() && db.is_zero() {
                    Expr::zero()
                } else {
                    match f {
                        BinaryFn::Atan2 => (b * &da - a * &db) / (a.squared() + b.squared()),
                        BinaryFn::Max => {
                            let s = (a - b).sign();
                            ((1.0 + &s) * da + (1.0 - &s) * db) * 0.5
                        }
                        BinaryFn::Min => {
                            let s = (a - b).sign();
                            ((1.0 - &s) * da + (1.0 + &s) * db) * 0.5
                        }
                    }
                }
            }
            ExprKind::Opaque(name, args) => {
                for arg in args {
                    if !arg.diff_memo(var, memo)?.is_zero() {
                        return Err(SymbolicError::not_differentiable(name.as_ref()));
                    }
                }
                Expr::zero()
            }
        };
        memo.insert(self.clone(), d.clone());
        Ok(d)
    }

    /// Gradient with respect to several symbols.
    pub fn gradient(&self, vars: &[Expr]) -> Result<Vec<Expr>> {
        vars.iter().map(|v| self.diff(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Bindings;
    use approx::assert_relative_eq;

    fn central_difference(e: &Expr, x: &Expr, at: f64) -> f64 {
        let h = 1e-6;
        let name = x.symbol_name().unwrap();
        let plus = e.eval(&Bindings::new().with(name, at + h)).unwrap();
        let minus = e.eval(&Bindings::new().with(name, at - h)).unwrap();
        (plus - minus) / (2.0 * h)
    }

    #[test]
    fn test_polynomial_derivative() {
        let x = Expr::symbol("x");
        let e = 3.0 * x.powi(3) + &x;
        assert_eq!(e.diff(&x).unwrap(), 9.0 * x.powi(2) + 1.0);
    }

    #[test]
    fn test_chain_rule_matches_finite_differences() {
        let x = Expr::symbol("x");
        let cases = vec![
            (x.sin() * x.exp(), 0.4),
            (x.tan(), 0.2),
            (x.asin() + x.acos() * 2.0, 0.3),
            (x.atan() / (1.0 + x.squared()), -0.8),
            (x.sinh() * x.cosh() - x.tanh(), 0.5),
            (x.log() * x.sqrt(), 1.7),
            (x.pow(&x), 1.3),
            (x.atan2(&(2.0 * &x + 1.0)), 0.6),
        ];
        for (e, at) in cases {
            let d = e.diff(&x).unwrap();
            let analytic = d.eval(&Bindings::new().with("x", at)).unwrap();
            assert_relative_eq!(analytic, central_difference(&e, &x, at), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_subgradient_conventions() {
        let x = Expr::symbol("x");
        let zero = Bindings::new().with("x", 0.0);

        let dabs = x.abs().diff(&x).unwrap();
        assert_eq!(dabs.eval(&zero).unwrap(), 0.0);

        assert!(x.sign().diff(&x).unwrap().is_zero());
        assert!(x.floor().diff(&x).unwrap().is_zero());

        // max(x, -x) ties at 0, derivative averages 1 and -1.
        let dmax = x.max_expr(&-&x).diff(&x).unwrap();
        assert_eq!(dmax.eval(&zero).unwrap(), 0.0);
        let dmin = x.min_expr(&Expr::zero()).diff(&x).unwrap();
        assert_eq!(dmin.eval(&zero).unwrap(), 0.5);
        assert_eq!(dmin.eval(&Bindings::new().with("x", -1.0)).unwrap(), 1.0);
        assert_eq!(dmin.eval(&Bindings::new().with("x", 1.0)).unwrap(), 0.0);
    }

    #[test]
    fn test_diff_requires_symbol() {
        let x = Expr::symbol("x");
        let err = x.sin().diff(&(&x * 2.0)).unwrap_err();
        assert!(matches!(err, SymbolicError::Type { .. }));
    }

    #[test]
    fn test_opaque_not_differentiable() {
        let x = Expr::symbol("x");
        let y = Expr::symbol("y");
        let f = Expr::opaque("f", vec![x.clone()]);
        assert!(matches!(
            f.diff(&x),
            Err(SymbolicError::NotDifferentiable { .. })
        ));
        assert!(f.diff(&y).unwrap().is_zero());
    }
}
