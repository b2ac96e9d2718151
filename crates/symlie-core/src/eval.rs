//! Numeric evaluation of expressions.

use std::collections::HashMap;

use crate::error::{Result, SymbolicError};
use crate::expr::{Expr, ExprKind};

/// Numeric values bound to symbol names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: HashMap<String, f64>,
}

impl Bindings {
    /// Creates an empty set of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding, builder style.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Binds `name` to `value`, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    /// Binds a symbol expression to `value`.
    pub fn bind(&mut self, symbol: &Expr, value: f64) -> Result<()> {
        let name = symbol.symbol_name().ok_or_else(|| {
            SymbolicError::type_error(format!("cannot bind a value to non-symbol {symbol}"))
        })?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Binds each symbol of `symbols` to the matching entry of `values`.
    pub fn bind_all(&mut self, symbols: &[Expr], values: &[f64]) -> Result<()> {
        if symbols.len() != values.len() {
            return Err(SymbolicError::shape_mismatch(symbols.len(), values.len()));
        }
        for (symbol, value) in symbols.iter().zip(values) {
            self.bind(symbol, *value)?;
        }
        Ok(())
    }

    /// The value bound to `name`.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Number of bound symbols.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<S: Into<String>> Extend<(S, f64)> for Bindings {
    fn extend<I: IntoIterator<Item = (S, f64)>>(&mut self, iter: I) {
        self.values
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v)));
    }
}

fn eval_pow(base: f64, exponent: f64) -> Result<f64> {
    if base == 0.0 && exponent < 0.0 {
        return Err(SymbolicError::evaluation(format!(
            "division by zero in 0^{exponent}"
        )));
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(SymbolicError::evaluation(format!(
            "fractional power {exponent} of negative number {base}"
        )));
    }
    Ok(base.powf(exponent))
}

impl Expr {
    /// Evaluates the expression numerically.
    ///
    /// Shared subexpressions are evaluated once.
    pub fn eval(&self, bindings: &Bindings) -> Result<f64> {
        let mut memo = HashMap::new();
        self.eval_memo(bindings, &mut memo)
    }

    fn eval_memo(&self, bindings: &Bindings, memo: &mut HashMap<Expr, f64>) -> Result<f64> {
        if let Some(value) = memo.get(self) {
            return Ok(*value);
        }
        let value = match self.kind() {
            ExprKind::Constant(v) => *v,
            ExprKind::Symbol(name) => bindings
                .get(name)
                .ok_or_else(|| SymbolicError::unbound_symbol(name.as_ref()))?,
            ExprKind::Add(args) => {
                let mut sum = 0.0;
                for arg in args {
                    sum += arg.eval_memo(bindings, memo)?;
                }
                sum
            }
            ExprKind::Mul(args) => {
                let mut product = 1.0;
                for arg in args {
                    product *= arg.eval_memo(bindings, memo)?;
                }
                product
            }
            ExprKind::Pow(base, exponent) => {
                let b = base.eval_memo(bindings, memo)?;
                let e = exponent.eval_memo(bindings, memo)?;
                eval_pow(b, e)?
            }
            ExprKind::Unary(f, arg) => f.evaluate(arg.eval_memo(bindings, memo)?)?,
            ExprKind::Binary(f, a, b) => {
                let a = a.eval_memo(bindings, memo)?;
                f.evaluate(a, b.eval_memo(bindings, memo)?)
            }
            ExprKind::Opaque(name, _) => {
                return Err(SymbolicError::evaluation(format!(
                    "opaque function {name} has no numeric definition"
                )));
            }
        };
        if !value.is_finite() {
            return Err(SymbolicError::evaluation(format!(
                "non-finite result {value}"
            )));
        }
        memo.insert(self.clone(), value);
        Ok(value)
    }
}

/// Evaluates several expressions against the same bindings.
pub fn eval_all(exprs: &[Expr], bindings: &Bindings) -> Result<Vec<f64>> {
    let mut memo = HashMap::new();
    exprs
        .iter()
        .map(|e| e.eval_memo(bindings, &mut memo))
        .collect()
}
