//! Canonicalizing constructors and operator overloading.
//!
//! Sums and products are flattened, like terms and like factors are merged,
//! constants are folded and operands are sorted by the [`Expr`] order, so two
//! algebraically trivial rearrangements of the same expression intern to the
//! same node.

use std::collections::HashMap;
use std::iter::{Product, Sum};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use super::{intern, BinaryFn, Expr, ExprKind, UnaryFn};

fn is_integer(v: f64) -> bool {
    v.is_finite() && v.fract() == 0.0
}

fn fold_pow(base: f64, exponent: f64) -> Option<f64> {
    if base == 0.0 && exponent < 0.0 {
        return None;
    }
    if base < 0.0 && !is_integer(exponent) {
        return None;
    }
    let value = base.powf(exponent);
    value.is_finite().then_some(value)
}

fn flatten_into(expr: Expr, is_add: bool, out: &mut Vec<Expr>) {
    match (expr.kind(), is_add) {
        (ExprKind::Add(args), true) | (ExprKind::Mul(args), false) => {
            out.extend(args.iter().cloned());
        }
        _ => out.push(expr),
    }
}

impl Expr {
    /// Sum of any number of terms.
    pub fn add_all<I: IntoIterator<Item = Expr>>(terms: I) -> Expr {
        let mut flat = Vec::new();
        for term in terms {
            flatten_into(term, true, &mut flat);
        }

        let mut constant = 0.0;
        let mut order: Vec<Expr> = Vec::new();
        let mut coefficients: HashMap<Expr, f64> = HashMap::new();
        for term in flat {
            if let Some(c) = term.as_constant() {
                constant += c;
                continue;
            }
            let (coefficient, rest) = term.split_coefficient();
            match coefficients.get_mut(&rest) {
                Some(total) => *total += coefficient,
                None => {
                    coefficients.insert(rest.clone(), coefficient);
                    order.push(rest);
                }
            }
        }

        let mut out: Vec<Expr> = Vec::with_capacity(order.len() + 1);
        for rest in order {
            let coefficient = coefficients.get(&rest).copied().unwrap_or(0.0);
            if coefficient == 0.0 {
                continue;
            }
            if coefficient == 1.0 {
                out.push(rest);
            } else {
                out.push(Expr::mul_all([Expr::constant(coefficient), rest]));
            }
        }
        if constant != 0.0 {
            out.push(Expr::constant(constant));
        }

        match out.len() {
            0 => Expr::zero(),
            1 => out.pop().unwrap_or_else(Expr::zero),
            _ => {
                out.sort();
                intern(ExprKind::Add(out))
            }
        }
    }

    /// Product of any number of factors.
    pub fn mul_all<I: IntoIterator<Item = Expr>>(factors: I) -> Expr {
        let mut flat = Vec::new();
        for factor in factors {
            flatten_into(factor, false, &mut flat);
        }

        let mut coefficient = 1.0;
        let mut order: Vec<Expr> = Vec::new();
        let mut exponents: HashMap<Expr, Vec<Expr>> = HashMap::new();
        for factor in flat {
            if let Some(c) = factor.as_constant() {
                coefficient *= c;
                continue;
            }
            let (base, exponent) = match factor.kind() {
                ExprKind::Pow(base, exponent) => (base.clone(), exponent.clone()),
                _ => (factor.clone(), Expr::one()),
            };
            match exponents.get_mut(&base) {
                Some(list) => list.push(exponent),
                None => {
                    exponents.insert(base.clone(), vec![exponent]);
                    order.push(base);
                }
            }
        }
        if coefficient == 0.0 {
            return Expr::zero();
        }

        let mut out: Vec<Expr> = Vec::with_capacity(order.len());
        let mut needs_flatten = false;
        for base in order {
            let exponent = Expr::add_all(exponents.remove(&base).unwrap_or_default());
            let power = base.pow(exponent);
            match power.kind() {
                ExprKind::Constant(c) => coefficient *= c,
                ExprKind::Mul(_) => {
                    needs_flatten = true;
                    out.push(power);
                }
                _ => out.push(power),
            }
        }
        if needs_flatten {
            out.push(Expr::constant(coefficient));
            return Expr::mul_all(out);
        }
        if coefficient == 0.0 {
            return Expr::zero();
        }
        if out.is_empty() {
            return Expr::constant(coefficient);
        }
        if coefficient == 1.0 && out.len() == 1 {
            return out.pop().unwrap_or_else(Expr::one);
        }
        // A numeric coefficient distributes over a lone sum, so that
        // `-(x + y)` cancels against `x + y`.
        if out.len() == 1 {
            if let ExprKind::Add(terms) = out[0].kind() {
                return Expr::add_all(
                    terms
                        .iter()
                        .map(|t| Expr::mul_all([Expr::constant(coefficient), t.clone()])),
                );
            }
        }

        out.sort();
        let mut args = Vec::with_capacity(out.len() + 1);
        if coefficient != 1.0 {
            args.push(Expr::constant(coefficient));
        }
        args.extend(out);
        intern(ExprKind::Mul(args))
    }

    /// Splits a term into its numeric coefficient and the remaining factor.
    pub(crate) fn split_coefficient(&self) -> (f64, Expr) {
        if let ExprKind::Mul(args) = self.kind() {
            if let Some(c) = args.first().and_then(Expr::as_constant) {
                let rest = if args.len() == 2 {
                    args[1].clone()
                } else {
                    intern(ExprKind::Mul(args[1..].to_vec()))
                };
                return (c, rest);
            }
        }
        (1.0, self.clone())
    }

    /// `self ^ exponent`.
    pub fn pow(&self, exponent: impl Into<Expr>) -> Expr {
        let exponent = exponent.into();
        if let Some(e) = exponent.as_constant() {
            if e == 0.0 {
                return Expr::one();
            }
            if e == 1.0 {
                return self.clone();
            }
            if let Some(folded) = self.as_constant().and_then(|b| fold_pow(b, e)) {
                return Expr::constant(folded);
            }
            if is_integer(e) {
                match self.kind() {
                    ExprKind::Pow(base, inner) => return base.pow(inner * e),
                    ExprKind::Mul(args) => {
                        return Expr::mul_all(args.iter().map(|a| a.pow(e)));
                    }
                    _ => {}
                }
            }
        }
        if self.is_one() {
            return Expr::one();
        }
        intern(ExprKind::Pow(self.clone(), exponent))
    }

    /// `self ^ n` for an integer exponent.
    pub fn powi(&self, n: i32) -> Expr {
        self.pow(Expr::from(n))
    }

    /// Square root, `self ^ 0.5`.
    pub fn sqrt(&self) -> Expr {
        self.pow(0.5)
    }

    /// Multiplicative inverse, `self ^ -1`.
    pub fn recip(&self) -> Expr {
        self.powi(-1)
    }

    /// Square, `self ^ 2`.
    pub fn squared(&self) -> Expr {
        self.powi(2)
    }

    /// Applies an elementary function of one argument.
    ///
    /// Constant arguments fold when the result is finite; arguments outside
    /// the function's domain stay symbolic so that evaluation reports them.
    pub fn unary(f: UnaryFn, arg: &Expr) -> Expr {
        if let Some(value) = arg
            .as_constant()
            .and_then(|c| f.evaluate(c).ok())
            .filter(|v| v.is_finite())
        {
            return Expr::constant(value);
        }
        intern(ExprKind::Unary(f, arg.clone()))
    }

    /// Applies an elementary function of two arguments.
    pub fn binary(f: BinaryFn, a: &Expr, b: &Expr) -> Expr {
        if let (Some(x), Some(y)) = (a.as_constant(), b.as_constant()) {
            let value = f.evaluate(x, y);
            if value.is_finite() {
                return Expr::constant(value);
            }
        }
        if matches!(f, BinaryFn::Min | BinaryFn::Max) && a == b {
            return a.clone();
        }
        intern(ExprKind::Binary(f, a.clone(), b.clone()))
    }

    /// Sine.
    pub fn sin(&self) -> Expr {
        Expr::unary(UnaryFn::Sin, self)
    }

    /// Cosine.
    pub fn cos(&self) -> Expr {
        Expr::unary(UnaryFn::Cos, self)
    }

    /// Tangent.
    pub fn tan(&self) -> Expr {
        Expr::unary(UnaryFn::Tan, self)
    }

    /// Inverse sine.
    pub fn asin(&self) -> Expr {
        Expr::unary(UnaryFn::Asin, self)
    }

    /// Inverse cosine.
    pub fn acos(&self) -> Expr {
        Expr::unary(UnaryFn::Acos, self)
    }

    /// Inverse tangent.
    pub fn atan(&self) -> Expr {
        Expr::unary(UnaryFn::Atan, self)
    }

    /// Hyperbolic sine.
    pub fn sinh(&self) -> Expr {
        Expr::unary(UnaryFn::Sinh, self)
    }

    /// Hyperbolic cosine.
    pub fn cosh(&self) -> Expr {
        Expr::unary(UnaryFn::Cosh, self)
    }

    /// Hyperbolic tangent.
    pub fn tanh(&self) -> Expr {
        Expr::unary(UnaryFn::Tanh, self)
    }

    /// Natural exponential.
    pub fn exp(&self) -> Expr {
        Expr::unary(UnaryFn::Exp, self)
    }

    /// Natural logarithm.
    pub fn log(&self) -> Expr {
        Expr::unary(UnaryFn::Log, self)
    }

    /// Absolute value.
    pub fn abs(&self) -> Expr {
        Expr::unary(UnaryFn::Abs, self)
    }

    /// Sign, zero at zero.
    pub fn sign(&self) -> Expr {
        Expr::unary(UnaryFn::Sign, self)
    }

    /// Floor.
    pub fn floor(&self) -> Expr {
        Expr::unary(UnaryFn::Floor, self)
    }

    /// `atan2(self, x)` with `self` as the y coordinate.
    pub fn atan2(&self, x: &Expr) -> Expr {
        Expr::binary(BinaryFn::Atan2, self, x)
    }

    /// Minimum of two expressions.
    pub fn min_expr(&self, other: &Expr) -> Expr {
        Expr::binary(BinaryFn::Min, self, other)
    }

    /// Maximum of two expressions.
    pub fn max_expr(&self, other: &Expr) -> Expr {
        Expr::binary(BinaryFn::Max, self, other)
    }
}

fn add2(a: &Expr, b: &Expr) -> Expr {
    Expr::add_all([a.clone(), b.clone()])
}

fn sub2(a: &Expr, b: &Expr) -> Expr {
    Expr::add_all([a.clone(), -b])
}

fn mul2(a: &Expr, b: &Expr) -> Expr {
    Expr::mul_all([a.clone(), b.clone()])
}

fn div2(a: &Expr, b: &Expr) -> Expr {
    Expr::mul_all([a.clone(), b.recip()])
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $func:ident) => {
        impl $trait<Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $func(&self, &rhs)
            }
        }

        impl $trait<&Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $func(&self, rhs)
            }
        }

        impl $trait<Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $func(self, &rhs)
            }
        }

        impl $trait<&Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $func(self, rhs)
            }
        }

        impl $trait<f64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                $func(&self, &Expr::constant(rhs))
            }
        }

        impl $trait<f64> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                $func(self, &Expr::constant(rhs))
            }
        }

        impl $trait<Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $func(&Expr::constant(self), &rhs)
            }
        }

        impl $trait<&Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $func(&Expr::constant(self), rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, add2);
impl_binary_op!(Sub, sub, sub2);
impl_binary_op!(Mul, mul, mul2);
impl_binary_op!(Div, div, div2);

macro_rules! impl_assign_op {
    ($trait:ident, $method:ident, $func:ident) => {
        impl $trait<Expr> for Expr {
            fn $method(&mut self, rhs: Expr) {
                *self = $func(self, &rhs);
            }
        }

        impl $trait<&Expr> for Expr {
            fn $method(&mut self, rhs: &Expr) {
                *self = $func(self, rhs);
            }
        }

        impl $trait<f64> for Expr {
            fn $method(&mut self, rhs: f64) {
                *self = $func(self, &Expr::constant(rhs));
            }
        }
    };
}

impl_assign_op!(AddAssign, add_assign, add2);
impl_assign_op!(SubAssign, sub_assign, sub2);
impl_assign_op!(MulAssign, mul_assign, mul2);
impl_assign_op!(DivAssign, div_assign, div2);

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::mul_all([Expr::constant(-1.0), self])
    }
}

impl Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::mul_all([Expr::constant(-1.0), self.clone()])
    }
}

impl Sum for Expr {
    fn sum<I: Iterator<Item = Expr>>(iter: I) -> Expr {
        Expr::add_all(iter)
    }
}

impl<'a> Sum<&'a Expr> for Expr {
    fn sum<I: Iterator<Item = &'a Expr>>(iter: I) -> Expr {
        Expr::add_all(iter.cloned())
    }
}

impl Product for Expr {
    fn product<I: Iterator<Item = Expr>>(iter: I) -> Expr {
        Expr::mul_all(iter)
    }
}

impl<'a> Product<&'a Expr> for Expr {
    fn product<I: Iterator<Item = &'a Expr>>(iter: I) -> Expr {
        Expr::mul_all(iter.cloned())
    }
}
