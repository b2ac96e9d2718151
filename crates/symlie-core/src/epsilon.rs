//! Epsilon-biased singularity handling.
//!
//! Functions like `sin(x)/x` or `acos(w)` have removable singularities or
//! unbounded derivatives at isolated points. Rather than branching at
//! runtime, the argument is nudged away from the singular point by a tiny
//! `epsilon` in a direction that preserves the value's limit. Callers always
//! pass epsilon explicitly; `Expr::zero()` opts into the exact singularity.

use crate::config::symbolic_config;
use crate::error::{Result, SymbolicError};
use crate::eval::Bindings;
use crate::expr::Expr;

/// Epsilon values tried by [`check_continuity`], from coarse to fine.
pub const CONTINUITY_EPSILONS: [f64; 3] = [1e-3, 1e-6, 1e-9];

/// The epsilon of the engine-wide configuration.
///
/// The symbol `epsilon` by default; a constant or zero under the other
/// [`EpsilonMode`](crate::config::EpsilonMode)s.
pub fn default_epsilon() -> Expr {
    symbolic_config().epsilon_expr()
}

/// Sign of `x`, mapping zero to `+1`.
///
/// Written branch-free as `2 * min(sign(x), 0) + 1`.
pub fn sign_no_zero(x: &Expr) -> Expr {
    2.0 * x.sign().min_expr(&Expr::zero()) + 1.0
}

/// `x + sign_no_zero(x) * epsilon`, pushing `x` away from zero.
pub fn add_with_sign(x: &Expr, epsilon: &Expr) -> Expr {
    x + sign_no_zero(x) * epsilon
}

/// `sin(x) / x` with the removable singularity at zero guarded.
pub fn sinc(x: &Expr, epsilon: &Expr) -> Expr {
    let shifted = add_with_sign(x, epsilon);
    shifted.sin() / &shifted
}

fn clamp_unit(x: &Expr, epsilon: &Expr) -> Expr {
    x.min_expr(&(1.0 - epsilon)).max_expr(&(epsilon - 1.0))
}

/// `acos(x)` with `x` clamped into `[-1 + epsilon, 1 - epsilon]`.
pub fn safe_acos(x: &Expr, epsilon: &Expr) -> Expr {
    clamp_unit(x, epsilon).acos()
}

/// `asin(x)` with `x` clamped into `[-1 + epsilon, 1 - epsilon]`.
pub fn safe_asin(x: &Expr, epsilon: &Expr) -> Expr {
    clamp_unit(x, epsilon).asin()
}

/// `atan2(y, x)` with `x` pushed away from zero.
pub fn safe_atan2(y: &Expr, x: &Expr, epsilon: &Expr) -> Expr {
    y.atan2(&add_with_sign(x, epsilon))
}

/// `sqrt(sum(v_i^2) + epsilon)`.
pub fn safe_norm(v: &[Expr], epsilon: &Expr) -> Expr {
    (squared_norm(v) + epsilon).sqrt()
}

/// `v / safe_norm(v, epsilon)`.
pub fn safe_normalize(v: &[Expr], epsilon: &Expr) -> Vec<Expr> {
    let inverse_norm = safe_norm(v, epsilon).recip();
    v.iter().map(|vi| vi * &inverse_norm).collect()
}

/// `sum(v_i^2)`.
pub fn squared_norm(v: &[Expr]) -> Expr {
    v.iter().map(Expr::squared).sum()
}

/// Value and first derivative of an expression as epsilon shrinks.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuityReport {
    /// Epsilons tried, from coarse to fine
    pub epsilons: Vec<f64>,
    /// Function value at each epsilon
    pub values: Vec<f64>,
    /// First derivative at each epsilon
    pub derivatives: Vec<f64>,
    /// `|value - limit|` at each epsilon
    pub value_errors: Vec<f64>,
    /// `|derivative - derivative_limit|` at each epsilon
    pub derivative_errors: Vec<f64>,
}

impl ContinuityReport {
    /// Whether both errors at the finest epsilon are within tolerance and
    /// shrinking epsilon never made them grow beyond it.
    pub fn converges(&self, value_tolerance: f64, derivative_tolerance: f64) -> bool {
        fn settles(errors: &[f64], tolerance: f64) -> bool {
            let last_ok = errors.last().is_some_and(|e| *e <= tolerance);
            let monotone = errors.windows(2).all(|w| w[1] <= w[0] + tolerance);
            last_ok && monotone
        }
        settles(&self.value_errors, value_tolerance)
            && settles(&self.derivative_errors, derivative_tolerance)
    }
}

/// Evaluates `f` at `x = point` for every epsilon in [`CONTINUITY_EPSILONS`].
///
/// `x` and `epsilon` must be symbols; every other symbol of `f` must be bound
/// by `extra`.
pub fn check_continuity(
    f: &Expr,
    x: &Expr,
    epsilon: &Expr,
    point: f64,
    limit: f64,
    derivative_limit: f64,
) -> Result<ContinuityReport> {
    check_continuity_with(f, x, epsilon, point, limit, derivative_limit, &Bindings::new())
}

/// [`check_continuity`] with additional bindings for the other symbols.
pub fn check_continuity_with(
    f: &Expr,
    x: &Expr,
    epsilon: &Expr,
    point: f64,
    limit: f64,
    derivative_limit: f64,
    extra: &Bindings,
) -> Result<ContinuityReport> {
    let (Some(x_name), Some(eps_name)) = (x.symbol_name(), epsilon.symbol_name()) else {
        return Err(SymbolicError::type_error(
            "continuity check needs symbols for x and epsilon",
        ));
    };
    let derivative = f.diff(x)?;

    let mut report = ContinuityReport {
        epsilons: CONTINUITY_EPSILONS.to_vec(),
        values: Vec::with_capacity(CONTINUITY_EPSILONS.len()),
        derivatives: Vec::with_capacity(CONTINUITY_EPSILONS.len()),
        value_errors: Vec::with_capacity(CONTINUITY_EPSILONS.len()),
        derivative_errors: Vec::with_capacity(CONTINUITY_EPSILONS.len()),
    };
    for eps in CONTINUITY_EPSILONS {
        let bindings = extra.clone().with(x_name, point).with(eps_name, eps);
        let value = f.eval(&bindings)?;
        let slope = derivative.eval(&bindings)?;
        report.values.push(value);
        report.derivatives.push(slope);
        report.value_errors.push((value - limit).abs());
        report.derivative_errors.push((slope - derivative_limit).abs());
    }
    Ok(report)
}
