//! Central-difference jacobians, used to check analytic ones.
//!
//! The function is perturbed through `retract`, so the columns line up with
//! the tangent-space jacobians produced by [`crate::jacobian`].

use nalgebra::DMatrix;
use symlie_core::error::{Result, SymbolicError};
use symlie_core::expr::Expr;
use symlie_core::ops::LieGroupOps;

/// Step used by [`numerical_jacobian`] when callers have no better choice.
pub const DEFAULT_STEP: f64 = 1e-6;

/// Jacobian of `f` at `at` by central differences along each tangent
/// direction, shaped `output_dim x at.tangent_dim()`.
pub fn numerical_jacobian<T, F>(f: F, at: &T, step: f64) -> Result<DMatrix<f64>>
where
    T: LieGroupOps,
    F: Fn(&T) -> Result<Vec<f64>>,
{
    if !(step.is_finite() && step > 0.0) {
        return Err(SymbolicError::evaluation(format!(
            "finite difference step must be positive, got {step}"
        )));
    }
    let tangent_dim = at.tangent_dim();
    let zero = Expr::zero();
    let output_dim = f(at)?.len();
    let mut out = DMatrix::zeros(output_dim, tangent_dim);

    for col in 0..tangent_dim {
        let mut delta = vec![Expr::zero(); tangent_dim];
        delta[col] = Expr::constant(step);
        let plus = f(&at.retract(&delta, &zero)?)?;
        delta[col] = Expr::constant(-step);
        let minus = f(&at.retract(&delta, &zero)?)?;
        if plus.len() != output_dim || minus.len() != output_dim {
            return Err(SymbolicError::shape_mismatch(
                format!("{output_dim} outputs"),
                format!("{} and {} outputs", plus.len(), minus.len()),
            ));
        }
        for (row, (p, m)) in plus.iter().zip(&minus).enumerate() {
            out[(row, col)] = (p - m) / (2.0 * step);
        }
    }
    Ok(out)
}
