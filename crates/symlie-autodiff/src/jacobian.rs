//! Jacobians of expression lists with respect to manifold-valued inputs.
//!
//! Differentiation happens in two steps. [`storage_jacobian`] takes plain
//! partial derivatives with respect to the input's storage symbols, then
//! [`tangent_jacobian`] chains that with the input's `storage_d_tangent`:
//!
//! ```text
//! ∂f/∂δ = ∂f/∂storage · ∂storage/∂δ
//! ```
//!
//! The result has one column per tangent degree of freedom, which is what a
//! least-squares solver working in local coordinates needs.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use symlie_core::error::Result;
use symlie_core::expr::Expr;
use symlie_core::ops::LieGroupOps;
use symlie_core::types::{hstack, sym_matmul, sym_zeros, SymMatrix};
use symlie_geo::Matrix;
use tracing::trace;

fn jacobian_row(output: &Expr, wrt: &[Expr]) -> Result<Vec<Expr>> {
    wrt.iter().map(|symbol| output.diff(symbol)).collect()
}

/// Partial derivatives of `outputs` with respect to the symbols `wrt`,
/// shaped `outputs.len() x wrt.len()`.
///
/// Every entry of `wrt` must be a symbol.
pub fn storage_jacobian(outputs: &[Expr], wrt: &[Expr]) -> Result<SymMatrix> {
    #[cfg(feature = "parallel")]
    let rows = outputs
        .par_iter()
        .map(|output| jacobian_row(output, wrt))
        .collect::<Result<Vec<_>>>()?;
    #[cfg(not(feature = "parallel"))]
    let rows = outputs
        .iter()
        .map(|output| jacobian_row(output, wrt))
        .collect::<Result<Vec<_>>>()?;

    let mut out = sym_zeros(outputs.len(), wrt.len());
    for (r, row) in rows.into_iter().enumerate() {
        for (c, entry) in row.into_iter().enumerate() {
            out[(r, c)] = entry;
        }
    }
    Ok(out)
}

/// Derivative of `outputs` with respect to a tangent perturbation of `wrt`,
/// shaped `outputs.len() x wrt.tangent_dim()`.
pub fn tangent_jacobian(outputs: &[Expr], wrt: &dyn LieGroupOps) -> Result<SymMatrix> {
    let raw = storage_jacobian(outputs, &wrt.to_storage())?;
    let block = sym_matmul(&raw, &wrt.storage_d_tangent()?)?;
    trace!(
        datatype = %wrt.type_name(),
        rows = block.nrows(),
        cols = block.ncols(),
        "tangent jacobian block"
    );
    Ok(block)
}

/// Tangent jacobians with respect to each of `wrt`, concatenated
/// horizontally in order.
pub fn jacobian(outputs: &[Expr], wrt: &[&dyn LieGroupOps]) -> Result<SymMatrix> {
    if wrt.is_empty() {
        return Ok(sym_zeros(outputs.len(), 0));
    }
    let blocks = wrt
        .iter()
        .map(|input| tangent_jacobian(outputs, *input))
        .collect::<Result<Vec<_>>>()?;
    hstack(&blocks)
}

/// Jacobian sugar for values made of expressions.
pub trait JacobianExt {
    /// Tangent jacobian of the flattened value with respect to `wrt`.
    fn jacobian(&self, wrt: &dyn LieGroupOps) -> Result<Matrix>;
}

impl JacobianExt for Matrix {
    fn jacobian(&self, wrt: &dyn LieGroupOps) -> Result<Matrix> {
        tangent_jacobian(&self.entries(), wrt).map(Matrix::from_sym)
    }
}

impl JacobianExt for Expr {
    fn jacobian(&self, wrt: &dyn LieGroupOps) -> Result<Matrix> {
        tangent_jacobian(std::slice::from_ref(self), wrt).map(Matrix::from_sym)
    }
}
