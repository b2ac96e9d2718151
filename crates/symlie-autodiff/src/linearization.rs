//! Gauss-Newton linearization of a residual.

use symlie_core::error::{Result, SymbolicError};
use symlie_core::eval::Bindings;
use symlie_core::expr::Expr;
use symlie_core::ops::LieGroupOps;
use symlie_geo::Matrix;

use crate::jacobian::jacobian;

/// Residual `r`, its tangent jacobian `J`, and the normal equation blocks
/// `H = JᵀJ` and `b = Jᵀr`.
#[derive(Debug, Clone, PartialEq)]
pub struct Linearization {
    /// The residual as a column vector.
    pub residual: Matrix,
    /// `residual_dim x Σ tangent_dim`.
    pub jacobian: Matrix,
    /// Gauss-Newton approximation of the hessian of `½|r|²`.
    pub hessian: Matrix,
    /// Gradient of `½|r|²`.
    pub rhs: Matrix,
}

impl Linearization {
    /// Linearizes `residual` with respect to `inputs`, in order.
    pub fn new(residual: &Matrix, inputs: &[&dyn LieGroupOps]) -> Result<Self> {
        if !residual.is_vector() {
            return Err(SymbolicError::shape_mismatch(
                "column vector residual",
                format!("{:?}", residual.shape()),
            ));
        }
        let jacobian = Matrix::from_sym(jacobian(&residual.entries(), inputs)?);
        let transposed = jacobian.transpose();
        let hessian = transposed.matmul(&jacobian)?;
        let rhs = transposed.matmul(residual)?;
        Ok(Self {
            residual: residual.clone(),
            jacobian,
            hessian,
            rhs,
        })
    }

    /// `½|r|²`.
    pub fn error(&self) -> Expr {
        self.residual.squared_norm() * 0.5
    }

    /// Total tangent dimension of the inputs.
    pub fn tangent_dim(&self) -> usize {
        self.jacobian.ncols()
    }

    /// Every block evaluated.
    pub fn evaluated(&self, bindings: &Bindings) -> Result<Self> {
        let constant = |m: &Matrix| m.eval(bindings).map(|v| Matrix::from_numeric(&v));
        Ok(Self {
            residual: constant(&self.residual)?,
            jacobian: constant(&self.jacobian)?,
            hessian: constant(&self.hessian)?,
            rhs: constant(&self.rhs)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_residual_blocks() {
        let x = Expr::symbol("x");
        let residual = Matrix::column(&[&x * 3.0 - 1.0]);
        let lin = Linearization::new(&residual, &[&x]).unwrap();
        assert!(lin.jacobian[(0, 0)] == Expr::constant(3.0));
        assert_eq!(lin.hessian[(0, 0)], Expr::constant(9.0));
        assert_eq!(lin.rhs[(0, 0)], (&x * 3.0 - 1.0) * 3.0);
        assert_eq!(lin.tangent_dim(), 1);
    }

    #[test]
    fn test_rejects_matrix_residual() {
        let x = Expr::symbol("x");
        assert!(Linearization::new(&Matrix::symbolic("r", 2, 2), &[&x]).is_err());
    }

    #[test]
    fn test_evaluated_error() {
        let x = Expr::symbol("x");
        let lin = Linearization::new(&Matrix::column(&[x.clone(), &x * 2.0]), &[&x]).unwrap();
        let numeric = lin.evaluated(&Bindings::new().with("x", 1.0)).unwrap();
        assert_eq!(numeric.error(), Expr::constant(2.5));
        assert_eq!(numeric.hessian[(0, 0)], Expr::constant(5.0));
    }
}
