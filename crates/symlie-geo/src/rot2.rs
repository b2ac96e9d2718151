//! Planar rotations SO(2) as unit complex numbers.
//!
//! # Mathematical Definition
//!
//! ```text
//! SO(2) = { z = re + i·im : re² + im² = 1 }
//! ```
//!
//! - **Storage**: `[re, im]`
//! - **Tangent**: the angle `θ`, with `from_tangent(θ) = cos θ + i·sin θ`
//! - **Composition**: complex multiplication
//! - **Inverse**: complex conjugate

use std::f64::consts::PI;
use std::ops::Mul;

use rand::Rng;
use symlie_core::epsilon::safe_atan2;
use symlie_core::error::Result;
use symlie_core::expr::Expr;
use symlie_core::ops::{check_storage_len, check_tangent_len, GroupOps, LieGroupOps, StorageOps};
use symlie_core::types::SymMatrix;

use crate::matrix::Matrix;
use crate::point_shape;

/// Rotation in the plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Rot2 {
    re: Expr,
    im: Expr,
}

impl Rot2 {
    /// From the complex components; no normalization is applied.
    pub fn from_complex(re: impl Into<Expr>, im: impl Into<Expr>) -> Self {
        Self {
            re: re.into(),
            im: im.into(),
        }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Self::from_complex(1.0, 0.0)
    }

    /// Symbolic rotation with components `{name}_re`, `{name}_im`.
    pub fn symbolic(name: &str) -> Self {
        Self::from_complex(
            Expr::symbol(format!("{name}_re")),
            Expr::symbol(format!("{name}_im")),
        )
    }

    /// Rotation by `angle` radians.
    pub fn from_angle(angle: impl Into<Expr>) -> Self {
        let angle = angle.into();
        Self::from_complex(angle.cos(), angle.sin())
    }

    /// Uniformly distributed numeric rotation.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_angle(rng.gen_range(-PI..PI))
    }

    /// Rebuilds from `[re, im]`.
    pub fn from_storage(elements: &[Expr]) -> Result<Self> {
        Self::identity().from_storage_like(elements)
    }

    /// Exponential map of `[θ]`.
    pub fn from_tangent(delta: &[Expr], epsilon: &Expr) -> Result<Self> {
        Self::identity().from_tangent_like(delta, epsilon)
    }

    /// Real part.
    pub fn re(&self) -> &Expr {
        &self.re
    }

    /// Imaginary part.
    pub fn im(&self) -> &Expr {
        &self.im
    }

    /// The rotation angle in `(-π, π]`.
    pub fn angle(&self, epsilon: &Expr) -> Expr {
        safe_atan2(&self.im, &self.re, epsilon)
    }

    /// The 2x2 rotation matrix.
    pub fn to_rotation_matrix(&self) -> Matrix {
        Matrix::from_sym(SymMatrix::from_row_slice(
            2,
            2,
            &[self.re.clone(), -&self.im, self.im.clone(), self.re.clone()],
        ))
    }

    /// Rotates a 2-vector.
    pub fn rotate(&self, point: &Matrix) -> Result<Matrix> {
        point_shape(point, 2)?;
        let (x, y) = (&point[0], &point[1]);
        Ok(Matrix::column(&[
            &self.re * x - &self.im * y,
            &self.im * x + &self.re * y,
        ]))
    }
}

impl Default for Rot2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul<&Rot2> for &Rot2 {
    type Output = Rot2;

    fn mul(self, rhs: &Rot2) -> Rot2 {
        Rot2 {
            re: &self.re * &rhs.re - &self.im * &rhs.im,
            im: &self.re * &rhs.im + &self.im * &rhs.re,
        }
    }
}

/// Point rotation.
///
/// # Panics
///
/// Panics unless `rhs` is a 2-vector. Use [`Rot2::rotate`] to get an error
/// instead.
impl Mul<&Matrix> for &Rot2 {
    type Output = Matrix;

    fn mul(self, rhs: &Matrix) -> Matrix {
        match self.rotate(rhs) {
            Ok(m) => m,
            Err(e) => panic!("Rot2 * Matrix: {e}"),
        }
    }
}

impl StorageOps for Rot2 {
    fn type_name(&self) -> String {
        "Rot2".to_string()
    }

    fn storage_dim(&self) -> usize {
        2
    }

    fn to_storage(&self) -> Vec<Expr> {
        vec![self.re.clone(), self.im.clone()]
    }

    fn from_storage_like(&self, elements: &[Expr]) -> Result<Self> {
        check_storage_len("Rot2", 2, elements)?;
        Ok(Self::from_complex(elements[0].clone(), elements[1].clone()))
    }
}

impl GroupOps for Rot2 {
    fn identity_like(&self) -> Self {
        Self::identity()
    }

    fn compose(&self, other: &Self) -> Result<Self> {
        Ok(self * other)
    }

    fn inverse(&self) -> Self {
        Self::from_complex(self.re.clone(), -&self.im)
    }
}

impl LieGroupOps for Rot2 {
    fn tangent_dim(&self) -> usize {
        1
    }

    fn from_tangent_like(&self, delta: &[Expr], _epsilon: &Expr) -> Result<Self> {
        check_tangent_len("Rot2", 1, delta)?;
        Ok(Self::from_angle(delta[0].clone()))
    }

    fn to_tangent(&self, epsilon: &Expr) -> Vec<Expr> {
        vec![self.angle(epsilon)]
    }

    /// `d(self * exp(θ))/dθ` at zero is `i·self`.
    fn storage_d_tangent(&self) -> Result<SymMatrix> {
        Ok(SymMatrix::from_column_slice(
            2,
            1,
            &[-&self.im, self.re.clone()],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use symlie_core::eval::Bindings;

    #[test]
    fn test_composition_adds_angles() {
        let env = Bindings::new();
        let r = &Rot2::from_angle(0.4) * &Rot2::from_angle(0.5);
        let angle = r.angle(&Expr::zero()).eval(&env).unwrap();
        assert_relative_eq!(angle, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let r = Rot2::from_complex(0.0, 1.0);
        let p = &r * &Matrix::column_f64(&[1.0, 0.0]);
        assert_eq!(p, Matrix::column_f64(&[0.0, 1.0]));
        assert!(r.rotate(&Matrix::zeros(3, 1)).is_err());
    }

    #[test]
    fn test_inverse_of_symbolic_rotation() {
        let r = Rot2::symbolic("R");
        let product = r.compose(&r.inverse()).unwrap();
        // re² + im² is only 1 on the manifold, so check numerically.
        let unit = r.evaluated(&Bindings::new().with("R_re", 0.6).with("R_im", 0.8));
        let unit = unit.unwrap();
        let identity = unit.compose(&unit.inverse()).unwrap();
        assert_relative_eq!(identity.re().as_constant().unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(identity.im().as_constant().unwrap(), 0.0, epsilon = 1e-12);
        assert!(product.im().is_zero());
    }

    #[test]
    fn test_storage_d_tangent_closed_form() {
        let r = Rot2::symbolic("R");
        let m = r.storage_d_tangent().unwrap();
        assert_eq!(m[(0, 0)], -r.im());
        assert_eq!(&m[(1, 0)], r.re());
    }
}
