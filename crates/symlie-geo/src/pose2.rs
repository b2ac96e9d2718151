//! Planar rigid transforms SE(2).
//!
//! Stored as `[re, im, x, y]`: the rotation followed by the translation.
//! The tangent is ordered `[θ, x, y]`, and the exponential map treats the
//! rotation and translation independently, so `retract` moves the
//! translation along the body frame: `t' = t + R·v`.

use std::ops::Mul;

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use symlie_core::error::Result;
use symlie_core::expr::Expr;
use symlie_core::ops::{check_storage_len, check_tangent_len, GroupOps, LieGroupOps, StorageOps};
use symlie_core::types::{block_diagonal, SymMatrix};

use crate::matrix::Matrix;
use crate::point_shape;
use crate::rot2::Rot2;

/// Rotation and translation in the plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose2 {
    rotation: Rot2,
    position: Matrix,
}

impl Pose2 {
    /// From a rotation and a 2-vector translation.
    pub fn new(rotation: Rot2, position: Matrix) -> Result<Self> {
        point_shape(&position, 2)?;
        Ok(Self { rotation, position })
    }

    /// From an angle and translation components.
    pub fn from_angle_position(
        angle: impl Into<Expr>,
        x: impl Into<Expr>,
        y: impl Into<Expr>,
    ) -> Self {
        Self {
            rotation: Rot2::from_angle(angle),
            position: Matrix::column(&[x.into(), y.into()]),
        }
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: Rot2::identity(),
            position: Matrix::zeros(2, 1),
        }
    }

    /// Symbolic pose with a `{name}_R` rotation and `{name}_t` translation.
    pub fn symbolic(name: &str) -> Self {
        Self {
            rotation: Rot2::symbolic(&format!("{name}_R")),
            position: Matrix::symbolic(&format!("{name}_t"), 2, 1),
        }
    }

    /// Uniform rotation and standard normal translation.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let rotation = Rot2::random(rng);
        let t: [f64; 2] = [StandardNormal.sample(rng), StandardNormal.sample(rng)];
        Self {
            rotation,
            position: Matrix::column_f64(&t),
        }
    }

    /// Rebuilds from `[re, im, x, y]`.
    pub fn from_storage(elements: &[Expr]) -> Result<Self> {
        Self::identity().from_storage_like(elements)
    }

    /// Exponential map of `[θ, x, y]`.
    pub fn from_tangent(delta: &[Expr], epsilon: &Expr) -> Result<Self> {
        Self::identity().from_tangent_like(delta, epsilon)
    }

    /// The rotation part.
    pub fn rotation(&self) -> &Rot2 {
        &self.rotation
    }

    /// The translation part.
    pub fn position(&self) -> &Matrix {
        &self.position
    }

    /// The 3x3 homogeneous transform.
    pub fn to_homogeneous_matrix(&self) -> Matrix {
        let r = self.rotation.to_rotation_matrix();
        let mut m = Matrix::identity(3);
        for i in 0..2 {
            for j in 0..2 {
                m[(i, j)] = r[(i, j)].clone();
            }
            m[(i, 2)] = self.position[i].clone();
        }
        m
    }

    /// The 2x2 rotation matrix.
    pub fn to_rotation_matrix(&self) -> Matrix {
        self.rotation.to_rotation_matrix()
    }

    /// Applies the transform to a 2-vector.
    pub fn transform_point(&self, point: &Matrix) -> Result<Matrix> {
        self.rotation.rotate(point)?.try_add(&self.position)
    }
}

impl Default for Pose2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul<&Pose2> for &Pose2 {
    type Output = Pose2;

    fn mul(self, rhs: &Pose2) -> Pose2 {
        let moved = &self.rotation * &rhs.position;
        Pose2 {
            rotation: &self.rotation * &rhs.rotation,
            position: &moved + &self.position,
        }
    }
}

/// Point transformation.
///
/// # Panics
///
/// Panics unless `rhs` is a 2-vector. Use [`Pose2::transform_point`] to get
/// an error instead.
impl Mul<&Matrix> for &Pose2 {
    type Output = Matrix;

    fn mul(self, rhs: &Matrix) -> Matrix {
        match self.transform_point(rhs) {
            Ok(m) => m,
            Err(e) => panic!("Pose2 * Matrix: {e}"),
        }
    }
}

impl StorageOps for Pose2 {
    fn type_name(&self) -> String {
        "Pose2".to_string()
    }

    fn storage_dim(&self) -> usize {
        4
    }

    fn to_storage(&self) -> Vec<Expr> {
        let mut storage = self.rotation.to_storage();
        storage.extend(self.position.entries());
        storage
    }

    fn from_storage_like(&self, elements: &[Expr]) -> Result<Self> {
        check_storage_len("Pose2", 4, elements)?;
        Ok(Self {
            rotation: Rot2::from_storage(&elements[..2])?,
            position: Matrix::column(&elements[2..]),
        })
    }
}

impl GroupOps for Pose2 {
    fn identity_like(&self) -> Self {
        Self::identity()
    }

    fn compose(&self, other: &Self) -> Result<Self> {
        Ok(self * other)
    }

    fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        let position = -&(&rotation * &self.position);
        Self { rotation, position }
    }
}

impl LieGroupOps for Pose2 {
    fn tangent_dim(&self) -> usize {
        3
    }

    fn from_tangent_like(&self, delta: &[Expr], epsilon: &Expr) -> Result<Self> {
        check_tangent_len("Pose2", 3, delta)?;
        Ok(Self {
            rotation: Rot2::from_tangent(&delta[..1], epsilon)?,
            position: Matrix::column(&delta[1..]),
        })
    }

    fn to_tangent(&self, epsilon: &Expr) -> Vec<Expr> {
        let mut tangent = self.rotation.to_tangent(epsilon);
        tangent.extend(self.position.entries());
        tangent
    }

    fn storage_d_tangent(&self) -> Result<SymMatrix> {
        Ok(block_diagonal(&[
            self.rotation.storage_d_tangent()?,
            self.rotation.to_rotation_matrix().into_sym(),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use symlie_core::eval::Bindings;

    #[test]
    fn test_transform_point() {
        let pose = Pose2::from_angle_position(std::f64::consts::FRAC_PI_2, 1.0, 2.0);
        let p = pose.transform_point(&Matrix::column_f64(&[1.0, 0.0])).unwrap();
        let p = p.eval(&Bindings::new()).unwrap();
        assert_relative_eq!(p[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[(1, 0)], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_undoes_transform() {
        let pose = Pose2::from_angle_position(0.7, -1.0, 0.5);
        let p = Matrix::column_f64(&[0.3, -0.8]);
        let back = &pose.inverse() * &(&pose * &p);
        let back = back.eval(&Bindings::new()).unwrap();
        assert_relative_eq!(back[(0, 0)], 0.3, epsilon = 1e-12);
        assert_relative_eq!(back[(1, 0)], -0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_retract_moves_in_body_frame() {
        let pose = Pose2::from_angle_position(std::f64::consts::FRAC_PI_2, 0.0, 0.0);
        let delta = [Expr::zero(), Expr::one(), Expr::zero()];
        let moved = pose.retract(&delta, &Expr::zero()).unwrap();
        let t = moved.position().eval(&Bindings::new()).unwrap();
        assert_relative_eq!(t[(0, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(t[(1, 0)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_homogeneous_matrix_layout() {
        let pose = Pose2::symbolic("T");
        let m = pose.to_homogeneous_matrix();
        assert_eq!(m[(0, 2)].symbol_name(), Some("T_t0"));
        assert!(m[(2, 0)].is_zero());
        assert!(m[(2, 2)].is_one());
    }
}
