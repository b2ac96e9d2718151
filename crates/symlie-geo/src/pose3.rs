//! Rigid transforms SE(3).
//!
//! Stored as `[qx, qy, qz, qw, tx, ty, tz]`. The tangent is ordered
//! `[ω, v]`; rotation and translation are mapped independently, as for
//! [`Pose2`](crate::Pose2).

use std::ops::Mul;

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use symlie_core::error::Result;
use symlie_core::expr::Expr;
use symlie_core::ops::{check_storage_len, check_tangent_len, GroupOps, LieGroupOps, StorageOps};
use symlie_core::types::{block_diagonal, SymMatrix};

use crate::matrix::Matrix;
use crate::point_shape;
use crate::rot3::Rot3;

/// Rotation and translation in space.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose3 {
    rotation: Rot3,
    position: Matrix,
}

impl Pose3 {
    /// From a rotation and a 3-vector translation.
    pub fn new(rotation: Rot3, position: Matrix) -> Result<Self> {
        point_shape(&position, 3)?;
        Ok(Self { rotation, position })
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: Rot3::identity(),
            position: Matrix::zeros(3, 1),
        }
    }

    /// Symbolic pose with a `{name}_R` rotation and `{name}_t` translation.
    pub fn symbolic(name: &str) -> Self {
        Self {
            rotation: Rot3::symbolic(&format!("{name}_R")),
            position: Matrix::symbolic(&format!("{name}_t"), 3, 1),
        }
    }

    /// Uniform rotation and standard normal translation.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let rotation = Rot3::random(rng);
        let t: Vec<f64> = (0..3).map(|_| StandardNormal.sample(rng)).collect();
        Self {
            rotation,
            position: Matrix::column_f64(&t),
        }
    }

    /// Rebuilds from `[qx, qy, qz, qw, tx, ty, tz]`.
    pub fn from_storage(elements: &[Expr]) -> Result<Self> {
        Self::identity().from_storage_like(elements)
    }

    /// Exponential map of `[ω, v]`.
    pub fn from_tangent(delta: &[Expr], epsilon: &Expr) -> Result<Self> {
        Self::identity().from_tangent_like(delta, epsilon)
    }

    /// The rotation part.
    pub fn rotation(&self) -> &Rot3 {
        &self.rotation
    }

    /// The translation part.
    pub fn position(&self) -> &Matrix {
        &self.position
    }

    /// The 3x3 rotation matrix.
    pub fn to_rotation_matrix(&self) -> Matrix {
        self.rotation.to_rotation_matrix()
    }

    /// The 4x4 homogeneous transform.
    pub fn to_homogeneous_matrix(&self) -> Matrix {
        let r = self.rotation.to_rotation_matrix();
        let mut m = Matrix::identity(4);
        for i in 0..3 {
            for j in 0..3 {
                m[(i, j)] = r[(i, j)].clone();
            }
            m[(i, 3)] = self.position[i].clone();
        }
        m
    }

    /// Applies the transform to a 3-vector.
    pub fn transform_point(&self, point: &Matrix) -> Result<Matrix> {
        self.rotation.rotate(point)?.try_add(&self.position)
    }
}

impl Default for Pose3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul<&Pose3> for &Pose3 {
    type Output = Pose3;

    fn mul(self, rhs: &Pose3) -> Pose3 {
        let moved = &self.rotation * &rhs.position;
        Pose3 {
            rotation: &self.rotation * &rhs.rotation,
            position: &moved + &self.position,
        }
    }
}

/// Point transformation.
///
/// # Panics
///
/// Panics unless `rhs` is a 3-vector. Use [`Pose3::transform_point`] to get
/// an error instead.
impl Mul<&Matrix> for &Pose3 {
    type Output = Matrix;

    fn mul(self, rhs: &Matrix) -> Matrix {
        match self.transform_point(rhs) {
            Ok(m) => m,
            Err(e) => panic!("Pose3 * Matrix: {e}"),
        }
    }
}

impl StorageOps for Pose3 {
    fn type_name(&self) -> String {
        "Pose3".to_string()
    }

    fn storage_dim(&self) -> usize {
        7
    }

    fn to_storage(&self) -> Vec<Expr> {
        let mut storage = self.rotation.to_storage();
        storage.extend(self.position.entries());
        storage
    }

    fn from_storage_like(&self, elements: &[Expr]) -> Result<Self> {
        check_storage_len("Pose3", 7, elements)?;
        Ok(Self {
            rotation: Rot3::from_storage(&elements[..4])?,
            position: Matrix::column(&elements[4..]),
        })
    }
}

impl GroupOps for Pose3 {
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

impl LieGroupOps for Pose3 {
    fn tangent_dim(&self) -> usize {
        6
    }

    fn from_tangent_like(&self, delta: &[Expr], epsilon: &Expr) -> Result<Self> {
        check_tangent_len("Pose3", 6, delta)?;
        Ok(Self {
            rotation: Rot3::from_tangent(&delta[..3], epsilon)?,
            position: Matrix::column(&delta[3..]),
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
