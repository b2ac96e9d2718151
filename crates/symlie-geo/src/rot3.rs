//! Spatial rotations SO(3) as unit quaternions.
//!
//! # Mathematical Definition
//!
//! ```text
//! SO(3) ≅ { q = (x, y, z, w) : x² + y² + z² + w² = 1 } / {q ~ -q}
//! ```
//!
//! - **Storage**: `[x, y, z, w]` (vector part first)
//! - **Tangent**: rotation vector `ω`, angle `|ω|` about axis `ω/|ω|`
//! - **Exponential map**: `q = (sin(|ω|/2)·ω/|ω|, cos(|ω|/2))`
//! - **Logarithm**: `ω = 2·acos(w)·xyz/|xyz|` with the sign of `w` folded in
//!
//! Both maps divide by a norm that vanishes at the identity. The norm is
//! biased by epsilon so that generated code stays finite there.

use std::f64::consts::PI;
use std::ops::Mul;

use rand::Rng;
use symlie_core::epsilon::{safe_asin, safe_atan2, sign_no_zero};
use symlie_core::error::Result;
use symlie_core::expr::Expr;
use symlie_core::ops::{check_storage_len, check_tangent_len, GroupOps, LieGroupOps, StorageOps};
use symlie_core::types::SymMatrix;

use crate::matrix::Matrix;
use crate::point_shape;

/// Rotation in space.
#[derive(Debug, Clone, PartialEq)]
pub struct Rot3 {
    x: Expr,
    y: Expr,
    z: Expr,
    w: Expr,
}

impl Rot3 {
    /// From quaternion components; no normalization is applied.
    pub fn from_quaternion(
        x: impl Into<Expr>,
        y: impl Into<Expr>,
        z: impl Into<Expr>,
        w: impl Into<Expr>,
    ) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            z: z.into(),
            w: w.into(),
        }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Self::from_quaternion(0.0, 0.0, 0.0, 1.0)
    }

    /// Symbolic rotation with components `{name}_x` .. `{name}_w`.
    pub fn symbolic(name: &str) -> Self {
        let c = |s: &str| Expr::symbol(format!("{name}_{s}"));
        Self::from_quaternion(c("x"), c("y"), c("z"), c("w"))
    }

    /// Rotation of `angle` about a unit `axis`.
    pub fn from_angle_axis(angle: impl Into<Expr>, axis: [Expr; 3]) -> Self {
        let half = angle.into() * 0.5;
        let s = half.sin();
        let [ax, ay, az] = axis;
        Self::from_quaternion(&s * ax, &s * ay, &s * az, half.cos())
    }

    /// Intrinsic Z-Y-X rotation: yaw about z, then pitch about y, then roll
    /// about x.
    pub fn from_yaw_pitch_roll(
        yaw: impl Into<Expr>,
        pitch: impl Into<Expr>,
        roll: impl Into<Expr>,
    ) -> Self {
        let (hy, hp, hr) = (yaw.into() * 0.5, pitch.into() * 0.5, roll.into() * 0.5);
        let (cy, sy) = (hy.cos(), hy.sin());
        let (cp, sp) = (hp.cos(), hp.sin());
        let (cr, sr) = (hr.cos(), hr.sin());
        Self::from_quaternion(
            &sr * &cp * &cy - &cr * &sp * &sy,
            &cr * &sp * &cy + &sr * &cp * &sy,
            &cr * &cp * &sy - &sr * &sp * &cy,
            &cr * &cp * &cy + &sr * &sp * &sy,
        )
    }

    /// Uniformly distributed numeric rotation (Shoemake's method).
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let (u1, u2, u3): (f64, f64, f64) = (rng.gen(), rng.gen(), rng.gen());
        let (a, b) = ((1.0 - u1).sqrt(), u1.sqrt());
        let (t2, t3) = (2.0 * PI * u2, 2.0 * PI * u3);
        Self::from_quaternion(a * t2.sin(), a * t2.cos(), b * t3.sin(), b * t3.cos())
    }

    /// Rebuilds from `[x, y, z, w]`.
    pub fn from_storage(elements: &[Expr]) -> Result<Self> {
        Self::identity().from_storage_like(elements)
    }

    /// Exponential map of a rotation vector.
    pub fn from_tangent(delta: &[Expr], epsilon: &Expr) -> Result<Self> {
        Self::identity().from_tangent_like(delta, epsilon)
    }

    /// Quaternion components `[x, y, z, w]`.
    pub fn quaternion(&self) -> [&Expr; 4] {
        [&self.x, &self.y, &self.z, &self.w]
    }

    /// The 3x3 rotation matrix.
    pub fn to_rotation_matrix(&self) -> Matrix {
        let (x, y, z, w) = (&self.x, &self.y, &self.z, &self.w);
        let two = |e: Expr| e * 2.0;
        let entries = [
            1.0 - two(y * y + z * z),
            two(x * y - z * w),
            two(x * z + y * w),
            two(x * y + z * w),
            1.0 - two(x * x + z * z),
            two(y * z - x * w),
            two(x * z - y * w),
            two(y * z + x * w),
            1.0 - two(x * x + y * y),
        ];
        Matrix::from_sym(SymMatrix::from_row_slice(3, 3, &entries))
    }

    /// `[yaw, pitch, roll]` matching [`from_yaw_pitch_roll`](Self::from_yaw_pitch_roll).
    ///
    /// Pitch is clamped away from ±π/2 by epsilon.
    pub fn to_yaw_pitch_roll(&self, epsilon: &Expr) -> [Expr; 3] {
        let (x, y, z, w) = (&self.x, &self.y, &self.z, &self.w);
        let yaw = safe_atan2(
            &((w * z + x * y) * 2.0),
            &(1.0 - (y * y + z * z) * 2.0),
            epsilon,
        );
        let pitch = safe_asin(&((w * y - z * x) * 2.0), epsilon);
        let roll = safe_atan2(
            &((w * x + y * z) * 2.0),
            &(1.0 - (x * x + y * y) * 2.0),
            epsilon,
        );
        [yaw, pitch, roll]
    }

    /// Rotates a 3-vector.
    pub fn rotate(&self, point: &Matrix) -> Result<Matrix> {
        point_shape(point, 3)?;
        self.to_rotation_matrix().matmul(point)
    }
}

impl Default for Rot3 {
    fn default() -> Self {
        Self::identity()
    }
}

/// Hamilton product.
impl Mul<&Rot3> for &Rot3 {
    type Output = Rot3;

    fn mul(self, rhs: &Rot3) -> Rot3 {
        let (x1, y1, z1, w1) = (&self.x, &self.y, &self.z, &self.w);
        let (x2, y2, z2, w2) = (&rhs.x, &rhs.y, &rhs.z, &rhs.w);
        Rot3 {
            x: w1 * x2 + x1 * w2 + y1 * z2 - z1 * y2,
            y: w1 * y2 - x1 * z2 + y1 * w2 + z1 * x2,
            z: w1 * z2 + x1 * y2 - y1 * x2 + z1 * w2,
            w: w1 * w2 - x1 * x2 - y1 * y2 - z1 * z2,
        }
    }
}

/// Point rotation.
///
/// # Panics
///
/// Panics unless `rhs` is a 3-vector. Use [`Rot3::rotate`] to get an error
/// instead.
impl Mul<&Matrix> for &Rot3 {
    type Output = Matrix;

    fn mul(self, rhs: &Matrix) -> Matrix {
        match self.rotate(rhs) {
            Ok(m) => m,
            Err(e) => panic!("Rot3 * Matrix: {e}"),
        }
    }
}

impl StorageOps for Rot3 {
    fn type_name(&self) -> String {
        "Rot3".to_string()
    }

    fn storage_dim(&self) -> usize {
        4
    }

    fn to_storage(&self) -> Vec<Expr> {
        vec![self.x.clone(), self.y.clone(), self.z.clone(), self.w.clone()]
    }

    fn from_storage_like(&self, elements: &[Expr]) -> Result<Self> {
        check_storage_len("Rot3", 4, elements)?;
        Ok(Self::from_quaternion(
            elements[0].clone(),
            elements[1].clone(),
            elements[2].clone(),
            elements[3].clone(),
        ))
    }
}

impl GroupOps for Rot3 {
    fn identity_like(&self) -> Self {
        Self::identity()
    }

    fn compose(&self, other: &Self) -> Result<Self> {
        Ok(self * other)
    }

    fn inverse(&self) -> Self {
        Self::from_quaternion(-&self.x, -&self.y, -&self.z, self.w.clone())
    }
}

impl LieGroupOps for Rot3 {
    fn tangent_dim(&self) -> usize {
        3
    }

    fn from_tangent_like(&self, delta: &[Expr], epsilon: &Expr) -> Result<Self> {
        check_tangent_len("Rot3", 3, delta)?;
        let norm = (delta.iter().map(Expr::squared).sum::<Expr>() + epsilon.squared()).sqrt();
        let half = &norm * 0.5;
        let scale = half.sin() / &norm;
        Ok(Self::from_quaternion(
            &scale * &delta[0],
            &scale * &delta[1],
            &scale * &delta[2],
            half.cos(),
        ))
    }

    fn to_tangent(&self, epsilon: &Expr) -> Vec<Expr> {
        let flip = sign_no_zero(&self.w);
        let w_safe = (&self.w * &flip).min_expr(&(1.0 - epsilon));
        let norm = (1.0 - w_safe.squared()).max_expr(epsilon).sqrt();
        let scale = w_safe.acos() * 2.0 * flip / norm;
        vec![&scale * &self.x, &scale * &self.y, &scale * &self.z]
    }

    /// `d(q ⊗ exp(δ))/dδ` at zero is half the product of `q` with the pure
    /// unit quaternions.
    fn storage_d_tangent(&self) -> Result<SymMatrix> {
        let (x, y, z, w) = (
            &self.x * 0.5,
            &self.y * 0.5,
            &self.z * 0.5,
            &self.w * 0.5,
        );
        #[rustfmt::skip]
        let entries = [
            w.clone(), -&z, y.clone(),
            z.clone(), w.clone(), -&x,
            -&y, x.clone(), w,
            -x, -y, -z,
        ];
        Ok(SymMatrix::from_row_slice(4, 3, &entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use symlie_core::eval::Bindings;

    fn values(r: &Rot3) -> Vec<f64> {
        r.evalf(&Bindings::new()).unwrap()
    }

    #[test]
    fn test_angle_axis_matches_tangent() {
        let eps = Expr::zero();
        let axis = [Expr::zero(), Expr::zero(), Expr::one()];
        let a = Rot3::from_angle_axis(0.7, axis);
        let b = Rot3::from_tangent(&[Expr::zero(), Expr::zero(), Expr::constant(0.7)], &eps).unwrap();
        for (u, v) in values(&a).iter().zip(values(&b)) {
            assert_relative_eq!(*u, v, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_yaw_pitch_roll_round_trip() {
        let r = Rot3::from_yaw_pitch_roll(0.3, -0.4, 1.1);
        let env = Bindings::new();
        let [yaw, pitch, roll] = r.to_yaw_pitch_roll(&Expr::constant(1e-12));
        assert_relative_eq!(yaw.eval(&env).unwrap(), 0.3, epsilon = 1e-9);
        assert_relative_eq!(pitch.eval(&env).unwrap(), -0.4, epsilon = 1e-9);
        assert_relative_eq!(roll.eval(&env).unwrap(), 1.1, epsilon = 1e-9);
    }

    #[test]
    fn test_rotation_matrix_rotates_like_quaternion() {
        let r = Rot3::from_yaw_pitch_roll(0.2, 0.5, -0.3);
        let p = Matrix::column_f64(&[1.0, -2.0, 0.5]);
        let via_matrix = r.rotate(&p).unwrap();
        let pure = Rot3::from_quaternion(1.0, -2.0, 0.5, 0.0);
        let via_quaternion = &(&r * &pure) * &r.inverse();
        let expected = values(&via_quaternion);
        let actual = via_matrix.eval(&Bindings::new()).unwrap();
        for i in 0..3 {
            assert_relative_eq!(actual[(i, 0)], expected[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_to_tangent_at_identity_is_finite_with_epsilon() {
        let tangent = Rot3::identity().to_tangent(&Expr::constant(1e-10));
        for t in tangent {
            assert_relative_eq!(t.eval(&Bindings::new()).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_to_tangent_picks_short_rotation() {
        let eps = Expr::constant(1e-12);
        let delta = [Expr::constant(0.1), Expr::constant(-0.2), Expr::constant(0.3)];
        let q = Rot3::from_tangent(&delta, &Expr::zero()).unwrap();
        let negated = Rot3::from_storage(&q.to_storage().iter().map(|e| -e).collect::<Vec<_>>()).unwrap();
        let tangent = negated.to_tangent(&eps);
        for (t, d) in tangent.iter().zip(&delta) {
            assert_relative_eq!(
                t.eval(&Bindings::new()).unwrap(),
                d.as_constant().unwrap(),
                epsilon = 1e-9
            );
        }
    }
}
