//! Geometric types for symlie.
//!
//! Every type here stores symbolic expressions and implements the
//! capability traits of `symlie_core::ops`, so the same value can be
//! evaluated numerically, differentiated through its tangent space or handed
//! to the code generator.
//!
//! - [`Matrix`]: dense matrices, a vector space under addition
//! - [`Rot2`], [`Rot3`]: rotations as unit complex numbers and quaternions
//! - [`Pose2`], [`Pose3`]: rigid transforms
//!
//! Sequences (`Vec<T>`) and pairs of these types are manifolds as well; see
//! `symlie_core::aggregate`.

pub mod matrix;
pub mod pose2;
pub mod pose3;
pub mod rot2;
pub mod rot3;

pub use matrix::Matrix;
pub use pose2::Pose2;
pub use pose3::Pose3;
pub use rot2::Rot2;
pub use rot3::Rot3;

use symlie_core::error::{Result, SymbolicError};

/// Checks that `point` is a column vector of length `n`.
pub(crate) fn point_shape(point: &Matrix, n: usize) -> Result<()> {
    if point.shape() == (n, 1) {
        Ok(())
    } else {
        Err(SymbolicError::shape_mismatch(
            format!("({n}, 1)"),
            format!("{:?}", point.shape()),
        ))
    }
}
