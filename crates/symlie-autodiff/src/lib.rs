//! Tangent-space differentiation for symlie.
//!
//! Jacobians here are taken with respect to the tangent space of each
//! input rather than its raw storage, so a `Rot3` contributes three columns
//! and not four.
//!
//! # Architecture
//!
//! 1. **jacobian**: storage partials chained with `storage_d_tangent`
//! 2. **linearization**: residual, jacobian and Gauss-Newton blocks
//! 3. **numerical**: central differences through `retract`, for checking
//!
//! # Example
//! ```
//! use symlie_autodiff::prelude::*;
//! use symlie_core::prelude::*;
//! use symlie_geo::{Matrix, Rot3};
//!
//! let rot = Rot3::symbolic("R");
//! let point = Matrix::symbolic("p", 3, 1);
//! let rotated = rot.rotate(&point).unwrap();
//! let j = jacobian(&rotated.entries(), &[&rot, &point]).unwrap();
//! assert_eq!(j.shape(), (3, 6));
//! ```

pub mod jacobian;
pub mod linearization;
pub mod numerical;

pub use jacobian::{jacobian, storage_jacobian, tangent_jacobian, JacobianExt};
pub use linearization::Linearization;
pub use numerical::numerical_jacobian;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::jacobian::{jacobian, storage_jacobian, tangent_jacobian, JacobianExt};
    pub use crate::linearization::Linearization;
    pub use crate::numerical::{numerical_jacobian, DEFAULT_STEP};
}
