//! Symbolic residuals on Lie groups, compiled to specialized code.
//!
//! `symlie` builds residual functions out of hash-consed symbolic
//! expressions over scalars, matrices, rotations and poses, differentiates
//! them in the tangent space of each argument, and emits flat, singularity
//! safe C++, Python or Rust.
//!
//! The facade re-exports the member crates:
//!
//! - [`core`]: expressions, evaluation, differentiation, simplification, CSE
//! - [`geo`]: `Rot2`, `Rot3`, `Pose2`, `Pose3` and symbolic matrices
//! - [`values`]: ordered, nestable containers of named elements
//! - [`autodiff`]: tangent-space jacobians and linearization blocks
//! - [`codegen`]: per-language backends and the generation entry points
//!
//! # Example
//! ```
//! use symlie::prelude::*;
//!
//! let names = NameScope::new();
//! let (pose, landmark) = {
//!     let _guard = names.enter("factor");
//!     (Pose3::symbolic(&names.qualify("T")), Matrix::symbolic(&names.qualify("p"), 3, 1))
//! };
//!
//! let mut inputs = Values::new();
//! inputs.insert("pose", pose.clone()).unwrap();
//! inputs.insert("landmark", landmark.clone()).unwrap();
//! let mut outputs = Values::new();
//! outputs.insert("res", pose.transform_point(&landmark).unwrap()).unwrap();
//!
//! let codegen = Codegen::new("landmark_residual", inputs, outputs, PythonConfig::default())
//!     .unwrap()
//!     .with_jacobians(&["pose"], true)
//!     .unwrap();
//! let function = codegen.render(None).unwrap();
//! assert_eq!(function.signature, "def landmark_residual_with_jacobians0(pose, landmark):");
//! ```

pub use symlie_autodiff as autodiff;
pub use symlie_codegen as codegen;
pub use symlie_core as core;
pub use symlie_geo as geo;
pub use symlie_values as values;

pub use nalgebra;

pub use symlie_codegen::{Codegen, CodegenError, GeneratedArtifact};
pub use symlie_core::{Expr, SymbolicError};
pub use symlie_values::Values;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use symlie_autodiff::prelude::*;
    pub use symlie_codegen::prelude::*;
    pub use symlie_core::prelude::*;
    pub use symlie_geo::{Matrix, Pose2, Pose3, Rot2, Rot3};
    pub use symlie_values::{Element, Values};
}
