//! Code generation for symlie residuals.
//!
//! A [`Codegen`] takes symbolic inputs and outputs held in
//! [`Values`](symlie_values::Values) and emits a specialized function in C++,
//! Python or Rust. Inputs become typed arguments, common subexpressions
//! become temporaries, and jacobian or Gauss-Newton outputs can be added on
//! the way.
//!
//! # Architecture
//!
//! 1. **codegen**: validation, jacobian augmentation, entry points
//! 2. **lower**: typed arguments, simplification and CSE
//! 3. **backend**: one printer per language behind the [`Backend`] trait
//! 4. **artifact**: staged, all-or-nothing writes to disk
//!
//! # Example
//! ```
//! use symlie_codegen::prelude::*;
//! use symlie_geo::{Matrix, Rot3};
//! use symlie_values::Values;
//!
//! let rot = Rot3::symbolic("R");
//! let point = Matrix::symbolic("p", 3, 1);
//!
//! let mut inputs = Values::new();
//! inputs.insert("R", rot.clone()).unwrap();
//! inputs.insert("p", point.clone()).unwrap();
//! let mut outputs = Values::new();
//! outputs.insert("rotated", rot.rotate(&point).unwrap()).unwrap();
//!
//! let codegen = Codegen::new("rotate_point", inputs, outputs, CppConfig::default())
//!     .unwrap()
//!     .with_return_key("rotated")
//!     .unwrap();
//! let function = codegen.render(None).unwrap();
//! assert!(function.signature.starts_with("Eigen::Matrix<Scalar, 3, 1> RotatePoint("));
//! ```

pub mod artifact;
pub mod backend;
pub mod codegen;
pub mod config;
pub mod error;
pub mod lower;
pub mod names;

pub use artifact::{GeneratedArtifact, GeneratedFile, GeneratedFunction};
pub use backend::Backend;
pub use codegen::{generate_many, Codegen};
pub use config::{CodegenConfig, CppConfig, Language, PythonConfig, RustConfig};
pub use error::{CodegenError, CodegenResult};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::artifact::{GeneratedArtifact, GeneratedFunction};
    pub use crate::codegen::{generate_many, Codegen};
    pub use crate::config::{CodegenConfig, CppConfig, Language, PythonConfig, RustConfig};
    pub use crate::error::{CodegenError, CodegenResult};
}
