//! Structured value containers for symlie.
//!
//! [`Values`] is an insertion-ordered map from keys to [`Element`]s (scalars,
//! matrices, rotations, poses, nested containers and homogeneous
//! sequences). It flattens to a single storage vector described by an
//! [`Index`], which can be serialized and later used to rebuild the same
//! structure from storage, and it is itself a product Lie group so whole
//! containers can be differentiated against.
//!
//! # Example
//! ```
//! use symlie_core::ops::{LieGroupOps, StorageOps};
//! use symlie_core::Expr;
//! use symlie_geo::Rot3;
//! use symlie_values::Values;
//!
//! let mut values = Values::new();
//! values.add(&Expr::symbol("x")).unwrap();
//! values.insert("R", Rot3::symbolic("R")).unwrap();
//! assert_eq!(values.storage_dim(), 5);
//! assert_eq!(values.tangent_dim(), 4);
//!
//! let rebuilt = Values::from_storage_index(&values.to_storage(), &values.index()).unwrap();
//! assert_eq!(rebuilt, values);
//! ```

pub mod element;
pub mod index;
pub mod values;

pub use element::Element;
pub use index::{Datatype, Index, IndexEntry};
pub use values::{Values, ValuesScope};
