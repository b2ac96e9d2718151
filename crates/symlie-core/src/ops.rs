//! Capability traits shared by every manifold-valued type.
//!
//! The three traits form a ladder:
//!
//! - [`StorageOps`]: a flat sequence of scalar expressions that fully
//!   describes the value.
//! - [`GroupOps`]: identity, composition and inverse.
//! - [`LieGroupOps`]: a tangent space with `from_tangent`/`to_tangent` and the
//!   derived `retract`/`local_coordinates` pair.
//!
//! Methods that construct `Self` are bounded by `Self: Sized`, which keeps
//! the remaining methods usable through `&dyn LieGroupOps`. That subset is
//! exactly what the differentiation engine needs.

use std::fmt::Debug;

use crate::error::{Result, SymbolicError};
use crate::eval::{eval_all, Bindings};
use crate::expr::Expr;
use crate::subs::Substitution;
use crate::types::{sym_identity, sym_zeros, SymMatrix};

/// Prefix of the perturbation symbols used by
/// [`storage_d_tangent_from_retract`].
pub const TANGENT_PERTURBATION_PREFIX: &str = "_delta";

/// Types that flatten to a fixed-length sequence of scalar expressions.
pub trait StorageOps: Debug {
    /// Name used in error messages and generated type signatures.
    fn type_name(&self) -> String;

    /// Number of scalars in the flattened form.
    fn storage_dim(&self) -> usize;

    /// The flattened form.
    fn to_storage(&self) -> Vec<Expr>;

    /// Rebuilds a value of the same shape from a flattened form.
    fn from_storage_like(&self, elements: &[Expr]) -> Result<Self>
    where
        Self: Sized;

    /// Substitutes `replacement` for the symbol `target` in every scalar.
    fn subs(&self, target: &Expr, replacement: &Expr) -> Result<Self>
    where
        Self: Sized,
    {
        let mut map = Substitution::with_capacity(1);
        map.insert(target.clone(), replacement.clone());
        self.subs_many(&map)
    }

    /// Simultaneous substitution in every scalar.
    fn subs_many(&self, map: &Substitution) -> Result<Self>
    where
        Self: Sized,
    {
        let storage = self
            .to_storage()
            .iter()
            .map(|e| e.subs_many(map))
            .collect::<Result<Vec<_>>>()?;
        self.from_storage_like(&storage)
    }

    /// Evaluates the flattened form numerically.
    fn evalf(&self, bindings: &Bindings) -> Result<Vec<f64>> {
        eval_all(&self.to_storage(), bindings)
    }

    /// A value of the same shape with every scalar evaluated to a constant.
    fn evaluated(&self, bindings: &Bindings) -> Result<Self>
    where
        Self: Sized,
    {
        let storage: Vec<Expr> = self
            .evalf(bindings)?
            .into_iter()
            .map(Expr::constant)
            .collect();
        self.from_storage_like(&storage)
    }

    /// Simplifies every scalar.
    fn simplify(&self) -> Result<Self>
    where
        Self: Sized,
    {
        let storage: Vec<Expr> = self.to_storage().iter().map(Expr::simplify).collect();
        self.from_storage_like(&storage)
    }

    /// Whether every scalar is free of symbols.
    fn is_numeric(&self) -> bool {
        self.to_storage().iter().all(Expr::is_constant)
    }
}

/// Types forming a group.
pub trait GroupOps: StorageOps {
    /// The identity element of the same shape.
    fn identity_like(&self) -> Self
    where
        Self: Sized;

    /// Group composition `self * other`.
    fn compose(&self, other: &Self) -> Result<Self>
    where
        Self: Sized;

    /// Group inverse.
    fn inverse(&self) -> Self
    where
        Self: Sized;

    /// `inverse(self) * other`.
    fn between(&self, other: &Self) -> Result<Self>
    where
        Self: Sized,
    {
        self.inverse().compose(other)
    }
}

/// Groups with a tangent space.
pub trait LieGroupOps: GroupOps {
    /// Degrees of freedom.
    fn tangent_dim(&self) -> usize;

    /// Exponential map from a tangent vector to a value of the same shape.
    fn from_tangent_like(&self, delta: &[Expr], epsilon: &Expr) -> Result<Self>
    where
        Self: Sized;

    /// Logarithm map to the tangent space at identity.
    fn to_tangent(&self, epsilon: &Expr) -> Vec<Expr>;

    /// `self * from_tangent(delta)`.
    fn retract(&self, delta: &[Expr], epsilon: &Expr) -> Result<Self>
    where
        Self: Sized,
    {
        self.compose(&self.from_tangent_like(delta, epsilon)?)
    }

    /// `to_tangent(between(self, other))`, the inverse of [`retract`](Self::retract).
    fn local_coordinates(&self, other: &Self, epsilon: &Expr) -> Result<Vec<Expr>>
    where
        Self: Sized,
    {
        Ok(self.between(other)?.to_tangent(epsilon))
    }

    /// Derivative of the storage with respect to a tangent perturbation at
    /// zero, shaped `storage_dim x tangent_dim`.
    fn storage_d_tangent(&self) -> Result<SymMatrix>;
}

/// Checks a storage slice length against the expected dimension.
pub fn check_storage_len(datatype: &str, expected: usize, elements: &[Expr]) -> Result<()> {
    if elements.len() == expected {
        Ok(())
    } else {
        Err(SymbolicError::storage_dimension(
            datatype,
            expected,
            elements.len(),
        ))
    }
}

/// Checks a tangent slice length against the expected dimension.
pub fn check_tangent_len(datatype: &str, expected: usize, delta: &[Expr]) -> Result<()> {
    if delta.len() == expected {
        Ok(())
    } else {
        Err(SymbolicError::tangent_dimension(
            datatype,
            expected,
            delta.len(),
        ))
    }
}

/// `storage_d_tangent` by differentiating `retract(value, delta)` with
/// respect to fresh perturbation symbols and setting them to zero.
///
/// Epsilon is zero in the retraction, so this is only suitable for types
/// whose retraction is smooth at zero without epsilon guarding.
pub fn storage_d_tangent_from_retract<T: LieGroupOps>(value: &T) -> Result<SymMatrix> {
    let tangent_dim = value.tangent_dim();
    let deltas: Vec<Expr> = (0..tangent_dim)
        .map(|i| Expr::symbol(format!("{TANGENT_PERTURBATION_PREFIX}{i}")))
        .collect();
    let storage = value.retract(&deltas, &Expr::zero())?.to_storage();
    let at_zero: Substitution = deltas.iter().map(|d| (d.clone(), Expr::zero())).collect();

    let mut out = sym_zeros(storage.len(), tangent_dim);
    for (r, element) in storage.iter().enumerate() {
        for (c, delta) in deltas.iter().enumerate() {
            out[(r, c)] = element.diff(delta)?.xreplace(&at_zero);
        }
    }
    Ok(out)
}

impl StorageOps for Expr {
    fn type_name(&self) -> String {
        "Scalar".to_string()
    }

    fn storage_dim(&self) -> usize {
        1
    }

    fn to_storage(&self) -> Vec<Expr> {
        vec![self.clone()]
    }

    fn from_storage_like(&self, elements: &[Expr]) -> Result<Self> {
        check_storage_len("Scalar", 1, elements)?;
        Ok(elements[0].clone())
    }
}

impl GroupOps for Expr {
    fn identity_like(&self) -> Self {
        Expr::zero()
    }

    fn compose(&self, other: &Self) -> Result<Self> {
        Ok(self + other)
    }

    fn inverse(&self) -> Self {
        -self
    }
}

impl LieGroupOps for Expr {
    fn tangent_dim(&self) -> usize {
        1
    }

    fn from_tangent_like(&self, delta: &[Expr], _epsilon: &Expr) -> Result<Self> {
        check_tangent_len("Scalar", 1, delta)?;
        Ok(delta[0].clone())
    }

    fn to_tangent(&self, _epsilon: &Expr) -> Vec<Expr> {
        vec![self.clone()]
    }

    fn storage_d_tangent(&self) -> Result<SymMatrix> {
        Ok(sym_identity(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_group_laws() {
        let a = Expr::symbol("a");
        let b = Expr::symbol("b");
        let eps = Expr::zero();
        assert!(a.compose(&a.inverse()).unwrap().is_zero());
        assert_eq!(a.identity_like().compose(&a).unwrap(), a);
        assert_eq!(a.between(&b).unwrap(), &b - &a);

        let d = vec![Expr::symbol("d")];
        let moved = a.retract(&d, &eps).unwrap();
        assert_eq!(a.local_coordinates(&moved, &eps).unwrap(), d);
    }

    #[test]
    fn test_dimension_errors() {
        let a = Expr::symbol("a");
        assert!(matches!(
            a.from_storage_like(&[]),
            Err(SymbolicError::StorageDimension { .. })
        ));
        assert!(matches!(
            a.from_tangent_like(&[a.clone(), a.clone()], &Expr::zero()),
            Err(SymbolicError::TangentDimension { .. })
        ));
    }

    #[test]
    fn test_default_storage_d_tangent_matches_scalar() {
        let a = Expr::symbol("a");
        assert_eq!(storage_d_tangent_from_retract(&a).unwrap(), sym_identity(1));
    }

    #[test]
    fn test_object_safe_subset() {
        let a = Expr::symbol("a");
        let erased: &dyn LieGroupOps = &a;
        assert_eq!(erased.storage_dim(), 1);
        assert_eq!(erased.tangent_dim(), 1);
        assert_eq!(erased.storage_d_tangent().unwrap().shape(), (1, 1));
        assert!(!erased.is_numeric());
    }

    #[test]
    fn test_trait_subs_and_evalf() {
        let a = Expr::symbol("a");
        let e = a.sin();
        let replaced = StorageOps::subs(&e, &a, &Expr::zero()).unwrap();
        assert!(replaced.is_zero());
        let v = e.evalf(&Bindings::new().with("a", 0.0)).unwrap();
        assert_eq!(v, vec![0.0]);
    }
}
