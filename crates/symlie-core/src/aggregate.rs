//! Products of manifolds: homogeneous sequences and pairs.
//!
//! Storage and tangent vectors are concatenations of the members' in order,
//! every group operation acts member-wise and `storage_d_tangent` is block
//! diagonal.

use crate::error::{Result, SymbolicError};
use crate::expr::Expr;
use crate::ops::{check_storage_len, check_tangent_len, GroupOps, LieGroupOps, StorageOps};
use crate::types::{block_diagonal, SymMatrix};

/// Splits `elements` into consecutive chunks of the given lengths.
fn split_by<'a>(elements: &'a [Expr], lengths: impl IntoIterator<Item = usize>) -> Vec<&'a [Expr]> {
    let mut offset = 0;
    lengths
        .into_iter()
        .map(|len| {
            let chunk = &elements[offset..offset + len];
            offset += len;
            chunk
        })
        .collect()
}

fn check_same_len<T>(a: &[T], b: &[T]) -> Result<()> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(SymbolicError::shape_mismatch(
            format!("{} elements", a.len()),
            format!("{} elements", b.len()),
        ))
    }
}

impl<T: StorageOps> StorageOps for Vec<T> {
    fn type_name(&self) -> String {
        let inner = self.first().map_or_else(|| "_".to_string(), StorageOps::type_name);
        format!("Vec<{inner}; {}>", self.len())
    }

    fn storage_dim(&self) -> usize {
        self.iter().map(StorageOps::storage_dim).sum()
    }

    fn to_storage(&self) -> Vec<Expr> {
        self.iter().flat_map(StorageOps::to_storage).collect()
    }

    fn from_storage_like(&self, elements: &[Expr]) -> Result<Self> {
        check_storage_len(&self.type_name(), self.storage_dim(), elements)?;
        self.iter()
            .zip(split_by(elements, self.iter().map(StorageOps::storage_dim)))
            .map(|(item, chunk)| item.from_storage_like(chunk))
            .collect()
    }
}

impl<T: GroupOps> GroupOps for Vec<T> {
    fn identity_like(&self) -> Self {
        self.iter().map(GroupOps::identity_like).collect()
    }

    fn compose(&self, other: &Self) -> Result<Self> {
        check_same_len(self, other)?;
        self.iter().zip(other).map(|(a, b)| a.compose(b)).collect()
    }

    fn inverse(&self) -> Self {
        self.iter().map(GroupOps::inverse).collect()
    }
}

impl<T: LieGroupOps> LieGroupOps for Vec<T> {
    fn tangent_dim(&self) -> usize {
        self.iter().map(LieGroupOps::tangent_dim).sum()
    }

    fn from_tangent_like(&self, delta: &[Expr], epsilon: &Expr) -> Result<Self> {
        check_tangent_len(&self.type_name(), self.tangent_dim(), delta)?;
        self.iter()
            .zip(split_by(delta, self.iter().map(LieGroupOps::tangent_dim)))
            .map(|(item, chunk)| item.from_tangent_like(chunk, epsilon))
            .collect()
    }

    fn to_tangent(&self, epsilon: &Expr) -> Vec<Expr> {
        self.iter().flat_map(|item| item.to_tangent(epsilon)).collect()
    }

    fn storage_d_tangent(&self) -> Result<SymMatrix> {
        let blocks = self
            .iter()
            .map(LieGroupOps::storage_d_tangent)
            .collect::<Result<Vec<_>>>()?;
        Ok(block_diagonal(&blocks))
    }
}

impl<A: StorageOps, B: StorageOps> StorageOps for (A, B) {
    fn type_name(&self) -> String {
        format!("({}, {})", self.0.type_name(), self.1.type_name())
    }

    fn storage_dim(&self) -> usize {
        self.0.storage_dim() + self.1.storage_dim()
    }

    fn to_storage(&self) -> Vec<Expr> {
        let mut storage = self.0.to_storage();
        storage.extend(self.1.to_storage());
        storage
    }

    fn from_storage_like(&self, elements: &[Expr]) -> Result<Self> {
        check_storage_len(&self.type_name(), self.storage_dim(), elements)?;
        let (head, tail) = elements.split_at(self.0.storage_dim());
        Ok((self.0.from_storage_like(head)?, self.1.from_storage_like(tail)?))
    }
}

impl<A: GroupOps, B: GroupOps> GroupOps for (A, B) {
    fn identity_like(&self) -> Self {
        (self.0.identity_like(), self.1.identity_like())
    }

    fn compose(&self, other: &Self) -> Result<Self> {
        Ok((self.0.compose(&other.0)?, self.1.compose(&other.1)?))
    }

    fn inverse(&self) -> Self {
        (self.0.inverse(), self.1.inverse())
    }
}

impl<A: LieGroupOps, B: LieGroupOps> LieGroupOps for (A, B) {
    fn tangent_dim(&self) -> usize {
        self.0.tangent_dim() + self.1.tangent_dim()
    }

    fn from_tangent_like(&self, delta: &[Expr], epsilon: &Expr) -> Result<Self> {
        check_tangent_len(&self.type_name(), self.tangent_dim(), delta)?;
        let (head, tail) = delta.split_at(self.0.tangent_dim());
        Ok((
            self.0.from_tangent_like(head, epsilon)?,
            self.1.from_tangent_like(tail, epsilon)?,
        ))
    }

    fn to_tangent(&self, epsilon: &Expr) -> Vec<Expr> {
        let mut tangent = self.0.to_tangent(epsilon);
        tangent.extend(self.1.to_tangent(epsilon));
        tangent
    }

    fn storage_d_tangent(&self) -> Result<SymMatrix> {
        Ok(block_diagonal(&[
            self.0.storage_d_tangent()?,
            self.1.storage_d_tangent()?,
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_dimensions() {
        let seq = vec![Expr::symbol("a"), Expr::symbol("b"), Expr::symbol("c")];
        assert_eq!(seq.storage_dim(), 3);
        assert_eq!(seq.tangent_dim(), 3);
        assert_eq!(seq.storage_d_tangent().unwrap().shape(), (3, 3));
        assert_eq!(seq.from_storage_like(&seq.to_storage()).unwrap(), seq);
        assert!(seq.from_storage_like(&seq.to_storage()[1..]).is_err());
    }

    #[test]
    fn test_sequence_compose_length_mismatch() {
        let a = vec![Expr::zero(); 2];
        let b = vec![Expr::zero(); 3];
        assert!(matches!(a.compose(&b), Err(SymbolicError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_nested_pair_block_structure() {
        let pair = (Expr::symbol("s"), vec![Expr::symbol("u"), Expr::symbol("v")]);
        assert_eq!(pair.type_name(), "(Scalar, Vec<Scalar; 2>)");
        let m = pair.storage_d_tangent().unwrap();
        assert_eq!(m.shape(), (3, 3));
        assert!(m[(0, 0)].is_one());
        assert!(m[(0, 1)].is_zero());
        assert!(m[(2, 2)].is_one());

        let delta = [Expr::symbol("d0"), Expr::zero(), Expr::one()];
        let moved = pair.retract(&delta, &Expr::zero()).unwrap();
        assert_eq!(moved.0, Expr::symbol("s") + Expr::symbol("d0"));
        assert_eq!(moved.1[1], Expr::symbol("v") + 1.0);
        assert_eq!(
            pair.local_coordinates(&moved, &Expr::zero()).unwrap(),
            delta.to_vec()
        );
    }
}
