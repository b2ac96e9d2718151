//! Serialization index describing where each entry lives in flat storage.
//!
//! An [`Index`] maps each top-level key of a [`Values`](crate::Values) to an
//! [`IndexEntry`] giving the entry's offset and length in the container's
//! storage vector, plus enough type information to rebuild it. Nested
//! containers and sequences carry an `item_index` whose offsets are relative
//! to the start of their parent entry.

use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use symlie_core::error::{Result, SymbolicError};
use symlie_core::expr::Expr;
use symlie_core::ops::StorageOps;
use symlie_geo::{Matrix, Pose2, Pose3, Rot2, Rot3};

use crate::element::Element;
use crate::values::Values;

/// Ordered key to entry mapping.
pub type Index = IndexMap<String, IndexEntry>;

/// The kind of value stored under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Datatype {
    /// A single expression.
    Scalar,
    /// A dense matrix; the entry carries its shape.
    Matrix,
    /// A planar rotation.
    Rot2,
    /// A spatial rotation.
    Rot3,
    /// A planar pose.
    Pose2,
    /// A spatial pose.
    Pose3,
    /// A nested container; the entry carries its item index.
    Values,
    /// A sequence; the item index is keyed by position.
    Sequence,
}

/// Location and type of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IndexEntry {
    /// First storage position of the entry.
    pub offset: usize,
    /// Number of storage positions.
    pub storage_dim: usize,
    /// Kind of value.
    pub datatype: Datatype,
    /// `(rows, cols)` for matrices.
    pub shape: Option<(usize, usize)>,
    /// Layout of the members of containers and sequences.
    pub item_index: Option<Index>,
}

/// Builds the index entry of `element` placed at `offset`.
pub(crate) fn entry_for(element: &Element, offset: usize) -> IndexEntry {
    let item_index = match element {
        Element::Values(v) => Some(v.index()),
        Element::Sequence(items) => Some(sequence_index(items)),
        _ => None,
    };
    IndexEntry {
        offset,
        storage_dim: element.storage_dim(),
        datatype: element.datatype(),
        shape: element.as_matrix().map(Matrix::shape),
        item_index,
    }
}

fn sequence_index(items: &[Element]) -> Index {
    let mut index = Index::with_capacity(items.len());
    let mut offset = 0;
    for (i, item) in items.iter().enumerate() {
        let entry = entry_for(item, offset);
        offset += entry.storage_dim;
        index.insert(i.to_string(), entry);
    }
    index
}

fn missing(what: &str, datatype: Datatype) -> SymbolicError {
    SymbolicError::key(format!("{datatype:?} index entry has no {what}"))
}

/// Rebuilds one element from its own storage slice.
pub(crate) fn element_from_storage(storage: &[Expr], entry: &IndexEntry) -> Result<Element> {
    Ok(match entry.datatype {
        Datatype::Scalar => Element::Scalar(Expr::zero().from_storage_like(storage)?),
        Datatype::Matrix => {
            let (rows, cols) = entry.shape.ok_or_else(|| missing("shape", entry.datatype))?;
            Element::Matrix(Matrix::zeros(rows, cols).from_storage_like(storage)?)
        }
        Datatype::Rot2 => Element::Rot2(Rot2::from_storage(storage)?),
        Datatype::Rot3 => Element::Rot3(Rot3::from_storage(storage)?),
        Datatype::Pose2 => Element::Pose2(Pose2::from_storage(storage)?),
        Datatype::Pose3 => Element::Pose3(Pose3::from_storage(storage)?),
        Datatype::Values => {
            let items = entry
                .item_index
                .as_ref()
                .ok_or_else(|| missing("item index", entry.datatype))?;
            Element::Values(Values::from_storage_index(storage, items)?)
        }
        Datatype::Sequence => {
            let items = entry
                .item_index
                .as_ref()
                .ok_or_else(|| missing("item index", entry.datatype))?;
            let members = items
                .values()
                .map(|item| element_from_storage(slice(storage, item)?, item))
                .collect::<Result<Vec<_>>>()?;
            Element::sequence(members)?
        }
    })
}

/// The part of `storage` an entry covers.
pub(crate) fn slice<'a>(storage: &'a [Expr], entry: &IndexEntry) -> Result<&'a [Expr]> {
    storage
        .get(entry.offset..entry.offset + entry.storage_dim)
        .ok_or_else(|| {
            SymbolicError::storage_dimension(
                format!("{:?}", entry.datatype),
                entry.offset + entry.storage_dim,
                storage.len(),
            )
        })
}

/// Total storage length an index describes.
pub fn index_storage_dim(index: &Index) -> usize {
    index.values().map(|entry| entry.storage_dim).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_entry_requires_shape() {
        let entry = IndexEntry {
            offset: 0,
            storage_dim: 2,
            datatype: Datatype::Matrix,
            shape: None,
            item_index: None,
        };
        let storage = [Expr::zero(), Expr::one()];
        assert!(matches!(
            element_from_storage(&storage, &entry),
            Err(SymbolicError::Key { .. })
        ));
    }

    #[test]
    fn test_sequence_offsets_are_relative() {
        let seq = Element::sequence(vec![Rot2::identity().into(), Rot2::symbolic("R").into()]).unwrap();
        let entry = entry_for(&seq, 5);
        assert_eq!(entry.offset, 5);
        let items = entry.item_index.unwrap();
        assert_eq!(items["0"].offset, 0);
        assert_eq!(items["1"].offset, 2);
        assert_eq!(index_storage_dim(&items), 4);
    }
}
