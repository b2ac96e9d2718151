//! Ordered, nestable containers of symbolic values.
//!
//! Keys may be dotted (`"pose.R"`): each segment but the last names a nested
//! [`Values`], created on demand by [`Values::set`]. Storage and tangent
//! vectors follow insertion order depth-first, and the whole container is a
//! product manifold of its entries.

use std::fmt;

use indexmap::IndexMap;
use symlie_core::error::{Result, SymbolicError};
use symlie_core::expr::Expr;
use symlie_core::ops::{check_storage_len, check_tangent_len, GroupOps, LieGroupOps, StorageOps};
use symlie_core::scope::{NameScope, ScopeGuard};
use symlie_core::types::{block_diagonal, SymMatrix};

use crate::element::Element;
use crate::index::{element_from_storage, entry_for, index_storage_dim, slice, Index};

/// Ordered mapping from keys to [`Element`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    items: IndexMap<String, Element>,
}

fn split_key(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(SymbolicError::key(format!("malformed key '{key}'")));
    }
    Ok(segments)
}

impl Values {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Walks to the container that owns the last segment of `key`, creating
    /// intermediate containers.
    fn parent_mut<'a, 'k>(&'a mut self, key: &'k str) -> Result<(&'a mut Values, &'k str)> {
        let segments = split_key(key)?;
        let (leaf, path) = segments
            .split_last()
            .ok_or_else(|| SymbolicError::key("empty key"))?;
        let mut current = self;
        for segment in path {
            current = current
                .items
                .entry((*segment).to_string())
                .or_insert_with(|| Element::Values(Values::new()))
                .as_values_mut()
                .ok_or_else(|| {
                    SymbolicError::key(format!("'{segment}' in '{key}' is not a Values container"))
                })?;
        }
        Ok((current, leaf))
    }

    /// Sets `key`, replacing any previous value, and returns the previous
    /// value.
    pub fn set(&mut self, key: &str, value: impl Into<Element>) -> Result<Option<Element>> {
        let (parent, leaf) = self.parent_mut(key)?;
        Ok(parent.items.insert(leaf.to_string(), value.into()))
    }

    /// Inserts a new `key`.
    pub fn insert(&mut self, key: &str, value: impl Into<Element>) -> Result<()> {
        if self.contains_key(key) {
            return Err(SymbolicError::duplicate_key(key));
        }
        self.set(key, value).map(|_| ())
    }

    /// Inserts a symbol under its own name.
    pub fn add(&mut self, symbol: &Expr) -> Result<()> {
        let name = symbol.symbol_name().ok_or_else(|| {
            SymbolicError::type_error(format!("only symbols can be added by name, got {symbol}"))
        })?;
        self.insert(name, symbol.clone())
    }

    /// The value at a possibly dotted `key`.
    pub fn get(&self, key: &str) -> Option<&Element> {
        let mut segments = key.split('.');
        let mut current = self.items.get(segments.next()?)?;
        for segment in segments {
            current = current.as_values()?.items.get(segment)?;
        }
        Some(current)
    }

    /// The value at a possibly dotted `key`, mutably.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Element> {
        let mut segments = key.split('.');
        let mut current = self.items.get_mut(segments.next()?)?;
        for segment in segments {
            current = current.as_values_mut()?.items.get_mut(segment)?;
        }
        Some(current)
    }

    /// Whether a possibly dotted `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Element> {
        match key.rsplit_once('.') {
            Some((parent, leaf)) => self
                .get_mut(parent)?
                .as_values_mut()?
                .items
                .shift_remove(leaf),
            None => self.items.shift_remove(key),
        }
    }

    /// Top-level keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Top-level entries in insertion order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &Element)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Leaf entries with full keys; nested containers are flattened with
    /// dotted keys and sequence items with `key[i]`.
    pub fn items_recursive(&self) -> Vec<(String, &Element)> {
        let mut out = Vec::new();
        for (key, element) in &self.items {
            flatten(key.clone(), element, &mut out);
        }
        out
    }

    /// Keys of [`items_recursive`](Self::items_recursive).
    pub fn keys_recursive(&self) -> Vec<String> {
        self.items_recursive().into_iter().map(|(k, _)| k).collect()
    }

    /// Values of [`items_recursive`](Self::items_recursive).
    pub fn values_recursive(&self) -> Vec<&Element> {
        self.items_recursive().into_iter().map(|(_, v)| v).collect()
    }

    /// Layout of [`to_storage`](StorageOps::to_storage).
    pub fn index(&self) -> Index {
        let mut index = Index::with_capacity(self.items.len());
        let mut offset = 0;
        for (key, element) in &self.items {
            let entry = entry_for(element, offset);
            offset += entry.storage_dim;
            index.insert(key.clone(), entry);
        }
        index
    }

    /// Rebuilds a container from flat storage and its index.
    pub fn from_storage_index(storage: &[Expr], index: &Index) -> Result<Self> {
        check_storage_len("Values", index_storage_dim(index), storage)?;
        let mut values = Self::new();
        for (key, entry) in index {
            let element = element_from_storage(slice(storage, entry)?, entry)?;
            values.items.insert(key.clone(), element);
        }
        Ok(values)
    }

    /// Opens a key and symbol scope named `name`.
    ///
    /// Keys inserted through the returned guard are prefixed with `name`.
    /// Symbols created through it are qualified by `names`, which stays
    /// entered until the guard is dropped.
    pub fn scope<'a>(&'a mut self, names: &'a NameScope, name: &str) -> ValuesScope<'a> {
        ValuesScope {
            values: self,
            prefix: name.to_string(),
            guard: names.enter(name),
        }
    }

    fn check_same_keys(&self, other: &Self) -> Result<()> {
        if self.items.keys().eq(other.items.keys()) {
            Ok(())
        } else {
            Err(SymbolicError::key(format!(
                "key mismatch: {:?} vs {:?}",
                self.keys().collect::<Vec<_>>(),
                other.keys().collect::<Vec<_>>()
            )))
        }
    }

    fn map_elements(&self, mut f: impl FnMut(&Element) -> Result<Element>) -> Result<Self> {
        let mut items = IndexMap::with_capacity(self.items.len());
        for (key, element) in &self.items {
            items.insert(key.clone(), f(element)?);
        }
        Ok(Self { items })
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        if self.items.is_empty() {
            return f.write_str("Values()");
        }
        f.write_str("Values(\n")?;
        let pad = "  ".repeat(indent + 1);
        for (key, element) in &self.items {
            write!(f, "{pad}{key}: ")?;
            match element {
                Element::Values(v) => v.fmt_indented(f, indent + 1)?,
                other => write!(f, "{other}")?,
            }
            f.write_str(",\n")?;
        }
        write!(f, "{})", "  ".repeat(indent))
    }
}

fn flatten<'a>(key: String, element: &'a Element, out: &mut Vec<(String, &'a Element)>) {
    match element {
        Element::Values(v) => {
            for (k, e) in &v.items {
                flatten(format!("{key}.{k}"), e, out);
            }
        }
        Element::Sequence(items) => {
            for (i, e) in items.iter().enumerate() {
                flatten(format!("{key}[{i}]"), e, out);
            }
        }
        leaf => out.push((key, leaf)),
    }
}

impl fmt::Display for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

impl StorageOps for Values {
    fn type_name(&self) -> String {
        "Values".to_string()
    }

    fn storage_dim(&self) -> usize {
        self.items.values().map(StorageOps::storage_dim).sum()
    }

    fn to_storage(&self) -> Vec<Expr> {
        self.items.values().flat_map(StorageOps::to_storage).collect()
    }

    fn from_storage_like(&self, elements: &[Expr]) -> Result<Self> {
        check_storage_len("Values", self.storage_dim(), elements)?;
        let mut offset = 0;
        self.map_elements(|element| {
            let dim = element.storage_dim();
            let rebuilt = element.from_storage_like(&elements[offset..offset + dim]);
            offset += dim;
            rebuilt
        })
    }
}

impl GroupOps for Values {
    fn identity_like(&self) -> Self {
        Self {
            items: self
                .items
                .iter()
                .map(|(k, v)| (k.clone(), v.identity_like()))
                .collect(),
        }
    }

    fn compose(&self, other: &Self) -> Result<Self> {
        self.check_same_keys(other)?;
        let mut others = other.items.values();
        self.map_elements(|element| match others.next() {
            Some(rhs) => element.compose(rhs),
            None => Err(SymbolicError::key("key mismatch")),
        })
    }

    fn inverse(&self) -> Self {
        Self {
            items: self
                .items
                .iter()
                .map(|(k, v)| (k.clone(), v.inverse()))
                .collect(),
        }
    }
}

impl LieGroupOps for Values {
    fn tangent_dim(&self) -> usize {
        self.items.values().map(LieGroupOps::tangent_dim).sum()
    }

    fn from_tangent_like(&self, delta: &[Expr], epsilon: &Expr) -> Result<Self> {
        check_tangent_len("Values", self.tangent_dim(), delta)?;
        let mut offset = 0;
        self.map_elements(|element| {
            let dim = element.tangent_dim();
            let rebuilt = element.from_tangent_like(&delta[offset..offset + dim], epsilon);
            offset += dim;
            rebuilt
        })
    }

    fn to_tangent(&self, epsilon: &Expr) -> Vec<Expr> {
        self.items
            .values()
            .flat_map(|element| element.to_tangent(epsilon))
            .collect()
    }

    fn storage_d_tangent(&self) -> Result<SymMatrix> {
        let blocks = self
            .items
            .values()
            .map(LieGroupOps::storage_d_tangent)
            .collect::<Result<Vec<_>>>()?;
        Ok(block_diagonal(&blocks))
    }
}

/// A key prefix over a [`Values`] paired with an entered [`NameScope`].
///
/// Dropping the guard pops the name scope.
#[derive(Debug)]
pub struct ValuesScope<'a> {
    values: &'a mut Values,
    prefix: String,
    guard: ScopeGuard<'a>,
}

impl ValuesScope<'_> {
    /// The dotted key prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `key` under this scope's prefix.
    pub fn key(&self, key: &str) -> String {
        format!("{}.{key}", self.prefix)
    }

    /// A symbol qualified by the active name scope.
    pub fn symbol(&self, name: &str) -> Expr {
        self.guard.scope().symbol(name)
    }

    /// [`Values::set`] under the prefix.
    pub fn set(&mut self, key: &str, value: impl Into<Element>) -> Result<Option<Element>> {
        let full = self.key(key);
        self.values.set(&full, value)
    }

    /// [`Values::insert`] under the prefix.
    pub fn insert(&mut self, key: &str, value: impl Into<Element>) -> Result<()> {
        let full = self.key(key);
        self.values.insert(&full, value)
    }

    /// Creates a scoped symbol and inserts it under `name`.
    pub fn add(&mut self, name: &str) -> Result<Expr> {
        let symbol = self.symbol(name);
        self.insert(name, symbol.clone())?;
        Ok(symbol)
    }

    /// A nested scope.
    pub fn scope(&mut self, name: &str) -> ValuesScope<'_> {
        ValuesScope {
            prefix: self.key(name),
            guard: self.guard.scope().enter(name),
            values: &mut *self.values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symlie_geo::{Rot2, Rot3};

    #[test]
    fn test_dotted_keys_create_containers() {
        let mut v = Values::new();
        v.set("a.b.c", Expr::symbol("x")).unwrap();
        assert!(v.get("a").unwrap().as_values().is_some());
        assert_eq!(v.get("a.b.c").unwrap().as_scalar(), Some(&Expr::symbol("x")));
        assert_eq!(v.keys_recursive(), vec!["a.b.c".to_string()]);
    }

    #[test]
    fn test_non_container_intermediate_is_key_error() {
        let mut v = Values::new();
        v.set("a", Expr::symbol("x")).unwrap();
        assert!(matches!(v.set("a.b", 1.0), Err(SymbolicError::Key { .. })));
        assert!(matches!(v.set("a..b", 1.0), Err(SymbolicError::Key { .. })));
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut v = Values::new();
        v.insert("x", 1.0).unwrap();
        assert!(matches!(v.insert("x", 2.0), Err(SymbolicError::DuplicateKey { .. })));
        assert_eq!(v.set("x", 2.0).unwrap(), Some(Element::from(1.0)));
    }

    #[test]
    fn test_add_requires_symbol() {
        let mut v = Values::new();
        v.add(&Expr::symbol("x")).unwrap();
        assert!(v.contains_key("x"));
        assert!(matches!(v.add(&Expr::one()), Err(SymbolicError::Type { .. })));
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut v = Values::new();
        for key in ["a", "b", "c", "n.m"] {
            v.insert(key, 0.0).unwrap();
        }
        assert!(v.remove("b").is_some());
        assert!(v.remove("n.m").is_some());
        assert!(v.remove("missing").is_none());
        assert_eq!(v.keys().collect::<Vec<_>>(), vec!["a", "c", "n"]);
    }

    #[test]
    fn test_items_recursive_flattens_sequences() {
        let mut v = Values::new();
        let seq = Element::sequence(vec![Rot2::identity().into(), Rot2::identity().into()]).unwrap();
        v.insert("rots", seq).unwrap();
        v.insert("inner.x", 1.0).unwrap();
        assert_eq!(
            v.keys_recursive(),
            vec!["rots[0]".to_string(), "rots[1]".to_string(), "inner.x".to_string()]
        );
        assert_eq!(v.values_recursive().len(), 3);
    }

    #[test]
    fn test_display() {
        let mut v = Values::new();
        v.insert("x", Expr::symbol("x")).unwrap();
        v.insert("inner.R", Rot2::symbolic("R")).unwrap();
        assert_eq!(
            v.to_string(),
            "Values(\n  x: x,\n  inner: Values(\n    R: Rot2(R_re, R_im),\n  ),\n)"
        );
        assert_eq!(Values::new().to_string(), "Values()");
    }

    #[test]
    fn test_scope_prefixes_keys_and_symbols() {
        let names = NameScope::new();
        let mut v = Values::new();
        {
            let mut s = v.scope(&names, "pose");
            let t = s.add("t").unwrap();
            assert_eq!(t.symbol_name(), Some("pose.t"));
            {
                let mut inner = s.scope("R");
                inner.set("rot", Rot3::symbolic(&inner.symbol("q").to_string())).unwrap();
                assert_eq!(names.prefix(), "pose.R");
            }
            assert_eq!(names.prefix(), "pose");
        }
        assert_eq!(names.depth(), 0);
        assert!(v.contains_key("pose.t"));
        assert!(v.get("pose.R.rot").unwrap().as_rot3().is_some());
    }

    #[test]
    fn test_compose_requires_matching_keys() {
        let mut a = Values::new();
        a.insert("x", 1.0).unwrap();
        let mut b = Values::new();
        b.insert("y", 1.0).unwrap();
        assert!(matches!(a.compose(&b), Err(SymbolicError::Key { .. })));
        let doubled = a.compose(&a).unwrap();
        assert_eq!(doubled.get("x").unwrap().as_scalar(), Some(&Expr::constant(2.0)));
    }
}
