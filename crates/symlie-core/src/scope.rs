//! Explicit name scoping for symbol creation.
//!
//! A [`NameScope`] holds a stack of name segments. [`NameScope::enter`]
//! pushes one and hands back a guard that pops it when dropped, so the stack
//! is restored on every exit path including early returns and unwinding.

use std::cell::RefCell;

use crate::expr::Expr;

/// Stack of dot-joined name prefixes.
#[derive(Debug, Default)]
pub struct NameScope {
    segments: RefCell<Vec<String>>,
}

impl NameScope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `segment` until the returned guard is dropped.
    #[must_use = "the scope is popped as soon as the guard is dropped"]
    pub fn enter(&self, segment: impl Into<String>) -> ScopeGuard<'_> {
        let mut segments = self.segments.borrow_mut();
        let depth = segments.len();
        segments.push(segment.into());
        ScopeGuard { scope: self, depth }
    }

    /// The active prefix, segments joined by `.`.
    pub fn prefix(&self) -> String {
        self.segments.borrow().join(".")
    }

    /// Number of active segments.
    pub fn depth(&self) -> usize {
        self.segments.borrow().len()
    }

    /// `name` qualified by the active prefix.
    pub fn qualify(&self, name: &str) -> String {
        let segments = self.segments.borrow();
        if segments.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", segments.join("."))
        }
    }

    /// A symbol named by the active prefix and `name`.
    pub fn symbol(&self, name: &str) -> Expr {
        Expr::symbol(self.qualify(name))
    }

    /// One scoped symbol per whitespace-separated name.
    pub fn symbols(&self, names: &str) -> Vec<Expr> {
        names.split_whitespace().map(|n| self.symbol(n)).collect()
    }
}

/// Pops its segment from the owning [`NameScope`] on drop.
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    scope: &'a NameScope,
    depth: usize,
}

impl<'a> ScopeGuard<'a> {
    /// The scope this guard belongs to.
    pub fn scope(&self) -> &'a NameScope {
        self.scope
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.scope.segments.borrow_mut().truncate(self.depth);
    }
}
