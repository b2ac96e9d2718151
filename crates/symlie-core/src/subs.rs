//! Symbol substitution.

use std::collections::HashMap;

use crate::error::{Result, SymbolicError};
use crate::expr::Expr;

/// Mapping from symbols to replacement expressions.
pub type Substitution = HashMap<Expr, Expr>;

impl Expr {
    /// Replaces every occurrence of the symbol `target` with `replacement`.
    ///
    /// The rebuilt expression is re-canonicalized, so substituting constants
    /// folds what it can.
    pub fn subs(&self, target: &Expr, replacement: &Expr) -> Result<Expr> {
        let mut map = Substitution::with_capacity(1);
        map.insert(target.clone(), replacement.clone());
        self.subs_many(&map)
    }

    /// Replaces several symbols simultaneously.
    pub fn subs_many(&self, map: &Substitution) -> Result<Expr> {
        if let Some(target) = map.keys().find(|t| !t.is_symbol()) {
            return Err(SymbolicError::type_error(format!(
                "malformed substitution: target {target} is not a symbol"
            )));
        }
        Ok(self.xreplace(map))
    }

    /// Replaces exact subexpressions, with no restriction on the keys.
    pub fn xreplace(&self, map: &Substitution) -> Expr {
        let mut memo = HashMap::new();
        self.xreplace_memo(map, &mut memo)
    }

    fn xreplace_memo(&self, map: &Substitution, memo: &mut HashMap<Expr, Expr>) -> Expr {
        if let Some(replacement) = map.get(self) {
            return replacement.clone();
        }
        if self.is_leaf() {
            return self.clone();
        }
        if let Some(done) = memo.get(self) {
            return done.clone();
        }
        let old = self.args();
        let new: Vec<Expr> = old.iter().map(|a| a.xreplace_memo(map, memo)).collect();
        let rebuilt = if old == new {
            self.clone()
        } else {
            self.with_args(new)
        };
        memo.insert(self.clone(), rebuilt.clone());
        rebuilt
    }
}

/// Substitutes into every element of a slice.
pub fn subs_all(exprs: &[Expr], map: &Substitution) -> Result<Vec<Expr>> {
    exprs.iter().map(|e| e.subs_many(map)).collect()
}
