//! Common subexpression elimination.
//!
//! Every non-leaf node reachable from more than one parent (or from more than
//! one output) is hoisted into a temporary. Temporaries are emitted in
//! dependency order, so each one only refers to inputs and earlier
//! temporaries.

use std::collections::HashMap;

use crate::expr::{count_ops, Expr};

/// Prefix of the temporaries introduced by [`cse`].
pub const TEMPORARY_PREFIX: &str = "_tmp";

/// Output of common subexpression elimination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CseResult {
    /// `(temporary symbol, defining expression)` in evaluation order.
    pub intermediates: Vec<(Expr, Expr)>,
    /// The outputs rewritten in terms of the temporaries.
    pub outputs: Vec<Expr>,
}

impl CseResult {
    /// Operation count of the eliminated form.
    pub fn op_count(&self) -> usize {
        let mut all: Vec<Expr> = self.intermediates.iter().map(|(_, e)| e.clone()).collect();
        all.extend(self.outputs.iter().cloned());
        count_ops(&all)
    }
}

/// Eliminates common subexpressions using [`TEMPORARY_PREFIX`].
pub fn cse(outputs: &[Expr]) -> CseResult {
    cse_with_prefix(outputs, TEMPORARY_PREFIX)
}

/// Eliminates common subexpressions, naming temporaries `{prefix}{i}`.
pub fn cse_with_prefix(outputs: &[Expr], prefix: &str) -> CseResult {
    let mut uses: HashMap<Expr, usize> = HashMap::new();
    for output in outputs {
        count_uses(output, &mut uses);
    }

    let mut state = Hoist {
        uses,
        replaced: HashMap::new(),
        intermediates: Vec::new(),
        prefix,
    };
    let outputs = outputs.iter().map(|o| state.rewrite(o)).collect();
    CseResult {
        intermediates: state.intermediates,
        outputs,
    }
}

fn count_uses(expr: &Expr, uses: &mut HashMap<Expr, usize>) {
    let count = uses.entry(expr.clone()).or_insert(0);
    *count += 1;
    if *count > 1 {
        return;
    }
    for child in expr.args() {
        count_uses(&child, uses);
    }
}

struct Hoist<'a> {
    uses: HashMap<Expr, usize>,
    replaced: HashMap<Expr, Expr>,
    intermediates: Vec<(Expr, Expr)>,
    prefix: &'a str,
}

impl Hoist<'_> {
    fn rewrite(&mut self, expr: &Expr) -> Expr {
        if expr.is_leaf() {
            return expr.clone();
        }
        if let Some(done) = self.replaced.get(expr) {
            return done.clone();
        }
        let args: Vec<Expr> = expr.args().iter().map(|a| self.rewrite(a)).collect();
        let rebuilt = expr.with_args(args);
        let shared = self.uses.get(expr).copied().unwrap_or(0) > 1;
        let result = if shared && !rebuilt.is_leaf() {
            let temporary = Expr::symbol(format!("{}{}", self.prefix, self.intermediates.len()));
            self.intermediates.push((temporary.clone(), rebuilt));
            temporary
        } else {
            rebuilt
        };
        self.replaced.insert(expr.clone(), result.clone());
        result
    }
}
