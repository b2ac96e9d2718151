//! Matrix aliases and dense helpers over symbolic entries.
//!
//! `nalgebra` stores any `Clone + PartialEq + Debug` scalar, which `Expr`
//! satisfies, but its arithmetic requires a field. The helpers here do the
//! few dense operations the engine needs entry by entry.

use nalgebra::DMatrix;

use crate::error::{Result, SymbolicError};
use crate::eval::Bindings;
use crate::expr::Expr;

/// Dense matrix of expressions, column-major like every `nalgebra` matrix.
pub type SymMatrix = DMatrix<Expr>;

/// `rows x cols` matrix of zeros.
pub fn sym_zeros(rows: usize, cols: usize) -> SymMatrix {
    SymMatrix::from_element(rows, cols, Expr::zero())
}

/// `n x n` identity.
pub fn sym_identity(n: usize) -> SymMatrix {
    SymMatrix::from_fn(n, n, |r, c| if r == c { Expr::one() } else { Expr::zero() })
}

/// Matrix product.
pub fn sym_matmul(a: &SymMatrix, b: &SymMatrix) -> Result<SymMatrix> {
    if a.ncols() != b.nrows() {
        return Err(SymbolicError::shape_mismatch(
            format!("({}, _) rows on the right", a.ncols()),
            format!("({}, {})", b.nrows(), b.ncols()),
        ));
    }
    Ok(SymMatrix::from_fn(a.nrows(), b.ncols(), |r, c| {
        Expr::add_all((0..a.ncols()).map(|k| &a[(r, k)] * &b[(k, c)]))
    }))
}

/// Entry-wise sum of two equally shaped matrices.
pub fn sym_add(a: &SymMatrix, b: &SymMatrix) -> Result<SymMatrix> {
    if a.shape() != b.shape() {
        return Err(SymbolicError::shape_mismatch(
            format!("{:?}", a.shape()),
            format!("{:?}", b.shape()),
        ));
    }
    Ok(a.zip_map(b, |x, y| x + y))
}

/// Places `blocks` along the diagonal.
pub fn block_diagonal(blocks: &[SymMatrix]) -> SymMatrix {
    let rows = blocks.iter().map(SymMatrix::nrows).sum();
    let cols = blocks.iter().map(SymMatrix::ncols).sum();
    let mut out = sym_zeros(rows, cols);
    let (mut r0, mut c0) = (0, 0);
    for block in blocks {
        out.view_mut((r0, c0), block.shape()).copy_from(block);
        r0 += block.nrows();
        c0 += block.ncols();
    }
    out
}

/// Concatenates `blocks` left to right.
pub fn hstack(blocks: &[SymMatrix]) -> Result<SymMatrix> {
    let Some(first) = blocks.first() else {
        return Ok(sym_zeros(0, 0));
    };
    let rows = first.nrows();
    if let Some(bad) = blocks.iter().find(|b| b.nrows() != rows) {
        return Err(SymbolicError::shape_mismatch(
            format!("{rows} rows"),
            format!("{} rows", bad.nrows()),
        ));
    }
    let cols = blocks.iter().map(SymMatrix::ncols).sum();
    let mut out = sym_zeros(rows, cols);
    let mut c0 = 0;
    for block in blocks {
        out.view_mut((0, c0), block.shape()).copy_from(block);
        c0 += block.ncols();
    }
    Ok(out)
}

/// Evaluates every entry.
pub fn eval_matrix(m: &SymMatrix, bindings: &Bindings) -> Result<DMatrix<f64>> {
    let mut out = DMatrix::zeros(m.nrows(), m.ncols());
    for c in 0..m.ncols() {
        for r in 0..m.nrows() {
            out[(r, c)] = m[(r, c)].eval(bindings)?;
        }
    }
    Ok(out)
}

/// Lifts a numeric matrix into constants.
pub fn constant_matrix(m: &DMatrix<f64>) -> SymMatrix {
    m.map(Expr::constant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_matmul_shapes() {
        let a = SymMatrix::from_fn(2, 3, |r, c| Expr::symbol(format!("a{r}{c}")));
        let b = sym_identity(3);
        assert_eq!(sym_matmul(&a, &b).unwrap(), a);
        assert!(sym_matmul(&a, &a).is_err());
    }

    #[test]
    fn test_block_helpers() {
        let a = sym_identity(2);
        let b = SymMatrix::from_element(1, 3, Expr::symbol("k"));
        let d = block_diagonal(&[a.clone(), b.clone()]);
        assert_eq!(d.shape(), (3, 5));
        assert_eq!(d[(2, 4)], Expr::symbol("k"));
        assert!(d[(0, 4)].is_zero());

        assert!(hstack(&[a.clone(), b]).is_err());
        let h = hstack(&[a.clone(), a]).unwrap();
        assert_eq!(h.shape(), (2, 4));
        assert!(h[(1, 3)].is_one());
    }

    #[test]
    fn test_eval_matrix() {
        let x = Expr::symbol("x");
        let m = SymMatrix::from_row_slice(1, 2, &[x.sin(), &x * 2.0]);
        let v = eval_matrix(&m, &Bindings::new().with("x", 0.5)).unwrap();
        assert_relative_eq!(v[(0, 0)], 0.5f64.sin());
        assert_relative_eq!(v[(0, 1)], 1.0);
        assert_eq!(constant_matrix(&v)[(0, 1)], Expr::one());
    }
}
