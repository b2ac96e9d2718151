//! Symbolic matrices of fixed runtime shape.
//!
//! A [`Matrix`] is the Euclidean manifold `R^(rows x cols)`: the group
//! operation is addition, the tangent space is the matrix itself and
//! `storage_d_tangent` is the identity. Storage is column-major, the native
//! layout of `nalgebra`, so a column vector's storage is its entries in
//! order.

use std::fmt;
use std::ops::{Add, Index, IndexMut, Mul, Neg, Sub};

use nalgebra::DMatrix;
use symlie_core::epsilon::{safe_norm, squared_norm};
use symlie_core::error::{Result, SymbolicError};
use symlie_core::eval::Bindings;
use symlie_core::expr::Expr;
use symlie_core::ops::{check_storage_len, check_tangent_len, GroupOps, LieGroupOps, StorageOps};
use symlie_core::types::{eval_matrix, sym_add, sym_identity, sym_matmul, sym_zeros, SymMatrix};

/// Dense matrix of expressions.
#[derive(Clone, PartialEq)]
pub struct Matrix {
    data: SymMatrix,
}

impl Matrix {
    /// Wraps a symbolic `nalgebra` matrix.
    pub fn from_sym(data: SymMatrix) -> Self {
        Self { data }
    }

    /// Matrix of fresh symbols.
    ///
    /// Column vectors are named `{name}{row}`, other shapes
    /// `{name}{row}_{col}`.
    pub fn symbolic(name: &str, rows: usize, cols: usize) -> Self {
        let data = SymMatrix::from_fn(rows, cols, |r, c| {
            if cols == 1 {
                Expr::symbol(format!("{name}{r}"))
            } else {
                Expr::symbol(format!("{name}{r}_{c}"))
            }
        });
        Self { data }
    }

    /// `rows x cols` zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: sym_zeros(rows, cols),
        }
    }

    /// `n x n` identity.
    pub fn identity(n: usize) -> Self {
        Self {
            data: sym_identity(n),
        }
    }

    /// Builds a matrix from rows; every row must have the same length.
    pub fn from_rows(rows: &[Vec<Expr>]) -> Result<Self> {
        let ncols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
            return Err(SymbolicError::shape_mismatch(
                format!("{ncols} columns"),
                format!("{} columns", bad.len()),
            ));
        }
        Ok(Self {
            data: SymMatrix::from_fn(rows.len(), ncols, |r, c| rows[r][c].clone()),
        })
    }

    /// Column vector from its entries.
    pub fn column(entries: &[Expr]) -> Self {
        Self {
            data: SymMatrix::from_column_slice(entries.len(), 1, entries),
        }
    }

    /// Column vector of constants.
    pub fn column_f64(entries: &[f64]) -> Self {
        let exprs: Vec<Expr> = entries.iter().copied().map(Expr::constant).collect();
        Self::column(&exprs)
    }

    /// Matrix of constants.
    pub fn from_numeric(m: &DMatrix<f64>) -> Self {
        Self {
            data: m.map(Expr::constant),
        }
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    /// Whether this is a single column.
    pub fn is_vector(&self) -> bool {
        self.ncols() == 1
    }

    /// Entry at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<&Expr> {
        self.data.get((row, col))
    }

    /// The wrapped `nalgebra` matrix.
    pub fn as_sym(&self) -> &SymMatrix {
        &self.data
    }

    /// Unwraps into the `nalgebra` matrix.
    pub fn into_sym(self) -> SymMatrix {
        self.data
    }

    /// Entries in column-major order.
    pub fn entries(&self) -> Vec<Expr> {
        self.data.iter().cloned().collect()
    }

    /// Transpose.
    pub fn transpose(&self) -> Self {
        Self {
            data: self.data.transpose(),
        }
    }

    /// Matrix product.
    pub fn matmul(&self, other: &Matrix) -> Result<Matrix> {
        Ok(Self {
            data: sym_matmul(&self.data, &other.data)?,
        })
    }

    /// Entry-wise sum.
    pub fn try_add(&self, other: &Matrix) -> Result<Matrix> {
        Ok(Self {
            data: sym_add(&self.data, &other.data)?,
        })
    }

    /// Every entry multiplied by `s`.
    pub fn scale(&self, s: &Expr) -> Matrix {
        Self {
            data: self.data.map(|e| e * s),
        }
    }

    /// Every entry mapped through `f`.
    pub fn map(&self, f: impl FnMut(Expr) -> Expr) -> Matrix {
        Self {
            data: self.data.map(f),
        }
    }

    /// Inner product of two equally shaped matrices.
    pub fn dot(&self, other: &Matrix) -> Result<Expr> {
        if self.shape() != other.shape() {
            return Err(SymbolicError::shape_mismatch(
                format!("{:?}", self.shape()),
                format!("{:?}", other.shape()),
            ));
        }
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum())
    }

    /// Cross product of two 3-vectors.
    pub fn cross(&self, other: &Matrix) -> Result<Matrix> {
        for m in [self, other] {
            if m.shape() != (3, 1) {
                return Err(SymbolicError::shape_mismatch("(3, 1)", format!("{:?}", m.shape())));
            }
        }
        let (a, b) = (&self.data, &other.data);
        Ok(Self::column(&[
            &a[1] * &b[2] - &a[2] * &b[1],
            &a[2] * &b[0] - &a[0] * &b[2],
            &a[0] * &b[1] - &a[1] * &b[0],
        ]))
    }

    /// Sum of squared entries.
    pub fn squared_norm(&self) -> Expr {
        squared_norm(&self.entries())
    }

    /// Frobenius norm, `sqrt(squared_norm + epsilon)`.
    pub fn norm(&self, epsilon: &Expr) -> Expr {
        safe_norm(&self.entries(), epsilon)
    }

    /// `self / norm(epsilon)`.
    pub fn normalized(&self, epsilon: &Expr) -> Matrix {
        self.scale(&self.norm(epsilon).recip())
    }

    /// Evaluates every entry.
    pub fn eval(&self, bindings: &Bindings) -> Result<DMatrix<f64>> {
        eval_matrix(&self.data, bindings)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Expr;

    fn index(&self, index: (usize, usize)) -> &Expr {
        &self.data[index]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Expr {
        &mut self.data[index]
    }
}

impl Index<usize> for Matrix {
    type Output = Expr;

    /// Column-major linear indexing.
    fn index(&self, index: usize) -> &Expr {
        &self.data[index]
    }
}

/// Matrix product.
///
/// # Panics
///
/// Panics if the inner dimensions differ, like `nalgebra`'s operators. Use
/// [`Matrix::matmul`] for a fallible product.
impl Mul<&Matrix> for &Matrix {
    type Output = Matrix;

    fn mul(self, rhs: &Matrix) -> Matrix {
        match self.matmul(rhs) {
            Ok(m) => m,
            Err(e) => panic!("matrix product: {e}"),
        }
    }
}

/// Entry-wise sum.
///
/// # Panics
///
/// Panics if the shapes differ. Use [`Matrix::try_add`] for a fallible sum.
impl Add<&Matrix> for &Matrix {
    type Output = Matrix;

    fn add(self, rhs: &Matrix) -> Matrix {
        match self.try_add(rhs) {
            Ok(m) => m,
            Err(e) => panic!("matrix sum: {e}"),
        }
    }
}

/// Entry-wise difference.
///
/// # Panics
///
/// Panics if the shapes differ.
impl Sub<&Matrix> for &Matrix {
    type Output = Matrix;

    fn sub(self, rhs: &Matrix) -> Matrix {
        self + &(-rhs)
    }
}

impl Neg for &Matrix {
    type Output = Matrix;

    fn neg(self) -> Matrix {
        self.map(|e| -e)
    }
}

impl Mul<&Expr> for &Matrix {
    type Output = Matrix;

    fn mul(self, rhs: &Expr) -> Matrix {
        self.scale(rhs)
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix{:?}", self.shape())?;
        f.debug_list()
            .entries((0..self.nrows()).map(|r| {
                (0..self.ncols())
                    .map(|c| self.data[(r, c)].to_string())
                    .collect::<Vec<_>>()
            }))
            .finish()
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for r in 0..self.nrows() {
            if r > 0 {
                f.write_str(", ")?;
            }
            f.write_str("[")?;
            for c in 0..self.ncols() {
                if c > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", self.data[(r, c)])?;
            }
            f.write_str("]")?;
        }
        f.write_str("]")
    }
}

impl StorageOps for Matrix {
    fn type_name(&self) -> String {
        format!("Matrix{}{}", self.nrows(), self.ncols())
    }

    fn storage_dim(&self) -> usize {
        self.nrows() * self.ncols()
    }

    fn to_storage(&self) -> Vec<Expr> {
        self.entries()
    }

    fn from_storage_like(&self, elements: &[Expr]) -> Result<Self> {
        check_storage_len(&self.type_name(), self.storage_dim(), elements)?;
        Ok(Self {
            data: SymMatrix::from_column_slice(self.nrows(), self.ncols(), elements),
        })
    }
}

impl GroupOps for Matrix {
    fn identity_like(&self) -> Self {
        Self::zeros(self.nrows(), self.ncols())
    }

    fn compose(&self, other: &Self) -> Result<Self> {
        self.try_add(other)
    }

    fn inverse(&self) -> Self {
        -self
    }
}

impl LieGroupOps for Matrix {
    fn tangent_dim(&self) -> usize {
        self.storage_dim()
    }

    fn from_tangent_like(&self, delta: &[Expr], _epsilon: &Expr) -> Result<Self> {
        check_tangent_len(&self.type_name(), self.storage_dim(), delta)?;
        Ok(Self {
            data: SymMatrix::from_column_slice(self.nrows(), self.ncols(), delta),
        })
    }

    fn to_tangent(&self, _epsilon: &Expr) -> Vec<Expr> {
        self.entries()
    }

    fn storage_d_tangent(&self) -> Result<SymMatrix> {
        Ok(sym_identity(self.storage_dim()))
    }
}
