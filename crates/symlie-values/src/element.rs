//! A single entry of a [`Values`] container.

use std::fmt;

use symlie_core::error::{Result, SymbolicError};
use symlie_core::expr::Expr;
use symlie_core::ops::{GroupOps, LieGroupOps, StorageOps};
use symlie_core::types::SymMatrix;
use symlie_geo::{Matrix, Pose2, Pose3, Rot2, Rot3};

use crate::index::{entry_for, Datatype};
use crate::values::Values;

/// Any value a [`Values`] container can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A scalar expression.
    Scalar(Expr),
    /// A dense matrix.
    Matrix(Matrix),
    /// A planar rotation.
    Rot2(Rot2),
    /// A spatial rotation.
    Rot3(Rot3),
    /// A planar pose.
    Pose2(Pose2),
    /// A spatial pose.
    Pose3(Pose3),
    /// A nested container.
    Values(Values),
    /// Elements sharing one datatype and shape.
    Sequence(Vec<Element>),
}

/// Applies the same expression to whichever value the element holds.
macro_rules! dispatch {
    ($element:expr, $v:ident => $body:expr) => {
        match $element {
            Element::Scalar($v) => $body,
            Element::Matrix($v) => $body,
            Element::Rot2($v) => $body,
            Element::Rot3($v) => $body,
            Element::Pose2($v) => $body,
            Element::Pose3($v) => $body,
            Element::Values($v) => $body,
            Element::Sequence($v) => $body,
        }
    };
}

/// Same as `dispatch!`, but rewraps the result in the original variant.
macro_rules! rewrap {
    ($element:expr, $v:ident => $body:expr) => {
        match $element {
            Element::Scalar($v) => Element::Scalar($body),
            Element::Matrix($v) => Element::Matrix($body),
            Element::Rot2($v) => Element::Rot2($body),
            Element::Rot3($v) => Element::Rot3($body),
            Element::Pose2($v) => Element::Pose2($body),
            Element::Pose3($v) => Element::Pose3($body),
            Element::Values($v) => Element::Values($body),
            Element::Sequence($v) => Element::Sequence($body),
        }
    };
}

impl Element {
    /// A homogeneous sequence; every item must match the first item's
    /// datatype and storage shape.
    pub fn sequence(items: Vec<Element>) -> Result<Self> {
        if let Some(first) = items.first() {
            let expected = entry_for(first, 0);
            if let Some(bad) = items.iter().find(|item| entry_for(item, 0) != expected) {
                let (want, got) = (first.type_name(), bad.type_name());
                return Err(SymbolicError::type_error(if want == got {
                    format!("sequence of {want} items with differing layouts")
                } else {
                    format!("sequence of {want} cannot hold {got}")
                }));
            }
        }
        Ok(Self::Sequence(items))
    }

    /// The kind of value held.
    pub fn datatype(&self) -> Datatype {
        match self {
            Self::Scalar(_) => Datatype::Scalar,
            Self::Matrix(_) => Datatype::Matrix,
            Self::Rot2(_) => Datatype::Rot2,
            Self::Rot3(_) => Datatype::Rot3,
            Self::Pose2(_) => Datatype::Pose2,
            Self::Pose3(_) => Datatype::Pose3,
            Self::Values(_) => Datatype::Values,
            Self::Sequence(_) => Datatype::Sequence,
        }
    }

    /// The scalar, if this is one.
    pub fn as_scalar(&self) -> Option<&Expr> {
        match self {
            Self::Scalar(e) => Some(e),
            _ => None,
        }
    }

    /// The matrix, if this is one.
    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Self::Matrix(m) => Some(m),
            _ => None,
        }
    }

    /// The spatial rotation, if this is one.
    pub fn as_rot3(&self) -> Option<&Rot3> {
        match self {
            Self::Rot3(r) => Some(r),
            _ => None,
        }
    }

    /// The spatial pose, if this is one.
    pub fn as_pose3(&self) -> Option<&Pose3> {
        match self {
            Self::Pose3(p) => Some(p),
            _ => None,
        }
    }

    /// The nested container, if this is one.
    pub fn as_values(&self) -> Option<&Values> {
        match self {
            Self::Values(v) => Some(v),
            _ => None,
        }
    }

    /// The nested container, mutably.
    pub fn as_values_mut(&mut self) -> Option<&mut Values> {
        match self {
            Self::Values(v) => Some(v),
            _ => None,
        }
    }

    /// The sequence items, if this is a sequence.
    pub fn as_sequence(&self) -> Option<&[Element]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// The element as a trait object.
    pub fn as_lie_group(&self) -> &dyn LieGroupOps {
        dispatch!(self, v => v as &dyn LieGroupOps)
    }

    fn mismatch(&self, other: &Self) -> SymbolicError {
        SymbolicError::type_error(format!(
            "cannot combine {} with {}",
            self.type_name(),
            other.type_name()
        ))
    }
}

impl From<Expr> for Element {
    fn from(v: Expr) -> Self {
        Self::Scalar(v)
    }
}

impl From<f64> for Element {
    fn from(v: f64) -> Self {
        Self::Scalar(Expr::constant(v))
    }
}

impl From<Matrix> for Element {
    fn from(v: Matrix) -> Self {
        Self::Matrix(v)
    }
}

impl From<Rot2> for Element {
    fn from(v: Rot2) -> Self {
        Self::Rot2(v)
    }
}

impl From<Rot3> for Element {
    fn from(v: Rot3) -> Self {
        Self::Rot3(v)
    }
}

impl From<Pose2> for Element {
    fn from(v: Pose2) -> Self {
        Self::Pose2(v)
    }
}

impl From<Pose3> for Element {
    fn from(v: Pose3) -> Self {
        Self::Pose3(v)
    }
}

impl From<Values> for Element {
    fn from(v: Values) -> Self {
        Self::Values(v)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(e) => write!(f, "{e}"),
            Self::Matrix(m) => write!(f, "{m}"),
            Self::Values(v) => write!(f, "{v}"),
            Self::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            other => {
                write!(f, "{}(", other.type_name())?;
                for (i, e) in other.to_storage().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{e}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl StorageOps for Element {
    fn type_name(&self) -> String {
        dispatch!(self, v => v.type_name())
    }

    fn storage_dim(&self) -> usize {
        dispatch!(self, v => v.storage_dim())
    }

    fn to_storage(&self) -> Vec<Expr> {
        dispatch!(self, v => v.to_storage())
    }

    fn from_storage_like(&self, elements: &[Expr]) -> Result<Self> {
        Ok(rewrap!(self, v => v.from_storage_like(elements)?))
    }
}

impl GroupOps for Element {
    fn identity_like(&self) -> Self {
        rewrap!(self, v => v.identity_like())
    }

    fn compose(&self, other: &Self) -> Result<Self> {
        Ok(match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => Self::Scalar(a.compose(b)?),
            (Self::Matrix(a), Self::Matrix(b)) => Self::Matrix(a.compose(b)?),
            (Self::Rot2(a), Self::Rot2(b)) => Self::Rot2(a.compose(b)?),
            (Self::Rot3(a), Self::Rot3(b)) => Self::Rot3(a.compose(b)?),
            (Self::Pose2(a), Self::Pose2(b)) => Self::Pose2(a.compose(b)?),
            (Self::Pose3(a), Self::Pose3(b)) => Self::Pose3(a.compose(b)?),
            (Self::Values(a), Self::Values(b)) => Self::Values(a.compose(b)?),
            (Self::Sequence(a), Self::Sequence(b)) => Self::Sequence(a.compose(b)?),
            _ => return Err(self.mismatch(other)),
        })
    }

    fn inverse(&self) -> Self {
        rewrap!(self, v => v.inverse())
    }
}

impl LieGroupOps for Element {
    fn tangent_dim(&self) -> usize {
        dispatch!(self, v => v.tangent_dim())
    }

    fn from_tangent_like(&self, delta: &[Expr], epsilon: &Expr) -> Result<Self> {
        Ok(rewrap!(self, v => v.from_tangent_like(delta, epsilon)?))
    }

    fn to_tangent(&self, epsilon: &Expr) -> Vec<Expr> {
        dispatch!(self, v => v.to_tangent(epsilon))
    }

    fn storage_d_tangent(&self) -> Result<SymMatrix> {
        dispatch!(self, v => v.storage_d_tangent())
    }
}
