//! Backend-independent form of a function.
//!
//! Lowering turns `Values` inputs and outputs into typed arguments, flattens
//! every output to its storage expressions and optionally hoists shared
//! subexpressions into temporaries. Backends only ever see a
//! [`LoweredFunction`].

use symlie_core::cse::cse;
use symlie_core::expr::{count_ops, Expr};
use symlie_core::ops::StorageOps;
use symlie_core::simplify::Simplifier;
use symlie_values::{Element, Values};
use tracing::debug;

use crate::config::{CodegenConfig, Language};
use crate::error::{CodegenError, CodegenResult};
use crate::names::camel_case;

/// Shape of an argument as seen by generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    /// One scalar.
    Scalar,
    /// Fixed-size matrix, stored column-major.
    Matrix {
        /// Row count
        rows: usize,
        /// Column count
        cols: usize,
    },
    /// Planar rotation, storage `[re, im]`.
    Rot2,
    /// Unit quaternion, storage `[x, y, z, w]`.
    Rot3,
    /// Planar pose, storage `[re, im, x, y]`.
    Pose2,
    /// Spatial pose, storage `[x, y, z, w, px, py, pz]`.
    Pose3,
    /// Nested `Values`, emitted as a struct or class.
    Struct {
        /// Generated type name
        name: String,
        /// Fields in storage order
        fields: Vec<(String, ArgType)>,
    },
    /// Homogeneous sequence.
    Array {
        /// Type of every item
        item: Box<ArgType>,
        /// Item count
        len: usize,
    },
}

impl ArgType {
    /// Type of `element`; nested containers are named after `struct_name`.
    pub fn of(element: &Element, struct_name: &str) -> CodegenResult<Self> {
        Ok(match element {
            Element::Scalar(_) => Self::Scalar,
            Element::Matrix(m) => Self::Matrix {
                rows: m.nrows(),
                cols: m.ncols(),
            },
            Element::Rot2(_) => Self::Rot2,
            Element::Rot3(_) => Self::Rot3,
            Element::Pose2(_) => Self::Pose2,
            Element::Pose3(_) => Self::Pose3,
            Element::Values(values) => Self::Struct {
                name: struct_name.to_string(),
                fields: values
                    .items()
                    .map(|(key, item)| {
                        let nested = format!("{struct_name}{}", camel_case(key));
                        Ok((key.to_string(), Self::of(item, &nested)?))
                    })
                    .collect::<CodegenResult<_>>()?,
            },
            Element::Sequence(items) => {
                let first = items.first().ok_or_else(|| {
                    CodegenError::invalid_configuration(format!(
                        "empty sequence `{struct_name}` has no type"
                    ))
                })?;
                Self::Array {
                    item: Box::new(Self::of(first, struct_name)?),
                    len: items.len(),
                }
            }
        })
    }

    /// Number of scalars in the flattened value.
    pub fn storage_dim(&self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Matrix { rows, cols } => rows * cols,
            Self::Rot2 => 2,
            Self::Rot3 | Self::Pose2 => 4,
            Self::Pose3 => 7,
            Self::Struct { fields, .. } => fields.iter().map(|(_, t)| t.storage_dim()).sum(),
            Self::Array { item, len } => item.storage_dim() * len,
        }
    }

    /// `"Rot3"` and friends for geometric types.
    pub fn geometric_name(&self) -> Option<&'static str> {
        match self {
            Self::Rot2 => Some("Rot2"),
            Self::Rot3 => Some("Rot3"),
            Self::Pose2 => Some("Pose2"),
            Self::Pose3 => Some("Pose3"),
            _ => None,
        }
    }

    /// Struct definitions reachable from this type, innermost first.
    pub fn collect_structs<'a>(&'a self, out: &mut Vec<&'a ArgType>) {
        match self {
            Self::Struct { name, fields } => {
                for (_, field) in fields {
                    field.collect_structs(out);
                }
                let known = out
                    .iter()
                    .any(|s| matches!(s, Self::Struct { name: other, .. } if other == name));
                if !known {
                    out.push(self);
                }
            }
            Self::Array { item, .. } => item.collect_structs(out),
            _ => {}
        }
    }
}

/// One function argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// Identifier in generated code.
    pub name: String,
    /// Generated type.
    pub ty: ArgType,
    /// Storage symbols, in the order the generated accessors visit them.
    pub storage: Vec<Expr>,
    /// Human readable type, used in docstrings.
    pub label: String,
}

/// One function output.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    /// Identifier in generated code.
    pub name: String,
    /// Generated type.
    pub ty: ArgType,
    /// Storage expressions, rewritten in terms of the temporaries.
    pub exprs: Vec<Expr>,
    /// Returned by value rather than through an output argument.
    pub returned: bool,
    /// Human readable type, used in docstrings.
    pub label: String,
}

/// A function ready for a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredFunction {
    /// Function name, `snake_case`.
    pub name: String,
    /// Docstring paragraphs.
    pub docstring: String,
    /// Inputs in declaration order.
    pub inputs: Vec<Argument>,
    /// Outputs in declaration order.
    pub outputs: Vec<Output>,
    /// `(temporary, definition)` in evaluation order.
    pub intermediates: Vec<(Expr, Expr)>,
    /// Operation count of the outputs as given.
    pub ops_before: usize,
    /// Operation count after simplification and elimination.
    pub ops_after: usize,
}

impl LoweredFunction {
    /// The output returned by value, if any.
    pub fn returned(&self) -> Option<&Output> {
        self.outputs.iter().find(|o| o.returned)
    }

    /// Every struct type used by the inputs, innermost first.
    pub fn structs(&self) -> Vec<&ArgType> {
        let mut out = Vec::new();
        for input in &self.inputs {
            input.ty.collect_structs(&mut out);
        }
        out
    }
}

/// Everything lowering needs to know about a codegen request.
pub(crate) struct Request<'a> {
    pub name: &'a str,
    pub inputs: &'a Values,
    pub outputs: &'a Values,
    pub return_key: Option<&'a str>,
    pub docstring: Option<&'a str>,
    pub config: &'a CodegenConfig,
}

fn default_docstring(request: &Request<'_>) -> String {
    let mut lines = vec![format!("Function `{}`.", request.name), String::new(), "Args:".into()];
    for (key, element) in request.inputs.items() {
        lines.push(format!("    {key}: {}", element.type_name()));
    }
    lines.push(String::new());
    lines.push("Outputs:".into());
    for (key, element) in request.outputs.items() {
        lines.push(format!("    {key}: {}", element.type_name()));
    }
    lines.join("\n")
}

fn output_type(key: &str, element: &Element, language: Language) -> CodegenResult<ArgType> {
    match element {
        Element::Values(_) | Element::Sequence(_) => Err(CodegenError::unsupported(
            language.to_string(),
            format!("{} output `{key}`", element.type_name()),
        )),
        _ => ArgType::of(element, key),
    }
}

/// Lowers a validated request.
pub(crate) fn lower(request: &Request<'_>) -> CodegenResult<LoweredFunction> {
    let language = request.config.language();
    let struct_prefix = camel_case(request.name);

    let inputs = request
        .inputs
        .items()
        .map(|(key, element)| {
            Ok(Argument {
                name: key.to_string(),
                ty: ArgType::of(element, &format!("{struct_prefix}{}", camel_case(key)))?,
                storage: element.to_storage(),
                label: element.type_name(),
            })
        })
        .collect::<CodegenResult<Vec<_>>>()?;

    let mut shapes = Vec::new();
    let mut flat = Vec::new();
    for (key, element) in request.outputs.items() {
        let ty = output_type(key, element, language)?;
        let storage = element.to_storage();
        shapes.push((key.to_string(), ty, storage.len(), element.type_name()));
        flat.extend(storage);
    }

    let ops_before = count_ops(&flat);
    if request.config.simplify() {
        let simplifier = Simplifier::standard();
        flat = flat.iter().map(|e| simplifier.simplify(e)).collect();
    }
    let (intermediates, flat) = if request.config.use_cse() {
        let eliminated = cse(&flat);
        (eliminated.intermediates, eliminated.outputs)
    } else {
        (Vec::new(), flat)
    };
    let mut counted: Vec<Expr> = intermediates.iter().map(|(_, e)| e.clone()).collect();
    counted.extend(flat.iter().cloned());
    let ops_after = count_ops(&counted);
    debug!(
        function = request.name,
        ops_before,
        ops_after,
        temporaries = intermediates.len(),
        "lowered outputs"
    );

    let mut rest = flat.into_iter();
    let outputs = shapes
        .into_iter()
        .map(|(name, ty, dim, label)| Output {
            returned: request.return_key == Some(name.as_str()),
            exprs: rest.by_ref().take(dim).collect(),
            name,
            ty,
            label,
        })
        .collect();

    Ok(LoweredFunction {
        name: request.name.to_string(),
        docstring: request
            .docstring
            .map_or_else(|| default_docstring(request), str::to_string),
        inputs,
        outputs,
        intermediates,
        ops_before,
        ops_after,
    })
}
