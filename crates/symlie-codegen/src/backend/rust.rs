//! Rust modules on `f64`.
//!
//! Matrices are `nalgebra` fixed-size matrices, rotations and poses plain
//! storage arrays, nested `Values` arguments plain structs. Outputs that are
//! not returned are `Option<&mut T>` parameters and are only computed when
//! present.

use std::path::PathBuf;

use symlie_core::expr::{BinaryFn, UnaryFn};

use super::{
    indent, matrix_position, symbol_names, wrap_docstring, Backend, Precedence, Printed, Printer,
    BANNER,
};
use crate::artifact::{GeneratedFile, GeneratedFunction};
use crate::config::{Language, RustConfig};
use crate::error::CodegenResult;
use crate::lower::{ArgType, LoweredFunction, Output};

const RULE: &str =
    "// -----------------------------------------------------------------------------";

/// Rust backend.
#[derive(Debug, Clone)]
pub struct RustBackend {
    config: RustConfig,
}

impl RustBackend {
    /// Backend with the given settings.
    pub fn new(config: RustConfig) -> Self {
        Self { config }
    }

    fn type_name(ty: &ArgType) -> String {
        match ty {
            ArgType::Scalar => "f64".into(),
            ArgType::Matrix { rows, cols } => format!("nalgebra::SMatrix<f64, {rows}, {cols}>"),
            ArgType::Struct { name, .. } => name.clone(),
            ArgType::Array { item, len } => format!("[{}; {len}]", Self::type_name(item)),
            other => format!("[f64; {}]", other.storage_dim()),
        }
    }

    fn parameter(name: &str, ty: &ArgType) -> String {
        match ty {
            ArgType::Scalar => format!("{name}: f64"),
            _ => format!("{name}: &{}", Self::type_name(ty)),
        }
    }

    fn struct_definition(ty: &ArgType) -> String {
        let ArgType::Struct { name, fields } = ty else {
            return String::new();
        };
        let mut lines = vec![
            "#[derive(Debug, Clone, Copy, PartialEq)]".to_string(),
            format!("pub struct {name} {{"),
        ];
        for (field, field_ty) in fields {
            lines.push(format!("    pub {field}: {},", Self::type_name(field_ty)));
        }
        lines.push("}".into());
        lines.join("\n")
    }

    /// Method-call receiver; bare float literals need a type suffix there.
    fn receiver(printed: &Printed) -> String {
        if printed.text.parse::<f64>().is_ok() {
            let suffixed = Printed::new(format!("{}_f64", printed.text), printed.precedence);
            return suffixed.at_least(Precedence::Atom);
        }
        printed.at_least(Precedence::Atom)
    }

    fn initializer(output: &Output) -> String {
        match &output.ty {
            ArgType::Matrix { rows, cols } => format!("nalgebra::SMatrix::<f64, {rows}, {cols}>::zeros()"),
            ty => format!("[0.0_f64; {}]", ty.storage_dim()),
        }
    }

    fn assignments(output: &Output, local: &str, printer: &Printer<'_>) -> CodegenResult<Vec<String>> {
        output
            .exprs
            .iter()
            .enumerate()
            .map(|(i, expr)| {
                let value = printer.print(expr)?;
                Ok(match &output.ty {
                    ArgType::Scalar if output.returned => format!("let {local}: f64 = {value};"),
                    ArgType::Scalar => format!("*{local} = {value};"),
                    ArgType::Matrix { rows, .. } => {
                        let (r, c) = matrix_position(i, *rows);
                        format!("{local}[({r}, {c})] = {value};")
                    }
                    _ => format!("{local}[{i}] = {value};"),
                })
            })
            .collect()
    }

    fn output_block(output: &Output, printer: &Printer<'_>) -> CodegenResult<Vec<String>> {
        let local = format!("_{}", output.name);
        let assignments = Self::assignments(output, &local, printer)?;
        let mut lines = Vec::new();
        if output.returned {
            if !matches!(output.ty, ArgType::Scalar) {
                lines.push(format!("let mut {local} = {};", Self::initializer(output)));
            }
            lines.extend(assignments);
        } else {
            lines.push(format!("if let Some({local}) = {} {{", output.name));
            lines.extend(assignments.into_iter().map(|a| format!("    {a}")));
            lines.push("}".into());
        }
        Ok(lines)
    }
}

impl Backend for RustBackend {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn literal(&self, value: f64) -> String {
        if self.config.explicit_literals {
            format!("{value:?}_f64")
        } else {
            format!("{value:?}")
        }
    }

    fn sqrt(&self, arg: &Printed) -> Printed {
        Printed::atom(format!("{}.sqrt()", Self::receiver(arg)))
    }

    fn powi(&self, base: &Printed, exponent: i32) -> Printed {
        Printed::atom(format!("{}.powi({exponent})", Self::receiver(base)))
    }

    fn powf(&self, base: &Printed, exponent: &Printed) -> Printed {
        Printed::atom(format!("{}.powf({})", Self::receiver(base), exponent.text))
    }

    fn unary(&self, function: UnaryFn, arg: &Printed) -> Printed {
        Printed::atom(match function {
            UnaryFn::Sign => format!(
                "(if {a} > 0.0 {{ 1.0 }} else if {a} < 0.0 {{ -1.0 }} else {{ 0.0 }})",
                a = arg.at_least(Precedence::Atom)
            ),
            UnaryFn::Log => format!("{}.ln()", Self::receiver(arg)),
            other => format!("{}.{}()", Self::receiver(arg), other.name()),
        })
    }

    fn binary(&self, function: BinaryFn, a: &Printed, b: &Printed) -> Printed {
        Printed::atom(format!("{}.{}({})", Self::receiver(a), function.name(), b.text))
    }

    fn matrix_entry(&self, base: &str, _rows: usize, _cols: usize, row: usize, col: usize) -> String {
        format!("{base}[({row}, {col})]")
    }

    fn geometric_entry(&self, base: &str, index: usize) -> String {
        format!("{base}[{index}]")
    }

    fn render(&self, function: &LoweredFunction, namespace: &str) -> CodegenResult<GeneratedFunction> {
        let names = symbol_names(self, function);
        let printer = Printer::new(self, &names);

        let mut parameters: Vec<String> = function
            .inputs
            .iter()
            .map(|input| Self::parameter(&input.name, &input.ty))
            .collect();
        parameters.extend(
            function
                .outputs
                .iter()
                .filter(|o| !o.returned)
                .map(|o| format!("{}: Option<&mut {}>", o.name, Self::type_name(&o.ty))),
        );
        let return_type = function
            .returned()
            .map_or_else(String::new, |o| format!(" -> {}", Self::type_name(&o.ty)));
        let signature = format!("pub fn {}({}){return_type}", function.name, parameters.join(", "));

        let mut body = vec![format!("// Total ops: {}", function.ops_after), String::new()];
        body.push(format!("// Intermediate terms ({})", function.intermediates.len()));
        for (temporary, definition) in &function.intermediates {
            body.push(format!(
                "let {}: f64 = {};",
                printer.print(temporary)?,
                printer.print(definition)?
            ));
        }
        body.push(String::new());
        body.push(format!("// Output terms ({})", function.outputs.len()));
        for output in &function.outputs {
            body.extend(Self::output_block(output, &printer)?);
            body.push(String::new());
        }
        match function.returned() {
            Some(returned) => body.push(format!("_{}", returned.name)),
            None => {
                body.pop();
            }
        }
        let body = indent(&body, "    ");

        let docs = wrap_docstring(&function.docstring, self.config.docstring_width.saturating_sub(4))
            .into_iter()
            .map(|l| if l.is_empty() { "///".to_string() } else { format!("/// {l}") })
            .collect::<Vec<_>>()
            .join("\n");
        let structs = function
            .structs()
            .into_iter()
            .map(|s| Self::struct_definition(s) + "\n\n")
            .collect::<String>();

        let source = format!(
            "{RULE}\n// {BANNER}\n{RULE}\n\n#![allow(clippy::all, clippy::pedantic, non_snake_case, unused_parens, unused_variables)]\n\n{structs}{docs}\n#[allow(clippy::too_many_arguments)]\n{signature} {{\n{body}\n}}\n"
        );

        let directory = PathBuf::from(Language::Rust.directory()).join(namespace);
        Ok(GeneratedFunction {
            name: function.name.clone(),
            language: Language::Rust,
            namespace: namespace.to_string(),
            signature,
            body,
            files: vec![
                GeneratedFile {
                    path: directory.join(format!("{}.{}", function.name, Language::Rust.extension())),
                    contents: source,
                    merge: false,
                },
                GeneratedFile {
                    path: directory.join("mod.rs"),
                    contents: format!("pub mod {};\n", function.name),
                    merge: true,
                },
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_and_parameters() {
        assert_eq!(RustBackend::type_name(&ArgType::Pose3), "[f64; 7]");
        assert_eq!(
            RustBackend::parameter("p", &ArgType::Matrix { rows: 3, cols: 1 }),
            "p: &nalgebra::SMatrix<f64, 3, 1>"
        );
        assert_eq!(RustBackend::parameter("x", &ArgType::Scalar), "x: f64");
    }

    #[test]
    fn test_literal_receivers_get_a_suffix() {
        let backend = RustBackend::new(RustConfig::default());
        let two = Printed::atom(backend.literal(2.0));
        let printed = backend.powf(&two, &Printed::atom("x"));
        assert_eq!(printed.text, "2.0_f64.powf(x)");
        let explicit = RustBackend::new(RustConfig::builder().explicit_literals(true).build());
        assert_eq!(explicit.literal(0.5), "0.5_f64");
    }

    #[test]
    fn test_sign_is_exact_at_zero() {
        let backend = RustBackend::new(RustConfig::default());
        let sign = backend.unary(UnaryFn::Sign, &Printed::atom("x"));
        assert_eq!(sign.text, "(if x > 0.0 { 1.0 } else if x < 0.0 { -1.0 } else { 0.0 })");
    }
}
