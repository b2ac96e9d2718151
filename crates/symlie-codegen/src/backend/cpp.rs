//! Header-only C++ templated on the scalar type.
//!
//! Matrices are Eigen fixed-size matrices, rotations and poses the
//! `sym::Rot3<Scalar>` family, nested `Values` arguments become templated
//! structs. Outputs that are not returned are written through pointers
//! defaulting to `nullptr`, so callers only pay for what they ask for.

use std::path::PathBuf;

use symlie_core::expr::{BinaryFn, UnaryFn};

use super::{
    geometric_types, indent, matrix_position, symbol_names, wrap_docstring, Backend, Printed,
    Printer, BANNER,
};
use crate::artifact::{GeneratedFile, GeneratedFunction};
use crate::config::{CppConfig, Language};
use crate::error::CodegenResult;
use crate::lower::{ArgType, LoweredFunction, Output};
use crate::names::camel_case;

const RULE: &str =
    "// -----------------------------------------------------------------------------";

/// C++ backend.
#[derive(Debug, Clone)]
pub struct CppBackend {
    config: CppConfig,
}

impl CppBackend {
    /// Backend with the given settings.
    pub fn new(config: CppConfig) -> Self {
        Self { config }
    }

    fn type_name(ty: &ArgType) -> String {
        match ty {
            ArgType::Scalar => "Scalar".into(),
            ArgType::Matrix { rows, cols } => format!("Eigen::Matrix<Scalar, {rows}, {cols}>"),
            ArgType::Struct { name, .. } => format!("{name}<Scalar>"),
            ArgType::Array { item, len } => format!("std::array<{}, {len}>", Self::type_name(item)),
            other => format!("sym::{}<Scalar>", other.geometric_name().unwrap_or("Rot3")),
        }
    }

    fn parameter(name: &str, ty: &ArgType) -> String {
        match ty {
            ArgType::Scalar => format!("const Scalar {name}"),
            _ => format!("const {}& {name}", Self::type_name(ty)),
        }
    }

    fn struct_definition(ty: &ArgType) -> String {
        let ArgType::Struct { name, fields } = ty else {
            return String::new();
        };
        let mut lines = vec![
            "template <typename Scalar>".to_string(),
            format!("struct {name} {{"),
        ];
        for (field, field_ty) in fields {
            lines.push(format!("  {} {field};", Self::type_name(field_ty)));
        }
        lines.push("};".into());
        lines.join("\n")
    }

    /// Local holding the output's storage while it is filled in.
    fn storage_type(output: &Output) -> String {
        match &output.ty {
            ArgType::Scalar | ArgType::Matrix { .. } => Self::type_name(&output.ty),
            ty => format!("Eigen::Matrix<Scalar, {}, 1>", ty.storage_dim()),
        }
    }

    /// Expression converting the filled local into the output type.
    fn finished(output: &Output, local: &str) -> String {
        match &output.ty {
            ArgType::Scalar | ArgType::Matrix { .. } => local.to_string(),
            ty => format!("{}({local})", Self::type_name(ty)),
        }
    }

    fn assignments(
        output: &Output,
        local: &str,
        printer: &Printer<'_>,
    ) -> CodegenResult<Vec<String>> {
        output
            .exprs
            .iter()
            .enumerate()
            .map(|(i, expr)| {
                let target = match &output.ty {
                    ArgType::Scalar => local.to_string(),
                    ArgType::Matrix { rows, .. } => {
                        let (r, c) = matrix_position(i, *rows);
                        format!("{local}({r}, {c})")
                    }
                    _ => format!("{local}[{i}]"),
                };
                Ok(format!("{target} = {};", printer.print(expr)?))
            })
            .collect()
    }

    fn output_block(output: &Output, printer: &Printer<'_>) -> CodegenResult<Vec<String>> {
        let local = format!("_{}", output.name);
        let assignments = Self::assignments(output, &local, printer)?;
        let mut lines = Vec::new();
        if output.returned {
            lines.push(format!("{} {local};", Self::storage_type(output)));
            lines.extend(assignments);
            return Ok(lines);
        }

        lines.push(format!("if ({} != nullptr) {{", output.name));
        let direct = matches!(output.ty, ArgType::Scalar | ArgType::Matrix { .. });
        if direct {
            lines.push(format!(
                "  {}& {local} = (*{});",
                Self::type_name(&output.ty),
                output.name
            ));
        } else {
            lines.push(format!("  {} {local};", Self::storage_type(output)));
        }
        lines.extend(assignments.into_iter().map(|a| format!("  {a}")));
        if !direct {
            lines.push(format!("  *{} = {};", output.name, Self::finished(output, &local)));
        }
        lines.push("}".into());
        Ok(lines)
    }
}

impl Backend for CppBackend {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn literal(&self, value: f64) -> String {
        if self.config.explicit_literals {
            if value.fract() == 0.0 && value < 1e15 {
                #[allow(clippy::cast_possible_truncation)]
                let integer = value as i64;
                format!("Scalar({integer})")
            } else {
                format!("Scalar({value:?})")
            }
        } else {
            format!("{value:?}")
        }
    }

    fn sqrt(&self, arg: &Printed) -> Printed {
        Printed::atom(format!("std::sqrt({})", arg.text))
    }

    fn powi(&self, base: &Printed, exponent: i32) -> Printed {
        Printed::atom(format!(
            "std::pow({}, {})",
            base.text,
            self.literal(f64::from(exponent))
        ))
    }

    fn powf(&self, base: &Printed, exponent: &Printed) -> Printed {
        Printed::atom(format!("std::pow({}, {})", base.text, exponent.text))
    }

    fn unary(&self, function: UnaryFn, arg: &Printed) -> Printed {
        let a = &arg.text;
        Printed::atom(match function {
            UnaryFn::Sign => format!("Scalar((Scalar(0) < {a}) - ({a} < Scalar(0)))"),
            UnaryFn::Abs => format!("std::abs({a})"),
            other => format!("std::{}({a})", other.name()),
        })
    }

    fn binary(&self, function: BinaryFn, a: &Printed, b: &Printed) -> Printed {
        Printed::atom(match function {
            BinaryFn::Atan2 => format!("std::atan2({}, {})", a.text, b.text),
            BinaryFn::Min => format!("std::min<Scalar>({}, {})", a.text, b.text),
            BinaryFn::Max => format!("std::max<Scalar>({}, {})", a.text, b.text),
        })
    }

    fn matrix_entry(&self, base: &str, _rows: usize, _cols: usize, row: usize, col: usize) -> String {
        format!("{base}({row}, {col})")
    }

    fn geometric_entry(&self, base: &str, index: usize) -> String {
        format!("{base}.Data()[{index}]")
    }

    fn render(&self, function: &LoweredFunction, namespace: &str) -> CodegenResult<GeneratedFunction> {
        let names = symbol_names(self, function);
        let printer = Printer::new(self, &names);
        let name = camel_case(&function.name);

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
                .map(|o| format!("{}* const {} = nullptr", Self::type_name(&o.ty), o.name)),
        );
        let return_type = function
            .returned()
            .map_or_else(|| "void".to_string(), |o| Self::type_name(&o.ty));
        let signature = format!("{return_type} {name}({})", parameters.join(", "));

        let mut body = vec![format!("// Total ops: {}", function.ops_after), String::new()];
        body.push(format!("// Intermediate terms ({})", function.intermediates.len()));
        for (temporary, definition) in &function.intermediates {
            body.push(format!(
                "const Scalar {} = {};",
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
        if let Some(returned) = function.returned() {
            body.push(format!(
                "return {};",
                Self::finished(returned, &format!("_{}", returned.name))
            ));
        } else {
            body.pop();
        }
        let body = indent(&body, "  ");

        let mut includes = vec!["#include <Eigen/Dense>".to_string()];
        if function.inputs.iter().any(|i| contains_array(&i.ty)) {
            includes.insert(0, "#include <array>".into());
        }
        includes.push(String::new());
        for geometric in geometric_types(function) {
            includes.push(format!("#include <sym/{}.h>", geometric.to_lowercase()));
        }

        let docstring = wrap_docstring(&function.docstring, self.config.docstring_width.saturating_sub(3))
            .into_iter()
            .map(|l| if l.is_empty() { " *".to_string() } else { format!(" * {l}") })
            .collect::<Vec<_>>()
            .join("\n");
        let structs = function
            .structs()
            .into_iter()
            .map(|s| Self::struct_definition(s) + "\n\n")
            .collect::<String>();

        let source = format!(
            "{RULE}\n// {BANNER}\n{RULE}\n\n#pragma once\n\n{}\n\nnamespace {namespace} {{\n\n{structs}/**\n{docstring}\n */\ntemplate <typename Scalar>\n{signature} {{\n{body}\n}}  // NOLINT(readability/fn_size)\n\n}}  // namespace {namespace}\n",
            includes.join("\n").trim_end(),
        );

        let path = PathBuf::from(Language::Cpp.directory())
            .join(namespace)
            .join(format!("{}.{}", function.name, Language::Cpp.extension()));
        Ok(GeneratedFunction {
            name,
            language: Language::Cpp,
            namespace: namespace.to_string(),
            signature,
            body,
            files: vec![GeneratedFile {
                path,
                contents: source,
                merge: false,
            }],
        })
    }
}

fn contains_array(ty: &ArgType) -> bool {
    match ty {
        ArgType::Array { .. } => true,
        ArgType::Struct { fields, .. } => fields.iter().any(|(_, f)| contains_array(f)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CppConfig;

    #[test]
    fn test_types() {
        assert_eq!(CppBackend::type_name(&ArgType::Rot3), "sym::Rot3<Scalar>");
        assert_eq!(
            CppBackend::type_name(&ArgType::Matrix { rows: 2, cols: 3 }),
            "Eigen::Matrix<Scalar, 2, 3>"
        );
        let array = ArgType::Array {
            item: Box::new(ArgType::Pose2),
            len: 3,
        };
        assert_eq!(CppBackend::type_name(&array), "std::array<sym::Pose2<Scalar>, 3>");
        assert_eq!(CppBackend::parameter("x", &ArgType::Scalar), "const Scalar x");
    }

    #[test]
    fn test_literals() {
        let explicit = CppBackend::new(CppConfig::default());
        assert_eq!(explicit.literal(2.0), "Scalar(2)");
        assert_eq!(explicit.literal(0.25), "Scalar(0.25)");
        let plain = CppBackend::new(CppConfig::builder().explicit_literals(false).build());
        assert_eq!(plain.literal(2.0), "2.0");
    }

    #[test]
    fn test_struct_definition() {
        let ty = ArgType::Struct {
            name: "FParams".into(),
            fields: vec![("R".into(), ArgType::Rot2), ("k".into(), ArgType::Scalar)],
        };
        assert_eq!(
            CppBackend::struct_definition(&ty),
            "template <typename Scalar>\nstruct FParams {\n  sym::Rot2<Scalar> R;\n  Scalar k;\n};"
        );
    }
}
