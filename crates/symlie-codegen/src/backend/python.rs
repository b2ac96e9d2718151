//! Plain Python modules.
//!
//! By default only the standard `math` module is used: matrices are nested
//! lists (column vectors flat lists) and rotations or poses are flat storage
//! sequences. With `use_numpy` matrices become `numpy` arrays. Nested
//! `Values` arguments are described by small classes with `__slots__`.

use std::path::PathBuf;

use symlie_core::expr::{BinaryFn, UnaryFn};

use super::{
    indent, matrix_position, symbol_names, wrap_docstring, Backend, Precedence, Printed, Printer,
    BANNER,
};
use crate::artifact::{GeneratedFile, GeneratedFunction};
use crate::config::{Language, PythonConfig};
use crate::error::CodegenResult;
use crate::lower::{ArgType, LoweredFunction, Output};

const RULE: &str =
    "# -----------------------------------------------------------------------------";

/// Python backend.
#[derive(Debug, Clone)]
pub struct PythonBackend {
    config: PythonConfig,
}

impl PythonBackend {
    /// Backend with the given settings.
    pub fn new(config: PythonConfig) -> Self {
        Self { config }
    }

    fn module(&self) -> &'static str {
        if self.config.use_numpy {
            "numpy"
        } else {
            "math"
        }
    }

    fn type_hint(&self, ty: &ArgType) -> String {
        match ty {
            ArgType::Scalar => "float".into(),
            ArgType::Matrix { .. } if self.config.use_numpy => "numpy.ndarray".into(),
            ArgType::Matrix { cols: 1, .. } => "T.Sequence[float]".into(),
            ArgType::Matrix { .. } => "T.Sequence[T.Sequence[float]]".into(),
            ArgType::Struct { name, .. } => name.clone(),
            ArgType::Array { item, .. } => format!("T.Sequence[{}]", self.type_hint(item)),
            _ => "T.Sequence[float]".into(),
        }
    }

    fn class_definition(&self, ty: &ArgType) -> String {
        let ArgType::Struct { name, fields } = ty else {
            return String::new();
        };
        let names: Vec<&str> = fields.iter().map(|(f, _)| f.as_str()).collect();
        let hints: Vec<String> = fields.iter().map(|(_, t)| self.type_hint(t)).collect();
        let slots = names
            .iter()
            .map(|n| format!("\"{n}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let mut lines = vec![
            format!("class {name}(object):"),
            format!("    __slots__ = [{slots}]"),
            String::new(),
            format!("    def __init__(self, {}):", names.join(", ")),
            format!("        # type: ({}) -> None", hints.join(", ")),
        ];
        lines.extend(names.iter().map(|n| format!("        self.{n} = {n}")));
        lines.join("\n")
    }

    fn initializer(&self, output: &Output) -> String {
        match &output.ty {
            ArgType::Scalar => "0.0".into(),
            ArgType::Matrix { rows, cols } if self.config.use_numpy => {
                format!("numpy.zeros(({rows}, {cols}))")
            }
            ArgType::Matrix { rows, cols: 1 } => format!("[0.0] * {rows}"),
            ArgType::Matrix { rows, cols } => format!("[[0.0] * {cols} for _ in range({rows})]"),
            ty => format!("[0.0] * {}", ty.storage_dim()),
        }
    }

    fn target(&self, output: &Output, index: usize) -> String {
        let local = format!("_{}", output.name);
        match &output.ty {
            ArgType::Scalar => local,
            ArgType::Matrix { rows, cols } => {
                let (r, c) = matrix_position(index, *rows);
                self.matrix_entry(&local, *rows, *cols, r, c)
            }
            _ => format!("{local}[{index}]"),
        }
    }
}

impl Backend for PythonBackend {
    fn language(&self) -> Language {
        Language::Python
    }

    fn literal(&self, value: f64) -> String {
        format!("{value:?}")
    }

    fn sqrt(&self, arg: &Printed) -> Printed {
        Printed::atom(format!("{}.sqrt({})", self.module(), arg.text))
    }

    fn powi(&self, base: &Printed, exponent: i32) -> Printed {
        Printed::new(
            format!("{}**{exponent}", base.at_least(Precedence::Atom)),
            Precedence::Power,
        )
    }

    fn powf(&self, base: &Printed, exponent: &Printed) -> Printed {
        Printed::new(
            format!(
                "{}**{}",
                base.at_least(Precedence::Atom),
                exponent.at_least(Precedence::Atom)
            ),
            Precedence::Power,
        )
    }

    fn unary(&self, function: UnaryFn, arg: &Printed) -> Printed {
        let a = &arg.text;
        let module = self.module();
        Printed::atom(match (function, self.config.use_numpy) {
            (UnaryFn::Abs, _) => format!("abs({a})"),
            (UnaryFn::Sign, false) => format!("(0.0 if {a} == 0 else math.copysign(1.0, {a}))"),
            (UnaryFn::Asin, true) => format!("numpy.arcsin({a})"),
            (UnaryFn::Acos, true) => format!("numpy.arccos({a})"),
            (UnaryFn::Atan, true) => format!("numpy.arctan({a})"),
            (other, _) => format!("{module}.{}({a})", other.name()),
        })
    }

    fn binary(&self, function: BinaryFn, a: &Printed, b: &Printed) -> Printed {
        Printed::atom(match function {
            BinaryFn::Atan2 if self.config.use_numpy => format!("numpy.arctan2({}, {})", a.text, b.text),
            BinaryFn::Atan2 => format!("math.atan2({}, {})", a.text, b.text),
            BinaryFn::Min => format!("min({}, {})", a.text, b.text),
            BinaryFn::Max => format!("max({}, {})", a.text, b.text),
        })
    }

    fn matrix_entry(&self, base: &str, _rows: usize, cols: usize, row: usize, col: usize) -> String {
        if self.config.use_numpy {
            format!("{base}[{row}, {col}]")
        } else if cols == 1 {
            format!("{base}[{row}]")
        } else {
            format!("{base}[{row}][{col}]")
        }
    }

    fn geometric_entry(&self, base: &str, index: usize) -> String {
        format!("{base}[{index}]")
    }

    fn render(&self, function: &LoweredFunction, namespace: &str) -> CodegenResult<GeneratedFunction> {
        let names = symbol_names(self, function);
        let printer = Printer::new(self, &names);

        let arguments: Vec<&str> = function.inputs.iter().map(|i| i.name.as_str()).collect();
        let hints: Vec<String> = function.inputs.iter().map(|i| self.type_hint(&i.ty)).collect();
        let returns: Vec<String> = function.outputs.iter().map(|o| self.type_hint(&o.ty)).collect();
        let return_hint = match returns.as_slice() {
            [single] => single.clone(),
            many => format!("T.Tuple[{}]", many.join(", ")),
        };
        let signature = format!("def {}({}):", function.name, arguments.join(", "));

        let mut body = vec![
            format!("# type: ({}) -> {return_hint}", hints.join(", ")),
            "\"\"\"".to_string(),
        ];
        body.extend(wrap_docstring(&function.docstring, self.config.docstring_width.saturating_sub(4)));
        body.push("\"\"\"".into());
        body.push(String::new());
        body.push(format!("# Total ops: {}", function.ops_after));
        body.push(String::new());
        body.push(format!("# Intermediate terms ({})", function.intermediates.len()));
        for (temporary, definition) in &function.intermediates {
            body.push(format!(
                "{} = {}",
                printer.print(temporary)?,
                printer.print(definition)?
            ));
        }
        body.push(String::new());
        body.push(format!("# Output terms ({})", function.outputs.len()));
        for output in &function.outputs {
            if !matches!(output.ty, ArgType::Scalar) {
                body.push(format!("_{} = {}", output.name, self.initializer(output)));
            }
            for (i, expr) in output.exprs.iter().enumerate() {
                body.push(format!("{} = {}", self.target(output, i), printer.print(expr)?));
            }
        }
        let results: Vec<String> = function.outputs.iter().map(|o| format!("_{}", o.name)).collect();
        body.push(format!("return {}", results.join(", ")));
        let body = indent(&body, "    ");

        let mut imports = vec!["import math".to_string(), "import typing as T".to_string()];
        if self.config.use_numpy {
            imports.push(String::new());
            imports.push("import numpy".into());
        }
        let classes = function
            .structs()
            .into_iter()
            .map(|s| self.class_definition(s) + "\n\n\n")
            .collect::<String>();

        let source = format!(
            "{RULE}\n# {BANNER}\n{RULE}\n\n# pylint: disable=too-many-locals,too-many-lines,too-many-statements,unused-argument,unused-import\n\n{}\n\n\n{classes}{signature}\n{body}\n",
            imports.join("\n"),
        );

        let directory = PathBuf::from(Language::Python.directory()).join(namespace);
        Ok(GeneratedFunction {
            name: function.name.clone(),
            language: Language::Python,
            namespace: namespace.to_string(),
            signature,
            body,
            files: vec![
                GeneratedFile {
                    path: directory.join(format!("{}.{}", function.name, Language::Python.extension())),
                    contents: source,
                    merge: false,
                },
                GeneratedFile {
                    path: directory.join("__init__.py"),
                    contents: format!("from .{name} import {name}\n", name = function.name),
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
    fn test_matrix_access_styles() {
        let plain = PythonBackend::new(PythonConfig::default());
        assert_eq!(plain.matrix_entry("p", 3, 1, 2, 0), "p[2]");
        assert_eq!(plain.matrix_entry("m", 2, 2, 1, 0), "m[1][0]");
        let numpy = PythonBackend::new(PythonConfig::builder().use_numpy(true).build());
        assert_eq!(numpy.matrix_entry("m", 2, 2, 1, 0), "m[1, 0]");
        assert_eq!(numpy.type_hint(&ArgType::Matrix { rows: 2, cols: 2 }), "numpy.ndarray");
    }

    #[test]
    fn test_numpy_spells_inverse_trig() {
        let numpy = PythonBackend::new(PythonConfig::builder().use_numpy(true).build());
        let printed = numpy.unary(UnaryFn::Acos, &Printed::atom("x"));
        assert_eq!(printed.text, "numpy.arccos(x)");
        let plain = PythonBackend::new(PythonConfig::default());
        assert_eq!(plain.unary(UnaryFn::Acos, &Printed::atom("x")).text, "math.acos(x)");
    }

    #[test]
    fn test_class_definition() {
        let backend = PythonBackend::new(PythonConfig::default());
        let ty = ArgType::Struct {
            name: "FParams".into(),
            fields: vec![("R".into(), ArgType::Rot3), ("k".into(), ArgType::Scalar)],
        };
        let class = backend.class_definition(&ty);
        assert!(class.starts_with("class FParams(object):\n    __slots__ = [\"R\", \"k\"]"));
        assert!(class.contains("# type: (T.Sequence[float], float) -> None"));
        assert!(class.ends_with("self.k = k"));
    }
}
