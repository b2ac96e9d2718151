//! Language backends.
//!
//! A [`Backend`] knows two things: how to spell one expression node in its
//! language, and how to lay out a whole [`LoweredFunction`] as source files.
//! The precedence-aware walk over the expression graph is shared by every
//! backend through [`Printer`].

pub mod cpp;
pub mod python;
pub mod rust;

use std::collections::HashMap;
use std::fmt::Debug;

use symlie_core::expr::{BinaryFn, Expr, ExprKind, UnaryFn};

use crate::artifact::GeneratedFunction;
use crate::config::{CodegenConfig, Language};
use crate::error::{CodegenError, CodegenResult};
use crate::lower::{ArgType, LoweredFunction};

pub use cpp::CppBackend;
pub use python::PythonBackend;
pub use rust::RustBackend;

/// Banner placed at the top of every generated file.
pub const BANNER: &str = "This file was autogenerated by symlie. Do NOT modify by hand.";

/// Binding strength of a printed expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// `a + b`, `a - b` and unary minus
    Sum,
    /// `a*b`, `a/b`
    Product,
    /// `a**b`
    Power,
    /// Names, literals and calls
    Atom,
}

/// Source text of an expression together with its precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Printed {
    /// The source text.
    pub text: String,
    /// How tightly the text binds.
    pub precedence: Precedence,
}

impl Printed {
    /// Text that never needs parentheses.
    pub fn atom(text: impl Into<String>) -> Self {
        Self::new(text, Precedence::Atom)
    }

    /// Text with the given precedence.
    pub fn new(text: impl Into<String>, precedence: Precedence) -> Self {
        Self {
            text: text.into(),
            precedence,
        }
    }

    /// The text, parenthesized unless it binds at least as tightly as
    /// `precedence`.
    pub fn at_least(&self, precedence: Precedence) -> String {
        if self.precedence < precedence {
            format!("({})", self.text)
        } else {
            self.text.clone()
        }
    }
}

/// Everything language specific about emitting a function.
pub trait Backend: Debug + Send + Sync {
    /// Target language.
    fn language(&self) -> Language;

    /// A finite, non-negative numeric literal.
    fn literal(&self, value: f64) -> String;

    /// Square root.
    fn sqrt(&self, arg: &Printed) -> Printed;

    /// Power with a positive integer exponent.
    fn powi(&self, base: &Printed, exponent: i32) -> Printed;

    /// Power with an arbitrary exponent.
    fn powf(&self, base: &Printed, exponent: &Printed) -> Printed;

    /// Unary function call.
    fn unary(&self, function: UnaryFn, arg: &Printed) -> Printed;

    /// Binary function call.
    fn binary(&self, function: BinaryFn, a: &Printed, b: &Printed) -> Printed;

    /// Entry `(row, col)` of a matrix argument.
    fn matrix_entry(&self, base: &str, rows: usize, cols: usize, row: usize, col: usize)
        -> String;

    /// Storage scalar `index` of a rotation or pose argument.
    fn geometric_entry(&self, base: &str, index: usize) -> String;

    /// Field of a struct argument.
    fn field(&self, base: &str, field: &str) -> String {
        format!("{base}.{field}")
    }

    /// Item of an array argument.
    fn item(&self, base: &str, index: usize) -> String {
        format!("{base}[{index}]")
    }

    /// Lays out the function, returning it with the files to write.
    fn render(&self, function: &LoweredFunction, namespace: &str)
        -> CodegenResult<GeneratedFunction>;
}

/// The backend configured by `config`.
pub fn backend_for(config: &CodegenConfig) -> Box<dyn Backend> {
    match config {
        CodegenConfig::Cpp(c) => Box::new(CppBackend::new(c.clone())),
        CodegenConfig::Python(c) => Box::new(PythonBackend::new(c.clone())),
        CodegenConfig::Rust(c) => Box::new(RustBackend::new(c.clone())),
    }
}

fn split_coefficient(expr: &Expr) -> (f64, Vec<Expr>) {
    match expr.kind() {
        ExprKind::Constant(c) => (*c, Vec::new()),
        ExprKind::Mul(factors) => match factors.first().and_then(Expr::as_constant) {
            Some(c) => (c, factors[1..].to_vec()),
            None => (1.0, factors.clone()),
        },
        _ => (1.0, vec![expr.clone()]),
    }
}

fn negative_exponent(expr: &Expr) -> Option<(Expr, f64)> {
    match expr.kind() {
        ExprKind::Pow(base, exponent) => exponent
            .as_constant()
            .filter(|e| *e < 0.0)
            .map(|e| (base.clone(), e)),
        _ => None,
    }
}

/// Prints expressions through a backend, resolving symbols through a name
/// table.
pub struct Printer<'a> {
    backend: &'a dyn Backend,
    names: &'a HashMap<Expr, String>,
}

impl<'a> Printer<'a> {
    /// Printer resolving symbols through `names`.
    pub fn new(backend: &'a dyn Backend, names: &'a HashMap<Expr, String>) -> Self {
        Self { backend, names }
    }

    /// Source text of `expr`.
    pub fn print(&self, expr: &Expr) -> CodegenResult<String> {
        Ok(self.printed(expr)?.text)
    }

    /// Source text of `expr` with its precedence.
    pub fn printed(&self, expr: &Expr) -> CodegenResult<Printed> {
        match expr.kind() {
            ExprKind::Constant(value) => self.constant(*value),
            ExprKind::Symbol(name) => self
                .names
                .get(expr)
                .map(Printed::atom)
                .ok_or_else(|| CodegenError::unbound_symbol(name.as_ref())),
            ExprKind::Add(terms) => self.sum(terms),
            ExprKind::Mul(_) => {
                let (coefficient, factors) = split_coefficient(expr);
                self.product(coefficient, &factors)
            }
            ExprKind::Pow(base, exponent) => self.power(expr, base, exponent),
            ExprKind::Unary(function, arg) => Ok(self.backend.unary(*function, &self.printed(arg)?)),
            ExprKind::Binary(function, a, b) => {
                Ok(self
                    .backend
                    .binary(*function, &self.printed(a)?, &self.printed(b)?))
            }
            ExprKind::Opaque(name, _) => Err(CodegenError::unsupported(
                self.backend.language().to_string(),
                format!("opaque function `{name}`"),
            )),
        }
    }

    fn magnitude(&self, value: f64) -> CodegenResult<String> {
        if value.is_finite() {
            Ok(self.backend.literal(value.abs()))
        } else {
            Err(CodegenError::unsupported(
                self.backend.language().to_string(),
                format!("non-finite constant {value}"),
            ))
        }
    }

    fn constant(&self, value: f64) -> CodegenResult<Printed> {
        let text = self.magnitude(value)?;
        Ok(if value < 0.0 {
            Printed::new(format!("-{text}"), Precedence::Sum)
        } else {
            Printed::atom(text)
        })
    }

    fn sum(&self, terms: &[Expr]) -> CodegenResult<Printed> {
        // Constants go last: `x + 1` rather than `1 + x`.
        let mut ordered: Vec<&Expr> = terms.iter().filter(|t| !t.is_constant()).collect();
        ordered.extend(terms.iter().filter(|t| t.is_constant()));

        let mut text = String::new();
        for (i, term) in ordered.into_iter().enumerate() {
            let (coefficient, factors) = split_coefficient(term);
            let magnitude = self.product(coefficient.abs(), &factors)?;
            let separator = match (i, coefficient < 0.0) {
                (0, false) => "",
                (0, true) => "-",
                (_, false) => " + ",
                (_, true) => " - ",
            };
            text.push_str(separator);
            text.push_str(&magnitude.at_least(Precedence::Product));
        }
        Ok(Printed::new(text, Precedence::Sum))
    }

    fn product(&self, coefficient: f64, factors: &[Expr]) -> CodegenResult<Printed> {
        let mut numerator = Vec::new();
        let mut denominator = Vec::new();
        for factor in factors {
            match negative_exponent(factor) {
                Some((base, exponent)) => denominator.push(self.printed(&base.pow(-exponent))?),
                None => numerator.push(self.printed(factor)?),
            }
        }

        let magnitude = coefficient.abs();
        if magnitude != 1.0 || numerator.is_empty() {
            numerator.insert(0, Printed::atom(self.magnitude(magnitude)?));
        }

        let mut result = if numerator.len() == 1 && denominator.is_empty() {
            numerator.remove(0)
        } else {
            let mut text = numerator
                .iter()
                .map(|p| p.at_least(Precedence::Product))
                .collect::<Vec<_>>()
                .join("*");
            if denominator.len() == 1 {
                text.push('/');
                text.push_str(&denominator[0].at_least(Precedence::Power));
            } else if !denominator.is_empty() {
                let joined = denominator
                    .iter()
                    .map(|p| p.at_least(Precedence::Product))
                    .collect::<Vec<_>>()
                    .join("*");
                text.push_str(&format!("/({joined})"));
            }
            Printed::new(text, Precedence::Product)
        };

        if coefficient < 0.0 {
            result = Printed::new(
                format!("-{}", result.at_least(Precedence::Product)),
                Precedence::Sum,
            );
        }
        Ok(result)
    }

    fn power(&self, expr: &Expr, base: &Expr, exponent: &Expr) -> CodegenResult<Printed> {
        match exponent.as_constant() {
            Some(e) if e < 0.0 => self.product(1.0, std::slice::from_ref(expr)),
            Some(e) if e == 0.5 => Ok(self.backend.sqrt(&self.printed(base)?)),
            Some(e) if e.fract() == 0.0 && e <= f64::from(i32::MAX) => {
                #[allow(clippy::cast_possible_truncation)]
                let n = e as i32;
                Ok(self.backend.powi(&self.printed(base)?, n))
            }
            _ => Ok(self
                .backend
                .powf(&self.printed(base)?, &self.printed(exponent)?)),
        }
    }
}

/// Source accessors for each storage scalar of an argument named `base`, in
/// storage order.
pub fn storage_accessors(backend: &dyn Backend, base: &str, ty: &ArgType) -> Vec<String> {
    let mut out = Vec::with_capacity(ty.storage_dim());
    push_accessors(backend, base, ty, &mut out);
    out
}

fn push_accessors(backend: &dyn Backend, base: &str, ty: &ArgType, out: &mut Vec<String>) {
    match ty {
        ArgType::Scalar => out.push(base.to_string()),
        ArgType::Matrix { rows, cols } => {
            for col in 0..*cols {
                for row in 0..*rows {
                    out.push(backend.matrix_entry(base, *rows, *cols, row, col));
                }
            }
        }
        ArgType::Struct { fields, .. } => {
            for (name, field) in fields {
                push_accessors(backend, &backend.field(base, name), field, out);
            }
        }
        ArgType::Array { item, len } => {
            for i in 0..*len {
                push_accessors(backend, &backend.item(base, i), item, out);
            }
        }
        ArgType::Rot2 | ArgType::Rot3 | ArgType::Pose2 | ArgType::Pose3 => {
            out.extend((0..ty.storage_dim()).map(|i| backend.geometric_entry(base, i)));
        }
    }
}

/// Maps every input storage symbol and temporary to its source spelling.
pub fn symbol_names(backend: &dyn Backend, function: &LoweredFunction) -> HashMap<Expr, String> {
    let mut names = HashMap::new();
    for input in &function.inputs {
        let accessors = storage_accessors(backend, &input.name, &input.ty);
        for (symbol, accessor) in input.storage.iter().zip(accessors) {
            names.entry(symbol.clone()).or_insert(accessor);
        }
    }
    for (temporary, _) in &function.intermediates {
        if let Some(name) = temporary.symbol_name() {
            names.insert(temporary.clone(), name.to_string());
        }
    }
    names
}

/// `(row, col)` of storage entry `index` in a column-major matrix.
pub fn matrix_position(index: usize, rows: usize) -> (usize, usize) {
    (index % rows, index / rows)
}

/// Geometric types used anywhere in the function, in first-use order.
pub fn geometric_types(function: &LoweredFunction) -> Vec<&'static str> {
    fn visit(ty: &ArgType, out: &mut Vec<&'static str>) {
        match ty {
            ArgType::Struct { fields, .. } => fields.iter().for_each(|(_, f)| visit(f, out)),
            ArgType::Array { item, .. } => visit(item, out),
            _ => {
                if let Some(name) = ty.geometric_name() {
                    if !out.contains(&name) {
                        out.push(name);
                    }
                }
            }
        }
    }
    let mut out = Vec::new();
    for ty in function
        .inputs
        .iter()
        .map(|i| &i.ty)
        .chain(function.outputs.iter().map(|o| &o.ty))
    {
        visit(ty, &mut out);
    }
    out
}

/// Word-wraps `text` to `width` columns, keeping each line's indentation.
pub fn wrap_docstring(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for line in text.lines() {
        let line = line.trim_end();
        if line.len() <= width {
            lines.push(line.to_string());
            continue;
        }
        let indent = &line[..line.len() - line.trim_start().len()];
        let mut current = indent.to_string();
        for word in line.split_whitespace() {
            if current.len() > indent.len() && current.len() + 1 + word.len() > width {
                lines.push(std::mem::replace(&mut current, indent.to_string()));
            }
            if current.len() > indent.len() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}

/// Prefixes every non-empty line with `indent`.
pub fn indent(lines: &[String], indent: &str) -> String {
    lines
        .iter()
        .map(|l| {
            if l.is_empty() {
                String::new()
            } else {
                format!("{indent}{l}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CppConfig, PythonConfig, RustConfig};

    fn names(symbols: &[&str]) -> HashMap<Expr, String> {
        symbols
            .iter()
            .map(|s| (Expr::symbol(s), (*s).to_string()))
            .collect()
    }

    fn print_with(backend: &dyn Backend, expr: &Expr) -> String {
        let table = names(&["x", "y", "z"]);
        Printer::new(backend, &table).print(expr).unwrap()
    }

    #[test]
    fn test_signs_and_division() {
        let backend = PythonBackend::new(PythonConfig::default());
        let [x, y] = [Expr::symbol("x"), Expr::symbol("y")];
        assert_eq!(print_with(&backend, &(&x - &y)), "x - y");
        assert_eq!(print_with(&backend, &(-&x)), "-x");
        assert_eq!(print_with(&backend, &(&x / &y)), "x/y");
        assert_eq!(print_with(&backend, &(&x + 1.0)), "x + 1.0");
        assert_eq!(print_with(&backend, &x.recip()), "1.0/x");
        assert_eq!(print_with(&backend, &((&x + &y).sin() * 2.0)), "2.0*math.sin(x + y)");
        assert_eq!(print_with(&backend, &(&x + &y).powi(2)), "(x + y)**2");
    }

    #[test]
    fn test_power_spelling_per_language() {
        let x = Expr::symbol("x");
        let e = x.powi(3) + x.sqrt();
        let cpp = CppBackend::new(CppConfig::default());
        let python = PythonBackend::new(PythonConfig::default());
        let rust = RustBackend::new(RustConfig::default());
        let c = print_with(&cpp, &e);
        assert!(c.contains("std::pow(x, Scalar(3))"), "{c}");
        assert!(c.contains("std::sqrt(x)"), "{c}");
        let p = print_with(&python, &e);
        assert!(p.contains("x**3"), "{p}");
        assert!(p.contains("math.sqrt(x)"), "{p}");
        let r = print_with(&rust, &e);
        assert!(r.contains("x.powi(3)"), "{r}");
        assert!(r.contains("x.sqrt()"), "{r}");
    }

    #[test]
    fn test_method_receivers_are_parenthesized() {
        let rust = RustBackend::new(RustConfig::default());
        let [x, y] = [Expr::symbol("x"), Expr::symbol("y")];
        assert_eq!(print_with(&rust, &(&x + &y).sin()), "(x + y).sin()");
        assert_eq!(print_with(&rust, &(-&x).cos()), "(-x).cos()");
    }

    #[test]
    fn test_opaque_and_unbound_are_errors() {
        let backend = CppBackend::new(CppConfig::default());
        let x = Expr::symbol("x");
        let table = names(&["x"]);
        let printer = Printer::new(&backend, &table);
        assert!(matches!(
            printer.print(&Expr::opaque("g", vec![x.clone()])),
            Err(CodegenError::UnsupportedExpression { .. })
        ));
        assert!(matches!(
            printer.print(&(&x + Expr::symbol("w"))),
            Err(CodegenError::UnboundSymbol { .. })
        ));
    }

    #[test]
    fn test_wrap_docstring() {
        let text = "  alpha beta gamma delta epsilon";
        let lines = wrap_docstring(text, 16);
        assert_eq!(lines, ["  alpha beta", "  gamma delta", "  epsilon"]);
        assert_eq!(wrap_docstring("short", 16), ["short"]);
    }

    #[test]
    fn test_matrix_position_is_column_major() {
        assert_eq!(matrix_position(0, 2), (0, 0));
        assert_eq!(matrix_position(1, 2), (1, 0));
        assert_eq!(matrix_position(2, 2), (0, 1));
    }
}
