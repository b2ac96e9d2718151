//! Conventional infix rendering of expressions.

use std::fmt::{self, Write};

use super::{Expr, ExprKind};

const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_POW: u8 = 3;
const PREC_ATOM: u8 = 4;

/// Formats a numeric literal, dropping the fractional part of integers.
pub(crate) fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn precedence(expr: &Expr) -> u8 {
    match expr.kind() {
        ExprKind::Constant(v) if *v < 0.0 => PREC_ADD,
        ExprKind::Constant(_) | ExprKind::Symbol(_) => PREC_ATOM,
        ExprKind::Add(_) => PREC_ADD,
        ExprKind::Mul(args) => {
            if args.first().and_then(Expr::as_constant).is_some_and(|c| c < 0.0) {
                PREC_ADD
            } else {
                PREC_MUL
            }
        }
        ExprKind::Pow(_, exponent) => match exponent.as_constant() {
            Some(e) if e == 0.5 => PREC_ATOM,
            Some(e) if e < 0.0 => PREC_MUL,
            _ => PREC_POW,
        },
        ExprKind::Unary(..) | ExprKind::Binary(..) | ExprKind::Opaque(..) => PREC_ATOM,
    }
}

fn write_expr(expr: &Expr, out: &mut dyn Write, parent: u8) -> fmt::Result {
    let own = precedence(expr);
    if own < parent {
        out.write_char('(')?;
        write_bare(expr, out)?;
        out.write_char(')')
    } else {
        write_bare(expr, out)
    }
}

fn write_list(args: &[Expr], out: &mut dyn Write) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write_expr(arg, out, 0)?;
    }
    Ok(())
}

fn write_bare(expr: &Expr, out: &mut dyn Write) -> fmt::Result {
    match expr.kind() {
        ExprKind::Constant(v) => out.write_str(&format_number(*v)),
        ExprKind::Symbol(name) => out.write_str(name),
        ExprKind::Add(terms) => {
            // Constants go last: `x + 1` rather than `1 + x`.
            let mut ordered: Vec<&Expr> = terms.iter().filter(|t| !t.is_constant()).collect();
            ordered.extend(terms.iter().filter(|t| t.is_constant()));
            for (i, term) in ordered.into_iter().enumerate() {
                let (coefficient, _) = term.split_coefficient();
                let negative = coefficient < 0.0 || term.as_constant().is_some_and(|c| c < 0.0);
                if i == 0 {
                    write_expr(term, out, PREC_ADD)?;
                } else if negative {
                    out.write_str(" - ")?;
                    write_expr(&-term, out, PREC_ADD + 1)?;
                } else {
                    out.write_str(" + ")?;
                    write_expr(term, out, PREC_ADD + 1)?;
                }
            }
            Ok(())
        }
        ExprKind::Mul(_) => write_product(expr, out),
        ExprKind::Pow(base, exponent) => match exponent.as_constant() {
            Some(e) if e == 0.5 => {
                out.write_str("sqrt(")?;
                write_expr(base, out, 0)?;
                out.write_char(')')
            }
            Some(e) if e < 0.0 => {
                out.write_str("1/")?;
                write_expr(&base.pow(-e), out, PREC_POW)
            }
            _ => {
                write_expr(base, out, PREC_POW + 1)?;
                out.write_char('^')?;
                write_expr(exponent, out, PREC_POW + 1)
            }
        },
        ExprKind::Unary(f, arg) => {
            write!(out, "{}(", f.name())?;
            write_expr(arg, out, 0)?;
            out.write_char(')')
        }
        ExprKind::Binary(f, a, b) => {
            write!(out, "{}(", f.name())?;
            write_list(&[a.clone(), b.clone()], out)?;
            out.write_char(')')
        }
        ExprKind::Opaque(name, args) => {
            write!(out, "{name}(")?;
            write_list(args, out)?;
            out.write_char(')')
        }
    }
}

fn write_product(expr: &Expr, out: &mut dyn Write) -> fmt::Result {
    let (coefficient, rest) = expr.split_coefficient();
    let factors = match rest.kind() {
        ExprKind::Mul(args) => args.clone(),
        _ => vec![rest.clone()],
    };

    let mut numerator = Vec::new();
    let mut denominator = Vec::new();
    for factor in factors {
        match factor.kind() {
            ExprKind::Pow(base, exponent) if exponent.as_constant().is_some_and(|e| e < 0.0) => {
                let e = exponent.as_constant().unwrap_or(-1.0);
                denominator.push(base.pow(-e));
            }
            _ => numerator.push(factor),
        }
    }

    if coefficient == -1.0 {
        out.write_char('-')?;
    } else if coefficient != 1.0 {
        out.write_str(&format_number(coefficient))?;
        if !numerator.is_empty() {
            out.write_char('*')?;
        }
    }
    if numerator.is_empty() && (coefficient == 1.0 || coefficient == -1.0) {
        out.write_char('1')?;
    }
    for (i, factor) in numerator.iter().enumerate() {
        if i > 0 {
            out.write_char('*')?;
        }
        write_expr(factor, out, PREC_MUL)?;
    }
    if !denominator.is_empty() {
        out.write_char('/')?;
        if denominator.len() == 1 {
            write_expr(&denominator[0], out, PREC_POW)?;
        } else {
            out.write_char('(')?;
            for (i, factor) in denominator.iter().enumerate() {
                if i > 0 {
                    out.write_char('*')?;
                }
                write_expr(factor, out, PREC_MUL)?;
            }
            out.write_char(')')?;
        }
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_bare(self, f)
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({self})")
    }
}
