//! Identifier rules for generated code.

use crate::config::{Language, DEFAULT_NAMESPACE};
use crate::error::{CodegenError, CodegenResult};

/// Identifiers starting with this are reserved for generated locals such as
/// `_tmp0` and `_res`.
pub const RESERVED_PREFIX: char = '_';

const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "asm", "auto", "bool", "break", "case", "catch", "char",
    "class", "const", "constexpr", "continue", "default", "delete", "do", "double", "else",
    "enum", "explicit", "extern", "false", "float", "for", "friend", "goto", "if", "inline",
    "int", "long", "namespace", "new", "not", "nullptr", "operator", "or", "private",
    "protected", "public", "register", "return", "short", "signed", "sizeof", "static",
    "struct", "switch", "template", "this", "throw", "true", "try", "typedef", "typename",
    "union", "unsigned", "using", "virtual", "void", "volatile", "while", "xor",
    // names the emitted header relies on
    "Eigen", "Scalar", "std", "sym",
];

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise",
    "return", "try", "while", "with", "yield",
    // modules the emitted file imports
    "T", "math", "numpy",
];

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super",
    "trait", "true", "type", "unsafe", "use", "where", "while", "abstract", "become", "box",
    "do", "final", "macro", "override", "priv", "try", "typeof", "unsized", "virtual",
    "yield",
    // paths the emitted module relies on
    "f64", "nalgebra",
];

fn keywords(language: Language) -> &'static [&'static str] {
    match language {
        Language::Cpp => CPP_KEYWORDS,
        Language::Python => PYTHON_KEYWORDS,
        Language::Rust => RUST_KEYWORDS,
    }
}

/// ASCII identifier: a letter or underscore, then letters, digits or
/// underscores.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Checks that `name` can be used as a user-facing identifier in `language`.
pub fn check_identifier(name: &str, language: Language) -> CodegenResult<()> {
    if !is_identifier(name) {
        return Err(CodegenError::name_collision(name, "not a valid identifier"));
    }
    if name.starts_with(RESERVED_PREFIX) {
        return Err(CodegenError::name_collision(
            name,
            format!("names starting with `{RESERVED_PREFIX}` are reserved for generated locals"),
        ));
    }
    if keywords(language).contains(&name) {
        return Err(CodegenError::name_collision(
            name,
            format!("reserved word in {language}"),
        ));
    }
    Ok(())
}

/// Checks a namespace, which doubles as an output subdirectory.
pub fn check_namespace(namespace: &str, language: Language) -> CodegenResult<()> {
    let reserved = keywords(language).contains(&namespace) && namespace != DEFAULT_NAMESPACE;
    if !is_identifier(namespace) || reserved {
        return Err(CodegenError::name_collision(namespace, "not a usable namespace"));
    }
    Ok(())
}

/// `snake_case` to `CamelCase`.
pub fn camel_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect()
}
