//! Per-language code generation settings.
//!
//! Each target language has its own configuration struct, assembled with a
//! builder:
//!
//! ```
//! use symlie_codegen::config::{CppConfig, Language};
//!
//! let config = CppConfig::builder().use_cse(true).namespace("residuals").build();
//! assert_eq!(config.namespace, "residuals");
//! assert_eq!(symlie_codegen::CodegenConfig::from(config).language(), Language::Cpp);
//! ```

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use symlie_core::config::symbolic_config;

use crate::error::{CodegenError, CodegenResult};

/// Namespace used when a generate call does not name one.
pub const DEFAULT_NAMESPACE: &str = "sym";

/// Default wrapping width of emitted docstrings.
pub const DEFAULT_DOCSTRING_WIDTH: usize = 100;

/// Narrowest accepted docstring width.
pub const MIN_DOCSTRING_WIDTH: usize = 20;

/// Target language of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Language {
    /// Header-only C++ on top of Eigen
    Cpp,
    /// Plain Python module
    Python,
    /// Rust module on top of nalgebra
    Rust,
}

impl Language {
    /// Subdirectory of the output directory holding this language's files.
    pub fn directory(self) -> &'static str {
        match self {
            Self::Cpp => "cpp",
            Self::Python => "python",
            Self::Rust => "rust",
        }
    }

    /// Extension of generated source files.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Cpp => "h",
            Self::Python => "py",
            Self::Rust => "rs",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cpp => "C++",
            Self::Python => "Python",
            Self::Rust => "Rust",
        })
    }
}

/// C++ emission settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CppConfig {
    /// Hoist common subexpressions into temporaries.
    pub use_cse: bool,
    /// Run the simplifier on outputs before emission. Defaults to the
    /// engine-wide setting.
    pub simplify: bool,
    /// Wrap literals as `Scalar(0.5)` so float instantiations stay in `float`.
    pub explicit_literals: bool,
    /// Column at which docstrings are wrapped.
    pub docstring_width: usize,
    /// Enclosing C++ namespace, also the output subdirectory.
    pub namespace: String,
}

impl Default for CppConfig {
    fn default() -> Self {
        Self {
            use_cse: true,
            simplify: symbolic_config().simplify,
            explicit_literals: true,
            docstring_width: DEFAULT_DOCSTRING_WIDTH,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Python emission settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PythonConfig {
    /// Hoist common subexpressions into temporaries.
    pub use_cse: bool,
    /// Run the simplifier on outputs before emission.
    pub simplify: bool,
    /// Use `numpy` arrays for matrices and `numpy` math instead of `math`.
    pub use_numpy: bool,
    /// Column at which docstrings are wrapped.
    pub docstring_width: usize,
    /// Package directory the module is written into.
    pub namespace: String,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            use_cse: true,
            simplify: symbolic_config().simplify,
            use_numpy: false,
            docstring_width: DEFAULT_DOCSTRING_WIDTH,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Rust emission settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RustConfig {
    /// Hoist common subexpressions into temporaries.
    pub use_cse: bool,
    /// Run the simplifier on outputs before emission.
    pub simplify: bool,
    /// Suffix literals with `_f64`.
    pub explicit_literals: bool,
    /// Column at which doc comments are wrapped.
    pub docstring_width: usize,
    /// Module directory the file is written into.
    pub namespace: String,
}

impl Default for RustConfig {
    fn default() -> Self {
        Self {
            use_cse: true,
            simplify: symbolic_config().simplify,
            explicit_literals: false,
            docstring_width: DEFAULT_DOCSTRING_WIDTH,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Builder methods shared by every language.
macro_rules! common_builder {
    ($builder:ident, $config:ident) => {
        impl $config {
            /// Starts a builder from the defaults.
            pub fn builder() -> $builder {
                $builder::new()
            }
        }

        #[doc = concat!("Builder for [`", stringify!($config), "`].")]
        #[derive(Debug, Clone, Default)]
        pub struct $builder {
            config: $config,
        }

        impl $builder {
            /// Create a new builder with default settings.
            pub fn new() -> Self {
                Self::default()
            }

            /// Enable or disable common subexpression elimination.
            pub fn use_cse(mut self, use_cse: bool) -> Self {
                self.config.use_cse = use_cse;
                self
            }

            /// Enable or disable simplification before emission.
            pub fn simplify(mut self, simplify: bool) -> Self {
                self.config.simplify = simplify;
                self
            }

            /// Set the docstring wrapping width.
            pub fn docstring_width(mut self, width: usize) -> Self {
                self.config.docstring_width = width;
                self
            }

            /// Set the default namespace.
            pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
                self.config.namespace = namespace.into();
                self
            }

            /// Build the configuration.
            pub fn build(self) -> $config {
                self.config
            }
        }
    };
}

common_builder!(CppConfigBuilder, CppConfig);
common_builder!(PythonConfigBuilder, PythonConfig);
common_builder!(RustConfigBuilder, RustConfig);

impl CppConfigBuilder {
    /// Wrap numeric literals in `Scalar(..)`.
    pub fn explicit_literals(mut self, explicit: bool) -> Self {
        self.config.explicit_literals = explicit;
        self
    }
}

impl PythonConfigBuilder {
    /// Emit `numpy` arrays and functions.
    pub fn use_numpy(mut self, use_numpy: bool) -> Self {
        self.config.use_numpy = use_numpy;
        self
    }
}

impl RustConfigBuilder {
    /// Suffix numeric literals with `_f64`.
    pub fn explicit_literals(mut self, explicit: bool) -> Self {
        self.config.explicit_literals = explicit;
        self
    }
}

/// Settings of whichever backend a [`crate::Codegen`] targets.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CodegenConfig {
    /// C++ output
    Cpp(CppConfig),
    /// Python output
    Python(PythonConfig),
    /// Rust output
    Rust(RustConfig),
}

impl CodegenConfig {
    /// The target language.
    pub fn language(&self) -> Language {
        match self {
            Self::Cpp(_) => Language::Cpp,
            Self::Python(_) => Language::Python,
            Self::Rust(_) => Language::Rust,
        }
    }

    /// Whether common subexpressions are hoisted.
    pub fn use_cse(&self) -> bool {
        match self {
            Self::Cpp(c) => c.use_cse,
            Self::Python(c) => c.use_cse,
            Self::Rust(c) => c.use_cse,
        }
    }

    /// Whether outputs are simplified first.
    pub fn simplify(&self) -> bool {
        match self {
            Self::Cpp(c) => c.simplify,
            Self::Python(c) => c.simplify,
            Self::Rust(c) => c.simplify,
        }
    }

    /// Docstring wrapping width.
    pub fn docstring_width(&self) -> usize {
        match self {
            Self::Cpp(c) => c.docstring_width,
            Self::Python(c) => c.docstring_width,
            Self::Rust(c) => c.docstring_width,
        }
    }

    /// Namespace used when the generate call gives none.
    pub fn namespace(&self) -> &str {
        match self {
            Self::Cpp(c) => &c.namespace,
            Self::Python(c) => &c.namespace,
            Self::Rust(c) => &c.namespace,
        }
    }

    /// Rejects settings no backend can honour.
    pub fn validate(&self) -> CodegenResult<()> {
        if self.docstring_width() < MIN_DOCSTRING_WIDTH {
            return Err(CodegenError::invalid_configuration(format!(
                "docstring width {} is below {MIN_DOCSTRING_WIDTH}",
                self.docstring_width()
            )));
        }
        crate::names::check_namespace(self.namespace(), self.language())
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self::Cpp(CppConfig::default())
    }
}

impl From<CppConfig> for CodegenConfig {
    fn from(config: CppConfig) -> Self {
        Self::Cpp(config)
    }
}

impl From<PythonConfig> for CodegenConfig {
    fn from(config: PythonConfig) -> Self {
        Self::Python(config)
    }
}

impl From<RustConfig> for CodegenConfig {
    fn from(config: RustConfig) -> Self {
        Self::Rust(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cpp = CppConfig::default();
        assert!(cpp.use_cse);
        assert_eq!(cpp.simplify, symbolic_config().simplify);
        assert_eq!(PythonConfig::default().simplify, symbolic_config().simplify);
        assert_eq!(cpp.namespace, DEFAULT_NAMESPACE);
        assert!(!PythonConfig::default().use_numpy);
    }

    #[test]
    fn test_builders() {
        let python = PythonConfig::builder().use_numpy(true).use_cse(false).build();
        assert!(python.use_numpy);
        assert!(!python.use_cse);

        let rust = RustConfig::builder().explicit_literals(true).docstring_width(60).build();
        let config = CodegenConfig::from(rust);
        assert_eq!(config.language(), Language::Rust);
        assert_eq!(config.docstring_width(), 60);
    }

    #[test]
    fn test_validate() {
        assert!(CodegenConfig::default().validate().is_ok());
        let narrow = CodegenConfig::from(CppConfig::builder().docstring_width(3).build());
        assert!(matches!(narrow.validate(), Err(CodegenError::InvalidConfiguration { .. })));
        let spaced = CodegenConfig::from(PythonConfig::builder().namespace("my pkg").build());
        assert!(matches!(spaced.validate(), Err(CodegenError::NameCollision { .. })));
    }

    #[test]
    fn test_language_layout() {
        assert_eq!(Language::Cpp.directory(), "cpp");
        assert_eq!(Language::Python.extension(), "py");
        assert_eq!(Language::Rust.to_string(), "Rust");
    }
}
