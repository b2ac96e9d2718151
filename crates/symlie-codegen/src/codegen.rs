//! The code generation entry point.
//!
//! A [`Codegen`] pairs symbolic inputs and outputs, both held in
//! [`Values`], with a target language. Every check happens when the request
//! is built; rendering happens fully in memory; only then are files staged
//! and moved into the output directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use symlie_autodiff::{tangent_jacobian, Linearization};
use symlie_core::config::{symbolic_config, EpsilonMode, SymbolicConfig};
use symlie_core::cse::TEMPORARY_PREFIX;
use symlie_core::expr::{BinaryFn, Expr, ExprKind, UnaryFn};
use symlie_core::ops::{LieGroupOps, StorageOps};
use symlie_geo::Matrix;
use symlie_values::{Element, Values};
use tracing::{debug, instrument, warn};

use crate::artifact::{write_staged, GeneratedArtifact, GeneratedFunction};
use crate::backend::backend_for;
use crate::config::{CodegenConfig, Language};
use crate::error::{CodegenError, CodegenResult};
use crate::lower::{lower, Request};
use crate::names::{check_identifier, check_namespace};

/// Separator between a result and an argument in jacobian output names.
pub const JACOBIAN_SEPARATOR: &str = "_D_";

/// A function to generate.
#[derive(Debug, Clone, PartialEq)]
pub struct Codegen {
    name: String,
    inputs: Values,
    outputs: Values,
    config: CodegenConfig,
    return_key: Option<String>,
    docstring: Option<String>,
}

impl Codegen {
    /// Validates and creates a request.
    ///
    /// Every free symbol of `outputs` must be a storage symbol of `inputs`,
    /// input storage must consist of distinct symbols, and every key must be
    /// a usable identifier that no other input or output already takes.
    pub fn new(
        name: impl Into<String>,
        inputs: Values,
        outputs: Values,
        config: impl Into<CodegenConfig>,
    ) -> CodegenResult<Self> {
        let codegen = Self {
            name: name.into(),
            inputs,
            outputs,
            config: config.into(),
            return_key: None,
            docstring: None,
        };
        codegen.validate()?;
        Ok(codegen)
    }

    fn validate(&self) -> CodegenResult<()> {
        let language = self.config.language();
        self.config.validate()?;
        check_identifier(&self.name, language)?;
        if self.outputs.is_empty() {
            return Err(CodegenError::invalid_configuration(format!(
                "`{}` has no outputs",
                self.name
            )));
        }

        let mut taken = HashSet::new();
        for key in self.inputs.keys().chain(self.outputs.keys()) {
            check_identifier(key, language)?;
            if !taken.insert(key) {
                return Err(CodegenError::name_collision(key, "used by an input and an output"));
            }
        }
        for (_, element) in self.inputs.items() {
            check_fields(element, language)?;
        }

        let mut symbols = HashSet::new();
        for (key, element) in self.inputs.items() {
            for entry in element.to_storage() {
                let Some(name) = entry.symbol_name() else {
                    return Err(CodegenError::invalid_configuration(format!(
                        "input `{key}` has non-symbolic storage entry {entry}"
                    )));
                };
                if name.starts_with(TEMPORARY_PREFIX) {
                    return Err(CodegenError::name_collision(
                        name,
                        "clashes with generated temporaries",
                    ));
                }
                if !symbols.insert(entry.clone()) {
                    return Err(CodegenError::name_collision(name, "appears twice in the inputs"));
                }
            }
        }
        for (_, element) in self.outputs.items() {
            for entry in element.to_storage() {
                if let Some(free) = entry.free_symbols().into_iter().find(|s| !symbols.contains(s)) {
                    return Err(CodegenError::unbound_symbol(free.symbol_name().unwrap_or_default()));
                }
            }
        }
        Ok(())
    }

    /// Function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The inputs.
    pub fn inputs(&self) -> &Values {
        &self.inputs
    }

    /// The outputs.
    pub fn outputs(&self) -> &Values {
        &self.outputs
    }

    /// The backend settings.
    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    /// Key of the output returned by value, if any.
    pub fn return_key(&self) -> Option<&str> {
        self.return_key.as_deref()
    }

    /// Returns the output `key` by value; the others stay output arguments.
    ///
    /// Python functions return every output regardless.
    pub fn with_return_key(mut self, key: &str) -> CodegenResult<Self> {
        if !self.outputs.contains_key(key) {
            return Err(CodegenError::invalid_configuration(format!(
                "return key `{key}` is not an output"
            )));
        }
        self.return_key = Some(key.to_string());
        Ok(self)
    }

    /// Replaces the generated docstring.
    pub fn with_docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    /// `(position, key)` of the requested arguments, all inputs when empty.
    fn resolve_args(&self, which_args: &[&str]) -> CodegenResult<Vec<(usize, String)>> {
        let keys: Vec<&str> = self.inputs.keys().collect();
        if which_args.is_empty() {
            return Ok(keys.iter().enumerate().map(|(i, k)| (i, (*k).to_string())).collect());
        }
        which_args
            .iter()
            .map(|arg| {
                keys.iter()
                    .position(|k| k == arg)
                    .map(|i| (i, (*arg).to_string()))
                    .ok_or_else(|| {
                        CodegenError::invalid_configuration(format!("`{arg}` is not an input"))
                    })
            })
            .collect()
    }

    fn input(&self, key: &str) -> CodegenResult<&Element> {
        self.inputs
            .get(key)
            .ok_or_else(|| CodegenError::invalid_configuration(format!("`{key}` is not an input")))
    }

    /// Adds `{result}_D_{arg}` outputs: the derivative of each result's
    /// storage with respect to a tangent perturbation of each argument.
    ///
    /// With an empty `which_args` every input is differentiated against.
    /// The new function is named `{name}_with_jacobians{indices}`, where
    /// `indices` are the argument positions. When `include_results` is
    /// false only the jacobians are produced.
    pub fn with_jacobians(&self, which_args: &[&str], include_results: bool) -> CodegenResult<Self> {
        let args = self.resolve_args(which_args)?;
        let mut outputs = Values::new();
        if include_results {
            for (key, element) in self.outputs.items() {
                outputs.insert(key, element.clone())?;
            }
        }
        for (result_key, result) in self.outputs.items() {
            let storage = result.to_storage();
            for (_, arg) in &args {
                let key = format!("{result_key}{JACOBIAN_SEPARATOR}{arg}");
                if outputs.contains_key(&key) {
                    return Err(CodegenError::name_collision(key, "already an output"));
                }
                let block = tangent_jacobian(&storage, self.input(arg)?.as_lie_group())?;
                outputs.insert(&key, Matrix::from_sym(block))?;
            }
        }

        let indices: String = args.iter().map(|(i, _)| i.to_string()).collect();
        let return_key = if include_results {
            self.return_key.clone()
        } else if outputs.len() == 1 {
            outputs.keys().next().map(str::to_string)
        } else {
            None
        };
        let mut augmented = Self::new(
            format!("{}_with_jacobians{indices}", self.name),
            self.inputs.clone(),
            outputs,
            self.config.clone(),
        )?;
        augmented.return_key = return_key;
        augmented.docstring = self.docstring.clone();
        Ok(augmented)
    }

    /// Replaces the outputs by the Gauss-Newton blocks of the residual:
    /// `residual`, `jacobian`, `hessian` and `rhs`.
    ///
    /// The residual is the returned output if there is one, otherwise the
    /// first output; it must be a scalar or a column vector. The new
    /// function is named `{name}_factor` and returns nothing by value.
    pub fn with_linearization(&self, which_args: &[&str]) -> CodegenResult<Self> {
        let residual_key = self
            .return_key
            .clone()
            .or_else(|| self.outputs.keys().next().map(str::to_string))
            .unwrap_or_default();
        let residual = match self.outputs.get(&residual_key) {
            Some(Element::Scalar(e)) => Matrix::column(std::slice::from_ref(e)),
            Some(Element::Matrix(m)) if m.ncols() == 1 => m.clone(),
            Some(other) => {
                return Err(CodegenError::invalid_configuration(format!(
                    "residual `{residual_key}` must be a column vector, got {}",
                    other.type_name()
                )))
            }
            None => {
                return Err(CodegenError::invalid_configuration("no residual output"));
            }
        };

        let args = self.resolve_args(which_args)?;
        let wrt = args
            .iter()
            .map(|(_, arg)| self.input(arg).map(Element::as_lie_group))
            .collect::<CodegenResult<Vec<&dyn LieGroupOps>>>()?;
        let linearization = Linearization::new(&residual, &wrt)?;

        let mut outputs = Values::new();
        outputs.insert("residual", linearization.residual)?;
        outputs.insert("jacobian", linearization.jacobian)?;
        outputs.insert("hessian", linearization.hessian)?;
        outputs.insert("rhs", linearization.rhs)?;
        let mut factor = Self::new(
            format!("{}_factor", self.name),
            self.inputs.clone(),
            outputs,
            self.config.clone(),
        )?;
        factor.docstring = self.docstring.clone();
        Ok(factor)
    }

    /// Renders the function in memory without touching the filesystem.
    ///
    /// `namespace` defaults to the configured one.
    pub fn render(&self, namespace: Option<&str>) -> CodegenResult<GeneratedFunction> {
        let namespace = namespace.unwrap_or_else(|| self.config.namespace());
        check_namespace(namespace, self.config.language())?;
        self.warn_on_unguarded_singularities();
        let lowered = lower(&Request {
            name: &self.name,
            inputs: &self.inputs,
            outputs: &self.outputs,
            return_key: self.return_key.as_deref(),
            docstring: self.docstring.as_deref(),
            config: &self.config,
        })?;
        backend_for(&self.config).render(&lowered, namespace)
    }

    /// Renders the function and writes it under `output_dir`.
    ///
    /// Without an output directory a fresh temporary directory named
    /// `symlie_codegen_{name}_*` is created and kept. Rendering completes
    /// before any file is written, and files are staged next to their final
    /// location, so a failure leaves no partial artifact behind.
    #[instrument(skip_all, fields(name = %self.name, language = %self.config.language()))]
    pub fn generate_function(
        &self,
        output_dir: Option<&Path>,
        namespace: Option<&str>,
    ) -> CodegenResult<GeneratedArtifact> {
        let function = self.render(namespace)?;
        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => fresh_output_dir(&self.name)?,
        };
        write_function(output_dir, function)
    }

    fn warn_on_unguarded_singularities(&self) {
        if self.has_unguarded_singularities(symbolic_config()) {
            warn!(
                function = %self.name,
                "outputs contain singular primitives but no epsilon input"
            );
        }
    }

    /// Whether outputs can hit a singularity with no epsilon to steer them
    /// away. A numeric epsilon is baked into the expressions themselves; a
    /// symbolic one has to be an input, under the configured name or an
    /// epsilon-like one.
    fn has_unguarded_singularities(&self, config: &SymbolicConfig) -> bool {
        let configured = match &config.epsilon {
            EpsilonMode::Numeric(_) => return false,
            EpsilonMode::Symbol(name) => Some(name.as_str()),
            EpsilonMode::Zero => None,
        };
        let guarded = self.inputs.items().any(|(_, element)| {
            element
                .to_storage()
                .iter()
                .filter_map(Expr::symbol_name)
                .any(|name| Some(name) == configured || is_epsilon_like(name))
        });
        if guarded {
            return false;
        }
        let outputs: Vec<Expr> = self
            .outputs
            .items()
            .flat_map(|(_, element)| element.to_storage())
            .collect();
        has_singular_primitive(&outputs)
    }
}

fn check_fields(element: &Element, language: Language) -> CodegenResult<()> {
    match element {
        Element::Values(values) => {
            for (key, item) in values.items() {
                check_identifier(key, language)?;
                check_fields(item, language)?;
            }
            Ok(())
        }
        Element::Sequence(items) => items.iter().try_for_each(|i| check_fields(i, language)),
        _ => Ok(()),
    }
}

fn is_epsilon_like(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "eps" || lower.contains("epsilon")
}

/// Whether any node can divide by zero or leave its domain at some input.
fn has_singular_primitive(exprs: &[Expr]) -> bool {
    let mut seen = HashSet::new();
    let mut stack: Vec<Expr> = exprs.to_vec();
    while let Some(expr) = stack.pop() {
        if !seen.insert(expr.clone()) {
            continue;
        }
        let singular = match expr.kind() {
            ExprKind::Pow(_, exponent) => exponent
                .as_constant()
                .map_or(true, |e| e < 0.0 || e.fract() != 0.0),
            ExprKind::Unary(f, _) => matches!(f, UnaryFn::Log | UnaryFn::Asin | UnaryFn::Acos),
            ExprKind::Binary(f, _, _) => *f == BinaryFn::Atan2,
            _ => false,
        };
        if singular {
            return true;
        }
        stack.extend(expr.args());
    }
    false
}

fn fresh_output_dir(name: &str) -> CodegenResult<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix(&format!("symlie_codegen_{name}_"))
        .tempdir()?;
    Ok(dir.keep())
}

fn write_function(output_dir: PathBuf, function: GeneratedFunction) -> CodegenResult<GeneratedArtifact> {
    let generated_files = write_staged(&output_dir, &function.files)?;
    let function_dir = output_dir
        .join(function.language.directory())
        .join(&function.namespace);
    debug!(
        files = generated_files.len(),
        dir = %function_dir.display(),
        "generated function written"
    );
    Ok(GeneratedArtifact {
        output_dir,
        generated_files,
        function_dir,
        function,
    })
}

/// Renders several functions, in parallel when the `parallel` feature is
/// on, then writes them all under one output directory.
///
/// Nothing is written unless every function renders.
#[instrument(skip_all, fields(count = codegens.len()))]
pub fn generate_many(
    codegens: &[Codegen],
    output_dir: Option<&Path>,
    namespace: Option<&str>,
) -> CodegenResult<Vec<GeneratedArtifact>> {
    let mut seen = HashSet::new();
    for codegen in codegens {
        if !seen.insert((codegen.config.language(), codegen.name.as_str())) {
            return Err(CodegenError::name_collision(
                codegen.name.as_str(),
                "generated twice into the same directory",
            ));
        }
    }

    #[cfg(feature = "parallel")]
    let rendered = codegens
        .par_iter()
        .map(|c| c.render(namespace))
        .collect::<CodegenResult<Vec<_>>>()?;
    #[cfg(not(feature = "parallel"))]
    let rendered = codegens
        .iter()
        .map(|c| c.render(namespace))
        .collect::<CodegenResult<Vec<_>>>()?;

    let output_dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => fresh_output_dir("many")?,
    };
    rendered
        .into_iter()
        .map(|function| write_function(output_dir.clone(), function))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CppConfig, PythonConfig};
    use symlie_geo::Rot2;

    fn scalar_inputs(names: &[&str]) -> Values {
        let mut values = Values::new();
        for name in names {
            values.add(&Expr::symbol(name)).unwrap();
        }
        values
    }

    fn single_output(key: &str, value: impl Into<Element>) -> Values {
        let mut values = Values::new();
        values.insert(key, value).unwrap();
        values
    }

    #[test]
    fn test_rejects_unbound_symbols() {
        let x = Expr::symbol("x");
        let outputs = single_output("res", &x + Expr::symbol("y"));
        let err = Codegen::new("f", scalar_inputs(&["x"]), outputs, CppConfig::default()).unwrap_err();
        assert_eq!(err, CodegenError::unbound_symbol("y"));
    }

    #[test]
    fn test_rejects_collisions() {
        let x = Expr::symbol("x");
        let outputs = single_output("x", x.sin());
        assert!(matches!(
            Codegen::new("f", scalar_inputs(&["x"]), outputs, CppConfig::default()),
            Err(CodegenError::NameCollision { .. })
        ));

        let outputs = single_output("res", x.sin());
        assert!(matches!(
            Codegen::new("class", scalar_inputs(&["x"]), outputs, PythonConfig::default()),
            Err(CodegenError::NameCollision { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_and_constant_inputs() {
        let x = Expr::symbol("x");
        let mut inputs = scalar_inputs(&["x"]);
        inputs.insert("y", x.clone()).unwrap();
        let outputs = single_output("res", x.sin());
        assert!(matches!(
            Codegen::new("f", inputs, outputs.clone(), CppConfig::default()),
            Err(CodegenError::NameCollision { .. })
        ));

        let mut inputs = scalar_inputs(&["x"]);
        inputs.insert("R", Rot2::identity()).unwrap();
        assert!(matches!(
            Codegen::new("f", inputs, outputs, CppConfig::default()),
            Err(CodegenError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_with_jacobians_names_and_shapes() {
        let mut inputs = scalar_inputs(&["x"]);
        inputs.insert("R", Rot2::symbolic("R")).unwrap();
        let x = Expr::symbol("x");
        let r = Rot2::symbolic("R");
        let outputs = single_output("res", Matrix::column(&[&x * r.re(), &x * r.im()]));
        let codegen = Codegen::new("f", inputs, outputs, CppConfig::default())
            .unwrap()
            .with_return_key("res")
            .unwrap();

        let augmented = codegen.with_jacobians(&["R"], true).unwrap();
        assert_eq!(augmented.name(), "f_with_jacobians1");
        let keys: Vec<_> = augmented.outputs().keys().collect();
        assert_eq!(keys, ["res", "res_D_R"]);
        assert_eq!(augmented.outputs().get("res_D_R").unwrap().as_matrix().unwrap().shape(), (2, 1));
        assert_eq!(augmented.return_key(), Some("res"));

        let only = codegen.with_jacobians(&[], false).unwrap();
        assert_eq!(only.name(), "f_with_jacobians01");
        let keys: Vec<_> = only.outputs().keys().collect();
        assert_eq!(keys, ["res_D_x", "res_D_R"]);
        assert_eq!(only.return_key(), None);

        assert!(codegen.with_jacobians(&["nope"], true).is_err());
    }

    #[test]
    fn test_with_linearization_blocks() {
        let x = Expr::symbol("x");
        let y = Expr::symbol("y");
        let outputs = single_output("res", Matrix::column(&[&x - 1.0, &x * &y]));
        let codegen = Codegen::new("f", scalar_inputs(&["x", "y"]), outputs, CppConfig::default()).unwrap();
        let factor = codegen.with_linearization(&[]).unwrap();
        assert_eq!(factor.name(), "f_factor");
        let shape = |key: &str| factor.outputs().get(key).unwrap().as_matrix().unwrap().shape();
        assert_eq!(shape("residual"), (2, 1));
        assert_eq!(shape("jacobian"), (2, 2));
        assert_eq!(shape("hessian"), (2, 2));
        assert_eq!(shape("rhs"), (2, 1));
    }

    #[test]
    fn test_singularity_detection() {
        let x = Expr::symbol("x");
        assert!(has_singular_primitive(&[x.sqrt()]));
        assert!(has_singular_primitive(&[(&x + 1.0).recip() * 2.0]));
        assert!(!has_singular_primitive(&[x.sin() * x.powi(2)]));
        assert!(is_epsilon_like("epsilon"));
        assert!(is_epsilon_like("eps"));
        assert!(!is_epsilon_like("x"));
    }

    #[test]
    fn test_unguarded_singularities_follow_epsilon_policy() {
        let x = Expr::symbol("x");
        let tol = Expr::symbol("tol");
        let outputs = single_output("res", (&x + &tol).sqrt());
        let codegen =
            Codegen::new("f", scalar_inputs(&["x", "tol"]), outputs, CppConfig::default()).unwrap();

        let symbolic = |name: &str| {
            SymbolicConfig::builder()
                .epsilon(EpsilonMode::Symbol(name.to_string()))
                .build()
        };
        assert!(codegen.has_unguarded_singularities(&symbolic("epsilon")));
        assert!(!codegen.has_unguarded_singularities(&symbolic("tol")));
        let zero = SymbolicConfig::builder().epsilon(EpsilonMode::Zero).build();
        assert!(codegen.has_unguarded_singularities(&zero));
        let numeric = SymbolicConfig::builder().epsilon(EpsilonMode::numeric()).build();
        assert!(!codegen.has_unguarded_singularities(&numeric));

        let smooth = single_output("res", x.sin());
        let codegen = Codegen::new("g", scalar_inputs(&["x"]), smooth, CppConfig::default()).unwrap();
        assert!(!codegen.has_unguarded_singularities(&SymbolicConfig::default()));
    }
}
