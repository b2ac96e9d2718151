//! End-to-end generation: signatures per language, jacobian augmentation,
//! rejected requests and what ends up on disk.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use symlie_codegen::prelude::*;
use symlie_core::Expr;
use symlie_geo::{Matrix, Pose3, Rot3};
use symlie_values::Values;
use tempfile::TempDir;

fn transform_point(config: impl Into<CodegenConfig>) -> Codegen {
    let pose = Pose3::symbolic("T");
    let point = Matrix::symbolic("p", 3, 1);
    let mut inputs = Values::new();
    inputs.insert("pose", pose.clone()).unwrap();
    inputs.insert("point", point.clone()).unwrap();
    let mut outputs = Values::new();
    outputs.insert("res", pose.transform_point(&point).unwrap()).unwrap();
    Codegen::new("transform_point", inputs, outputs, config)
        .unwrap()
        .with_return_key("res")
        .unwrap()
}

fn files_under(dir: &Path) -> Vec<String> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(next) = stack.pop() {
        for entry in fs::read_dir(next).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                found.push(path.strip_prefix(dir).unwrap().display().to_string());
            }
        }
    }
    found.sort();
    found
}

#[test]
fn test_cpp_signature_and_layout() {
    let dir = TempDir::new().unwrap();
    let artifact = transform_point(CppConfig::default())
        .generate_function(Some(dir.path()), None)
        .unwrap();

    assert_eq!(
        artifact.function.signature,
        "Eigen::Matrix<Scalar, 3, 1> TransformPoint(const sym::Pose3<Scalar>& pose, const Eigen::Matrix<Scalar, 3, 1>& point)"
    );
    assert_eq!(artifact.function_dir, dir.path().join("cpp").join("sym"));
    assert_eq!(files_under(dir.path()), ["cpp/sym/transform_point.h"]);

    let header = fs::read_to_string(&artifact.generated_files[0]).unwrap();
    assert!(header.contains("#pragma once"));
    assert!(header.contains("#include <sym/pose3.h>"));
    assert!(header.contains("template <typename Scalar>"));
    assert!(header.contains("pose.Data()[4]"));
    assert!(header.contains("return _res;"));
    assert!(header.trim_end().ends_with("}  // namespace sym"));
}

#[test]
fn test_cpp_jacobians_become_output_pointers() {
    let codegen = transform_point(CppConfig::default()).with_jacobians(&[], true).unwrap();
    assert_eq!(codegen.name(), "transform_point_with_jacobians01");
    let function = codegen.render(Some("residuals")).unwrap();
    assert_eq!(
        function.signature,
        "Eigen::Matrix<Scalar, 3, 1> TransformPointWithJacobians01(const sym::Pose3<Scalar>& pose, \
         const Eigen::Matrix<Scalar, 3, 1>& point, \
         Eigen::Matrix<Scalar, 3, 6>* const res_D_pose = nullptr, \
         Eigen::Matrix<Scalar, 3, 3>* const res_D_point = nullptr)"
    );
    assert!(function.body.contains("if (res_D_pose != nullptr) {"));
    assert!(function.body.contains("Eigen::Matrix<Scalar, 3, 6>& _res_D_pose = (*res_D_pose);"));
    assert!(function.source().contains("namespace residuals {"));
}

#[test]
fn test_python_module_and_index() {
    let dir = TempDir::new().unwrap();
    let artifact = transform_point(PythonConfig::default())
        .generate_function(Some(dir.path()), None)
        .unwrap();
    assert_eq!(artifact.function.signature, "def transform_point(pose, point):");
    assert!(artifact
        .function
        .body
        .contains("# type: (T.Sequence[float], T.Sequence[float]) -> T.Sequence[float]"));
    assert!(artifact.function.body.contains("return _res"));
    assert_eq!(
        files_under(dir.path()),
        ["python/sym/__init__.py", "python/sym/transform_point.py"]
    );

    transform_point(PythonConfig::default())
        .with_jacobians(&["pose"], false)
        .unwrap()
        .generate_function(Some(dir.path()), None)
        .unwrap();
    let index = fs::read_to_string(dir.path().join("python/sym/__init__.py")).unwrap();
    assert_eq!(
        index,
        "from .transform_point import transform_point\n\
         from .transform_point_with_jacobians0 import transform_point_with_jacobians0\n"
    );
}

#[test]
fn test_python_struct_arguments_become_classes() {
    let x = Expr::symbol("x");
    let k = Expr::symbol("k");
    let mut params = Values::new();
    params.insert("R", Rot3::symbolic("R")).unwrap();
    params.insert("k", k.clone()).unwrap();
    let mut inputs = Values::new();
    inputs.insert("x", x.clone()).unwrap();
    inputs.insert("params", params).unwrap();
    let mut outputs = Values::new();
    outputs.insert("y", &k * x.sin()).unwrap();

    let function = Codegen::new("scaled_sine", inputs, outputs, PythonConfig::default())
        .unwrap()
        .render(None)
        .unwrap();
    assert!(function.source().contains("class ScaledSineParams(object):"));
    assert!(function.body.contains("params.k*math.sin(x)"));
}

#[test]
fn test_rust_signature() {
    let function = transform_point(RustConfig::default())
        .with_jacobians(&["point"], true)
        .unwrap()
        .render(None)
        .unwrap();
    assert_eq!(
        function.signature,
        "pub fn transform_point_with_jacobians1(pose: &[f64; 7], point: &nalgebra::SMatrix<f64, 3, 1>, \
         res_D_point: Option<&mut nalgebra::SMatrix<f64, 3, 3>>) -> nalgebra::SMatrix<f64, 3, 1>"
    );
    assert!(function.body.contains("if let Some(_res_D_point) = res_D_point {"));
    assert!(function.body.trim_end().ends_with("_res"));
}

#[test]
fn test_cse_shares_repeated_work() {
    let x = Expr::symbol("x");
    let y = Expr::symbol("y");
    let shared = (&x + &y).sin();
    let mut inputs = Values::new();
    inputs.add(&x).unwrap();
    inputs.add(&y).unwrap();
    let mut outputs = Values::new();
    outputs.insert("a", &shared * &x).unwrap();
    outputs.insert("b", &shared * &y).unwrap();

    let with_cse = Codegen::new("f", inputs.clone(), outputs.clone(), CppConfig::default())
        .unwrap()
        .render(None)
        .unwrap();
    assert!(with_cse.body.contains("// Intermediate terms (1)"));
    assert!(with_cse.body.contains("const Scalar _tmp0 = std::sin(x + y);"));

    let without = Codegen::new("f", inputs, outputs, CppConfig::builder().use_cse(false).build())
        .unwrap()
        .render(None)
        .unwrap();
    assert!(without.body.contains("// Intermediate terms (0)"));
}

#[test]
fn test_rejected_requests() {
    let x = Expr::symbol("x");
    let mut inputs = Values::new();
    inputs.add(&x).unwrap();

    let mut unbound = Values::new();
    unbound.insert("res", &x * Expr::symbol("z")).unwrap();
    assert_eq!(
        Codegen::new("f", inputs.clone(), unbound, CppConfig::default()).unwrap_err(),
        CodegenError::unbound_symbol("z")
    );

    let mut outputs = Values::new();
    outputs.insert("res", x.cos()).unwrap();
    for name in ["_private", "for", "with space"] {
        assert!(matches!(
            Codegen::new(name, inputs.clone(), outputs.clone(), RustConfig::default()),
            Err(CodegenError::NameCollision { .. })
        ));
    }
    assert!(matches!(
        Codegen::new("f", Values::new(), Values::new(), CppConfig::default()),
        Err(CodegenError::InvalidConfiguration { .. })
    ));
    let narrow = CppConfig::builder().docstring_width(5).build();
    assert!(matches!(
        Codegen::new("f", inputs, outputs, narrow),
        Err(CodegenError::InvalidConfiguration { .. })
    ));
}

#[test]
fn test_opaque_output_writes_nothing() {
    let x = Expr::symbol("x");
    let mut inputs = Values::new();
    inputs.add(&x).unwrap();
    let mut outputs = Values::new();
    outputs.insert("res", Expr::opaque("custom", vec![x.clone()])).unwrap();

    let dir = TempDir::new().unwrap();
    let result = Codegen::new("f", inputs, outputs, CppConfig::default())
        .unwrap()
        .generate_function(Some(dir.path()), None);
    assert!(matches!(result, Err(CodegenError::UnsupportedExpression { .. })));
    assert!(files_under(dir.path()).is_empty());
}

#[test]
fn test_output_dir_that_is_a_file() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("out");
    fs::write(&blocker, "not a directory").unwrap();
    let result = transform_point(CppConfig::default()).generate_function(Some(&blocker), None);
    assert!(matches!(result, Err(CodegenError::Io { .. })));
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "not a directory");
}

#[test]
fn test_missing_output_dir_creates_a_temporary_one() {
    let artifact = transform_point(CppConfig::default())
        .generate_function(None, None)
        .unwrap();
    let dir_name = artifact.output_dir.file_name().unwrap().to_string_lossy().to_string();
    assert!(dir_name.starts_with("symlie_codegen_transform_point_"));
    assert!(artifact.generated_files.iter().all(|f| f.exists()));
    fs::remove_dir_all(&artifact.output_dir).unwrap();
}

#[test]
fn test_generate_many() {
    let dir = TempDir::new().unwrap();
    let base = transform_point(RustConfig::default());
    let codegens = vec![base.clone(), base.with_jacobians(&[], false).unwrap()];
    let artifacts = generate_many(&codegens, Some(dir.path()), Some("geometry")).unwrap();
    assert_eq!(artifacts.len(), 2);
    assert_eq!(
        files_under(dir.path()),
        [
            "rust/geometry/mod.rs",
            "rust/geometry/transform_point.rs",
            "rust/geometry/transform_point_with_jacobians01.rs",
        ]
    );
    let index = fs::read_to_string(dir.path().join("rust/geometry/mod.rs")).unwrap();
    assert_eq!(
        index,
        "pub mod transform_point;\npub mod transform_point_with_jacobians01;\n"
    );

    let duplicated = vec![base.clone(), base];
    assert!(matches!(
        generate_many(&duplicated, Some(dir.path()), None),
        Err(CodegenError::NameCollision { .. })
    ));
}
