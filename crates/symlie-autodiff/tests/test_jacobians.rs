//! Analytic tangent jacobians against central differences, and the shape
//! law for mixed inputs.

use approx::assert_relative_eq;
use nalgebra::DMatrix;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use symlie_autodiff::numerical::DEFAULT_STEP;
use symlie_autodiff::{jacobian, numerical_jacobian, tangent_jacobian, JacobianExt, Linearization};
use symlie_core::eval::{eval_all, Bindings};
use symlie_core::expr::Expr;
use symlie_core::ops::{LieGroupOps, StorageOps};
use symlie_core::types::eval_matrix;
use symlie_geo::{Matrix, Pose3, Rot2, Rot3};
use symlie_values::Values;

/// Binds every storage symbol of `symbolic` to the matching entry of
/// `numeric`.
fn bind_storage(symbolic: &dyn LieGroupOps, numeric: &dyn LieGroupOps, bindings: &mut Bindings) {
    let values = numeric.evalf(&Bindings::new()).unwrap();
    for (symbol, value) in symbolic.to_storage().iter().zip(values) {
        bindings.bind(symbol, value).unwrap();
    }
}

fn assert_matrices_close(analytic: &DMatrix<f64>, numeric: &DMatrix<f64>) {
    assert_eq!(analytic.shape(), numeric.shape());
    for (a, n) in analytic.iter().zip(numeric.iter()) {
        assert_relative_eq!(a, n, epsilon = 1e-6, max_relative = 1e-6);
    }
}

#[test]
fn test_pose3_point_transform_matches_numerical() {
    let pose = Pose3::symbolic("T");
    let point = Matrix::symbolic("p", 3, 1);
    let transformed = pose.transform_point(&point).unwrap();

    let at = Pose3::random(&mut StdRng::seed_from_u64(7));
    let p = Matrix::column_f64(&[0.3, -1.2, 2.0]);
    let mut bindings = Bindings::new();
    bind_storage(&pose, &at, &mut bindings);
    bind_storage(&point, &p, &mut bindings);

    let analytic = eval_matrix(&tangent_jacobian(&transformed.entries(), &pose).unwrap(), &bindings).unwrap();
    let numeric = numerical_jacobian(
        |t: &Pose3| t.transform_point(&p)?.evalf(&Bindings::new()),
        &at,
        DEFAULT_STEP,
    )
    .unwrap();
    assert_matrices_close(&analytic, &numeric);
}

#[test]
fn test_rot3_local_coordinates_residual_matches_numerical() {
    let eps = Expr::constant(1e-10);
    let rot = Rot3::symbolic("R");
    let target = Rot3::from_yaw_pitch_roll(0.4, -0.2, 0.9);
    let residual = Matrix::column(&rot.local_coordinates(&target, &eps).unwrap());

    let at = Rot3::from_yaw_pitch_roll(0.1, 0.3, 0.5);
    let mut bindings = Bindings::new();
    bind_storage(&rot, &at, &mut bindings);

    let analytic = eval_matrix(residual.jacobian(&rot).unwrap().as_sym(), &bindings).unwrap();
    let numeric = numerical_jacobian(
        |r: &Rot3| eval_all(&r.local_coordinates(&target, &eps)?, &Bindings::new()),
        &at,
        DEFAULT_STEP,
    )
    .unwrap();
    assert_matrices_close(&analytic, &numeric);
}

#[test]
fn test_values_input_uses_block_tangent() {
    let mut values = Values::new();
    values.insert("s", Expr::symbol("s")).unwrap();
    values.insert("R", Rot2::symbolic("R")).unwrap();
    let angle = Rot2::symbolic("R").to_tangent(&Expr::zero()).remove(0);
    let f = &angle * Expr::symbol("s");

    let j = f.jacobian(&values).unwrap();
    assert_eq!(j.shape(), (1, 2));
    let bindings = Bindings::new().with("s", 2.0).with("R_re", 0.0).with("R_im", 1.0);
    let numeric = j.eval(&bindings).unwrap();
    assert_relative_eq!(numeric[(0, 0)], std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    assert_relative_eq!(numeric[(0, 1)], 2.0, epsilon = 1e-12);
}

#[test]
fn test_linearization_is_consistent_with_jacobian() {
    let pose = Pose3::symbolic("T");
    let point = Matrix::symbolic("p", 3, 1);
    let residual = pose.transform_point(&point).unwrap();
    let lin = Linearization::new(&residual, &[&pose, &point]).unwrap();
    assert_eq!(lin.jacobian.shape(), (3, 9));
    assert_eq!(lin.hessian.shape(), (9, 9));
    assert_eq!(lin.rhs.shape(), (9, 1));

    let at = Pose3::random(&mut StdRng::seed_from_u64(3));
    let mut bindings = Bindings::new();
    bind_storage(&pose, &at, &mut bindings);
    bind_storage(&point, &Matrix::column_f64(&[1.0, 2.0, 3.0]), &mut bindings);
    let numeric = lin.evaluated(&bindings).unwrap();
    let j = numeric.jacobian.eval(&Bindings::new()).unwrap();
    let r = numeric.residual.eval(&Bindings::new()).unwrap();
    let h = numeric.hessian.eval(&Bindings::new()).unwrap();
    let b = numeric.rhs.eval(&Bindings::new()).unwrap();
    assert_matrices_close(&h, &(j.transpose() * &j));
    assert_matrices_close(&b, &(j.transpose() * &r));
}

proptest! {
    #[test]
    fn prop_jacobian_shape_is_outputs_by_total_tangent(
        outputs in 1usize..5,
        kinds in prop::collection::vec(0usize..4, 0..4),
    ) {
        let inputs: Vec<Box<dyn LieGroupOps>> = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| -> Box<dyn LieGroupOps> {
                let name = format!("in{i}");
                match kind {
                    0 => Box::new(Expr::symbol(&name)),
                    1 => Box::new(Rot2::symbolic(&name)),
                    2 => Box::new(Rot3::symbolic(&name)),
                    _ => Box::new(Pose3::symbolic(&name)),
                }
            })
            .collect();
        let symbols: Vec<Expr> = inputs.iter().flat_map(|i| i.to_storage()).collect();
        let exprs: Vec<Expr> = (0..outputs)
            .map(|k| symbols.iter().map(|s| s * (k as f64 + 1.0)).sum::<Expr>().sin())
            .collect();
        let refs: Vec<&dyn LieGroupOps> = inputs.iter().map(|b| &**b).collect();
        let j = jacobian(&exprs, &refs).unwrap();
        let total: usize = refs.iter().map(|i| i.tangent_dim()).sum();
        prop_assert_eq!(j.shape(), (outputs, total));
    }
}

#[test]
fn test_numeric_inputs_are_rejected() {
    let x = Expr::symbol("x");
    let numeric = Rot2::identity();
    assert!(tangent_jacobian(&[x], &numeric).is_err());
}
