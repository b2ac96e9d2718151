//! Rotation identities checked symbolically and at fixed angles.

use std::f64::consts::FRAC_PI_2;

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use symlie_core::eval::Bindings;
use symlie_core::expr::Expr;
use symlie_core::ops::{GroupOps, LieGroupOps, StorageOps};
use symlie_geo::{Matrix, Pose3, Rot2, Rot3};

#[test]
fn test_rot2_tangent_round_trip_at_fixed_angles() {
    for eps in [Expr::zero(), Expr::constant(1e-12)] {
        for theta in [0.0, 0.3, -1.2, FRAC_PI_2] {
            let r = Rot2::from_tangent(&[Expr::constant(theta)], &eps).unwrap();
            let tangent = r.to_tangent(&eps);
            assert_eq!(tangent.len(), 1);
            assert_relative_eq!(
                tangent[0].eval(&Bindings::new()).unwrap(),
                theta,
                epsilon = 1e-10
            );
        }
    }
}

#[test]
fn test_rot3_inverse_of_product_symbolically() {
    let r1 = Rot3::symbolic("R1");
    let r2 = Rot3::symbolic("R2");
    let lhs = (&r1 * &r2).inverse();
    let rhs = &r2.inverse() * &r1.inverse();
    assert_eq!(lhs.to_storage(), rhs.to_storage());
}

#[test]
fn test_rot2_inverse_of_product_symbolically() {
    let r1 = Rot2::symbolic("a");
    let r2 = Rot2::symbolic("b");
    assert_eq!((&r1 * &r2).inverse(), &r2.inverse() * &r1.inverse());
}

#[test]
fn test_pose3_inverse_of_product_numerically() {
    let a = Pose3::new(
        Rot3::from_yaw_pitch_roll(0.1, 0.2, 0.3),
        Matrix::column_f64(&[1.0, -1.0, 2.0]),
    )
    .unwrap();
    let b = Pose3::new(
        Rot3::from_angle_axis(1.3, [Expr::one(), Expr::zero(), Expr::zero()]),
        Matrix::column_f64(&[0.0, 0.5, -0.5]),
    )
    .unwrap();
    let lhs = (&a * &b).inverse().evalf(&Bindings::new()).unwrap();
    let rhs = (&b.inverse() * &a.inverse()).evalf(&Bindings::new()).unwrap();
    for (l, r) in lhs.iter().zip(&rhs) {
        assert_relative_eq!(l, r, epsilon = 1e-12);
    }
}

#[test]
fn test_rot3_storage_d_tangent_is_symbolic_closed_form() {
    let r = Rot3::symbolic("R");
    let m = r.storage_d_tangent().unwrap();
    let w = Expr::symbol("R_w");
    assert_eq!(m.shape(), (4, 3));
    for i in 0..3 {
        assert_eq!(m[(i, i)], &w * 0.5);
    }
    assert_eq!(m[(3, 0)], Expr::symbol("R_x") * -0.5);
}

#[test]
fn test_symbolic_rotation_evaluates_with_bindings() {
    let r = Rot3::symbolic("R");
    let env = Bindings::new()
        .with("R_x", 0.0)
        .with("R_y", 0.0)
        .with("R_z", 0.0)
        .with("R_w", 1.0);
    let numeric = r.evaluated(&env).unwrap();
    assert_eq!(numeric, Rot3::identity());
    assert!(numeric.is_numeric());
}
