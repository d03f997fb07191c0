//! Tests for the temporal affine layer

use approx::assert_relative_eq;
use rust_recurrent_layers::layers::{temporal_affine_backward, temporal_affine_forward};
use rust_recurrent_layers::utils::{eval_numerical_gradient_array, SimpleRng};
use rust_recurrent_layers::Tensor;

fn assert_tensor_close(analytic: &Tensor, numeric: &Tensor) {
    assert_eq!(analytic.shape(), numeric.shape());
    for (a, n) in analytic.data().iter().zip(numeric.data()) {
        assert_relative_eq!(*a, *n, epsilon = 1e-7, max_relative = 1e-5);
    }
}

#[test]
fn test_forward_applies_same_projection_each_step() {
    let mut rng = SimpleRng::new(2);
    let x = rng.normal_tensor(&[2, 3, 4], 1.0);
    let w = rng.normal_tensor(&[4, 5], 1.0);
    let b = rng.normal_tensor(&[5], 1.0);

    let (out, _) = temporal_affine_forward(&x, &w, &b).unwrap();
    assert_eq!(out.shape(), &[2, 3, 5]);
    for t in 0..3 {
        let mut expected = x.timestep(t).unwrap().matmul(&w).unwrap();
        expected.add_row_vector(&b).unwrap();
        let got = out.timestep(t).unwrap();
        for (a, e) in got.data().iter().zip(expected.data()) {
            assert_relative_eq!(*a, *e, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_gradients_match_numerical() {
    let (n, t, d, m) = (2, 3, 4, 5);
    let mut rng = SimpleRng::new(231);
    let x = rng.normal_tensor(&[n, t, d], 1.0);
    let w = rng.normal_tensor(&[d, m], 1.0);
    let b = rng.normal_tensor(&[m], 1.0);
    let dout = rng.normal_tensor(&[n, t, m], 1.0);

    let (_, cache) = temporal_affine_forward(&x, &w, &b).unwrap();
    let grads = temporal_affine_backward(&dout, &cache).unwrap();

    let dx_num = eval_numerical_gradient_array(
        |x| temporal_affine_forward(x, &w, &b).map(|(out, _)| out),
        &x,
        &dout,
        1e-5,
    )
    .unwrap();
    let dw_num = eval_numerical_gradient_array(
        |w| temporal_affine_forward(&x, w, &b).map(|(out, _)| out),
        &w,
        &dout,
        1e-5,
    )
    .unwrap();
    let db_num = eval_numerical_gradient_array(
        |b| temporal_affine_forward(&x, &w, b).map(|(out, _)| out),
        &b,
        &dout,
        1e-5,
    )
    .unwrap();

    assert_tensor_close(&grads.dx, &dx_num);
    assert_tensor_close(&grads.dw, &dw_num);
    assert_tensor_close(&grads.db, &db_num);
}

#[test]
fn test_weight_width_mismatch_rejected() {
    let x: Tensor = Tensor::zeros(&[2, 3, 4]);
    let w: Tensor = Tensor::zeros(&[3, 5]);
    let b: Tensor = Tensor::zeros(&[5]);
    assert!(temporal_affine_forward(&x, &w, &b).is_err());

    let w: Tensor = Tensor::zeros(&[4, 5]);
    let b: Tensor = Tensor::zeros(&[4]);
    assert!(temporal_affine_forward(&x, &w, &b).is_err());
}
