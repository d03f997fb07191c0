//! Nonlinearities used by the recurrent cells and the temporal loss
//!
//! - Stable sigmoid (scalar and tensor versions)
//! - Derivatives expressed in terms of the activation output
//! - Row-wise softmax with max subtraction

use crate::tensor::Tensor;

/// Logistic sigmoid that never overflows.
///
/// Branches on the sign so `exp` is only ever evaluated at a non-positive
/// argument: `1 / (1 + exp(-x))` for `x >= 0` and `exp(x) / (1 + exp(x))`
/// otherwise. NaN propagates.
pub fn stable_sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

/// Elementwise stable sigmoid over a tensor of any shape.
pub fn sigmoid(x: &Tensor) -> Tensor {
    x.map(stable_sigmoid)
}

/// Sigmoid derivative assuming s = sigmoid(z).
pub fn sigmoid_derivative(s: f64) -> f64 {
    s * (1.0 - s)
}

/// Tanh derivative assuming t = tanh(z).
pub fn tanh_derivative(t: f64) -> f64 {
    1.0 - t * t
}

/// Softmax applied row-wise in place.
///
/// Subtracts each row's maximum before exponentiating so large scores do not
/// overflow.
///
/// # Arguments
/// * `outputs` - Flat array containing row-major matrix data
/// * `rows` - Number of rows in the matrix
/// * `cols` - Number of columns in the matrix
pub fn softmax_rows(outputs: &mut [f64], rows: usize, cols: usize) {
    if cols == 0 {
        return;
    }
    debug_assert_eq!(outputs.len(), rows * cols, "outputs length mismatch in softmax_rows");

    for row in outputs.chunks_exact_mut(cols).take(rows) {
        let max_value = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut sum = 0.0f64;
        for value in row.iter_mut() {
            *value = (*value - max_value).exp();
            sum += *value;
        }

        let inv_sum = 1.0 / sum;
        for value in row.iter_mut() {
            *value *= inv_sum;
        }
    }
}
