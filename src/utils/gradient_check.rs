//! Finite-difference gradient checking.
//!
//! Analytic backward passes are verified against centered differences
//! `(f(x + h) - f(x - h)) / 2h`, evaluated one element at a time.

use crate::error::{RecurrentError, Result};
use crate::tensor::Tensor;

/// Numerical gradient of a tensor-valued function contracted with `df`.
///
/// For every element `x[i]` this returns `sum((f(x + h e_i) - f(x - h e_i)) * df) / 2h`,
/// which is what the matching backward pass should produce when fed `df` as the
/// upstream gradient.
pub fn eval_numerical_gradient_array<F>(mut f: F, x: &Tensor, df: &Tensor, h: f64) -> Result<Tensor>
where
    F: FnMut(&Tensor) -> Result<Tensor>,
{
    let mut work = x.clone();
    let mut grad: Tensor = Tensor::zeros(x.shape());

    for i in 0..x.len() {
        let original = work.data()[i];

        work.data_mut()[i] = original + h;
        let pos = f(&work)?;
        work.data_mut()[i] = original - h;
        let neg = f(&work)?;
        work.data_mut()[i] = original;

        if pos.shape() != df.shape() {
            return Err(RecurrentError::shape("df", pos.shape(), df.shape()));
        }
        let contracted: f64 = pos
            .data()
            .iter()
            .zip(neg.data())
            .zip(df.data())
            .map(|((p, n), d)| (p - n) * d)
            .sum();
        grad.data_mut()[i] = contracted / (2.0 * h);
    }

    Ok(grad)
}

/// Numerical gradient of a scalar-valued function.
pub fn eval_numerical_gradient<F>(mut f: F, x: &Tensor, h: f64) -> Result<Tensor>
where
    F: FnMut(&Tensor) -> Result<f64>,
{
    let mut work = x.clone();
    let mut grad: Tensor = Tensor::zeros(x.shape());

    for i in 0..x.len() {
        let original = work.data()[i];

        work.data_mut()[i] = original + h;
        let pos = f(&work)?;
        work.data_mut()[i] = original - h;
        let neg = f(&work)?;
        work.data_mut()[i] = original;

        grad.data_mut()[i] = (pos - neg) / (2.0 * h);
    }

    Ok(grad)
}

/// Maximum elementwise relative error `|a - b| / max(1e-8, |a| + |b|)`.
pub fn rel_error(a: &Tensor, b: &Tensor) -> Result<f64> {
    let diff = a.zip_map(b, |x, y| (x - y).abs() / (x.abs() + y.abs()).max(1e-8))?;
    Ok(diff.data().iter().copied().fold(0.0, f64::max))
}
