//! Masked softmax cross-entropy over a sequence of predictions
//!
//! Scores of shape (N, T, V) are flattened to (N·T, V), softmaxed row-wise and
//! scored against the (N, T) ground-truth ids. Positions whose mask entry is
//! false contribute nothing to either the loss or the gradient.
//!
//! The loss is summed over every unmasked timestep and divided by the batch
//! size N only, not by N·T or by the number of unmasked positions.

use log::trace;

use crate::error::{RecurrentError, Result};
use crate::tensor::{Indices, Mask, Tensor};
use crate::utils::activations::softmax_rows;

/// Returns `(loss, dx)` with `dx` shaped like `x`.
pub fn temporal_softmax_loss(x: &Tensor, y: &Indices, mask: &Mask) -> Result<(f64, Tensor)> {
    let (n, t_len, v) = x.dims3("x")?;
    y.expect_shape("y", &[n, t_len])?;
    mask.expect_shape("mask", &[n, t_len])?;

    if let Some(&index) = y.data().iter().find(|&&label| label >= v) {
        return Err(RecurrentError::IndexOutOfRange {
            name: "y",
            index,
            bound: v,
        });
    }

    let rows = n * t_len;
    let mut probs = x.data().to_vec();
    softmax_rows(&mut probs, rows, v);

    let inv_n = if n == 0 { 0.0 } else { 1.0 / n as f64 };
    let mut loss = 0.0f64;
    let mut dx = vec![0.0f64; rows * v];
    let mut active = 0usize;

    for (row, ((&label, &keep), p)) in y
        .data()
        .iter()
        .zip(mask.data())
        .zip(probs.chunks_exact(v.max(1)))
        .enumerate()
    {
        if !keep {
            continue;
        }
        active += 1;
        loss -= p[label].ln();

        let grad = &mut dx[row * v..(row + 1) * v];
        for (g, &prob) in grad.iter_mut().zip(p) {
            *g = prob * inv_n;
        }
        grad[label] -= inv_n;
    }
    loss *= inv_n;

    trace!("temporal_softmax_loss: {} of {} positions active, loss={}", active, rows, loss);
    Ok((loss, Tensor::from_vec(&[n, t_len, v], dx)?))
}
