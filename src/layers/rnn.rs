//! Vanilla (tanh) recurrent layer
//!
//! Single-step forward/backward plus the time-unrolled drivers that thread
//! the hidden state through a whole (N, T, D) sequence and run
//! backpropagation through time.
//!
//! Shapes: x (N, D) per step or (N, T, D) per sequence, hidden (N, H),
//! Wx (D, H), Wh (H, H), b (H,).

use log::debug;

use crate::error::{RecurrentError, Result};
use crate::layers::params::{check_cell_params, sum_over_time, RecurrentGrads, StepParamGrads};
use crate::tensor::Tensor;
use crate::utils::activations::tanh_derivative;

/// Values kept from [`rnn_step_forward`] for the matching backward call.
///
/// The weights are borrowed: the caller keeps its parameters alive for the
/// duration of a forward/backward pair.
#[derive(Debug, Clone)]
pub struct RnnStepCache<'a> {
    x: Tensor,
    prev_h: Tensor,
    wx: &'a Tensor,
    wh: &'a Tensor,
    next_h: Tensor,
}

impl RnnStepCache<'_> {
    pub fn next_h(&self) -> &Tensor {
        &self.next_h
    }

    fn input_dim(&self) -> usize {
        self.x.shape()[1]
    }
}

/// Gradients returned by [`rnn_step_backward`].
#[derive(Debug, Clone)]
pub struct RnnStepGrads {
    pub dx: Tensor,
    pub dprev_h: Tensor,
    pub dwx: Tensor,
    pub dwh: Tensor,
    pub db: Tensor,
}

/// One timestep: `next_h = tanh(x·Wx + prev_h·Wh + b)`.
pub fn rnn_step_forward<'a>(
    x: &Tensor,
    prev_h: &Tensor,
    wx: &'a Tensor,
    wh: &'a Tensor,
    b: &Tensor,
) -> Result<(Tensor, RnnStepCache<'a>)> {
    let (n, d) = x.dims2("x")?;
    let (_, h) = prev_h.dims2("prev_h")?;
    prev_h.expect_shape("prev_h", &[n, h])?;
    check_cell_params(wx, wh, b, d, h, 1)?;

    let mut pre = x.matmul(wx)?;
    pre.matmul_acc(prev_h, wh)?;
    pre.add_row_vector(b)?;
    let next_h = pre.map(f64::tanh);

    let cache = RnnStepCache {
        x: x.clone(),
        prev_h: prev_h.clone(),
        wx,
        wh,
        next_h: next_h.clone(),
    };
    Ok((next_h, cache))
}

/// Backward pass for one timestep.
///
/// The tanh derivative is taken from the cached output (`1 - next_h²`), so no
/// nonlinearity is re-evaluated.
pub fn rnn_step_backward(dnext_h: &Tensor, cache: &RnnStepCache<'_>) -> Result<RnnStepGrads> {
    dnext_h.expect_shape("dnext_h", cache.next_h.shape())?;

    let dh = dnext_h.zip_map(&cache.next_h, |g, h| g * tanh_derivative(h))?;

    Ok(RnnStepGrads {
        db: dh.sum_rows()?,
        dwh: cache.prev_h.t_matmul(&dh)?,
        dwx: cache.x.t_matmul(&dh)?,
        dprev_h: dh.matmul_t(cache.wh)?,
        dx: dh.matmul_t(cache.wx)?,
    })
}

/// Run the RNN over a whole sequence starting from `h0`.
///
/// Returns the hidden states for every timestep, shape (N, T, H), and one
/// cache per timestep in chronological order.
pub fn rnn_forward<'a>(
    x: &Tensor,
    h0: &Tensor,
    wx: &'a Tensor,
    wh: &'a Tensor,
    b: &Tensor,
) -> Result<(Tensor, Vec<RnnStepCache<'a>>)> {
    let (n, t_len, d) = x.dims3("x")?;
    let (_, h) = h0.dims2("h0")?;
    if t_len == 0 {
        return Err(RecurrentError::EmptySequence);
    }
    h0.expect_shape("h0", &[n, h])?;
    check_cell_params(wx, wh, b, d, h, 1)?;
    debug!("rnn_forward: N={} T={} D={} H={}", n, t_len, d, h);

    let mut hidden: Tensor = Tensor::zeros(&[n, t_len, h]);
    let mut caches = Vec::with_capacity(t_len);
    let mut prev_h = h0.clone();

    for t in 0..t_len {
        let x_t = x.timestep(t)?;
        let (next_h, cache) = rnn_step_forward(&x_t, &prev_h, wx, wh, b)?;
        hidden.set_timestep(t, &next_h)?;
        caches.push(cache);
        prev_h = next_h;
    }

    Ok((hidden, caches))
}

/// Backpropagation through time for [`rnn_forward`].
///
/// Walks the caches from the last timestep to the first. At each step the
/// upstream hidden gradient is `dh[:, t, :]` plus the `dprev_h` produced by
/// step `t + 1`.
pub fn rnn_backward(dh: &Tensor, caches: &[RnnStepCache<'_>]) -> Result<RecurrentGrads> {
    let (n, t_len, h) = dh.dims3("dh")?;
    if t_len == 0 || caches.is_empty() {
        return Err(RecurrentError::EmptySequence);
    }
    if caches.len() != t_len {
        return Err(RecurrentError::CacheMismatch {
            expected: t_len,
            got: caches.len(),
        });
    }
    let d = caches[0].input_dim();
    debug!("rnn_backward: N={} T={} D={} H={}", n, t_len, d, h);

    let mut dx: Tensor = Tensor::zeros(&[n, t_len, d]);
    let mut dprev_h: Tensor = Tensor::zeros(&[n, h]);
    let mut slots: Vec<Option<StepParamGrads>> = vec![None; t_len];

    for t in (0..t_len).rev() {
        let mut upstream = dh.timestep(t)?;
        upstream.add_assign(&dprev_h)?;

        let step = rnn_step_backward(&upstream, &caches[t])?;
        dx.set_timestep(t, &step.dx)?;
        dprev_h = step.dprev_h;
        slots[t] = Some(StepParamGrads {
            dwx: step.dwx,
            dwh: step.dwh,
            db: step.db,
        });
    }

    let (dwx, dwh, db) = sum_over_time(slots)?;
    Ok(RecurrentGrads {
        dx,
        dh0: dprev_h,
        dwx,
        dwh,
        db,
    })
}
