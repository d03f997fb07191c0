//! Long short-term memory layer
//!
//! The stacked pre-activation `a = x·Wx + prev_h·Wh + b` has shape (N, 4H)
//! and is split column-wise into four (N, H) blocks in the order
//! input (i), forget (f), output (o), candidate (g). Forward and backward both
//! depend on that order; the gradient `da` is assembled in the same layout.
//!
//! ```text
//! i = σ(a_i)   f = σ(a_f)   o = σ(a_o)   g = tanh(a_g)
//! next_c = f ⊙ prev_c + i ⊙ g
//! next_h = o ⊙ tanh(next_c)
//! ```

use log::debug;

use crate::error::{RecurrentError, Result};
use crate::layers::params::{check_cell_params, sum_over_time, RecurrentGrads, StepParamGrads};
use crate::tensor::Tensor;
use crate::utils::activations::{sigmoid_derivative, stable_sigmoid, tanh_derivative};

const GATES: usize = 4;

/// Post-nonlinearity values from [`lstm_step_forward`].
///
/// Everything backward needs is stored after activation, so the backward pass
/// evaluates no sigmoid or tanh.
#[derive(Debug, Clone)]
pub struct LstmStepCache<'a> {
    x: Tensor,
    prev_h: Tensor,
    prev_c: Tensor,
    wx: &'a Tensor,
    wh: &'a Tensor,
    i: Tensor,
    f: Tensor,
    o: Tensor,
    g: Tensor,
    tanh_next_c: Tensor,
}

impl LstmStepCache<'_> {
    pub fn input_gate(&self) -> &Tensor {
        &self.i
    }

    pub fn forget_gate(&self) -> &Tensor {
        &self.f
    }

    pub fn output_gate(&self) -> &Tensor {
        &self.o
    }

    pub fn candidate(&self) -> &Tensor {
        &self.g
    }

    fn input_dim(&self) -> usize {
        self.x.shape()[1]
    }
}

/// Gradients returned by [`lstm_step_backward`].
#[derive(Debug, Clone)]
pub struct LstmStepGrads {
    pub dx: Tensor,
    pub dprev_h: Tensor,
    pub dprev_c: Tensor,
    pub dwx: Tensor,
    pub dwh: Tensor,
    pub db: Tensor,
}

/// One LSTM timestep. Returns `(next_h, next_c, cache)`.
pub fn lstm_step_forward<'a>(
    x: &Tensor,
    prev_h: &Tensor,
    prev_c: &Tensor,
    wx: &'a Tensor,
    wh: &'a Tensor,
    b: &Tensor,
) -> Result<(Tensor, Tensor, LstmStepCache<'a>)> {
    let (n, d) = x.dims2("x")?;
    let (_, h) = prev_h.dims2("prev_h")?;
    prev_h.expect_shape("prev_h", &[n, h])?;
    prev_c.expect_shape("prev_c", &[n, h])?;
    check_cell_params(wx, wh, b, d, h, GATES)?;

    let mut a = x.matmul(wx)?;
    a.matmul_acc(prev_h, wh)?;
    a.add_row_vector(b)?;

    let mut i: Tensor = Tensor::zeros(&[n, h]);
    let mut f: Tensor = Tensor::zeros(&[n, h]);
    let mut o: Tensor = Tensor::zeros(&[n, h]);
    let mut g: Tensor = Tensor::zeros(&[n, h]);
    let mut next_c: Tensor = Tensor::zeros(&[n, h]);
    let mut tanh_next_c: Tensor = Tensor::zeros(&[n, h]);
    let mut next_h: Tensor = Tensor::zeros(&[n, h]);

    for (row, a_row) in a.data().chunks_exact((GATES * h).max(1)).enumerate() {
        for col in 0..h {
            let k = row * h + col;
            let gi = stable_sigmoid(a_row[col]);
            let gf = stable_sigmoid(a_row[h + col]);
            let go = stable_sigmoid(a_row[2 * h + col]);
            let gg = a_row[3 * h + col].tanh();

            let c = gf * prev_c.data()[k] + gi * gg;
            let tc = c.tanh();

            i.data_mut()[k] = gi;
            f.data_mut()[k] = gf;
            o.data_mut()[k] = go;
            g.data_mut()[k] = gg;
            next_c.data_mut()[k] = c;
            tanh_next_c.data_mut()[k] = tc;
            next_h.data_mut()[k] = go * tc;
        }
    }

    let cache = LstmStepCache {
        x: x.clone(),
        prev_h: prev_h.clone(),
        prev_c: prev_c.clone(),
        wx,
        wh,
        i,
        f,
        o,
        g,
        tanh_next_c,
    };
    Ok((next_h, next_c, cache))
}

/// Backward pass for one LSTM timestep.
///
/// `dnext_c` is the gradient already flowing into the cell state from later
/// timesteps; the contribution through `next_h = o ⊙ tanh(next_c)` is added on
/// top of it here. The caller's tensor is not modified.
pub fn lstm_step_backward(
    dnext_h: &Tensor,
    dnext_c: &Tensor,
    cache: &LstmStepCache<'_>,
) -> Result<LstmStepGrads> {
    let (n, h) = cache.i.dims2("cache")?;
    dnext_h.expect_shape("dnext_h", &[n, h])?;
    dnext_c.expect_shape("dnext_c", &[n, h])?;

    let mut da: Tensor = Tensor::zeros(&[n, GATES * h]);
    let mut dprev_c: Tensor = Tensor::zeros(&[n, h]);

    for row in 0..n {
        let da_row = &mut da.data_mut()[row * GATES * h..(row + 1) * GATES * h];
        for col in 0..h {
            let k = row * h + col;
            let i = cache.i.data()[k];
            let f = cache.f.data()[k];
            let o = cache.o.data()[k];
            let g = cache.g.data()[k];
            let tnc = cache.tanh_next_c.data()[k];
            let dh = dnext_h.data()[k];

            let dc = dnext_c.data()[k] + dh * o * tanh_derivative(tnc);
            let d_o = dh * tnc;
            let d_f = dc * cache.prev_c.data()[k];
            let d_i = dc * g;
            let d_g = dc * i;
            dprev_c.data_mut()[k] = dc * f;

            da_row[col] = d_i * sigmoid_derivative(i);
            da_row[h + col] = d_f * sigmoid_derivative(f);
            da_row[2 * h + col] = d_o * sigmoid_derivative(o);
            da_row[3 * h + col] = d_g * tanh_derivative(g);
        }
    }

    Ok(LstmStepGrads {
        dx: da.matmul_t(cache.wx)?,
        dprev_h: da.matmul_t(cache.wh)?,
        dprev_c,
        dwx: cache.x.t_matmul(&da)?,
        dwh: cache.prev_h.t_matmul(&da)?,
        db: da.sum_rows()?,
    })
}

/// Run the LSTM over a whole sequence.
///
/// The initial cell state is zero and the cell state never leaves this
/// function; only the hidden states, shape (N, T, H), are returned together
/// with the per-timestep caches in chronological order.
pub fn lstm_forward<'a>(
    x: &Tensor,
    h0: &Tensor,
    wx: &'a Tensor,
    wh: &'a Tensor,
    b: &Tensor,
) -> Result<(Tensor, Vec<LstmStepCache<'a>>)> {
    let (n, t_len, d) = x.dims3("x")?;
    let (_, h) = h0.dims2("h0")?;
    if t_len == 0 {
        return Err(RecurrentError::EmptySequence);
    }
    h0.expect_shape("h0", &[n, h])?;
    check_cell_params(wx, wh, b, d, h, GATES)?;
    debug!("lstm_forward: N={} T={} D={} H={}", n, t_len, d, h);

    let mut hidden: Tensor = Tensor::zeros(&[n, t_len, h]);
    let mut caches = Vec::with_capacity(t_len);
    let mut prev_h = h0.clone();
    let mut prev_c: Tensor = Tensor::zeros(&[n, h]);

    for t in 0..t_len {
        let x_t = x.timestep(t)?;
        let (next_h, next_c, cache) = lstm_step_forward(&x_t, &prev_h, &prev_c, wx, wh, b)?;
        hidden.set_timestep(t, &next_h)?;
        caches.push(cache);
        prev_h = next_h;
        prev_c = next_c;
    }

    Ok((hidden, caches))
}

/// Backpropagation through time for [`lstm_forward`].
///
/// Processes timesteps from last to first. The hidden-state gradient fed to
/// step `t` is `dh[:, t, :]` plus `dprev_h` from step `t + 1`; the cell-state
/// gradient is `dprev_c` from step `t + 1`, zero at the final step.
pub fn lstm_backward(dh: &Tensor, caches: &[LstmStepCache<'_>]) -> Result<RecurrentGrads> {
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
    debug!("lstm_backward: N={} T={} D={} H={}", n, t_len, d, h);

    let mut dx: Tensor = Tensor::zeros(&[n, t_len, d]);
    let mut dprev_h: Tensor = Tensor::zeros(&[n, h]);
    let mut dprev_c: Tensor = Tensor::zeros(&[n, h]);
    let mut slots: Vec<Option<StepParamGrads>> = vec![None; t_len];

    for t in (0..t_len).rev() {
        let mut upstream = dh.timestep(t)?;
        upstream.add_assign(&dprev_h)?;

        let step = lstm_step_backward(&upstream, &dprev_c, &caches[t])?;
        dx.set_timestep(t, &step.dx)?;
        dprev_h = step.dprev_h;
        dprev_c = step.dprev_c;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::SimpleRng;

    fn random_step(
        rng: &mut SimpleRng,
        n: usize,
        d: usize,
        h: usize,
    ) -> (Tensor, Tensor, Tensor, Tensor, Tensor, Tensor) {
        (
            rng.normal_tensor(&[n, d], 1.0),
            rng.normal_tensor(&[n, h], 1.0),
            rng.normal_tensor(&[n, h], 1.0),
            rng.normal_tensor(&[d, 4 * h], 0.3),
            rng.normal_tensor(&[h, 4 * h], 0.3),
            rng.normal_tensor(&[4 * h], 0.3),
        )
    }

    #[test]
    fn test_gate_order_in_bias() {
        // Zero weights: each gate sees only its own bias block.
        let h = 2;
        let x: Tensor = Tensor::zeros(&[1, 3]);
        let prev_h: Tensor = Tensor::zeros(&[1, h]);
        let prev_c: Tensor = Tensor::filled(&[1, h], 1.0);
        let wx: Tensor = Tensor::zeros(&[3, 4 * h]);
        let wh: Tensor = Tensor::zeros(&[h, 4 * h]);
        let b: Tensor = Tensor::from_vec(&[4 * h], vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 0.5, 0.5])
            .unwrap();

        let (next_h, next_c, cache) =
            lstm_step_forward(&x, &prev_h, &prev_c, &wx, &wh, &b).unwrap();

        assert!((cache.input_gate().data()[0] - stable_sigmoid(1.0)).abs() < 1e-12);
        assert!((cache.forget_gate().data()[0] - stable_sigmoid(2.0)).abs() < 1e-12);
        assert!((cache.output_gate().data()[0] - stable_sigmoid(3.0)).abs() < 1e-12);
        assert!((cache.candidate().data()[0] - 0.5f64.tanh()).abs() < 1e-12);

        let c = stable_sigmoid(2.0) + stable_sigmoid(1.0) * 0.5f64.tanh();
        assert!((next_c.data()[1] - c).abs() < 1e-12);
        assert!((next_h.data()[1] - stable_sigmoid(3.0) * c.tanh()).abs() < 1e-12);
    }

    #[test]
    fn test_step_backward_does_not_touch_dnext_c() {
        let mut rng = SimpleRng::new(9);
        let (x, prev_h, prev_c, wx, wh, b) = random_step(&mut rng, 2, 3, 4);
        let (_, _, cache) = lstm_step_forward(&x, &prev_h, &prev_c, &wx, &wh, &b).unwrap();

        let dnext_h = rng.normal_tensor(&[2, 4], 1.0);
        let dnext_c = rng.normal_tensor(&[2, 4], 1.0);
        let before = dnext_c.clone();
        lstm_step_backward(&dnext_h, &dnext_c, &cache).unwrap();
        assert_eq!(dnext_c, before);
    }

    #[test]
    fn test_step_backward_shapes() {
        let mut rng = SimpleRng::new(10);
        let (x, prev_h, prev_c, wx, wh, b) = random_step(&mut rng, 3, 5, 6);
        let (next_h, next_c, cache) =
            lstm_step_forward(&x, &prev_h, &prev_c, &wx, &wh, &b).unwrap();

        let grads = lstm_step_backward(&next_h, &next_c, &cache).unwrap();
        assert_eq!(grads.dx.shape(), &[3, 5]);
        assert_eq!(grads.dprev_h.shape(), &[3, 6]);
        assert_eq!(grads.dprev_c.shape(), &[3, 6]);
        assert_eq!(grads.dwx.shape(), &[5, 24]);
        assert_eq!(grads.dwh.shape(), &[6, 24]);
        assert_eq!(grads.db.shape(), &[24]);
    }

    #[test]
    fn test_step_forward_rejects_rnn_shaped_weights() {
        let mut rng = SimpleRng::new(11);
        let x = rng.normal_tensor(&[2, 3], 1.0);
        let prev_h = rng.normal_tensor(&[2, 4], 1.0);
        let prev_c = rng.normal_tensor(&[2, 4], 1.0);
        let wx = rng.normal_tensor(&[3, 4], 1.0);
        let wh = rng.normal_tensor(&[4, 4], 1.0);
        let b = rng.normal_tensor(&[4], 1.0);

        let err = lstm_step_forward(&x, &prev_h, &prev_c, &wx, &wh, &b).unwrap_err();
        assert!(matches!(err, RecurrentError::ShapeMismatch { name: "Wx", .. }));
    }

    #[test]
    fn test_forward_starts_from_zero_cell_state() {
        let mut rng = SimpleRng::new(12);
        let x = rng.normal_tensor(&[2, 3, 4], 1.0);
        let h0 = rng.normal_tensor(&[2, 5], 1.0);
        let wx = rng.normal_tensor(&[4, 20], 0.3);
        let wh = rng.normal_tensor(&[5, 20], 0.3);
        let b = rng.normal_tensor(&[20], 0.3);

        let (h, _) = lstm_forward(&x, &h0, &wx, &wh, &b).unwrap();
        let zero_c: Tensor = Tensor::zeros(&[2, 5]);
        let (h1, _, _) =
            lstm_step_forward(&x.timestep(0).unwrap(), &h0, &zero_c, &wx, &wh, &b).unwrap();
        assert_eq!(h.timestep(0).unwrap(), h1);
    }
}
