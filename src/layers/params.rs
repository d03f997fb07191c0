//! Recurrent parameter bundles and cell-type dispatch
//!
//! Both cell types share the same parameter layout, `Wx (D, G·H)`,
//! `Wh (H, G·H)` and `b (G·H,)`, where `G` is the number of gates: 1 for the
//! vanilla RNN and 4 for the LSTM. LSTM gates are stacked along the last axis
//! in the fixed order input, forget, output, candidate.

use serde::Deserialize;

use crate::error::{RecurrentError, Result};
use crate::layers::lstm::{lstm_backward, lstm_forward, LstmStepCache};
use crate::layers::rnn::{rnn_backward, rnn_forward, RnnStepCache};
use crate::tensor::Tensor;
use crate::utils::SimpleRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Rnn,
    Lstm,
}

impl CellType {
    /// Number of gate blocks stacked in the weight and bias tensors.
    pub fn gate_count(self) -> usize {
        match self {
            CellType::Rnn => 1,
            CellType::Lstm => 4,
        }
    }
}

/// Weights and bias for one recurrent layer.
#[derive(Debug, Clone)]
pub struct RecurrentParams {
    pub wx: Tensor,
    pub wh: Tensor,
    pub b: Tensor,
}

impl RecurrentParams {
    /// Normal-distributed weights scaled by `scale`, bias drawn the same way.
    ///
    /// Weight matrices are additionally divided by the square root of their
    /// fan-in so activations stay in the responsive range of tanh/sigmoid.
    pub fn new_random(
        cell: CellType,
        input_dim: usize,
        hidden_dim: usize,
        scale: f64,
        rng: &mut SimpleRng,
    ) -> Self {
        let width = cell.gate_count() * hidden_dim;
        let wx_scale = scale / (input_dim.max(1) as f64).sqrt();
        let wh_scale = scale / (hidden_dim.max(1) as f64).sqrt();

        Self {
            wx: rng.normal_tensor(&[input_dim, width], wx_scale),
            wh: rng.normal_tensor(&[hidden_dim, width], wh_scale),
            b: rng.normal_tensor(&[width], scale),
        }
    }

    /// Total number of scalar parameters.
    pub fn parameter_count(&self) -> usize {
        self.wx.len() + self.wh.len() + self.b.len()
    }
}

/// Gradients produced by a sequence-level backward pass.
///
/// `dwx`, `dwh` and `db` are summed over both batch and time.
#[derive(Debug, Clone)]
pub struct RecurrentGrads {
    pub dx: Tensor,
    pub dh0: Tensor,
    pub dwx: Tensor,
    pub dwh: Tensor,
    pub db: Tensor,
}

/// Parameter gradients of a single timestep, before summation over time.
#[derive(Debug, Clone)]
pub(crate) struct StepParamGrads {
    pub dwx: Tensor,
    pub dwh: Tensor,
    pub db: Tensor,
}

/// Cache sequence of either cell type, in chronological order.
#[derive(Debug, Clone)]
pub enum SequenceCache<'a> {
    Rnn(Vec<RnnStepCache<'a>>),
    Lstm(Vec<LstmStepCache<'a>>),
}

impl SequenceCache<'_> {
    pub fn cell_type(&self) -> CellType {
        match self {
            SequenceCache::Rnn(_) => CellType::Rnn,
            SequenceCache::Lstm(_) => CellType::Lstm,
        }
    }

    /// Number of cached timesteps.
    pub fn len(&self) -> usize {
        match self {
            SequenceCache::Rnn(steps) => steps.len(),
            SequenceCache::Lstm(steps) => steps.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sequence forward pass for the given cell type.
///
/// The LSTM starts from a zero cell state; only `h0` is supplied.
pub fn recurrent_forward<'a>(
    cell: CellType,
    x: &Tensor,
    h0: &Tensor,
    params: &'a RecurrentParams,
) -> Result<(Tensor, SequenceCache<'a>)> {
    match cell {
        CellType::Rnn => {
            let (h, caches) = rnn_forward(x, h0, &params.wx, &params.wh, &params.b)?;
            Ok((h, SequenceCache::Rnn(caches)))
        }
        CellType::Lstm => {
            let (h, caches) = lstm_forward(x, h0, &params.wx, &params.wh, &params.b)?;
            Ok((h, SequenceCache::Lstm(caches)))
        }
    }
}

/// Sequence backward pass matching the variant of `cache`.
pub fn recurrent_backward(dh: &Tensor, cache: &SequenceCache<'_>) -> Result<RecurrentGrads> {
    match cache {
        SequenceCache::Rnn(steps) => rnn_backward(dh, steps),
        SequenceCache::Lstm(steps) => lstm_backward(dh, steps),
    }
}

/// Validate `Wx (D, G·H)`, `Wh (H, G·H)` and `b (G·H,)`.
pub(crate) fn check_cell_params(
    wx: &Tensor,
    wh: &Tensor,
    b: &Tensor,
    input_dim: usize,
    hidden_dim: usize,
    gates: usize,
) -> Result<()> {
    let width = gates * hidden_dim;
    wx.expect_shape("Wx", &[input_dim, width])?;
    wh.expect_shape("Wh", &[hidden_dim, width])?;
    b.expect_shape("b", &[width])?;
    Ok(())
}

/// Sum per-timestep parameter gradients. Every slot must have been filled.
pub(crate) fn sum_over_time(
    slots: Vec<Option<StepParamGrads>>,
) -> Result<(Tensor, Tensor, Tensor)> {
    let expected = slots.len();
    let filled = slots.iter().filter(|s| s.is_some()).count();
    if filled != expected || expected == 0 {
        return Err(RecurrentError::CacheMismatch {
            expected,
            got: filled,
        });
    }

    let mut steps = slots.into_iter().flatten();
    let mut total = match steps.next() {
        Some(first) => first,
        None => return Err(RecurrentError::EmptySequence),
    };
    for step in steps {
        total.dwx.add_assign(&step.dwx)?;
        total.dwh.add_assign(&step.dwh)?;
        total.db.add_assign(&step.db)?;
    }
    Ok((total.dwx, total.dwh, total.db))
}
