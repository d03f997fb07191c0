//! Recurrent sequence layers
//!
//! Each layer is a pair of free functions: a forward pass that returns its
//! output together with a typed cache, and a backward pass that consumes that
//! cache and returns gradients shaped like the forward inputs.
//!
//! In a training step data flows embedding → recurrent sequence → temporal
//! affine → temporal softmax loss, and gradients flow back in reverse.

pub mod embedding;
pub mod lstm;
pub mod params;
pub mod rnn;
pub mod temporal_affine;
pub mod temporal_loss;

pub use embedding::{word_embedding_backward, word_embedding_forward, EmbeddingCache};
pub use lstm::{
    lstm_backward, lstm_forward, lstm_step_backward, lstm_step_forward, LstmStepCache,
    LstmStepGrads,
};
pub use params::{
    recurrent_backward, recurrent_forward, CellType, RecurrentGrads, RecurrentParams,
    SequenceCache,
};
pub use rnn::{
    rnn_backward, rnn_forward, rnn_step_backward, rnn_step_forward, RnnStepCache, RnnStepGrads,
};
pub use temporal_affine::{
    temporal_affine_backward, temporal_affine_forward, TemporalAffineCache, TemporalAffineGrads,
};
pub use temporal_loss::temporal_softmax_loss;
