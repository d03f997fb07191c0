//! Recurrent Layers Library
//!
//! Hand-derived forward and backward primitives for recurrent sequence models.
//! Every primitive is a pure function: forward returns its output plus a typed
//! cache, backward turns that cache and an upstream gradient into gradients
//! for each forward input. Composing them into a model, and updating
//! parameters, is left to the caller.
//!
//! # Modules
//!
//! - `tensor`: row-major `Tensor` with checked shapes, plus `Indices` and `Mask`
//! - `layers`: RNN and LSTM cells with their BPTT drivers, word embeddings,
//!   temporal affine projection and masked temporal softmax loss
//! - `utils`: stable activations, GEMM, RNG and numerical gradient checking
//! - `config`: JSON configuration for gradient-check runs
//! - `error`: the crate-wide `RecurrentError`

#[cfg(feature = "blas")]
extern crate blas_src;

pub mod config;
pub mod error;
pub mod layers;
pub mod tensor;
pub mod utils;

pub use error::{RecurrentError, Result};
pub use tensor::{Indices, Mask, Tensor};
