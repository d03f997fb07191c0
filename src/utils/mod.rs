//! Shared numeric utilities
//!
//! Stable nonlinearities, the GEMM wrapper behind tensor products, a small
//! deterministic RNG for initialisation and tests, and finite-difference
//! gradient checking.

pub mod activations;
pub mod gemm;
pub mod gradient_check;
pub mod rng;

pub use activations::{sigmoid, softmax_rows, stable_sigmoid};
pub use gradient_check::{eval_numerical_gradient, eval_numerical_gradient_array, rel_error};
pub use rng::SimpleRng;
