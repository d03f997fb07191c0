//! Word embedding lookup
//!
//! Forward gathers rows of a (V, D) table for every id in an (N, T) index
//! tensor; backward scatter-adds the upstream gradient back into a zeroed
//! (V, D) table. Repeated ids accumulate.

use crate::error::{RecurrentError, Result};
use crate::tensor::{Indices, Tensor};

/// Word ids and table dimensions kept from [`word_embedding_forward`].
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    x: Indices,
    vocab_size: usize,
    embed_dim: usize,
}

impl EmbeddingCache {
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn embed_dim(&self) -> usize {
        self.embed_dim
    }
}

/// Gather `w[x[n, t], :]` into an (N, T, D) output.
///
/// Every id must lie in `[0, V)`; the check runs before any row is copied.
pub fn word_embedding_forward(x: &Indices, w: &Tensor) -> Result<(Tensor, EmbeddingCache)> {
    let (n, t_len) = x.dims2("x")?;
    let (vocab_size, embed_dim) = w.dims2("W")?;

    if let Some(&index) = x.data().iter().find(|&&idx| idx >= vocab_size) {
        return Err(RecurrentError::IndexOutOfRange {
            name: "x",
            index,
            bound: vocab_size,
        });
    }

    let mut data = Vec::with_capacity(n * t_len * embed_dim);
    for &idx in x.data() {
        let start = idx * embed_dim;
        data.extend_from_slice(&w.data()[start..start + embed_dim]);
    }
    let out = Tensor::from_vec(&[n, t_len, embed_dim], data)?;

    let cache = EmbeddingCache {
        x: x.clone(),
        vocab_size,
        embed_dim,
    };
    Ok((out, cache))
}

/// Gradient of the embedding table, shape (V, D).
///
/// The word ids themselves are not differentiable, so only `dW` is returned.
pub fn word_embedding_backward(dout: &Tensor, cache: &EmbeddingCache) -> Result<Tensor> {
    let (n, t_len) = (cache.x.shape()[0], cache.x.shape()[1]);
    dout.expect_shape("dout", &[n, t_len, cache.embed_dim])?;

    let mut dw: Tensor = Tensor::zeros(&[cache.vocab_size, cache.embed_dim]);
    let d = cache.embed_dim;
    for (&idx, grad) in cache.x.data().iter().zip(dout.data().chunks_exact(d.max(1))) {
        let row = &mut dw.data_mut()[idx * d..(idx + 1) * d];
        for (acc, g) in row.iter_mut().zip(grad) {
            *acc += *g;
        }
    }
    Ok(dw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Tensor {
        Tensor::from_fn(&[4, 3], |i| i as f64)
    }

    #[test]
    fn test_forward_gathers_rows() {
        let x: Indices = Tensor::from_vec(&[2, 2], vec![0, 3, 1, 1]).unwrap();
        let (out, _) = word_embedding_forward(&x, &table()).unwrap();
        assert_eq!(out.shape(), &[2, 2, 3]);
        assert_eq!(out.timestep(1).unwrap().data(), &[9.0, 10.0, 11.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_forward_rejects_out_of_range_id() {
        let x: Indices = Tensor::from_vec(&[1, 3], vec![0, 4, 1]).unwrap();
        let err = word_embedding_forward(&x, &table()).unwrap_err();
        assert!(matches!(
            err,
            RecurrentError::IndexOutOfRange {
                index: 4,
                bound: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_backward_accumulates_repeated_ids() {
        let x: Indices = Tensor::from_vec(&[1, 3], vec![2, 0, 2]).unwrap();
        let (_, cache) = word_embedding_forward(&x, &table()).unwrap();
        let dout: Tensor =
            Tensor::from_vec(&[1, 3, 3], vec![1.0, 2.0, 3.0, 0.5, 0.5, 0.5, 10.0, 20.0, 30.0])
                .unwrap();

        let dw = word_embedding_backward(&dout, &cache).unwrap();
        assert_eq!(dw.shape(), &[4, 3]);
        assert_eq!(&dw.data()[6..9], &[11.0, 22.0, 33.0]);
        assert_eq!(&dw.data()[0..3], &[0.5, 0.5, 0.5]);
        assert_eq!(&dw.data()[3..6], &[0.0, 0.0, 0.0]);
        assert_eq!(&dw.data()[9..12], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_backward_rejects_wrong_dout_shape() {
        let x: Indices = Tensor::from_vec(&[1, 2], vec![0, 1]).unwrap();
        let (_, cache) = word_embedding_forward(&x, &table()).unwrap();
        let dout: Tensor = Tensor::zeros(&[1, 2, 4]);
        assert!(word_embedding_backward(&dout, &cache).is_err());
    }
}
