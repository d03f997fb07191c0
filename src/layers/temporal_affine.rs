//! Affine projection applied independently at every timestep
//!
//! The (N, T, D) input is viewed as an (N·T, D) matrix, multiplied by the
//! shared (D, M) weight and offset by the (M,) bias.

use crate::error::Result;
use crate::tensor::Tensor;

/// Flattened input and borrowed weight kept from [`temporal_affine_forward`].
#[derive(Debug, Clone)]
pub struct TemporalAffineCache<'a> {
    x_flat: Tensor,
    w: &'a Tensor,
    batch: usize,
    steps: usize,
}

/// Gradients returned by [`temporal_affine_backward`].
#[derive(Debug, Clone)]
pub struct TemporalAffineGrads {
    pub dx: Tensor,
    pub dw: Tensor,
    pub db: Tensor,
}

pub fn temporal_affine_forward<'a>(
    x: &Tensor,
    w: &'a Tensor,
    b: &Tensor,
) -> Result<(Tensor, TemporalAffineCache<'a>)> {
    let (n, t_len, d) = x.dims3("x")?;
    let (_, m) = w.dims2("w")?;
    w.expect_shape("w", &[d, m])?;
    b.expect_shape("b", &[m])?;

    let x_flat = x.clone().reshape(&[n * t_len, d])?;
    let mut out = x_flat.matmul(w)?;
    out.add_row_vector(b)?;
    let out = out.reshape(&[n, t_len, m])?;

    let cache = TemporalAffineCache {
        x_flat,
        w,
        batch: n,
        steps: t_len,
    };
    Ok((out, cache))
}

/// Linear-layer gradients computed on the flattened (N·T, ·) view.
pub fn temporal_affine_backward(
    dout: &Tensor,
    cache: &TemporalAffineCache<'_>,
) -> Result<TemporalAffineGrads> {
    let (d, m) = cache.w.dims2("w")?;
    let (n, t_len) = (cache.batch, cache.steps);
    dout.expect_shape("dout", &[n, t_len, m])?;

    let dout_flat = dout.clone().reshape(&[n * t_len, m])?;
    let dx = dout_flat.matmul_t(cache.w)?.reshape(&[n, t_len, d])?;
    let dw = cache.x_flat.t_matmul(&dout_flat)?;
    let db = dout_flat.sum_rows()?;

    Ok(TemporalAffineGrads { dx, dw, db })
}
