//! Dense row-major tensors with explicit shapes.
//!
//! `Tensor<f64>` carries activations, parameters and gradients. The same
//! container holds integer word ids (`Indices`) and padding masks (`Mask`).
//! Shape checks return [`RecurrentError`] instead of panicking so every layer
//! can validate its inputs before doing any work.

use crate::error::{RecurrentError, Result};
use crate::utils::gemm::dgemm_wrapper;

/// Dense tensor stored as a flat row-major buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T = f64> {
    shape: Vec<usize>,
    data: Vec<T>,
}

/// Integer index tensor, e.g. word ids of shape (N, T).
pub type Indices = Tensor<usize>;

/// Boolean mask, e.g. valid timesteps of shape (N, T).
pub type Mask = Tensor<bool>;

fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

impl<T: Copy + Default> Tensor<T> {
    /// Tensor of the given shape filled with `T::default()`.
    pub fn zeros(shape: &[usize]) -> Self {
        Self::filled(shape, T::default())
    }

    pub fn filled(shape: &[usize], value: T) -> Self {
        Self {
            shape: shape.to_vec(),
            data: vec![value; element_count(shape)],
        }
    }

    /// Wrap an existing buffer. Fails if `data.len()` does not match the shape.
    pub fn from_vec(shape: &[usize], data: Vec<T>) -> Result<Self> {
        if data.len() != element_count(shape) {
            return Err(RecurrentError::shape(
                "data",
                &[element_count(shape)],
                &[data.len()],
            ));
        }
        Ok(Self {
            shape: shape.to_vec(),
            data,
        })
    }

    /// Build a tensor by evaluating `f` at every flat offset.
    pub fn from_fn(shape: &[usize], f: impl FnMut(usize) -> T) -> Self {
        Self {
            shape: shape.to_vec(),
            data: (0..element_count(shape)).map(f).collect(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at a multi-dimensional index, or `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<T> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            offset = offset * dim + i;
        }
        self.data.get(offset).copied()
    }

    fn expect_rank(&self, name: &'static str, rank: usize) -> Result<()> {
        if self.shape.len() != rank {
            return Err(RecurrentError::RankMismatch {
                name,
                expected: rank,
                got: self.shape.clone(),
            });
        }
        Ok(())
    }

    pub fn dims1(&self, name: &'static str) -> Result<usize> {
        self.expect_rank(name, 1)?;
        Ok(self.shape[0])
    }

    pub fn dims2(&self, name: &'static str) -> Result<(usize, usize)> {
        self.expect_rank(name, 2)?;
        Ok((self.shape[0], self.shape[1]))
    }

    pub fn dims3(&self, name: &'static str) -> Result<(usize, usize, usize)> {
        self.expect_rank(name, 3)?;
        Ok((self.shape[0], self.shape[1], self.shape[2]))
    }

    /// Check that the tensor has exactly the `expected` shape.
    pub fn expect_shape(&self, name: &'static str, expected: &[usize]) -> Result<()> {
        self.expect_rank(name, expected.len())?;
        if self.shape != expected {
            return Err(RecurrentError::shape(name, expected, &self.shape));
        }
        Ok(())
    }

    /// Relabel the shape without touching the buffer.
    pub fn reshape(self, shape: &[usize]) -> Result<Self> {
        if element_count(shape) != self.data.len() {
            return Err(RecurrentError::shape("reshape", shape, &self.shape));
        }
        Ok(Self {
            shape: shape.to_vec(),
            data: self.data,
        })
    }

    /// Copy `[:, t, :]` out of an (N, T, D) tensor as an (N, D) tensor.
    pub fn timestep(&self, t: usize) -> Result<Self> {
        let (n, steps, d) = self.dims3("timeseries")?;
        if t >= steps {
            return Err(RecurrentError::IndexOutOfRange {
                name: "timestep",
                index: t,
                bound: steps,
            });
        }
        let mut data = Vec::with_capacity(n * d);
        for row in 0..n {
            let start = (row * steps + t) * d;
            data.extend_from_slice(&self.data[start..start + d]);
        }
        Ok(Self {
            shape: vec![n, d],
            data,
        })
    }

    /// Write an (N, D) tensor into `[:, t, :]` of an (N, T, D) tensor.
    pub fn set_timestep(&mut self, t: usize, step: &Self) -> Result<()> {
        let (n, steps, d) = self.dims3("timeseries")?;
        if t >= steps {
            return Err(RecurrentError::IndexOutOfRange {
                name: "timestep",
                index: t,
                bound: steps,
            });
        }
        step.expect_shape("timestep slice", &[n, d])?;
        for (row, chunk) in step.data.chunks_exact(d.max(1)).enumerate() {
            let start = (row * steps + t) * d;
            self.data[start..start + d].copy_from_slice(chunk);
        }
        Ok(())
    }
}

impl Tensor<f64> {
    /// `self · other` for (m, k) × (k, n).
    pub fn matmul(&self, other: &Self) -> Result<Self> {
        let (m, k) = self.dims2("lhs")?;
        let (k2, n) = other.dims2("rhs")?;
        if k != k2 {
            return Err(RecurrentError::shape("rhs", &[k, n], other.shape()));
        }
        let mut out = Self::zeros(&[m, n]);
        dgemm_wrapper(
            m,
            n,
            k,
            &self.data,
            k,
            &other.data,
            n,
            &mut out.data,
            n,
            false,
            false,
            1.0,
            0.0,
        );
        Ok(out)
    }

    /// `selfᵀ · other` for (k, m) and (k, n), giving (m, n).
    pub fn t_matmul(&self, other: &Self) -> Result<Self> {
        let (k, m) = self.dims2("lhs")?;
        let (k2, n) = other.dims2("rhs")?;
        if k != k2 {
            return Err(RecurrentError::shape("rhs", &[k, n], other.shape()));
        }
        let mut out = Self::zeros(&[m, n]);
        dgemm_wrapper(
            m,
            n,
            k,
            &self.data,
            m,
            &other.data,
            n,
            &mut out.data,
            n,
            true,
            false,
            1.0,
            0.0,
        );
        Ok(out)
    }

    /// `self · otherᵀ` for (m, k) and (n, k), giving (m, n).
    pub fn matmul_t(&self, other: &Self) -> Result<Self> {
        let (m, k) = self.dims2("lhs")?;
        let (n, k2) = other.dims2("rhs")?;
        if k != k2 {
            return Err(RecurrentError::shape("rhs", &[n, k], other.shape()));
        }
        let mut out = Self::zeros(&[m, n]);
        dgemm_wrapper(
            m,
            n,
            k,
            &self.data,
            k,
            &other.data,
            k,
            &mut out.data,
            n,
            false,
            true,
            1.0,
            0.0,
        );
        Ok(out)
    }

    /// `self += a · b`, accumulating into an existing (m, n) product.
    pub fn matmul_acc(&mut self, a: &Self, b: &Self) -> Result<()> {
        let (m, k) = a.dims2("lhs")?;
        let (k2, n) = b.dims2("rhs")?;
        if k != k2 {
            return Err(RecurrentError::shape("rhs", &[k, n], b.shape()));
        }
        self.expect_shape("accumulator", &[m, n])?;
        dgemm_wrapper(
            m,
            n,
            k,
            &a.data,
            k,
            &b.data,
            n,
            &mut self.data,
            n,
            false,
            false,
            1.0,
            1.0,
        );
        Ok(())
    }

    /// Broadcast-add a (cols,) vector to every row of a (rows, cols) matrix.
    pub fn add_row_vector(&mut self, bias: &Self) -> Result<()> {
        let (_, cols) = self.dims2("matrix")?;
        bias.expect_shape("bias", &[cols])?;
        if cols == 0 {
            return Ok(());
        }
        for row in self.data.chunks_exact_mut(cols) {
            for (value, b) in row.iter_mut().zip(&bias.data) {
                *value += *b;
            }
        }
        Ok(())
    }

    /// Sum a (rows, cols) matrix over its rows, giving (cols,).
    pub fn sum_rows(&self) -> Result<Self> {
        let (_, cols) = self.dims2("matrix")?;
        let mut out = Self::zeros(&[cols]);
        for row in self.data.chunks_exact(cols.max(1)) {
            for (value, sum) in row.iter().zip(out.data.iter_mut()) {
                *sum += *value;
            }
        }
        Ok(out)
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Elementwise combination of two tensors of identical shape.
    pub fn zip_map(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        if self.shape != other.shape {
            return Err(RecurrentError::shape("rhs", &self.shape, &other.shape));
        }
        Ok(Self {
            shape: self.shape.clone(),
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    pub fn add_assign(&mut self, other: &Self) -> Result<()> {
        if self.shape != other.shape {
            return Err(RecurrentError::shape("rhs", &self.shape, &other.shape));
        }
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += *b;
        }
        Ok(())
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }

    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}
