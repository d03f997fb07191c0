//! General matrix multiply on row-major buffers.
//!
//! `C = alpha * op(A) * op(B) + beta * C` with the same argument order as the
//! BLAS `dgemm` routine. With the `blas` feature enabled the call is forwarded
//! to `cblas::dgemm`; otherwise a portable triple loop is used.

#[cfg(feature = "blas")]
use cblas::{dgemm, Layout, Transpose};

/// Row-major GEMM wrapper.
///
/// # Arguments
///
/// * `m`, `n`, `k` - `op(A)` is `m × k`, `op(B)` is `k × n`, `C` is `m × n`
/// * `lda`, `ldb`, `ldc` - leading dimensions (row strides) of the stored buffers
/// * `transpose_a`, `transpose_b` - use the transpose of the stored matrix
/// * `beta` - when zero, the previous contents of `c` are ignored
#[allow(clippy::too_many_arguments)]
pub fn dgemm_wrapper(
    m: usize,
    n: usize,
    k: usize,
    a: &[f64],
    lda: usize,
    b: &[f64],
    ldb: usize,
    c: &mut [f64],
    ldc: usize,
    transpose_a: bool,
    transpose_b: bool,
    alpha: f64,
    beta: f64,
) {
    if m == 0 || n == 0 {
        return;
    }

    #[cfg(feature = "blas")]
    {
        let trans_a = if transpose_a {
            Transpose::Ordinary
        } else {
            Transpose::None
        };
        let trans_b = if transpose_b {
            Transpose::Ordinary
        } else {
            Transpose::None
        };

        unsafe {
            dgemm(
                Layout::RowMajor,
                trans_a,
                trans_b,
                m as i32,
                n as i32,
                k as i32,
                alpha,
                a,
                lda as i32,
                b,
                ldb as i32,
                beta,
                c,
                ldc as i32,
            );
        }
    }

    #[cfg(not(feature = "blas"))]
    {
        for i in 0..m {
            for j in 0..n {
                let mut acc = 0.0f64;
                for p in 0..k {
                    let a_ip = if transpose_a {
                        a[p * lda + i]
                    } else {
                        a[i * lda + p]
                    };
                    let b_pj = if transpose_b {
                        b[j * ldb + p]
                    } else {
                        b[p * ldb + j]
                    };
                    acc += a_ip * b_pj;
                }
                let out = &mut c[i * ldc + j];
                *out = if beta == 0.0 {
                    alpha * acc
                } else {
                    alpha * acc + beta * *out
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemm_plain() {
        // [1 2; 3 4] x [5 6; 7 8] = [19 22; 43 50]
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];
        let mut c = [0.0; 4];
        dgemm_wrapper(2, 2, 2, &a, 2, &b, 2, &mut c, 2, false, false, 1.0, 0.0);
        assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_gemm_transpose_a() {
        // A stored as 3x2, op(A) = A^T is 2x3; B is 3x1.
        let a = [1.0, 4.0, 2.0, 5.0, 3.0, 6.0];
        let b = [1.0, 1.0, 1.0];
        let mut c = [0.0; 2];
        dgemm_wrapper(2, 1, 3, &a, 2, &b, 1, &mut c, 1, true, false, 1.0, 0.0);
        assert_eq!(c, [6.0, 15.0]);
    }

    #[test]
    fn test_gemm_transpose_b_accumulates() {
        // A is 1x2, B stored as 2x2 and used transposed.
        let a = [1.0, 2.0];
        let b = [1.0, 0.0, 0.0, 1.0];
        let mut c = [10.0, 20.0];
        dgemm_wrapper(1, 2, 2, &a, 2, &b, 2, &mut c, 2, false, true, 2.0, 1.0);
        assert_eq!(c, [12.0, 24.0]);
    }

    #[test]
    fn test_gemm_beta_zero_ignores_garbage() {
        let a = [1.0];
        let b = [3.0];
        let mut c = [f64::NAN];
        dgemm_wrapper(1, 1, 1, &a, 1, &b, 1, &mut c, 1, false, false, 1.0, 0.0);
        assert_eq!(c, [3.0]);
    }
}
