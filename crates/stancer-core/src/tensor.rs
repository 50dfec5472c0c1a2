use std::sync::Arc;

use crate::error::{Error, Result};

// Tensor: the value type flowing through the graph
//
// Every node output in the pipeline is a dense f32 vector, and every
// parameter block is a dense f32 matrix. That is the whole shape vocabulary
// of this engine, so Tensor supports exactly rank-1 and rank-2 data and
// nothing more.
//
// MEMORY MODEL:
//
//   The inner data is wrapped in Arc, so cloning a Tensor is cheap (one
//   refcount increment). Node slots overwrite their output by replacing the
//   whole Tensor on each forward call; values are immutable once created,
//   which is what lets many readers (the next pipeline stage, the recorded
//   graph, tests) share one buffer safely.

struct TensorInner {
    /// Raw elements in row-major order.
    data: Vec<f32>,
    /// Dimensions: `[len]` for vectors, `[rows, cols]` for matrices.
    dims: Vec<usize>,
}

/// A dense f32 vector or matrix with cheap (Arc) cloning.
///
/// # Examples
/// ```ignore
/// let v = Tensor::from_vec(vec![1.0, 2.0, 3.0], [3])?;
/// let w = Tensor::zeros([3])?;
/// let s = v.add(&w)?;
/// ```
pub struct Tensor {
    inner: Arc<TensorInner>,
}

impl Clone for Tensor {
    fn clone(&self) -> Self {
        Tensor {
            inner: Arc::clone(&self.inner),
        }
    }
}

// An empty vector. Pool slots start here before their first forward call.
impl Default for Tensor {
    fn default() -> Self {
        Tensor {
            inner: Arc::new(TensorInner {
                data: Vec::new(),
                dims: vec![0],
            }),
        }
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tensor(dims={:?}, len={})", self.dims(), self.elem_count())
    }
}

impl Tensor {
    /// Create a tensor from raw elements and dimensions.
    ///
    /// Fails with `ElementCountMismatch` when the element count does not
    /// match the product of `dims`, and with `RankMismatch` for rank 0 or
    /// rank 3+.
    pub fn from_vec(data: Vec<f32>, dims: impl Into<Vec<usize>>) -> Result<Self> {
        let dims = dims.into();
        if dims.is_empty() || dims.len() > 2 {
            return Err(Error::RankMismatch {
                expected: 2,
                got: dims.len(),
            });
        }
        let expected: usize = dims.iter().product();
        if data.len() != expected {
            return Err(Error::ElementCountMismatch {
                dims,
                expected,
                got: data.len(),
            });
        }
        Ok(Tensor {
            inner: Arc::new(TensorInner { data, dims }),
        })
    }

    /// Create an all-zero tensor.
    pub fn zeros(dims: impl Into<Vec<usize>>) -> Result<Self> {
        let dims = dims.into();
        let count: usize = dims.iter().product();
        Tensor::from_vec(vec![0.0; count], dims)
    }

    /// Create a tensor filled with a constant value.
    pub fn full(dims: impl Into<Vec<usize>>, value: f32) -> Result<Self> {
        let dims = dims.into();
        let count: usize = dims.iter().product();
        Tensor::from_vec(vec![value; count], dims)
    }

    /// The dimensions of this tensor.
    pub fn dims(&self) -> &[usize] {
        &self.inner.dims
    }

    /// Number of dimensions (1 for vectors, 2 for matrices).
    pub fn rank(&self) -> usize {
        self.inner.dims.len()
    }

    /// Total number of elements.
    pub fn elem_count(&self) -> usize {
        self.inner.data.len()
    }

    /// The raw elements in row-major order.
    pub fn data(&self) -> &[f32] {
        &self.inner.data
    }

    /// Single element of a vector.
    pub fn get(&self, index: usize) -> Result<f32> {
        self.inner.data.get(index).copied().ok_or(Error::IndexOutOfRange {
            index,
            len: self.inner.data.len(),
        })
    }

    /// Extract row `r` of a matrix as a fresh vector.
    pub fn row(&self, r: usize) -> Result<Tensor> {
        if self.rank() != 2 {
            return Err(Error::RankMismatch {
                expected: 2,
                got: self.rank(),
            });
        }
        let (rows, cols) = (self.inner.dims[0], self.inner.dims[1]);
        if r >= rows {
            return Err(Error::IndexOutOfRange { index: r, len: rows });
        }
        let start = r * cols;
        Tensor::from_vec(self.inner.data[start..start + cols].to_vec(), [cols])
    }

    // Elementwise binary ops. Both operands must have identical dims.

    fn binary(&self, rhs: &Tensor, op: impl Fn(f32, f32) -> f32) -> Result<Tensor> {
        if self.dims() != rhs.dims() {
            return Err(Error::LengthMismatch {
                expected: self.elem_count(),
                got: rhs.elem_count(),
            });
        }
        let data = self
            .inner
            .data
            .iter()
            .zip(rhs.inner.data.iter())
            .map(|(a, b)| op(*a, *b))
            .collect();
        Tensor::from_vec(data, self.inner.dims.clone())
    }

    /// Elementwise addition.
    pub fn add(&self, rhs: &Tensor) -> Result<Tensor> {
        self.binary(rhs, |a, b| a + b)
    }

    /// Elementwise (Hadamard) product.
    pub fn mul(&self, rhs: &Tensor) -> Result<Tensor> {
        self.binary(rhs, |a, b| a * b)
    }

    /// Elementwise maximum.
    pub fn maximum(&self, rhs: &Tensor) -> Result<Tensor> {
        self.binary(rhs, f32::max)
    }

    // Elementwise unary ops.

    fn unary(&self, op: impl Fn(f32) -> f32) -> Tensor {
        let data = self.inner.data.iter().map(|a| op(*a)).collect();
        Tensor {
            inner: Arc::new(TensorInner {
                data,
                dims: self.inner.dims.clone(),
            }),
        }
    }

    /// Elementwise hyperbolic tangent.
    pub fn tanh(&self) -> Tensor {
        self.unary(f32::tanh)
    }

    /// Elementwise logistic sigmoid.
    pub fn sigmoid(&self) -> Tensor {
        self.unary(|a| 1.0 / (1.0 + (-a).exp()))
    }

    /// Elementwise scale: `self * mul`.
    pub fn scale(&self, mul: f32) -> Tensor {
        self.unary(|a| a * mul)
    }

    /// Matrix-vector product: `[m, n] @ [n] -> [m]`.
    pub fn matvec(&self, x: &Tensor) -> Result<Tensor> {
        if self.rank() != 2 {
            return Err(Error::RankMismatch {
                expected: 2,
                got: self.rank(),
            });
        }
        let (m, n) = (self.inner.dims[0], self.inner.dims[1]);
        if x.rank() != 1 || x.elem_count() != n {
            return Err(Error::MatvecShapeMismatch {
                m,
                n,
                len: x.elem_count(),
            });
        }
        let mut out = vec![0.0f32; m];
        for (r, slot) in out.iter_mut().enumerate() {
            let row = &self.inner.data[r * n..(r + 1) * n];
            *slot = row.iter().zip(x.inner.data.iter()).map(|(a, b)| a * b).sum();
        }
        Tensor::from_vec(out, [m])
    }

    /// Concatenate vectors into one longer vector, in argument order.
    pub fn concat(parts: &[&Tensor]) -> Result<Tensor> {
        if parts.is_empty() {
            return Err(Error::EmptyInput);
        }
        let mut data = Vec::with_capacity(parts.iter().map(|p| p.elem_count()).sum());
        for part in parts {
            if part.rank() != 1 {
                return Err(Error::RankMismatch {
                    expected: 1,
                    got: part.rank(),
                });
            }
            data.extend_from_slice(part.data());
        }
        let len = data.len();
        Tensor::from_vec(data, [len])
    }

    /// Split a vector into `n` equal-length chunks.
    pub fn chunk(&self, n: usize) -> Result<Vec<Tensor>> {
        if self.rank() != 1 {
            return Err(Error::RankMismatch {
                expected: 1,
                got: self.rank(),
            });
        }
        let len = self.elem_count();
        if n == 0 || len % n != 0 {
            return Err(Error::LengthMismatch {
                expected: n.max(1),
                got: len,
            });
        }
        let size = len / n;
        (0..n)
            .map(|i| Tensor::from_vec(self.inner.data[i * size..(i + 1) * size].to_vec(), [size]))
            .collect()
    }
}
