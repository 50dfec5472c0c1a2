// Affine projection node: y = Wx + b

use std::sync::Arc;

use rand::Rng;
use stancer_core::error::{Error, Result};
use stancer_core::graph::{Graph, NodeId, NodeRef};
use stancer_core::tensor::Tensor;

use crate::dropout;
use crate::init;

/// Weight and bias for one affine projection.
///
/// # Shapes
/// - `weight`: `[out, in]`
/// - `bias`: `[out]`
pub struct LinearParams {
    weight: Tensor,
    bias: Tensor,
}

impl LinearParams {
    /// Create a projection with Xavier-uniform weights and zero bias.
    pub fn new<R: Rng>(in_features: usize, out_features: usize, rng: &mut R) -> Result<Self> {
        if in_features == 0 {
            return Err(Error::InvalidDimension {
                what: "projection input",
                got: in_features,
            });
        }
        if out_features == 0 {
            return Err(Error::InvalidDimension {
                what: "projection output",
                got: out_features,
            });
        }
        Ok(LinearParams {
            weight: init::xavier_uniform([out_features, in_features], rng)?,
            bias: Tensor::zeros([out_features])?,
        })
    }

    /// Wrap existing weight and bias tensors.
    pub fn from_tensors(weight: Tensor, bias: Tensor) -> Result<Self> {
        if weight.rank() != 2 {
            return Err(Error::RankMismatch {
                expected: 2,
                got: weight.rank(),
            });
        }
        if bias.dims() != [weight.dims()[0]] {
            return Err(Error::LengthMismatch {
                expected: weight.dims()[0],
                got: bias.elem_count(),
            });
        }
        Ok(LinearParams { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.dims()[1]
    }

    pub fn out_features(&self) -> usize {
        self.weight.dims()[0]
    }
}

/// Projection node bound to an externally owned [`LinearParams`] block.
#[derive(Default)]
pub struct LinearNode {
    id: NodeId,
    params: Option<Arc<LinearParams>>,
    dim: usize,
    dropout: Option<f64>,
    val: Tensor,
}

impl LinearNode {
    /// Bind the projection parameters. Must precede `init`.
    pub fn bind(&mut self, params: &Arc<LinearParams>) {
        self.params = Some(Arc::clone(params));
    }

    /// Configure the output dimension and dropout policy.
    pub fn init(&mut self, dim: usize, policy: Option<f64>) -> Result<()> {
        if dim == 0 {
            return Err(Error::InvalidDimension {
                what: "projection output",
                got: dim,
            });
        }
        let params = self.params.as_ref().ok_or(Error::InvalidState {
            expected: "parameters bound",
            got: "unbound projection node",
        })?;
        if params.out_features() != dim {
            return Err(Error::LengthMismatch {
                expected: params.out_features(),
                got: dim,
            });
        }
        self.dropout = dropout::validate_policy(policy)?;
        self.dim = dim;
        self.val = Tensor::zeros([dim])?;
        Ok(())
    }

    /// Store `W @ input + b` as this node's output.
    pub fn forward(&mut self, graph: &mut Graph, input: NodeRef<'_>) -> Result<()> {
        let params = self.params.as_ref().ok_or(Error::InvalidState {
            expected: "parameters bound",
            got: "unbound projection node",
        })?;
        let mut v = params.weight.matvec(input.value)?.add(&params.bias)?;
        if let Some(p) = self.dropout {
            if graph.is_training() {
                v = dropout::inverted_dropout(&v, p, &mut rand::thread_rng())?;
            }
        }
        self.val = v;
        graph.record(self.id, &[input.id]);
        Ok(())
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn output(&self) -> NodeRef<'_> {
        NodeRef {
            id: self.id,
            value: &self.val,
        }
    }
}
