// Pairwise concatenation node

use stancer_core::error::{Error, Result};
use stancer_core::graph::{Graph, NodeId, NodeRef};
use stancer_core::tensor::Tensor;

use crate::dropout;

/// Concatenates two input vectors into one output vector.
///
/// The configured output dimension must equal the sum of the two input
/// lengths; anything else is a wiring mistake and fails the call.
#[derive(Default)]
pub struct ConcatNode {
    id: NodeId,
    dim: usize,
    dropout: Option<f64>,
    val: Tensor,
}

impl ConcatNode {
    /// Configure the output dimension and dropout policy.
    pub fn init(&mut self, dim: usize, policy: Option<f64>) -> Result<()> {
        if dim == 0 {
            return Err(Error::InvalidDimension {
                what: "concat",
                got: dim,
            });
        }
        self.dropout = dropout::validate_policy(policy)?;
        self.dim = dim;
        self.val = Tensor::zeros([dim])?;
        Ok(())
    }

    /// Store `[a, b]` as this node's output.
    pub fn forward(&mut self, graph: &mut Graph, a: NodeRef<'_>, b: NodeRef<'_>) -> Result<()> {
        let got = a.value.elem_count() + b.value.elem_count();
        if got != self.dim {
            return Err(Error::LengthMismatch {
                expected: self.dim,
                got,
            });
        }
        let mut v = Tensor::concat(&[a.value, b.value])?;
        if let Some(p) = self.dropout {
            if graph.is_training() {
                v = dropout::inverted_dropout(&v, p, &mut rand::thread_rng())?;
            }
        }
        self.val = v;
        graph.record(self.id, &[a.id, b.id]);
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
