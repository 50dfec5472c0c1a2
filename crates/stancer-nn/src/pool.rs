// Max pooling over a sequence of vectors

use stancer_core::error::{Error, Result};
use stancer_core::graph::{Graph, NodeId, NodeRef};
use stancer_core::tensor::Tensor;

use crate::dropout;

/// Elementwise maximum across an ordered, non-empty sequence of
/// equal-length input vectors.
#[derive(Default)]
pub struct MaxPoolNode {
    id: NodeId,
    dim: usize,
    dropout: Option<f64>,
    val: Tensor,
}

impl MaxPoolNode {
    /// Configure the pooled dimension and dropout policy.
    pub fn init(&mut self, dim: usize, policy: Option<f64>) -> Result<()> {
        if dim == 0 {
            return Err(Error::InvalidDimension {
                what: "pooling",
                got: dim,
            });
        }
        self.dropout = dropout::validate_policy(policy)?;
        self.dim = dim;
        self.val = Tensor::zeros([dim])?;
        Ok(())
    }

    /// Pool every input elementwise and store the result.
    pub fn forward(&mut self, graph: &mut Graph, inputs: &[NodeRef<'_>]) -> Result<()> {
        let first = inputs.first().ok_or(Error::EmptyInput)?;
        let mut acc = first.value.clone();
        for input in inputs {
            if input.value.elem_count() != self.dim {
                return Err(Error::LengthMismatch {
                    expected: self.dim,
                    got: input.value.elem_count(),
                });
            }
        }
        for input in &inputs[1..] {
            acc = acc.maximum(input.value)?;
        }
        if let Some(p) = self.dropout {
            if graph.is_training() {
                acc = dropout::inverted_dropout(&acc, p, &mut rand::thread_rng())?;
            }
        }
        self.val = acc;
        let deps: Vec<NodeId> = inputs.iter().map(|i| i.id).collect();
        graph.record(self.id, &deps);
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

#[cfg(test)]
mod tests {
    use super::*;

    fn make_refs<'a>(ids: &'a [NodeId], vals: &'a [Tensor]) -> Vec<NodeRef<'a>> {
        ids.iter()
            .zip(vals.iter())
            .map(|(id, value)| NodeRef { id: *id, value })
            .collect()
    }

    #[test]
    fn pools_elementwise_maximum() -> Result<()> {
        let mut node = MaxPoolNode::default();
        node.init(3, None)?;
        let ids: Vec<NodeId> = (0..3).map(|_| NodeId::new()).collect();
        let vals = vec![
            Tensor::from_vec(vec![1.0, -5.0, 0.0], [3])?,
            Tensor::from_vec(vec![-2.0, 7.0, 0.5], [3])?,
            Tensor::from_vec(vec![0.0, 0.0, -1.0], [3])?,
        ];
        let mut g = Graph::new();
        node.forward(&mut g, &make_refs(&ids, &vals))?;
        assert_eq!(node.output().value.data(), &[1.0, 7.0, 0.5]);
        assert_eq!(g.steps()[0].inputs.len(), 3);
        Ok(())
    }

    #[test]
    fn rejects_empty_input() -> Result<()> {
        let mut node = MaxPoolNode::default();
        node.init(3, None)?;
        let mut g = Graph::new();
        assert!(matches!(node.forward(&mut g, &[]), Err(Error::EmptyInput)));
        Ok(())
    }

    #[test]
    fn rejects_mixed_lengths() -> Result<()> {
        let mut node = MaxPoolNode::default();
        node.init(2, None)?;
        let ids: Vec<NodeId> = (0..2).map(|_| NodeId::new()).collect();
        let vals = vec![Tensor::zeros([2])?, Tensor::zeros([3])?];
        let mut g = Graph::new();
        assert!(node.forward(&mut g, &make_refs(&ids, &vals)).is_err());
        Ok(())
    }
}
