// Embedding lookup
//
// An EmbeddingTable maps token identifiers to dense vectors; a LookupNode
// is one pooled graph position that reads a row out of a shared table on
// each forward call.
//
// The table is externally owned and shared read-only: every LookupNode in
// every pool holds an Arc to the same block, and nothing on the forward
// path mutates it.

use std::sync::Arc;

use rand::Rng;
use stancer_core::error::{Error, Result};
use stancer_core::graph::{Graph, NodeId, NodeRef};
use stancer_core::tensor::Tensor;

use crate::dropout;
use crate::init;

/// A `[vocab, dim]` table of token vectors.
pub struct EmbeddingTable {
    weights: Tensor,
}

impl EmbeddingTable {
    /// Create a table with Xavier-uniform random rows.
    pub fn new<R: Rng>(vocab: usize, dim: usize, rng: &mut R) -> Result<Self> {
        if vocab == 0 {
            return Err(Error::InvalidDimension {
                what: "vocabulary",
                got: vocab,
            });
        }
        if dim == 0 {
            return Err(Error::InvalidDimension {
                what: "embedding",
                got: dim,
            });
        }
        Ok(EmbeddingTable {
            weights: init::xavier_uniform([vocab, dim], rng)?,
        })
    }

    /// Wrap an existing `[vocab, dim]` weight matrix.
    pub fn from_tensor(weights: Tensor) -> Result<Self> {
        if weights.rank() != 2 {
            return Err(Error::RankMismatch {
                expected: 2,
                got: weights.rank(),
            });
        }
        Ok(EmbeddingTable { weights })
    }

    pub fn vocab_size(&self) -> usize {
        self.weights.dims()[0]
    }

    pub fn dim(&self) -> usize {
        self.weights.dims()[1]
    }

    /// The vector for one token.
    pub fn lookup(&self, token: u32) -> Result<Tensor> {
        let index = token as usize;
        if index >= self.vocab_size() {
            return Err(Error::TokenOutOfRange {
                token,
                vocab: self.vocab_size(),
            });
        }
        self.weights.row(index)
    }

    pub fn weights(&self) -> &Tensor {
        &self.weights
    }
}

/// One pooled embedding-lookup position.
///
/// Lifecycle: default-construct into a pool slot, `bind` the shared table,
/// `init` the dimension and dropout policy, then `forward` once per pass.
/// The node identity is assigned at construction and survives resizes of
/// sibling slots.
#[derive(Default)]
pub struct LookupNode {
    id: NodeId,
    table: Option<Arc<EmbeddingTable>>,
    dim: usize,
    dropout: Option<f64>,
    val: Tensor,
}

impl LookupNode {
    /// Bind the shared embedding table. Must precede `init`.
    pub fn bind(&mut self, table: &Arc<EmbeddingTable>) {
        self.table = Some(Arc::clone(table));
    }

    /// Configure the output dimension and dropout policy.
    pub fn init(&mut self, dim: usize, policy: Option<f64>) -> Result<()> {
        if dim == 0 {
            return Err(Error::InvalidDimension {
                what: "embedding",
                got: dim,
            });
        }
        let table = self.table.as_ref().ok_or(Error::InvalidState {
            expected: "table bound",
            got: "unbound lookup node",
        })?;
        if table.dim() != dim {
            return Err(Error::LengthMismatch {
                expected: table.dim(),
                got: dim,
            });
        }
        self.dropout = dropout::validate_policy(policy)?;
        self.dim = dim;
        self.val = Tensor::zeros([dim])?;
        Ok(())
    }

    /// Look up `token` and store its vector as this node's output.
    pub fn forward(&mut self, graph: &mut Graph, token: u32) -> Result<()> {
        let table = self.table.as_ref().ok_or(Error::InvalidState {
            expected: "table bound",
            got: "unbound lookup node",
        })?;
        let mut v = table.lookup(token)?;
        if let Some(p) = self.dropout {
            if graph.is_training() {
                v = dropout::inverted_dropout(&v, p, &mut rand::thread_rng())?;
            }
        }
        self.val = v;
        graph.record(self.id, &[]);
        Ok(())
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// This node's identity plus its current output value.
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
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table() -> Arc<EmbeddingTable> {
        let weights =
            Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [3, 2]).unwrap();
        Arc::new(EmbeddingTable::from_tensor(weights).unwrap())
    }

    #[test]
    fn forward_reads_the_token_row() -> Result<()> {
        let mut node = LookupNode::default();
        node.bind(&table());
        node.init(2, None)?;
        let mut g = Graph::new();
        node.forward(&mut g, 1)?;
        assert_eq!(node.output().value.data(), &[3.0, 4.0]);
        assert_eq!(g.len(), 1);
        Ok(())
    }

    #[test]
    fn out_of_range_token_fails() -> Result<()> {
        let mut node = LookupNode::default();
        node.bind(&table());
        node.init(2, None)?;
        let mut g = Graph::new();
        assert!(matches!(
            node.forward(&mut g, 3),
            Err(Error::TokenOutOfRange { token: 3, vocab: 3 })
        ));
        Ok(())
    }

    #[test]
    fn init_requires_bound_table() {
        let mut node = LookupNode::default();
        assert!(node.init(2, None).is_err());
    }

    #[test]
    fn init_rejects_mismatched_dim() {
        let mut node = LookupNode::default();
        node.bind(&table());
        assert!(node.init(5, None).is_err());
    }

    #[test]
    fn table_init_is_seeded() -> Result<()> {
        let a = EmbeddingTable::new(4, 3, &mut StdRng::seed_from_u64(1))?;
        let b = EmbeddingTable::new(4, 3, &mut StdRng::seed_from_u64(1))?;
        assert_eq!(a.weights().data(), b.weights().data());
        Ok(())
    }
}
