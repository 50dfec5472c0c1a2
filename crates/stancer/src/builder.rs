// GraphBuilder: per-example wiring of the stance-classification pipeline
//
// One builder owns a pool of node instances sized up to the sentence-length
// ceiling and knows the end-to-end wiring for one example:
//
//   lookup -> bidirectional recurrence -> pairwise concat -> max pool -> projection
//
// Three contracts shape the implementation:
//
//   1. POOLED NODES. All per-position nodes are allocated by create_nodes
//      and only written into during forward. No forward call allocates node
//      instances, and no stage reads a slot beyond the positions this call
//      populated.
//
//   2. TARGET-FIRST ORDER. Logical positions 0..target_count hold the
//      target tokens, the context tokens follow, regardless of where the
//      target sat in the original sentence. When the combined length
//      exceeds the pool, context tokens are dropped from the tail and the
//      input is never rejected.
//
//   3. SPLIT-PARAMETER RECURRENCE. Each direction runs one sweep over the
//      full flattened sequence with both its parameter sets, switching at
//      the target/context boundary. Hidden states come back in forward
//      logical order, so concatenation is position-aligned by index.

use std::sync::Arc;

use tracing::{debug, warn};

use stancer_core::error::{Error, Result};
use stancer_core::graph::{Graph, NodeRef};
use stancer_core::tensor::Tensor;
use stancer_nn::{ConcatNode, LinearNode, LookupNode, LstmBuilder, MaxPoolNode};

use crate::feature::Feature;
use crate::hyper::HyperParams;
use crate::params::ModelParams;

/// Hard ceiling on pooled positions per builder.
pub const MAX_SENTENCE_LENGTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuilderState {
    Unconfigured,
    PoolAllocated,
    Ready,
}

impl BuilderState {
    fn name(self) -> &'static str {
        match self {
            BuilderState::Unconfigured => "unconfigured builder",
            BuilderState::PoolAllocated => "builder without bound parameters",
            BuilderState::Ready => "ready builder",
        }
    }
}

impl Default for BuilderState {
    fn default() -> Self {
        BuilderState::Unconfigured
    }
}

/// Builds the classification graph for one example per forward call.
///
/// Lifecycle: `create_nodes` sizes the pool, `initialize` binds parameters
/// into every node, `forward` runs once per example, `clear` releases the
/// pool. `forward` before the pool exists or before parameters are bound
/// fails with an invalid-state error.
#[derive(Default)]
pub struct GraphBuilder {
    word_inputs: Vec<LookupNode>,
    lstm_left: LstmBuilder,
    lstm_right: LstmBuilder,
    lstm_concat: Vec<ConcatNode>,
    max_pooling: MaxPoolNode,
    neural_output: LinearNode,
    params: Option<Arc<ModelParams>>,
    opts: Option<HyperParams>,
    state: BuilderState,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size every per-position node sequence to `capacity`, clamped to
    /// [`MAX_SENTENCE_LENGTH`].
    ///
    /// Existing slots (and their node identities) survive a resize; excess
    /// slots are dropped, new slots are default-constructed. Safe to call
    /// between examples: when parameters are already bound, fresh slots
    /// are bound immediately so the builder stays ready.
    pub fn create_nodes(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity { got: capacity });
        }
        let capacity = capacity.min(MAX_SENTENCE_LENGTH);
        self.word_inputs.resize_with(capacity, LookupNode::default);
        self.lstm_left.resize(capacity);
        self.lstm_right.resize(capacity);
        self.lstm_concat.resize_with(capacity, ConcatNode::default);
        debug!(capacity, "node pool resized");

        if self.state == BuilderState::Ready {
            let params = self.params.clone().ok_or(Error::InvalidState {
                expected: "bound parameters",
                got: self.state.name(),
            })?;
            let opts = self.opts.clone().ok_or(Error::InvalidState {
                expected: "bound hyperparameters",
                got: self.state.name(),
            })?;
            self.bind_nodes(&params, &opts)?;
        } else {
            self.state = BuilderState::PoolAllocated;
        }
        Ok(())
    }

    /// Bind the parameter bundle into every pooled and fixed node.
    ///
    /// Callable once the pool exists; calling it again re-binds everything
    /// (last call wins).
    pub fn initialize(&mut self, params: &Arc<ModelParams>, opts: &HyperParams) -> Result<()> {
        if self.state == BuilderState::Unconfigured {
            return Err(Error::InvalidState {
                expected: "allocated node pool",
                got: self.state.name(),
            });
        }
        opts.validate()?;
        params.validate(opts)?;
        self.bind_nodes(params, opts)?;
        self.params = Some(Arc::clone(params));
        self.opts = Some(opts.clone());
        self.state = BuilderState::Ready;
        debug!(
            word_dim = opts.word_dim,
            hidden_size = opts.hidden_size,
            label_size = opts.label_size,
            "parameters bound"
        );
        Ok(())
    }

    fn bind_nodes(&mut self, params: &Arc<ModelParams>, opts: &HyperParams) -> Result<()> {
        let policy = if opts.dropout > 0.0 {
            Some(opts.dropout)
        } else {
            None
        };
        for idx in 0..self.word_inputs.len() {
            self.word_inputs[idx].bind(&params.words);
            self.word_inputs[idx].init(opts.word_dim, policy)?;
            self.lstm_concat[idx].init(opts.hidden_size * 2, None)?;
        }
        self.lstm_left.init(&params.target_left, None, true)?;
        self.lstm_right.init(&params.target_right, None, false)?;
        self.max_pooling.init(opts.hidden_size * 2, None)?;
        self.neural_output.bind(&params.output);
        self.neural_output.init(opts.label_size, None)?;
        Ok(())
    }

    /// Release every node instance. The builder must go through
    /// `create_nodes` and `initialize` again before the next forward call.
    pub fn clear(&mut self) {
        self.word_inputs.clear();
        self.lstm_left.clear();
        self.lstm_right.clear();
        self.lstm_concat.clear();
        self.params = None;
        self.opts = None;
        self.state = BuilderState::Unconfigured;
    }

    /// Pooled positions currently allocated.
    pub fn capacity(&self) -> usize {
        self.word_inputs.len()
    }

    /// Build the graph for one example and return the label-score vector.
    ///
    /// Stages run in strict order; each consumes the previous stage's
    /// outputs by logical position. The engine's training flag is set for
    /// the whole call. Over-long inputs lose context tokens from the tail
    /// and are never rejected.
    pub fn forward(&mut self, graph: &mut Graph, feature: &Feature, train: bool) -> Result<Tensor> {
        if self.state != BuilderState::Ready {
            return Err(Error::InvalidState {
                expected: "ready builder",
                got: self.state.name(),
            });
        }
        let params = self.params.clone().ok_or(Error::InvalidState {
            expected: "bound parameters",
            got: self.state.name(),
        })?;
        graph.set_training(train);

        let target_num = feature.target_tokens.len();
        let context_num = feature.context_tokens.len();
        let capacity = self.capacity();
        let mut all_num = target_num + context_num;
        if all_num == 0 {
            return Err(Error::EmptyInput);
        }
        if all_num > capacity {
            warn!(
                target_len = target_num,
                context_len = context_num,
                capacity,
                dropped = all_num - capacity,
                "sentence exceeds node pool, truncating context tail"
            );
            all_num = capacity;
        }

        // Target tokens first, context tokens after, each range in its
        // original order.
        let target_used = target_num.min(all_num);
        for i in 0..target_used {
            self.word_inputs[i].forward(graph, feature.target_tokens[i])?;
        }
        for i in 0..(all_num - target_used) {
            self.word_inputs[i + target_used].forward(graph, feature.context_tokens[i])?;
        }

        let embeddings: Vec<NodeRef<'_>> = self.word_inputs[..all_num]
            .iter()
            .map(|n| n.output())
            .collect();
        self.lstm_left.forward(
            graph,
            &embeddings,
            &params.target_left,
            &params.context_left,
            target_used,
        )?;
        self.lstm_right.forward(
            graph,
            &embeddings,
            &params.target_right,
            &params.context_right,
            target_used,
        )?;

        for i in 0..all_num {
            let left = self.lstm_left.hidden(i)?;
            let right = self.lstm_right.hidden(i)?;
            self.lstm_concat[i].forward(graph, left, right)?;
        }

        let concats: Vec<NodeRef<'_>> = self.lstm_concat[..all_num]
            .iter()
            .map(|n| n.output())
            .collect();
        self.max_pooling.forward(graph, &concats)?;
        self.neural_output.forward(graph, self.max_pooling.output())?;
        Ok(self.neural_output.output().value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn opts(word_dim: usize, hidden: usize, labels: usize) -> HyperParams {
        HyperParams {
            word_dim,
            hidden_size: hidden,
            label_size: labels,
            dropout: 0.0,
            max_sentence_length: MAX_SENTENCE_LENGTH,
        }
    }

    fn ready_builder(
        vocab: usize,
        capacity: usize,
        opts: &HyperParams,
        seed: u64,
    ) -> Result<(GraphBuilder, Arc<ModelParams>)> {
        let params = Arc::new(ModelParams::new(
            vocab,
            opts,
            &mut StdRng::seed_from_u64(seed),
        )?);
        let mut builder = GraphBuilder::new();
        builder.create_nodes(capacity)?;
        builder.initialize(&params, opts)?;
        Ok((builder, params))
    }

    #[test]
    fn target_tokens_occupy_leading_positions() -> Result<()> {
        let opts = opts(4, 3, 2);
        let (mut builder, params) = ready_builder(12, 8, &opts, 1)?;
        let feature = Feature::new(vec![9, 2], vec![5, 7, 11]);
        let mut g = Graph::new();
        builder.forward(&mut g, &feature, false)?;

        // Logical order is target tokens then context tokens.
        for (i, token) in [9u32, 2, 5, 7, 11].iter().enumerate() {
            let expected = params.words.lookup(*token)?;
            assert_eq!(
                builder.word_inputs[i].output().value.data(),
                expected.data(),
                "position {i}"
            );
        }
        Ok(())
    }

    #[test]
    fn concat_is_position_aligned() -> Result<()> {
        let opts = opts(4, 3, 2);
        let (mut builder, _) = ready_builder(12, 8, &opts, 2)?;
        let feature = Feature::new(vec![1], vec![2, 3]);
        let mut g = Graph::new();
        builder.forward(&mut g, &feature, false)?;

        for i in 0..3 {
            let left = builder.lstm_left.hidden(i)?;
            let right = builder.lstm_right.hidden(i)?;
            let expected = Tensor::concat(&[left.value, right.value])?;
            assert_eq!(
                builder.lstm_concat[i].output().value.data(),
                expected.data(),
                "position {i}"
            );
        }
        Ok(())
    }

    #[test]
    fn pooled_vector_is_elementwise_max() -> Result<()> {
        let opts = opts(4, 3, 2);
        let (mut builder, _) = ready_builder(12, 8, &opts, 3)?;
        let feature = Feature::new(vec![1, 4], vec![2, 3, 6]);
        let mut g = Graph::new();
        builder.forward(&mut g, &feature, false)?;

        let pooled = builder.max_pooling.output().value;
        for k in 0..pooled.elem_count() {
            let max_k = (0..5)
                .map(|i| builder.lstm_concat[i].output().value.data()[k])
                .fold(f32::NEG_INFINITY, f32::max);
            assert_eq!(pooled.data()[k], max_k, "component {k}");
        }
        Ok(())
    }

    #[test]
    fn truncation_drops_context_tail_only() -> Result<()> {
        let opts = opts(4, 3, 2);
        let (mut builder, params) = ready_builder(12, 4, &opts, 4)?;
        // Pool of 4: both targets and the first two context tokens fit,
        // the last two context tokens fall off the tail.
        let feature = Feature::new(vec![1, 2], vec![3, 4, 5, 6]);
        let mut g = Graph::new();
        builder.forward(&mut g, &feature, false)?;

        for (i, token) in [1u32, 2, 3, 4].iter().enumerate() {
            let expected = params.words.lookup(*token)?;
            assert_eq!(
                builder.word_inputs[i].output().value.data(),
                expected.data(),
                "position {i}"
            );
        }
        assert_eq!(builder.lstm_left.len(), 4);
        Ok(())
    }

    #[test]
    fn empty_feature_is_rejected() -> Result<()> {
        let opts = opts(4, 3, 2);
        let (mut builder, _) = ready_builder(12, 8, &opts, 5)?;
        let mut g = Graph::new();
        assert!(matches!(
            builder.forward(&mut g, &Feature::default(), false),
            Err(Error::EmptyInput)
        ));
        Ok(())
    }

    #[test]
    fn forward_sets_engine_training_flag() -> Result<()> {
        let opts = opts(4, 3, 2);
        let (mut builder, _) = ready_builder(12, 8, &opts, 6)?;
        let feature = Feature::new(vec![1], vec![2]);
        let mut g = Graph::new();
        builder.forward(&mut g, &feature, true)?;
        assert!(g.is_training());
        builder.forward(&mut g, &feature, false)?;
        assert!(!g.is_training());
        Ok(())
    }

    #[test]
    fn grow_after_initialize_keeps_builder_ready() -> Result<()> {
        let opts = opts(4, 3, 2);
        let (mut builder, _) = ready_builder(12, 2, &opts, 7)?;
        builder.create_nodes(6)?;
        let feature = Feature::new(vec![1, 2], vec![3, 4, 5]);
        let mut g = Graph::new();
        // Five positions only fit because the fresh slots were re-bound.
        let scores = builder.forward(&mut g, &feature, false)?;
        assert_eq!(scores.elem_count(), 2);
        Ok(())
    }
}
