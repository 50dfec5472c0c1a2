use crate::tensor::Tensor;

// Graph: the per-pass engine handle
//
// Every node forward call receives a mutable Graph. The graph owns two
// pieces of per-pass state:
//
//   1. The training flag. Nodes read it to decide on training-only behavior
//      (dropout). It is an explicit field on the handle, never ambient
//      global state, so test-isolated or per-worker graphs cannot interfere
//      with each other.
//
//   2. The dependency log. Each forward call appends one step recording
//      which node produced a value and which node outputs it consumed.
//      A backward scheduler replays this log in reverse; recording is the
//      engine's whole obligation here, traversal belongs to the consumer.
//
// One Graph is exclusively owned by one forward/backward pass at a time.
// Callers that want parallelism use one builder plus one Graph per worker.

/// Unique identifier for a node instance.
///
/// Identities are handed out once (at pool allocation or node init) and
/// stay stable across forward calls, which is what makes the dependency
/// log meaningful between passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID (uses a global atomic counter).
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        NodeId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed view of one node's identity and current output value.
///
/// Stages hand sequences of these to the next stage, the moral equivalent
/// of a `vector<Node*>` in pointer-graph engines.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub id: NodeId,
    pub value: &'a Tensor,
}

/// One recorded forward step: `output` was computed from `inputs`.
#[derive(Debug, Clone)]
pub struct Step {
    pub output: NodeId,
    pub inputs: Vec<NodeId>,
}

/// The mutable engine handle threaded through every node forward call.
#[derive(Debug, Default)]
pub struct Graph {
    train: bool,
    steps: Vec<Step>,
}

impl Graph {
    /// Create a fresh graph handle in evaluation mode.
    pub fn new() -> Self {
        Graph {
            train: false,
            steps: Vec::new(),
        }
    }

    /// Set the training flag for the current pass.
    pub fn set_training(&mut self, train: bool) {
        self.train = train;
    }

    /// Whether the current pass runs in training mode.
    pub fn is_training(&self) -> bool {
        self.train
    }

    /// Record one forward step and its dependency edges.
    pub fn record(&mut self, output: NodeId, inputs: &[NodeId]) {
        self.steps.push(Step {
            output,
            inputs: inputs.to_vec(),
        });
    }

    /// The recorded steps of the current pass, in execution order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Discard the recorded steps, keeping the handle for the next pass.
    pub fn reset(&mut self) {
        self.steps.clear();
    }
}
