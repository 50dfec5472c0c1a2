// LSTM over a pooled sequence of positions
//
// LstmParams holds one direction-and-range parameter set: the stacked gate
// weights of a standard LSTM cell.
//
//   gates = W_ih @ x_t + W_hh @ h_prev + b        [4*hidden]
//   i, f, g, o = chunk(gates, 4)
//   i = sigmoid(i)   input gate
//   f = sigmoid(f)   forget gate
//   g = tanh(g)      candidate values
//   o = sigmoid(o)   output gate
//   c' = f * c + i * g
//   h' = o * tanh(c')
//
// LstmBuilder unrolls that cell over a pre-allocated pool of per-position
// node identities. Two contracts distinguish it from a plain unrolled LSTM:
//
//   1. SPLIT PARAMETERS. One sweep consumes TWO parameter sets and a split
//      index: positions below the split use the primary set, the rest the
//      secondary set. The switch happens inside a single recurrence, the
//      hidden state carries across it.
//
//   2. FORWARD-ORDER OUTPUTS. The sweep direction is a construction-time
//      flag, but hidden states are stored indexed by logical position, so
//      `hidden(i)` always refers to input position i no matter which way
//      the sweep ran.

use std::sync::Arc;

use stancer_core::error::{Error, Result};
use stancer_core::graph::{Graph, NodeId, NodeRef};
use stancer_core::tensor::Tensor;

use crate::dropout;
use crate::init;

/// Stacked gate parameters for one LSTM direction/range.
///
/// # Shapes
/// - `w_ih`: `[4*hidden, input]`
/// - `w_hh`: `[4*hidden, hidden]`
/// - `bias`: `[4*hidden]`
pub struct LstmParams {
    w_ih: Tensor,
    w_hh: Tensor,
    bias: Tensor,
    input_size: usize,
    hidden_size: usize,
}

impl LstmParams {
    /// Create a parameter set with Xavier-uniform weights and zero bias.
    pub fn new<R: rand::Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Result<Self> {
        if input_size == 0 {
            return Err(Error::InvalidDimension {
                what: "lstm input",
                got: input_size,
            });
        }
        if hidden_size == 0 {
            return Err(Error::InvalidDimension {
                what: "lstm hidden",
                got: hidden_size,
            });
        }
        let gate = 4 * hidden_size;
        Ok(LstmParams {
            w_ih: init::xavier_uniform([gate, input_size], rng)?,
            w_hh: init::xavier_uniform([gate, hidden_size], rng)?,
            bias: Tensor::zeros([gate])?,
            input_size,
            hidden_size,
        })
    }

    /// Wrap existing gate tensors. Shapes are checked against each other.
    pub fn from_tensors(w_ih: Tensor, w_hh: Tensor, bias: Tensor) -> Result<Self> {
        if w_ih.rank() != 2 || w_hh.rank() != 2 {
            return Err(Error::RankMismatch {
                expected: 2,
                got: if w_ih.rank() != 2 { w_ih.rank() } else { w_hh.rank() },
            });
        }
        let gate = w_ih.dims()[0];
        if gate == 0 || gate % 4 != 0 {
            return Err(Error::InvalidDimension {
                what: "lstm gate",
                got: gate,
            });
        }
        let hidden_size = gate / 4;
        if w_hh.dims() != [gate, hidden_size] {
            return Err(Error::LengthMismatch {
                expected: gate * hidden_size,
                got: w_hh.elem_count(),
            });
        }
        if bias.dims() != [gate] {
            return Err(Error::LengthMismatch {
                expected: gate,
                got: bias.elem_count(),
            });
        }
        let input_size = w_ih.dims()[1];
        Ok(LstmParams {
            w_ih,
            w_hh,
            bias,
            input_size,
            hidden_size,
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// One cell step: `(h', c')` from `(x, h, c)`.
    fn step(&self, x: &Tensor, h: &Tensor, c: &Tensor) -> Result<(Tensor, Tensor)> {
        let gates = self
            .w_ih
            .matvec(x)?
            .add(&self.w_hh.matvec(h)?)?
            .add(&self.bias)?;
        let chunks = gates.chunk(4)?;
        let i_gate = chunks[0].sigmoid();
        let f_gate = chunks[1].sigmoid();
        let g_gate = chunks[2].tanh();
        let o_gate = chunks[3].sigmoid();

        let c_new = f_gate.mul(c)?.add(&i_gate.mul(&g_gate)?)?;
        let h_new = o_gate.mul(&c_new.tanh())?;
        Ok((h_new, c_new))
    }
}

/// Direction-flagged recurrence over a pool of per-position cells.
///
/// Lifecycle mirrors the other pooled nodes: `resize` the pool, `init` the
/// binding (parameter set for sizing, dropout policy, sweep direction),
/// then `forward` once per pass. The direction is fixed at `init` and not
/// reconfigurable afterwards.
#[derive(Default)]
pub struct LstmBuilder {
    ids: Vec<NodeId>,
    hiddens: Vec<Tensor>,
    cells: Vec<Tensor>,
    bound: Option<Arc<LstmParams>>,
    left_to_right: bool,
    hidden_size: usize,
    dropout: Option<f64>,
    /// Positions populated by the last forward call.
    len: usize,
}

impl LstmBuilder {
    /// Resize the per-position cell pool.
    ///
    /// Existing positions keep their node identities; excess positions are
    /// dropped; new positions get fresh identities.
    pub fn resize(&mut self, capacity: usize) {
        self.ids.resize_with(capacity, NodeId::new);
        self.hiddens.resize_with(capacity, Tensor::default);
        self.cells.resize_with(capacity, Tensor::default);
        self.len = self.len.min(capacity);
    }

    /// Release every pooled cell.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.hiddens.clear();
        self.cells.clear();
        self.bound = None;
        self.len = 0;
    }

    /// Bind a parameter set (for dimension checking), a dropout policy,
    /// and the sweep direction.
    pub fn init(
        &mut self,
        params: &Arc<LstmParams>,
        policy: Option<f64>,
        left_to_right: bool,
    ) -> Result<()> {
        self.dropout = dropout::validate_policy(policy)?;
        self.hidden_size = params.hidden_size();
        self.bound = Some(Arc::clone(params));
        self.left_to_right = left_to_right;
        Ok(())
    }

    /// Number of pooled positions.
    pub fn capacity(&self) -> usize {
        self.ids.len()
    }

    /// Positions populated by the last forward call.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Run one sweep over `inputs`, switching parameter sets at `split`.
    ///
    /// Positions `< split` use `primary`, the rest `secondary`. The sweep
    /// runs in this builder's direction, but `hiddens` is indexed by
    /// logical position throughout, so outputs come back in forward order.
    pub fn forward(
        &mut self,
        graph: &mut Graph,
        inputs: &[NodeRef<'_>],
        primary: &Arc<LstmParams>,
        secondary: &Arc<LstmParams>,
        split: usize,
    ) -> Result<()> {
        let n = inputs.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if n > self.capacity() {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity(),
                requested: n,
            });
        }
        let bound = self.bound.as_ref().ok_or(Error::InvalidState {
            expected: "initialized recurrence",
            got: "unbound recurrence",
        })?;
        for params in [primary, secondary] {
            if params.hidden_size() != self.hidden_size {
                return Err(Error::LengthMismatch {
                    expected: self.hidden_size,
                    got: params.hidden_size(),
                });
            }
            if params.input_size() != bound.input_size() {
                return Err(Error::LengthMismatch {
                    expected: bound.input_size(),
                    got: params.input_size(),
                });
            }
        }
        for input in inputs {
            if input.value.elem_count() != bound.input_size() {
                return Err(Error::LengthMismatch {
                    expected: bound.input_size(),
                    got: input.value.elem_count(),
                });
            }
        }

        let mut h = Tensor::zeros([self.hidden_size])?;
        let mut c = Tensor::zeros([self.hidden_size])?;
        let mut prev: Option<usize> = None;

        let order: Vec<usize> = if self.left_to_right {
            (0..n).collect()
        } else {
            (0..n).rev().collect()
        };
        for p in order {
            let params = if p < split { primary } else { secondary };
            let (mut h_new, c_new) = params.step(inputs[p].value, &h, &c)?;
            if let Some(pr) = self.dropout {
                if graph.is_training() {
                    h_new = dropout::inverted_dropout(&h_new, pr, &mut rand::thread_rng())?;
                }
            }
            h = h_new;
            c = c_new;
            self.hiddens[p] = h.clone();
            self.cells[p] = c.clone();

            let mut deps = vec![inputs[p].id];
            if let Some(q) = prev {
                deps.push(self.ids[q]);
            }
            graph.record(self.ids[p], &deps);
            prev = Some(p);
        }
        self.len = n;
        Ok(())
    }

    /// The hidden state at logical position `i` of the last forward call.
    pub fn hidden(&self, i: usize) -> Result<NodeRef<'_>> {
        if i >= self.len {
            return Err(Error::IndexOutOfRange {
                index: i,
                len: self.len,
            });
        }
        Ok(NodeRef {
            id: self.ids[i],
            value: &self.hiddens[i],
        })
    }
}
