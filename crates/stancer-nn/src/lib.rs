//! # stancer-nn
//!
//! Graph node primitives for stancer.
//!
//! Every primitive follows the same pooled-node pattern:
//!
//! 1. **Stable identity**: a [`stancer_core::NodeId`] assigned at
//!    construction and kept across forward calls.
//! 2. **Parameter binding**: externally owned parameter blocks are shared
//!    read-only via `Arc` (`bind`, then `init(dimension, policy)` where the
//!    policy is an optional dropout probability).
//! 3. **Forward**: compute the output vector into the node's own slot and
//!    record the dependency edge on the passed [`stancer_core::Graph`].
//!
//! Provided primitives: [`LookupNode`] over a shared [`EmbeddingTable`],
//! the direction-flagged [`LstmBuilder`] with split-parameter sweeps,
//! [`ConcatNode`], [`MaxPoolNode`], and [`LinearNode`].

pub mod concat;
pub mod dropout;
pub mod init;
pub mod linear;
pub mod lookup;
pub mod lstm;
pub mod pool;

pub use concat::ConcatNode;
pub use linear::{LinearNode, LinearParams};
pub use lookup::{EmbeddingTable, LookupNode};
pub use lstm::{LstmBuilder, LstmParams};
pub use pool::MaxPoolNode;
