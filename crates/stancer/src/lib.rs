//! # stancer
//!
//! Dynamic-graph stance classifier: encodes a target phrase plus its
//! surrounding context into a fixed-size representation and emits label
//! scores.
//!
//! The center of the crate is [`GraphBuilder`]: it owns a pool of node
//! instances sized to a sentence-length ceiling and wires, per example,
//! the pipeline
//!
//! ```text
//! lookup -> bidirectional LSTM -> pairwise concat -> max pool -> projection
//! ```
//!
//! over a flattened sequence in which target tokens always come first.
//! Node primitives live in [`stancer_nn`]; the engine handle, tensor type,
//! and error type live in [`stancer_core`].
//!
//! # Example
//! ```ignore
//! let opts = HyperParams::from_json_reader(File::open("hyper.json")?)?;
//! let params = Arc::new(ModelParams::new(vocab, &opts, &mut rng)?);
//! let mut builder = GraphBuilder::new();
//! builder.create_nodes(opts.max_sentence_length)?;
//! builder.initialize(&params, &opts)?;
//!
//! let mut graph = Graph::new();
//! let scores = builder.forward(&mut graph, &feature, false)?;
//! ```

pub mod builder;
pub mod feature;
pub mod hyper;
pub mod params;

pub use builder::{GraphBuilder, MAX_SENTENCE_LENGTH};
pub use feature::Feature;
pub use hyper::HyperParams;
pub use params::ModelParams;

pub use stancer_core::{Error, Graph, NodeId, NodeRef, Result, Step, Tensor};
