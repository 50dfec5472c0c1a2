//! # stancer-core
//!
//! Dense tensor primitives and the dynamic computation-graph engine for
//! stancer.
//!
//! This crate provides:
//! - [`Tensor`]: dense f32 vectors and matrices with cheap (Arc) cloning
//! - [`Graph`]: the per-pass engine handle (training flag + dependency log)
//! - [`NodeId`] / [`NodeRef`]: stable node identities and stage handoffs
//! - [`Error`] / [`Result`]: the single error type used across the workspace

pub mod error;
pub mod graph;
pub mod tensor;

pub use error::{Error, Result};
pub use graph::{Graph, NodeId, NodeRef, Step};
pub use tensor::Tensor;
