// Model parameters
//
// The externally owned parameter bundle. The builder never owns parameter
// storage: every block is Arc-shared and read-only on the forward path, so
// one bundle can serve many builders (one per worker thread) at once.
//
// Four recurrence parameter sets exist, one per (direction, token range)
// pair. Both ranges of one direction take part in the SAME sweep; the
// recurrence switches between them at the target/context split index.

use std::sync::Arc;

use rand::Rng;
use stancer_core::error::{Error, Result};
use stancer_nn::{EmbeddingTable, LinearParams, LstmParams};

use crate::hyper::HyperParams;

/// Every parameter block of one stance model.
pub struct ModelParams {
    /// Shared embedding table, `[vocab, word_dim]`.
    pub words: Arc<EmbeddingTable>,
    /// Left-to-right recurrence over target-range positions.
    pub target_left: Arc<LstmParams>,
    /// Left-to-right recurrence over context-range positions.
    pub context_left: Arc<LstmParams>,
    /// Right-to-left recurrence over target-range positions.
    pub target_right: Arc<LstmParams>,
    /// Right-to-left recurrence over context-range positions.
    pub context_right: Arc<LstmParams>,
    /// Output projection, `[label_size, 2*hidden_size]`.
    pub output: Arc<LinearParams>,
}

impl ModelParams {
    /// Randomly initialize a full bundle for the given vocabulary and
    /// dimensions. Reproducible from the Rng seed.
    pub fn new<R: Rng>(vocab: usize, opts: &HyperParams, rng: &mut R) -> Result<Self> {
        opts.validate()?;
        Ok(ModelParams {
            words: Arc::new(EmbeddingTable::new(vocab, opts.word_dim, rng)?),
            target_left: Arc::new(LstmParams::new(opts.word_dim, opts.hidden_size, rng)?),
            context_left: Arc::new(LstmParams::new(opts.word_dim, opts.hidden_size, rng)?),
            target_right: Arc::new(LstmParams::new(opts.word_dim, opts.hidden_size, rng)?),
            context_right: Arc::new(LstmParams::new(opts.word_dim, opts.hidden_size, rng)?),
            output: Arc::new(LinearParams::new(
                2 * opts.hidden_size,
                opts.label_size,
                rng,
            )?),
        })
    }

    /// Check every block against the hyperparameters it will be bound
    /// under. Catches bundles assembled from mismatched pieces before any
    /// node touches them.
    pub fn validate(&self, opts: &HyperParams) -> Result<()> {
        if self.words.dim() != opts.word_dim {
            return Err(Error::LengthMismatch {
                expected: opts.word_dim,
                got: self.words.dim(),
            });
        }
        for lstm in [
            &self.target_left,
            &self.context_left,
            &self.target_right,
            &self.context_right,
        ] {
            if lstm.input_size() != opts.word_dim {
                return Err(Error::LengthMismatch {
                    expected: opts.word_dim,
                    got: lstm.input_size(),
                });
            }
            if lstm.hidden_size() != opts.hidden_size {
                return Err(Error::LengthMismatch {
                    expected: opts.hidden_size,
                    got: lstm.hidden_size(),
                });
            }
        }
        if self.output.in_features() != 2 * opts.hidden_size {
            return Err(Error::LengthMismatch {
                expected: 2 * opts.hidden_size,
                got: self.output.in_features(),
            });
        }
        if self.output.out_features() != opts.label_size {
            return Err(Error::LengthMismatch {
                expected: opts.label_size,
                got: self.output.out_features(),
            });
        }
        Ok(())
    }
}
