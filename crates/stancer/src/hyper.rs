// Hyperparameters
//
// The dimensional configuration of one model: embedding width, recurrent
// hidden width, label count, plus the word-dropout probability and the
// per-model sentence-length bound. Loadable from JSON so driver code can
// keep model shape out of source.

use serde::{Deserialize, Serialize};
use stancer_core::error::{Error, Result};

use crate::builder::MAX_SENTENCE_LENGTH;

fn default_max_sentence_length() -> usize {
    MAX_SENTENCE_LENGTH
}

/// Dimensional configuration bound into every node at initialize time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperParams {
    /// Embedding vector width.
    pub word_dim: usize,
    /// Hidden-state width of each recurrence direction.
    pub hidden_size: usize,
    /// Number of output labels.
    pub label_size: usize,
    /// Word-level dropout probability, 0 disables.
    #[serde(default)]
    pub dropout: f64,
    /// Sentence-length bound for the node pool. Clamped to the hard
    /// ceiling of [`MAX_SENTENCE_LENGTH`] positions.
    #[serde(default = "default_max_sentence_length")]
    pub max_sentence_length: usize,
}

impl HyperParams {
    /// Reject dimension and policy values no model can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.word_dim == 0 {
            return Err(Error::InvalidDimension {
                what: "embedding",
                got: self.word_dim,
            });
        }
        if self.hidden_size == 0 {
            return Err(Error::InvalidDimension {
                what: "hidden",
                got: self.hidden_size,
            });
        }
        if self.label_size == 0 {
            return Err(Error::InvalidDimension {
                what: "label",
                got: self.label_size,
            });
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(Error::InvalidDropout { got: self.dropout });
        }
        if self.max_sentence_length == 0 {
            return Err(Error::InvalidCapacity {
                got: self.max_sentence_length,
            });
        }
        Ok(())
    }

    /// Parse from a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let opts: HyperParams = serde_json::from_str(s)
            .map_err(|e| Error::msg(format!("failed to parse hyperparameters: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Parse from any JSON reader (a config file, usually).
    pub fn from_json_reader(r: impl std::io::Read) -> Result<Self> {
        let opts: HyperParams = serde_json::from_reader(r)
            .map_err(|e| Error::msg(format!("failed to parse hyperparameters: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }
}
