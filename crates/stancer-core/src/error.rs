/// All errors that can occur within stancer.
///
/// This enum captures every failure mode: configuration mistakes (bad
/// capacities or dimensions), lifecycle violations (forward before the node
/// pool exists), and shape or index violations inside the numeric kernels.
/// Using a single error type across the workspace simplifies propagation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Node pool capacity must be positive.
    #[error("invalid node pool capacity: {got}")]
    InvalidCapacity { got: usize },

    /// A configured dimension (embedding width, hidden size, label count)
    /// must be positive.
    #[error("invalid {what} dimension: {got}")]
    InvalidDimension { what: &'static str, got: usize },

    /// Dropout policy outside [0, 1).
    #[error("dropout probability must be in [0, 1), got {got}")]
    InvalidDropout { got: f64 },

    /// An operation was called in the wrong lifecycle state.
    #[error("invalid state: expected {expected}, got {got}")]
    InvalidState {
        expected: &'static str,
        got: &'static str,
    },

    /// Vector length mismatch between two operands.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// Operation requires a specific rank (number of dimensions).
    #[error("rank mismatch: expected rank {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// Matrix-vector product dimension mismatch.
    #[error("matvec shape mismatch: [{m}x{n}] @ [{len}]")]
    MatvecShapeMismatch { m: usize, n: usize, len: usize },

    /// Element count mismatch when creating a tensor from a vec.
    #[error("element count mismatch: shape {dims:?} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        dims: Vec<usize>,
        expected: usize,
        got: usize,
    },

    /// Token identifier outside the embedding vocabulary.
    #[error("token {token} out of range for vocabulary of {vocab}")]
    TokenOutOfRange { token: u32, vocab: usize },

    /// Position index outside the populated range of a pool or sequence.
    #[error("index {index} out of range for {len} positions")]
    IndexOutOfRange { index: usize, len: usize },

    /// Sequence length exceeds the pre-allocated node pool.
    #[error("sequence length {requested} exceeds node pool capacity {capacity}")]
    CapacityExceeded { capacity: usize, requested: usize },

    /// An operation that needs at least one input received none.
    #[error("empty input sequence")]
    EmptyInput,

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }
}

/// Convenience Result type used throughout stancer.
pub type Result<T> = std::result::Result<T, Error>;

/// Macro for early return with a formatted error message.
/// Usage: `bail!("something went wrong: {}", detail)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}
