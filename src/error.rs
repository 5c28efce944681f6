use {
    std::path::PathBuf,
    thiserror::Error,
};

/// Errors the agent surfaces to its caller.
///
/// Anything else (tensor shape bugs, I/O while writing results) is propagated
/// as a plain [`anyhow::Error`].
#[derive(Debug, Error)]
pub enum AgentError {
    /// A checkpoint file is missing, corrupt, or does not match the shapes of
    /// the network it is loaded into.
    #[error("failed to load parameters from {path:?}: {reason}")]
    Deserialization {
        path: PathBuf,
        reason: String,
    },

    /// A priority handle does not point into the buffer.
    #[error("index {index} is out of range for a buffer holding {len} transitions")]
    IndexOutOfRange {
        index: usize,
        len: usize,
    },

    /// The buffer was asked for more transitions than it holds.
    #[error("cannot sample {batch_size} transitions from a buffer holding {len}")]
    InsufficientSamples {
        batch_size: usize,
        len: usize,
    },
}
