/// Crate-wide result alias.
pub type FxPipeResult<T> = Result<T, FxPipeError>;

/// Error taxonomy for the bridge pipeline.
///
/// `Launch` covers the child process failing to start at all, `Effect` a
/// child that started and exited non-zero, and `Decode` an output file that
/// is missing or unreadable after the child is done. Everything
/// file-system-shaped on our side of the boundary is `Io`.
#[derive(thiserror::Error, Debug)]
pub enum FxPipeError {
    /// Invalid options or buffer geometry, caught before any side effect.
    #[error("validation error: {0}")]
    Validation(String),

    /// Temp-file or cache-file create/read/write/delete failure.
    #[error("i/o error: {0}")]
    Io(String),

    /// The external binary could not be spawned.
    #[error("process launch error: {0}")]
    Launch(String),

    /// The external process ran but reported failure via its exit status.
    #[error("effect process failed: {0}")]
    Effect(String),

    /// The declared output file is absent or not decodable.
    #[error("decode error: {0}")]
    Decode(String),

    /// Any other underlying error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FxPipeError {
    /// Build a [`FxPipeError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FxPipeError::Io`].
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Build a [`FxPipeError::Launch`].
    pub fn launch(msg: impl Into<String>) -> Self {
        Self::Launch(msg.into())
    }

    /// Build a [`FxPipeError::Effect`].
    pub fn effect(msg: impl Into<String>) -> Self {
        Self::Effect(msg.into())
    }

    /// Build a [`FxPipeError::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}
