use thiserror::Error;

/// Canonical result for the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Every kind is fatal to the operator instance it occurs in; the external
/// scheduler decides whether to fail the workflow or retry the partition.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// An operation was called outside its valid operator state.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// A field value does not match its attribute's declared type.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Schema error: {0}")]
    Schema(String),

    // Propagated unmodified from the underlying byte stream; there is no
    // retry at this layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
