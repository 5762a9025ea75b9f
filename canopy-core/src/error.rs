//! Error Types
//!
//! Errors raised by the container itself. Failures of consumer reducers are
//! not represented here: `try_apply` and `try_dispatch` hand the consumer's
//! own error type straight back to the caller.

use thiserror::Error;

/// Errors produced by store provisioning and the devtools bridge.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A store kind name that the provisioning layer does not know.
    #[error("unknown store kind `{0}` (expected standard, debug or devtools)")]
    UnknownStoreKind(String),

    /// A devtools store was requested without a connection to report to.
    #[error("devtools store requires a devtools connection")]
    MissingConnection,

    /// An inbound devtools message was not JSON of the expected shape.
    #[error("malformed devtools message: {0}")]
    MalformedMessage(#[source] serde_json::Error),

    /// A jump command arrived without the state to jump to.
    #[error("devtools jump command carried no state")]
    MissingJumpState,

    /// The state carried by a jump command does not fit the store's type.
    #[error("devtools state does not match the store's shape: {0}")]
    InvalidState(#[source] serde_json::Error),

    /// The current state could not be serialized for the devtools bridge.
    #[error("failed to serialize state for devtools: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Result alias for container operations.
pub type Result<T> = std::result::Result<T, StoreError>;
