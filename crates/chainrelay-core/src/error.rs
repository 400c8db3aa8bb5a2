//! Error types shared across the relay layers.

use thiserror::Error;

/// Errors from the notification feed adapter.
///
/// Everything except `Malformed` is fatal for the relay: there is no
/// reconnect logic, the error propagates to a process-level failure.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed connect failed: {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("feed subscribe failed for topic '{topic}': {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("feed receive failed: {reason}")]
    Recv { reason: String },

    /// A delivery that does not match the expected multipart shape.
    /// Dropped by the adapter, never reaches the relay loop.
    #[error("malformed feed delivery: {reason}")]
    Malformed { reason: String },
}

impl FeedError {
    /// Returns `true` if this error terminates the relay.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Malformed { .. })
    }
}

/// Errors from the indexing-service RPC client.
#[derive(Debug, Error)]
pub enum RpcError {
    /// HTTP request failed (connection refused, timeout, non-2xx, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC error object returned by the indexing service.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Response could not be deserialized.
    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The configured endpoint URL is not usable.
    #[error("invalid RPC endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

impl RpcError {
    /// Returns `true` if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

/// A notifier callback failure. Logged by the registry and isolated per
/// callback; never affects sibling notifiers or the relay loop.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
