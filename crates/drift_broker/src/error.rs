//! Error types for the broker core.

use thiserror::Error;

/// Main error type for broker operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Publish against a topic that has been closed for deletion.
    #[error("topic \"{0}\" is closed")]
    TopicClosed(String),

    /// Lookup or delete of a topic that does not exist.
    #[error("no topic named \"{0}\"")]
    TopicNotFound(String),

    /// A topic name was empty at an API boundary.
    #[error("topic name must not be empty")]
    EmptyTopicName,

    /// A write to a subscriber's output stream failed. The stream loop
    /// treats this as the remote side having disconnected.
    #[error("subscriber stream write failed: {0}")]
    StreamWrite(String),
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
