//! Error types for paywatch.

/// Top-level error type for the watcher.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Configuration-related errors. Fatal at startup only.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence errors from the dedup store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    /// A concurrent writer already inserted this fingerprint. Recovered
    /// by the pipeline as a duplicate, never surfaced to the driver.
    #[error("Fingerprint already recorded: {fingerprint}")]
    Conflict { fingerprint: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Message-source errors. The source contract degrades these to an empty
/// listing / absent body; they exist so the implementation can log what
/// actually went wrong.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Unexpected response payload: {0}")]
    Payload(String),

    #[error("Failed to decode message body: {0}")]
    Decode(String),
}

/// Notification-sink errors.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// Result type alias for the watcher.
pub type Result<T> = std::result::Result<T, Error>;
