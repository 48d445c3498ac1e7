//! Errors raised while loading connector credentials.

/// Effectively `Result<T, error_stack::Report<E>>`.
pub type CustomResult<T, E> = error_stack::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable `{0}` is not set")]
    EnvVarNotSet(&'static str),
    #[error("Failed to read connector authentication file")]
    FileNotReadable,
    #[error("Failed to deserialize connector authentication file")]
    DeserializationFailed,
    #[error("Failed to serialize connector credentials")]
    SerializationFailed,
    #[error("No credentials configured for connector `{0}`")]
    ConnectorNotConfigured(String),
}
