//! Errors of the affinity domain.
//!
//! Each collaborator has its own `thiserror` enum; [`Error`] wraps them all
//! for code that crosses boundaries. `respond` never surfaces any of these to
//! the caller: they end in a log line and a degraded turn.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("generation provider: {0}")]
    Provider(#[from] ProviderError),

    #[error("memory tier: {0}")]
    Memory(#[from] MemoryError),

    #[error("relationship state: {0}")]
    State(#[from] StateError),

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("malformed JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a text-generation backend.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("provider answered {status_code}: {message}")]
    ApiError { status_code: u16, message: String },

    #[error("rate limited, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("credentials rejected: {0}")]
    AuthenticationFailed(String),

    #[error("no provider configured: {0}")]
    NotConfigured(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("transport failure: {0}")]
    Network(String),

    #[error("completion was empty")]
    EmptyResponse,
}

/// Failures of the episodic or fact tiers.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("write failed: {0}")]
    Storage(String),

    #[error("lookup failed: {0}")]
    QueryFailed(String),

    #[error("schema setup failed: {0}")]
    MigrationFailed(String),
}

/// Failures of the fast state store or the durable mirror.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("storage failure: {0}")]
    Storage(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_is_in_message() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "slow down".into(),
        });
        assert_eq!(err.to_string(), "generation provider: provider answered 429: slow down");
    }

    #[test]
    fn context_errors_convert() {
        let err: Error = StateError::Unavailable("cache offline".into()).into();
        assert!(matches!(err, Error::State(_)));
        assert!(err.to_string().contains("cache offline"));

        let err: Error = MemoryError::QueryFailed("fts".into()).into();
        assert!(matches!(err, Error::Memory(MemoryError::QueryFailed(_))));
    }

    #[test]
    fn bad_json_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = parse.into();
        assert!(err.to_string().starts_with("malformed JSON"));
    }
}
