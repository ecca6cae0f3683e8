//! Error types for the Atelier domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Atelier operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Virtual file system errors ---
    #[error("VFS error: {0}")]
    Vfs(#[from] VfsError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider rejected the request schema: {0}")]
    InvalidRequest(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether this error is transient and worth retrying.
    ///
    /// Rate limits, 5xx responses, timeouts, and network failures are
    /// retryable; authentication, schema, and model errors are fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_)
            | ProviderError::Network(_)
            | ProviderError::StreamInterrupted(_) => true,
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            ProviderError::AuthenticationFailed(_)
            | ProviderError::ModelNotFound(_)
            | ProviderError::InvalidRequest(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Invalid tool definitions: {0}")]
    InvalidDefinitions(String),
}

#[derive(Debug, Error)]
pub enum VfsError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn transient_classification() {
        assert!(ProviderError::RateLimited { retry_after_secs: 5 }.is_transient());
        assert!(ProviderError::Network("reset".into()).is_transient());
        assert!(
            ProviderError::ApiError {
                status_code: 503,
                message: "unavailable".into()
            }
            .is_transient()
        );
        assert!(!ProviderError::AuthenticationFailed("bad key".into()).is_transient());
        assert!(
            !ProviderError::ApiError {
                status_code: 400,
                message: "bad request".into()
            }
            .is_transient()
        );
        assert!(!ProviderError::InvalidRequest("bad tool schema".into()).is_transient());
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::ExecutionFailed {
            tool_name: "shell".into(),
            reason: "unknown command".into(),
        });
        assert!(err.to_string().contains("shell"));
        assert!(err.to_string().contains("unknown command"));
    }

    #[test]
    fn vfs_error_displays_path() {
        let err = VfsError::NotFound("src/app.js".into());
        assert!(err.to_string().contains("src/app.js"));
    }
}
