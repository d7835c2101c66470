use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] BridgeError),

    #[error("Backend rejected the request: {code}")]
    Backend { code: String, message: String },

    #[error("Unexpected backend response: {0}")]
    InvalidResponse(String),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("No Google OAuth client id configured for {platform}")]
    MissingClientId { platform: String },

    #[error("Auth prompt failed: {0}")]
    PromptFailed(String),

    #[error("Operation timed out: {operation}")]
    OperationTimeout { operation: String },

    #[error("Session expired")]
    SessionExpired,

    #[error("Not authenticated")]
    NotAuthenticated,
}

pub type Result<T> = std::result::Result<T, AuthError>;
