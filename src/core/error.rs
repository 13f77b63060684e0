//! Error taxonomy for the pricing client

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmberError {
    /// Sign-in answered with anything other than a success message.
    #[error("sign-in rejected: {reason}")]
    AuthRejected { reason: String },

    /// The price endpoint no longer accepts the current tokens.
    #[error("token is not valid")]
    TokenInvalid,

    #[error("malformed price response: {reason}")]
    MalformedResponse { reason: String },

    #[error("request to Amber Electric failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl AmberError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::AuthRejected {
            reason: reason.into(),
        }
    }

    /// Errors that the fetcher absorbs into state instead of raising.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthRejected { .. } | Self::TokenInvalid)
    }
}

pub type Result<T, E = AmberError> = std::result::Result<T, E>;
