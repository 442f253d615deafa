use thiserror::Error;

/// Failure taxonomy shared by the trending feed, the report aggregator and
/// the advisory session. Each flow decides separately whether a variant is
/// surfaced, recovered or swallowed.
#[derive(Debug, Error)]
pub enum RugError {
    /// Remote service unreachable, timed out or answered with a non-2xx status.
    #[error("network error: {0}")]
    Network(String),

    /// Remote service answered but the body is missing expected fields.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// User input rejected before any remote call is made.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Another operation of the same kind is still outstanding.
    #[error("busy: {0}")]
    Busy(String),

    /// A newer report request replaced this one before it completed.
    #[error("request for '{0}' was superseded by a newer request")]
    Superseded(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RugError {
    /// Short machine-readable tag used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            RugError::Network(_) => "network",
            RugError::MalformedResponse(_) => "malformed_response",
            RugError::Validation(_) => "validation",
            RugError::NotFound(_) => "not_found",
            RugError::Busy(_) => "busy",
            RugError::Superseded(_) => "superseded",
            RugError::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for RugError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RugError::MalformedResponse(err.to_string())
        } else {
            RugError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for RugError {
    fn from(err: url::ParseError) -> Self {
        RugError::Config(format!("invalid URL: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, RugError>;
