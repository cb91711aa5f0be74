//! Error types for megacloud

use thiserror::Error;

/// Main error type for extraction operations
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Player script did not contain the expected declaration pattern")]
    PatternNotMatched,

    #[error("Derivation out of range: {0}")]
    DerivationOutOfRange(String),

    #[error("Decryption failure: {0}")]
    DecryptionFailure(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),
}

impl ExtractError {
    /// Check if a later attempt could succeed.
    ///
    /// Pattern and derivation failures usually mean the player script rotated
    /// mid-flight, so a retry against a refreshed script is reasonable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExtractError::Http(_)
                | ExtractError::UpstreamUnavailable(_)
                | ExtractError::PatternNotMatched
                | ExtractError::DerivationOutOfRange(_)
        )
    }

    /// HTTP status the surrounding service should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            ExtractError::NotFound(_) => 404,
            ExtractError::InvalidUrl(_) | ExtractError::UrlError(_) => 400,
            ExtractError::UpstreamUnavailable(_) | ExtractError::Http(_) => 502,
            ExtractError::PatternNotMatched
            | ExtractError::DerivationOutOfRange(_)
            | ExtractError::DecryptionFailure(_)
            | ExtractError::RegexError(_) => 500,
        }
    }
}
