/*!
 * Error types for the subcue library.
 *
 * Each component surfaces its own error enum, built with the thiserror crate.
 * `ErrorKind` is the coarse taxonomy the error handler files records under.
 * Errors are `Clone` so they can be broadcast through watch channels.
 */

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cue::SubtitleFormat;

/// A subtitle grammar failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human readable reason
    pub message: String,
    /// Format the parser was reading
    pub format: SubtitleFormat,
    /// 1-based source line, when it could be determined
    pub line_number: Option<usize>,
}

impl ParseError {
    pub fn new(format: SubtitleFormat, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            format,
            line_number: None,
        }
    }

    pub fn at_line(format: SubtitleFormat, line_number: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            format,
            line_number: Some(line_number),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} parse error", self.format)?;
        if let Some(line) = self.line_number {
            write!(f, " at line {}", line)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Errors raised while fetching and decoding remote subtitle content
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Transport level failure (DNS, connection reset, TLS)
    #[error("Request failed: {0}")]
    Request(String),

    /// The call exceeded its per-attempt timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-success status
    #[error("HTTP {status} while fetching {url}")]
    Http {
        status: u16,
        url: String,
    },

    /// The declared charset is not one we can decode
    #[error("Unsupported character encoding: {0}")]
    UnsupportedEncoding(String),
}

/// Everything that can go wrong while loading one subtitle URL
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Rejected before any I/O
    #[error("Unsupported subtitle format: {0}")]
    UnsupportedFormat(String),

    /// The background worker died or was aborted
    #[error("Subtitle load was cancelled")]
    Cancelled,
}

/// Errors that can occur when talking to subtitle providers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The caller's request is missing required fields; raised before any I/O
    #[error("Invalid search request for {provider}: {message}")]
    Validation {
        provider: String,
        message: String,
    },

    /// Connection level failure
    #[error("Network error from {provider}: {message}")]
    Network {
        provider: String,
        message: String,
    },

    /// The attempt exceeded its timeout
    #[error("Request to {provider} timed out")]
    Timeout {
        provider: String,
    },

    /// HTTP 429 or local budget exhausted
    #[error("Rate limit exceeded for {provider}")]
    RateLimited {
        provider: String,
        /// Seconds from a `Retry-After` header, when present
        retry_after_secs: Option<u64>,
    },

    /// Error status returned by the provider
    #[error("{provider} responded with error: {status_code} - {message}")]
    Http {
        provider: String,
        status_code: u16,
        message: String,
    },

    /// Body could not be decoded
    #[error("Failed to parse response from {provider}: {message}")]
    InvalidResponse {
        provider: String,
        message: String,
    },

    /// Terminal failure after the retry loop gave up
    #[error("{provider} failed after {attempts} attempts: {message}")]
    Exhausted {
        provider: String,
        attempts: u32,
        message: String,
    },

    #[error("Provider {0} is disabled")]
    Disabled(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

impl ProviderError {
    /// Id of the provider the error belongs to
    pub fn provider(&self) -> &str {
        match self {
            Self::Validation { provider, .. }
            | Self::Network { provider, .. }
            | Self::Timeout { provider }
            | Self::RateLimited { provider, .. }
            | Self::Http { provider, .. }
            | Self::InvalidResponse { provider, .. }
            | Self::Exhausted { provider, .. } => provider,
            Self::Disabled(provider) | Self::UnknownProvider(provider) => provider,
        }
    }

    /// Network failures, timeouts and 5xx responses may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Http { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Errors returned by the subtitle manager facade
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManagerError {
    #[error("Subtitle manager has been disposed")]
    Disposed,

    #[error("No subtitle registered for {0}")]
    NotFound(String),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Coarse failure taxonomy used for error records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or unsupported subtitle grammar
    Parse,
    /// Caller supplied an incomplete request
    Validation,
    /// Transport failure or timeout
    Network,
    /// 429 or local budget exhausted
    RateLimit,
    /// 4xx/5xx from a remote server
    Http,
    /// Terminal provider failure after retries
    Provider,
    Unknown,
}

impl ErrorKind {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::RateLimit | ErrorKind::Http)
    }

    /// Whether the failure needs user attention rather than a retry
    pub fn is_critical(&self) -> bool {
        matches!(self, ErrorKind::Parse | ErrorKind::Validation | ErrorKind::Provider)
    }
}

impl From<&ProviderError> for ErrorKind {
    fn from(error: &ProviderError) -> Self {
        match error {
            ProviderError::Validation { .. } => ErrorKind::Validation,
            ProviderError::Network { .. } | ProviderError::Timeout { .. } => ErrorKind::Network,
            ProviderError::RateLimited { .. } => ErrorKind::RateLimit,
            ProviderError::Http { .. } | ProviderError::InvalidResponse { .. } => ErrorKind::Http,
            ProviderError::Exhausted { .. } | ProviderError::Disabled(_) | ProviderError::UnknownProvider(_) => {
                ErrorKind::Provider
            }
        }
    }
}

impl From<&LoadError> for ErrorKind {
    fn from(error: &LoadError) -> Self {
        match error {
            LoadError::Parse(_) | LoadError::UnsupportedFormat(_) => ErrorKind::Parse,
            LoadError::Fetch(FetchError::Http { status: 429, .. }) => ErrorKind::RateLimit,
            LoadError::Fetch(FetchError::Http { .. }) => ErrorKind::Http,
            LoadError::Fetch(FetchError::Request(_)) | LoadError::Fetch(FetchError::Timeout(_)) => ErrorKind::Network,
            LoadError::Fetch(FetchError::UnsupportedEncoding(_)) => ErrorKind::Parse,
            LoadError::Cancelled => ErrorKind::Unknown,
        }
    }
}

/// Main application error type used by the binary
#[derive(Error, Debug)]
pub enum AppError {
    #[error("File error: {0}")]
    File(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
