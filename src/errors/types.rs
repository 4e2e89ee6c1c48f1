//! Error type definitions for the token icon resolver

use std::time::Duration;
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resolution errors surfaced outside the resolver
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),
}

/// Failures encountered while resolving a single symbol
///
/// None of these are fatal to the caller. `CandidateLoadFailed` and `Timeout`
/// advance to the next candidate, `AllCandidatesExhausted` triggers the
/// sanitize fallback, and `FetchFailed` ends the resolution as unresolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A single candidate failed to load or render
    #[error("Candidate failed to load: {url} - {reason}")]
    CandidateLoadFailed { url: String, reason: String },

    /// The remote body arrived but cannot be rendered as an icon
    #[error("Unrenderable content at {url}: {reason}")]
    UnrenderableContent { url: String, reason: String },

    /// Operation did not complete within its bounded wait
    #[error("Timed out after {after:?}: {url}")]
    Timeout { url: String, after: Duration },

    /// Every candidate for a symbol failed
    #[error("All {attempts} candidates exhausted for {symbol}")]
    AllCandidatesExhausted { symbol: String, attempts: usize },

    /// Raw content fetch failed (network, non-2xx, undecodable body)
    #[error("Fetch failed: {url} - {message}")]
    FetchFailed { url: String, message: String },
}

impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl ResolveError {
    /// Create a candidate load failure
    pub fn load_failed<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        Self::CandidateLoadFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a fetch failure
    pub fn fetch_failed<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::FetchFailed {
            url: url.into(),
            message: message.into(),
        }
    }
}
