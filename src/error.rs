//! Error types for the recipe-extract library.
//!
//! An extraction either yields a complete [`crate::output::ExtractedRecipe`]
//! or fails as a whole; there is no partial-success mode. Every failure is
//! therefore a single [`ExtractError`] returned from the top-level
//! `extract_*` functions.
//!
//! Variants fall into four families, reported by [`ExtractError::kind`]:
//!
//! * **Fetch** — the source page could not be obtained (bad URL, transport
//!   error, non-2xx status). Raised before any prompt is built.
//! * **Generation** — the model call itself failed (network, quota, auth).
//! * **MalformedOutput** — the model answered, but not with a usable JSON
//!   recipe object.
//! * **Configuration** — no model provider could be resolved at startup.
//!
//! Nothing is retried internally. Callers decide whether to re-run the
//! whole pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the recipe-extract library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Source errors ─────────────────────────────────────────────────────
    /// The input string is not an absolute HTTP/HTTPS URL.
    #[error("Invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    /// Transport-level failure while fetching the page.
    #[error("Failed to fetch '{url}': {reason}\nCheck your internet connection.")]
    FetchFailed { url: String, reason: String },

    /// Fetch exceeded the configured timeout.
    #[error("Fetching '{url}' timed out after {secs}s\nIncrease --fetch-timeout.")]
    FetchTimeout { url: String, secs: u64 },

    /// The server answered with a non-success status.
    #[error("Fetching '{url}' returned HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    /// Uploaded bytes could not be decoded as a raster image.
    #[error("Image could not be decoded: {detail}")]
    InvalidImage { detail: String },

    /// Image file could not be read from disk.
    #[error("Failed to read image '{path}': {source}")]
    ImageReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM call failed (network, quota, service fault).
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The model response is not a usable recipe object.
    ///
    /// The raw response text is logged, not carried here.
    #[error("Model returned malformed output: {reason}")]
    MalformedOutput { reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`ExtractError`], used as the payload of
/// [`crate::progress::Stage::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Source unreachable, bad URL, or non-success status.
    Fetch,
    /// Uploaded image unreadable.
    Input,
    /// Model invocation failed.
    Generation,
    /// Model output unusable.
    MalformedOutput,
    /// Provider or builder misconfigured.
    Configuration,
    /// Anything else.
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Fetch => "fetch",
            FailureKind::Input => "input",
            FailureKind::Generation => "generation",
            FailureKind::MalformedOutput => "malformed-output",
            FailureKind::Configuration => "configuration",
            FailureKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl ExtractError {
    /// Which failure family this error belongs to.
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractError::InvalidUrl { .. }
            | ExtractError::FetchFailed { .. }
            | ExtractError::FetchTimeout { .. }
            | ExtractError::FetchStatus { .. } => FailureKind::Fetch,
            ExtractError::InvalidImage { .. } | ExtractError::ImageReadFailed { .. } => {
                FailureKind::Input
            }
            ExtractError::LlmApiError { .. } => FailureKind::Generation,
            ExtractError::MalformedOutput { .. } => FailureKind::MalformedOutput,
            ExtractError::ProviderNotConfigured { .. } | ExtractError::InvalidConfig(_) => {
                FailureKind::Configuration
            }
            ExtractError::Internal(_) => FailureKind::Internal,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ExtractError::MalformedOutput {
            reason: reason.into(),
        }
    }
}
