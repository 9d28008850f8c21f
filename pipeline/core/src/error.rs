//! Pipeline Error Types
//!
//! Domain errors raised by the prompt and image stages. The controller is the
//! only consumer that branches on them: every variant maps to exactly one
//! [`FailureCategory`], which becomes the title of the user-visible alert.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the prompt-synthesis stage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    /// No API credential is configured; no request was sent
    #[error("API credential is not configured")]
    MissingCredential,

    /// Backend answered with a non-success HTTP status
    #[error("prompt backend rejected the request ({status}): {body}")]
    BackendRejected {
        /// HTTP status code
        status: u16,
        /// Response body (or its `detail` field when JSON)
        body: String,
    },

    /// Request never produced a usable response (connect, timeout, decode)
    #[error("prompt request failed: {0}")]
    TransportFailure(String),

    /// Call succeeded but the response carried no usable prompt
    #[error("prompt backend returned no prompt")]
    IncompleteResult,
}

/// Errors from the image-synthesis stage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// Transport or remote failure while generating images
    #[error("image synthesis failed: {cause}")]
    SynthesisFailure {
        /// Human-readable cause
        cause: String,
    },
}

impl ImageError {
    /// Build a synthesis failure from anything printable
    pub fn synthesis(cause: impl std::fmt::Display) -> Self {
        Self::SynthesisFailure {
            cause: cause.to_string(),
        }
    }
}

/// Coarse category used to label failure alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCategory {
    /// Credential missing
    CredentialMissing,
    /// Backend rejected the request
    BackendRejected,
    /// Network / transport problem
    Transport,
    /// Prompt missing after nominal success
    IncompleteResult,
    /// Image generation failed
    Synthesis,
}

impl FailureCategory {
    /// Alert title for this category
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::CredentialMissing => "Missing API credential",
            Self::BackendRejected => "Prompt backend rejected the request",
            Self::Transport => "Network error",
            Self::IncompleteResult => "Incomplete prompt result",
            Self::Synthesis => "Poster generation failed",
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl PromptError {
    /// Category for the failure alert
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::MissingCredential => FailureCategory::CredentialMissing,
            Self::BackendRejected { .. } => FailureCategory::BackendRejected,
            Self::TransportFailure(_) => FailureCategory::Transport,
            Self::IncompleteResult => FailureCategory::IncompleteResult,
        }
    }
}

impl ImageError {
    /// Category for the failure alert
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        FailureCategory::Synthesis
    }
}

impl From<reqwest::Error> for PromptError {
    fn from(err: reqwest::Error) -> Self {
        Self::TransportFailure(err.to_string())
    }
}

impl From<reqwest::Error> for ImageError {
    fn from(err: reqwest::Error) -> Self {
        Self::synthesis(err)
    }
}
