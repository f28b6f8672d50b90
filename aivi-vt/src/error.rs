//! Error types for the voice transcription pipeline
//!
//! Every failure mode of the pipeline maps to one variant here so retry
//! decisions and user-facing message selection work off the type, not off
//! string inspection of arbitrary errors. Service-reported error messages
//! still go through a text heuristic (`VoiceError::from_service_message`)
//! because the transcription service's wording is not a stable contract.

use std::path::Path;
use thiserror::Error;

/// Result type for voice pipeline operations
pub type Result<T> = std::result::Result<T, VoiceError>;

/// Voice pipeline errors
#[derive(Debug, Error)]
pub enum VoiceError {
    /// Transport read failed or produced no bytes
    #[error("download failed: {0}")]
    Download(String),

    /// Codec could not decode the input (corrupted or unrecognized container)
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Staged audio file is missing on disk
    #[error("audio file not found: {0}")]
    FileMissing(String),

    /// Audio file exceeds the configured size limit
    #[error("file too large: {0}")]
    FileTooLarge(String),

    /// Audio duration below the configured minimum
    #[error("audio too short: {0}")]
    TooShort(String),

    /// Audio duration above the configured maximum
    #[error("audio too long: {0}")]
    TooLong(String),

    /// Credential rejected by the transcription service
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Service-side size rejection
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Service rejected the request shape
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Poll ceiling exceeded while waiting for completion
    #[error("transcription timed out: {0}")]
    Timeout(String),

    /// Connectivity failure talking to the service
    #[error("network error: {0}")]
    Network(String),

    /// Error reported by the transcription service
    #[error("transcription service error: {0}")]
    Service(String),

    /// I/O error during staging or cleanup
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal pipeline error (worker panic, invariant breach)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Retry decision for a failed transcription attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient: worth another attempt (network, timeout, server-side)
    Retryable,
    /// Permanent: retrying cannot succeed, surface immediately
    Terminal,
}

/// User-facing guidance category, consumed by the response formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    Timeout,
    FileSize,
    Format,
    Network,
    TooShort,
    TooLong,
    Generic,
}

/// Error message fragments that mark a service error as non-retryable.
///
/// Best-effort: the service does not guarantee stable wording, so this
/// list errs toward retrying unknown messages.
const NON_RETRYABLE_INDICATORS: &[&str] = &[
    "api key",
    "unauthorized",
    "authentication",
    "file size",
    "too large",
    "unsupported format",
    "invalid audio",
    "bad request",
    "forbidden",
];

impl VoiceError {
    /// Classify for the retry state machine.
    pub fn class(&self) -> ErrorClass {
        match self {
            VoiceError::Timeout(_) | VoiceError::Network(_) | VoiceError::Io(_) => {
                ErrorClass::Retryable
            }
            // Service wording is inspected as a fallback; unknown messages retry.
            VoiceError::Service(msg) => {
                let lower = msg.to_lowercase();
                if NON_RETRYABLE_INDICATORS.iter().any(|i| lower.contains(i)) {
                    ErrorClass::Terminal
                } else {
                    ErrorClass::Retryable
                }
            }
            _ => ErrorClass::Terminal,
        }
    }

    /// Map to the guidance category used for user-facing messages.
    pub fn category(&self) -> ErrorCategory {
        match self {
            VoiceError::Authentication(_) => ErrorCategory::Authentication,
            VoiceError::Timeout(_) => ErrorCategory::Timeout,
            VoiceError::FileTooLarge(_) | VoiceError::PayloadTooLarge(_) => {
                ErrorCategory::FileSize
            }
            VoiceError::UnsupportedFormat(_) => ErrorCategory::Format,
            VoiceError::TooShort(_) => ErrorCategory::TooShort,
            VoiceError::TooLong(_) => ErrorCategory::TooLong,
            VoiceError::Download(_) | VoiceError::Network(_) | VoiceError::Io(_) => {
                ErrorCategory::Network
            }
            VoiceError::FileMissing(_)
            | VoiceError::MalformedRequest(_)
            | VoiceError::Service(_)
            | VoiceError::Internal(_) => ErrorCategory::Generic,
        }
    }

    /// Promote a service-reported error message to the closest typed variant.
    ///
    /// Used when the service answers with an error status and free-form
    /// message. Unrecognized wording stays `Service` (retryable).
    pub fn from_service_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("api key")
            || lower.contains("unauthorized")
            || lower.contains("authentication")
            || lower.contains("forbidden")
        {
            VoiceError::Authentication(message)
        } else if lower.contains("file size") || lower.contains("too large") {
            VoiceError::PayloadTooLarge(message)
        } else if lower.contains("unsupported format") || lower.contains("invalid audio") {
            VoiceError::UnsupportedFormat(message)
        } else if lower.contains("bad request") {
            VoiceError::MalformedRequest(message)
        } else if lower.contains("network") || lower.contains("connection") {
            VoiceError::Network(message)
        } else {
            VoiceError::Service(message)
        }
    }

    pub(crate) fn file_missing(path: &Path) -> Self {
        VoiceError::FileMissing(path.display().to_string())
    }
}
