//! aivi-vt — voice transcription pipeline for the AIVI interviewer bot
//!
//! Turns an inbound chat voice attachment into a quality-classified
//! transcript: download → audio normalization (mono/16 kHz WAV) →
//! rate-limited transcription with retry → quality classification →
//! user-facing rendering, with guaranteed temp-file cleanup and running
//! statistics.
//!
//! The chat transport, dialogue/LLM layer, and localization tables live
//! in the surrounding application; this crate reaches them only through
//! the [`transport::VoiceTransport`] seam and the plain
//! [`models::TranscriptionOutcome`] hand-off.

pub mod audio;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod stats;
pub mod transport;
pub mod utils;

pub use crate::config::VoiceConfig;
pub use crate::error::{ErrorCategory, ErrorClass, VoiceError};
pub use crate::models::{AudioAsset, QualityTier, TranscriptionOutcome, WordSearchResults};
pub use crate::services::VoicePipeline;
pub use crate::stats::StatsSnapshot;
pub use crate::transport::{VoiceAttachment, VoiceTransport};
