//! Transcription outcome types
//!
//! One `TranscriptionOutcome` is created per processed voice message and
//! passed by value through quality classification and response formatting,
//! never mutated after creation. Optional enrichment fields are populated
//! only when the corresponding feature was requested and the service
//! actually returned the data.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{ErrorCategory, VoiceError};

/// Discrete trustworthiness classification of a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    High,
    Medium,
    Low,
    Failed,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::High => "high",
            QualityTier::Medium => "medium",
            QualityTier::Low => "low",
            QualityTier::Failed => "failed",
        }
    }
}

/// Categorized error carried on a failed outcome
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeError {
    pub category: ErrorCategory,
    pub message: String,
}

/// Auto-generated chapter of a longer recording
#[derive(Debug, Clone, Serialize)]
pub struct Chapter {
    pub headline: String,
    pub summary: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Content-safety label with confidence
#[derive(Debug, Clone, Serialize)]
pub struct ContentSafetyLabel {
    pub label: String,
    pub confidence: f64,
    pub severity: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicLabel {
    pub relevance: f64,
    pub label: String,
}

/// Detected topic with its classified labels
#[derive(Debug, Clone, Serialize)]
pub struct TopicResult {
    pub text: String,
    pub labels: Vec<TopicLabel>,
}

/// Per-span sentiment classification
#[derive(Debug, Clone, Serialize)]
pub struct SentimentResult {
    pub text: String,
    pub sentiment: String,
    pub confidence: f64,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Best-effort enrichment extracted from a completed transcript
#[derive(Debug, Clone, Default, Serialize)]
pub struct Enrichment {
    pub transcript_id: Option<String>,
    pub word_count: usize,
    pub character_count: usize,
    pub audio_url: Option<String>,
    pub language_confidence: Option<f64>,
    pub speakers: Option<Vec<String>>,
    pub summary: Option<String>,
    pub chapters: Option<Vec<Chapter>>,
    pub content_safety: Option<Vec<ContentSafetyLabel>>,
    pub topics: Option<Vec<TopicResult>>,
    pub sentiment: Option<Vec<SentimentResult>>,
}

/// One occurrence of a searched word in the transcript text.
///
/// Offsets are character positions into the transcript; `count` repeats
/// the total number of occurrences of the word for convenience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordMatch {
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
    pub count: usize,
}

/// Per-word occurrence lists, keyed by the requested word
pub type WordSearchResults = BTreeMap<String, Vec<WordMatch>>;

/// The result of one transcription attempt
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionOutcome {
    /// Recognized text, possibly empty
    pub text: String,
    /// Overall confidence in [0, 1]
    pub confidence: f64,
    pub quality: QualityTier,
    /// Detected or configured language code
    pub language: Option<String>,
    /// Audio duration in seconds
    pub duration_seconds: f64,
    /// Wall-clock processing time in seconds
    pub processing_time_seconds: f64,
    /// Size of the submitted file
    pub file_size_bytes: u64,
    /// Source format tag ("ogg", "mp3", ...)
    pub format: String,
    /// Present iff quality is `Failed`
    pub error: Option<OutcomeError>,
    pub enrichment: Option<Enrichment>,
}

impl TranscriptionOutcome {
    /// Build a failed outcome from a pipeline error.
    pub fn failed(
        err: &VoiceError,
        duration_seconds: f64,
        file_size_bytes: u64,
        format: impl Into<String>,
        processing_time_seconds: f64,
    ) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            quality: QualityTier::Failed,
            language: None,
            duration_seconds,
            processing_time_seconds,
            file_size_bytes,
            format: format.into(),
            error: Some(OutcomeError {
                category: err.category(),
                message: err.to_string(),
            }),
            enrichment: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.quality == QualityTier::Failed
    }

    /// Identified speakers, when speaker labels were requested and returned.
    pub fn speakers(&self) -> &[String] {
        self.enrichment
            .as_ref()
            .and_then(|e| e.speakers.as_deref())
            .unwrap_or(&[])
    }

    /// Transcript summary, when summarization was requested and returned.
    pub fn summary(&self) -> Option<&str> {
        self.enrichment.as_ref()?.summary.as_deref()
    }

    /// Auto-generated chapters, when requested and returned.
    pub fn chapters(&self) -> &[Chapter] {
        self.enrichment
            .as_ref()
            .and_then(|e| e.chapters.as_deref())
            .unwrap_or(&[])
    }

    /// Detected topics, when requested and returned.
    pub fn topics(&self) -> &[TopicResult] {
        self.enrichment
            .as_ref()
            .and_then(|e| e.topics.as_deref())
            .unwrap_or(&[])
    }

    /// Sentiment analysis spans, when requested and returned.
    pub fn sentiment(&self) -> &[SentimentResult] {
        self.enrichment
            .as_ref()
            .and_then(|e| e.sentiment.as_deref())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_carries_category_and_message() {
        let err = VoiceError::Authentication("invalid API key".to_string());
        let outcome = TranscriptionOutcome::failed(&err, 3.0, 1024, "ogg", 0.1);

        assert!(outcome.is_failed());
        assert_eq!(outcome.confidence, 0.0);
        assert!(outcome.text.is_empty());
        let error = outcome.error.unwrap();
        assert_eq!(error.category, ErrorCategory::Authentication);
        assert!(error.message.contains("invalid API key"));
    }

    #[test]
    fn enrichment_accessors_default_to_empty() {
        let err = VoiceError::Network("down".to_string());
        let outcome = TranscriptionOutcome::failed(&err, 0.0, 0, "unknown", 0.0);

        assert!(outcome.speakers().is_empty());
        assert!(outcome.summary().is_none());
        assert!(outcome.chapters().is_empty());
        assert!(outcome.topics().is_empty());
        assert!(outcome.sentiment().is_empty());
    }
}
