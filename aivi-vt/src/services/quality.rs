//! Transcript quality classification
//!
//! Scores a completed transcript's confidence and text/duration ratio into
//! a discrete tier. The thresholds are empirically chosen defaults carried
//! over from the deployed system and stay configurable.

use crate::config::VoiceConfig;
use crate::models::QualityTier;

/// Multi-factor quality heuristic over confidence and word density
#[derive(Debug, Clone)]
pub struct QualityClassifier {
    /// Below this confidence the transcript is `Low` (default 0.6)
    confidence_threshold: f64,
    /// At or above this confidence (with enough words) the transcript is
    /// `High` (default 0.85)
    high_confidence_threshold: f64,
    /// Clips longer than this with fewer than `sparse_min_words` words are
    /// `Low` regardless of confidence (default 10 s)
    sparse_duration_seconds: f64,
    /// Word floor for the sparse-text rule (default 3)
    sparse_min_words: usize,
}

impl QualityClassifier {
    pub fn from_config(config: &VoiceConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            high_confidence_threshold: config.high_confidence_threshold,
            sparse_duration_seconds: config.sparse_duration_seconds,
            sparse_min_words: config.sparse_min_words,
        }
    }

    /// Classify one completed transcript.
    ///
    /// Order matters: the failed check, then the low-confidence and
    /// sparse-text checks, take precedence over the high-quality check.
    pub fn classify(&self, confidence: f64, text: &str, duration_seconds: f64) -> QualityTier {
        if text.is_empty() || confidence == 0.0 {
            return QualityTier::Failed;
        }

        if confidence < self.confidence_threshold {
            return QualityTier::Low;
        }

        let word_count = text.split_whitespace().count();

        // Very short text for longer audio indicates poor recognition
        if duration_seconds > self.sparse_duration_seconds && word_count < self.sparse_min_words {
            return QualityTier::Low;
        }

        if confidence >= self.high_confidence_threshold && word_count >= self.sparse_min_words {
            return QualityTier::High;
        }

        QualityTier::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> QualityClassifier {
        QualityClassifier::from_config(&VoiceConfig::with_api_key("k"))
    }

    #[test]
    fn empty_text_or_zero_confidence_is_failed() {
        let c = classifier();
        assert_eq!(c.classify(0.9, "", 5.0), QualityTier::Failed);
        assert_eq!(c.classify(0.0, "hello there friend", 5.0), QualityTier::Failed);
        assert_eq!(c.classify(0.0, "", 5.0), QualityTier::Failed);
    }

    #[test]
    fn low_confidence_is_low() {
        let c = classifier();
        assert_eq!(c.classify(0.5, "hello there my friend", 5.0), QualityTier::Low);
        assert_eq!(c.classify(0.59, "hello there my friend", 5.0), QualityTier::Low);
    }

    #[test]
    fn sparse_text_on_long_audio_beats_high_confidence() {
        let c = classifier();
        // 12 seconds of audio, two words, excellent confidence: still Low
        assert_eq!(c.classify(0.95, "uh hm", 12.0), QualityTier::Low);
    }

    #[test]
    fn high_confidence_with_enough_words_is_high() {
        let c = classifier();
        assert_eq!(
            c.classify(0.95, "Hello, this is a test transcription", 5.0),
            QualityTier::High
        );
        assert_eq!(c.classify(0.85, "one two three", 5.0), QualityTier::High);
    }

    #[test]
    fn middle_band_is_medium() {
        let c = classifier();
        assert_eq!(c.classify(0.7, "hello there my friend", 5.0), QualityTier::Medium);
        // High confidence but under the word floor (short clip, no sparse rule)
        assert_eq!(c.classify(0.9, "hello there", 5.0), QualityTier::Medium);
    }

    #[test]
    fn tier_is_monotonic_in_confidence() {
        let c = classifier();
        let text = "a reasonably long answer with several words";
        let rank = |tier: QualityTier| match tier {
            QualityTier::Failed => 0,
            QualityTier::Low => 1,
            QualityTier::Medium => 2,
            QualityTier::High => 3,
        };

        let mut prev = 0;
        for step in 1..=20 {
            let confidence = f64::from(step) * 0.05;
            let tier = rank(c.classify(confidence, text, 5.0));
            assert!(tier >= prev, "tier regressed at confidence {}", confidence);
            prev = tier;
        }
    }

    #[test]
    fn boundary_confidences() {
        let c = classifier();
        // Exactly at the low threshold is not Low
        assert_eq!(c.classify(0.6, "hello there my friend", 5.0), QualityTier::Medium);
        // Exactly at the high threshold is High
        assert_eq!(c.classify(0.85, "hello there my friend", 5.0), QualityTier::High);
    }
}
