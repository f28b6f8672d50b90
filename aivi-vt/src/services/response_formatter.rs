//! User-facing rendering of transcription outcomes
//!
//! Pure functions from outcome to chat text: no side effects, no I/O.
//! Failures map to guidance templates keyed on the error category; the
//! raw error taxonomy is never shown verbatim to end users.

use std::sync::Arc;

use crate::config::VoiceConfig;
use crate::error::ErrorCategory;
use crate::models::{QualityTier, TranscriptionOutcome, WordSearchResults};

/// Renders outcomes and word-search results for the chat surface
pub struct ResponseFormatter {
    config: Arc<VoiceConfig>,
}

impl ResponseFormatter {
    pub fn new(config: Arc<VoiceConfig>) -> Self {
        Self { config }
    }

    /// Render an outcome as the user-visible reply.
    ///
    /// `include_extras` appends a compact summary line (language,
    /// speaker count, summary presence, chapter count) for successful
    /// transcripts.
    pub fn format_outcome(&self, outcome: &TranscriptionOutcome, include_extras: bool) -> String {
        if outcome.is_failed() {
            return self.format_failure(outcome);
        }

        let indicator = match outcome.quality {
            QualityTier::High => "🎤✨",
            QualityTier::Medium => "🎤",
            QualityTier::Low => "🎤⚠️",
            QualityTier::Failed => "🎤",
        };

        let mut response = format!(
            "{} **Voice Message Transcribed:**\n\n{}",
            indicator, outcome.text
        );

        if outcome.quality == QualityTier::Low {
            response.push_str(&format!(
                "\n\n*(Confidence: {:.0}% - please verify)*",
                outcome.confidence * 100.0
            ));
        }

        if include_extras {
            let extras = self.extras_line(outcome);
            if !extras.is_empty() {
                response.push_str(&format!("\n\n*{}*", extras.join(" | ")));
            }
        }

        response
    }

    fn format_failure(&self, outcome: &TranscriptionOutcome) -> String {
        let category = outcome
            .error
            .as_ref()
            .map(|e| e.category)
            .unwrap_or(ErrorCategory::Generic);

        match category {
            ErrorCategory::Authentication => {
                "🎤❌ API authentication failed. Please check the configuration.".to_string()
            }
            ErrorCategory::Timeout => {
                "🎤⏱️ Transcription timed out. Please try with a shorter audio file.".to_string()
            }
            ErrorCategory::FileSize => format!(
                "🎤📁 File too large ({:.1}MB). Please keep under {}MB.",
                outcome.file_size_bytes as f64 / 1024.0 / 1024.0,
                self.config.max_file_size_mb
            ),
            ErrorCategory::Format => {
                "🎤🔄 Unsupported audio format. Please try recording in a standard format."
                    .to_string()
            }
            ErrorCategory::Network => {
                "🎤🌐 Network error occurred. Please check your connection and try again."
                    .to_string()
            }
            ErrorCategory::TooShort => format!(
                "🎤⚡ Audio too short ({:.1}s). Please speak for at least {}s.",
                outcome.duration_seconds, self.config.min_duration_seconds
            ),
            ErrorCategory::TooLong => format!(
                "🎤📏 Audio too long ({:.1} min). Please keep under {:.0} minutes.",
                outcome.duration_seconds / 60.0,
                self.config.max_duration_seconds / 60.0
            ),
            ErrorCategory::Generic => {
                "🎤❌ I couldn't process your voice message. Please try speaking more clearly \
                 or use text instead."
                    .to_string()
            }
        }
    }

    fn extras_line(&self, outcome: &TranscriptionOutcome) -> Vec<String> {
        let mut extras = Vec::new();

        if let Some(language) = &outcome.language {
            if *language != self.config.default_language {
                let language_confidence = outcome
                    .enrichment
                    .as_ref()
                    .and_then(|e| e.language_confidence);
                match language_confidence {
                    Some(confidence) => extras.push(format!(
                        "Language: {} ({:.0}%)",
                        language.to_uppercase(),
                        confidence * 100.0
                    )),
                    None => extras.push(format!("Language: {}", language.to_uppercase())),
                }
            }
        }

        let speakers = outcome.speakers();
        if speakers.len() > 1 {
            extras.push(format!("Speakers: {} detected", speakers.len()));
        }

        if outcome.summary().is_some() {
            extras.push("Summary available".to_string());
        }

        let chapters = outcome.chapters();
        if !chapters.is_empty() {
            extras.push(format!("Chapters: {} sections", chapters.len()));
        }

        extras
    }

    /// Render word-search results for display.
    pub fn format_search_results(results: &WordSearchResults) -> String {
        let any_match = results.values().any(|matches| !matches.is_empty());
        if results.is_empty() || !any_match {
            return "🔍 No matches found.".to_string();
        }

        let mut response = String::from("🔍 **Word Search Results:**\n\n");

        for (word, matches) in results {
            if matches.is_empty() {
                continue;
            }

            let count = matches.first().map(|m| m.count).unwrap_or(matches.len());
            let plural = if count == 1 { "" } else { "s" };
            response.push_str(&format!("**{}**: {} occurrence{}\n", word, count, plural));

            for m in matches.iter().take(3) {
                response.push_str(&format!("  • Position {}-{}\n", m.start_char, m.end_char));
            }
            if matches.len() > 3 {
                response.push_str(&format!("  • ... and {} more\n", matches.len() - 3));
            }
            response.push('\n');
        }

        response.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoiceError;
    use crate::models::{Enrichment, OutcomeError};

    fn formatter() -> ResponseFormatter {
        ResponseFormatter::new(Arc::new(VoiceConfig::with_api_key("k")))
    }

    fn success_outcome(quality: QualityTier, confidence: f64) -> TranscriptionOutcome {
        TranscriptionOutcome {
            text: "Hello, this is a test transcription".to_string(),
            confidence,
            quality,
            language: Some("en".to_string()),
            duration_seconds: 5.0,
            processing_time_seconds: 1.0,
            file_size_bytes: 160_000,
            format: "ogg".to_string(),
            error: None,
            enrichment: Some(Enrichment {
                transcript_id: Some("t-1".to_string()),
                word_count: 6,
                character_count: 35,
                ..Enrichment::default()
            }),
        }
    }

    #[test]
    fn high_quality_gets_sparkle_indicator() {
        let rendered = formatter().format_outcome(&success_outcome(QualityTier::High, 0.95), false);
        assert!(rendered.starts_with("🎤✨"));
        assert!(rendered.contains("Hello, this is a test transcription"));
        assert!(!rendered.contains("please verify"));
    }

    #[test]
    fn low_quality_appends_confidence_caveat() {
        let rendered = formatter().format_outcome(&success_outcome(QualityTier::Low, 0.45), false);
        assert!(rendered.starts_with("🎤⚠️"));
        assert!(rendered.contains("Confidence: 45%"));
        assert!(rendered.contains("please verify"));
    }

    #[test]
    fn failure_templates_match_categories() {
        let f = formatter();
        let cases = [
            (VoiceError::Authentication("bad key".into()), "authentication failed"),
            (VoiceError::Timeout("300s".into()), "timed out"),
            (VoiceError::FileTooLarge("30MB".into()), "File too large"),
            (VoiceError::UnsupportedFormat("midi".into()), "Unsupported audio format"),
            (VoiceError::Network("reset".into()), "Network error"),
            (VoiceError::TooShort("0.2s".into()), "too short"),
            (VoiceError::TooLong("700s".into()), "too long"),
            (VoiceError::Service("weird".into()), "couldn't process"),
        ];

        for (err, needle) in cases {
            let outcome = TranscriptionOutcome::failed(&err, 700.0, 30 * 1024 * 1024, "ogg", 0.1);
            let rendered = f.format_outcome(&outcome, false);
            assert!(
                rendered.contains(needle),
                "expected '{}' in '{}'",
                needle,
                rendered
            );
            // Raw taxonomy text must not leak through
            assert!(!rendered.contains("VoiceError"));
        }
    }

    #[test]
    fn failure_templates_interpolate_limits() {
        let f = formatter();
        let err = VoiceError::TooLong("x".into());
        let outcome = TranscriptionOutcome::failed(&err, 720.0, 1_000, "ogg", 0.1);
        let rendered = f.format_outcome(&outcome, false);
        assert!(rendered.contains("12.0 min"));
        assert!(rendered.contains("10 minutes"));
    }

    #[test]
    fn extras_line_reports_language_speakers_and_summary() {
        let mut outcome = success_outcome(QualityTier::High, 0.95);
        outcome.language = Some("ru".to_string());
        if let Some(enrichment) = outcome.enrichment.as_mut() {
            enrichment.language_confidence = Some(0.93);
            enrichment.speakers = Some(vec!["A".to_string(), "B".to_string()]);
            enrichment.summary = Some("short".to_string());
        }

        let rendered = formatter().format_outcome(&outcome, true);
        assert!(rendered.contains("Language: RU (93%)"));
        assert!(rendered.contains("Speakers: 2 detected"));
        assert!(rendered.contains("Summary available"));
    }

    #[test]
    fn default_language_is_omitted_from_extras() {
        let rendered = formatter().format_outcome(&success_outcome(QualityTier::High, 0.95), true);
        assert!(!rendered.contains("Language:"));
    }

    #[test]
    fn generic_failure_without_error_struct_is_still_generic() {
        let mut outcome = success_outcome(QualityTier::Failed, 0.0);
        outcome.error = None;
        let rendered = formatter().format_outcome(&outcome, false);
        assert!(rendered.contains("couldn't process"));

        let outcome_with = TranscriptionOutcome {
            error: Some(OutcomeError {
                category: ErrorCategory::Generic,
                message: "internal".to_string(),
            }),
            ..outcome
        };
        assert_eq!(
            formatter().format_outcome(&outcome_with, false),
            rendered
        );
    }

    #[test]
    fn search_results_render_counts_and_positions() {
        let text = "deadline one deadline two deadline three deadline four";
        let results =
            crate::services::transcription_client::fallback_word_search(text, &["deadline".to_string()]);

        let rendered = ResponseFormatter::format_search_results(&results);
        assert!(rendered.contains("**deadline**: 4 occurrences"));
        assert!(rendered.contains("Position 0-8"));
        assert!(rendered.contains("... and 1 more"));
    }

    #[test]
    fn empty_results_render_no_matches() {
        let results = WordSearchResults::new();
        assert_eq!(
            ResponseFormatter::format_search_results(&results),
            "🔍 No matches found."
        );

        let results = crate::services::transcription_client::fallback_word_search(
            "nothing here",
            &["absent".to_string()],
        );
        assert_eq!(
            ResponseFormatter::format_search_results(&results),
            "🔍 No matches found."
        );
    }
}
