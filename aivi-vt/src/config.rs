//! Configuration resolution for aivi-vt
//!
//! The pipeline's configuration is resolved once at startup with
//! ENV → TOML → compiled-default priority, validated eagerly, and passed
//! by reference into every component. No component re-reads the
//! environment per call.

use aivi_common::{config as common_config, Error, Result};
use serde::{Deserialize, Serialize};

use crate::models::{BoostLevel, PiiSubstitution};

/// Environment variable prefix for all aivi-vt settings
const ENV_PREFIX: &str = "AIVI_";

/// Immutable voice processing configuration.
///
/// Quality thresholds (0.6 low cutoff, 0.85 high cutoff, 3-word/10-second
/// sparse-text rule) are empirically chosen defaults carried over from the
/// deployed system; they are fields rather than constants so product tuning
/// does not require a rebuild.
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Transcription service API key (required, non-empty)
    pub api_key: String,
    /// Transcription service base URL
    pub api_base_url: String,

    // Validation bounds
    pub max_file_size_mb: u64,
    pub min_duration_seconds: f64,
    pub max_duration_seconds: f64,

    // Quality classification
    pub confidence_threshold: f64,
    pub high_confidence_threshold: f64,
    pub sparse_duration_seconds: f64,
    pub sparse_min_words: usize,

    // Language handling
    pub default_language: String,
    pub supported_languages: Vec<String>,
    pub language_detection: bool,

    // Transcript shaping
    pub punctuate: bool,
    pub format_text: bool,
    pub disfluencies: bool,
    pub speaker_labels: bool,

    // PII redaction
    pub redact_pii: bool,
    pub pii_policies: Vec<String>,
    pub pii_substitution: PiiSubstitution,

    // Content analysis features
    pub summarization: bool,
    pub auto_chapters: bool,
    pub content_safety: bool,
    pub topic_detection: bool,
    pub iab_categories: bool,
    pub entity_detection: bool,
    pub sentiment_analysis: bool,
    pub boost_level: BoostLevel,

    // Request management
    pub concurrent_requests: usize,
    pub retry_attempts: u32,
    pub retry_delay_seconds: f64,
    pub max_retry_delay_seconds: f64,
    pub poll_timeout_seconds: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://api.assemblyai.com".to_string(),
            max_file_size_mb: 25,
            min_duration_seconds: 0.5,
            max_duration_seconds: 600.0,
            confidence_threshold: 0.6,
            high_confidence_threshold: 0.85,
            sparse_duration_seconds: 10.0,
            sparse_min_words: 3,
            default_language: "en".to_string(),
            supported_languages: ["en", "ru", "es", "fr", "de", "it", "pt", "zh", "hi", "ja"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            language_detection: true,
            punctuate: true,
            format_text: true,
            disfluencies: false,
            speaker_labels: false,
            redact_pii: false,
            pii_policies: ["person_name", "phone_number", "email_address"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            pii_substitution: PiiSubstitution::Hash,
            summarization: false,
            auto_chapters: false,
            content_safety: false,
            topic_detection: false,
            iab_categories: false,
            entity_detection: false,
            sentiment_analysis: false,
            boost_level: BoostLevel::Default,
            concurrent_requests: 3,
            retry_attempts: 3,
            retry_delay_seconds: 2.0,
            max_retry_delay_seconds: 60.0,
            poll_timeout_seconds: 300,
        }
    }
}

/// Optional overrides from `~/.config/aivi/aivi-vt.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub transcription_api_key: Option<String>,
    pub transcription_base_url: Option<String>,
    pub max_file_size_mb: Option<u64>,
    pub min_duration_seconds: Option<f64>,
    pub max_duration_seconds: Option<f64>,
    pub confidence_threshold: Option<f64>,
    pub default_language: Option<String>,
    pub supported_languages: Option<Vec<String>>,
    pub language_detection: Option<bool>,
    pub punctuate: Option<bool>,
    pub format_text: Option<bool>,
    pub disfluencies: Option<bool>,
    pub speaker_labels: Option<bool>,
    pub redact_pii: Option<bool>,
    pub pii_policies: Option<Vec<String>>,
    pub pii_substitution: Option<String>,
    pub summarization: Option<bool>,
    pub auto_chapters: Option<bool>,
    pub content_safety: Option<bool>,
    pub topic_detection: Option<bool>,
    pub iab_categories: Option<bool>,
    pub entity_detection: Option<bool>,
    pub sentiment_analysis: Option<bool>,
    pub boost_level: Option<String>,
    pub concurrent_requests: Option<usize>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<f64>,
    pub max_retry_delay_seconds: Option<f64>,
    pub poll_timeout_seconds: Option<u64>,
}

impl VoiceConfig {
    /// Minimal config for embedding and tests: defaults plus an API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Resolve from the process environment and the module TOML file,
    /// ENV taking priority, then validate.
    pub fn resolve() -> Result<Self> {
        let toml_path = common_config::config_file_path("aivi-vt");
        let toml: Option<TomlConfig> = common_config::load_toml_file(&toml_path)?;

        let mut config = Self::default();
        if let Some(toml) = toml {
            config.apply_toml(toml);
        }
        config.apply_env(&|name| std::env::var(name).ok())?;
        config.validate()?;

        tracing::info!(
            base_url = %config.api_base_url,
            concurrent_requests = config.concurrent_requests,
            retry_attempts = config.retry_attempts,
            "voice transcription config resolved"
        );
        Ok(config)
    }

    fn apply_toml(&mut self, toml: TomlConfig) {
        macro_rules! take {
            ($field:ident, $src:ident) => {
                if let Some(value) = toml.$src {
                    self.$field = value;
                }
            };
        }

        take!(api_key, transcription_api_key);
        take!(api_base_url, transcription_base_url);
        take!(max_file_size_mb, max_file_size_mb);
        take!(min_duration_seconds, min_duration_seconds);
        take!(max_duration_seconds, max_duration_seconds);
        take!(confidence_threshold, confidence_threshold);
        take!(default_language, default_language);
        take!(supported_languages, supported_languages);
        take!(language_detection, language_detection);
        take!(punctuate, punctuate);
        take!(format_text, format_text);
        take!(disfluencies, disfluencies);
        take!(speaker_labels, speaker_labels);
        take!(redact_pii, redact_pii);
        take!(pii_policies, pii_policies);
        take!(summarization, summarization);
        take!(auto_chapters, auto_chapters);
        take!(content_safety, content_safety);
        take!(topic_detection, topic_detection);
        take!(iab_categories, iab_categories);
        take!(entity_detection, entity_detection);
        take!(sentiment_analysis, sentiment_analysis);
        take!(concurrent_requests, concurrent_requests);
        take!(retry_attempts, retry_attempts);
        take!(retry_delay_seconds, retry_delay_seconds);
        take!(max_retry_delay_seconds, max_retry_delay_seconds);
        take!(poll_timeout_seconds, poll_timeout_seconds);

        if let Some(name) = toml.pii_substitution {
            self.pii_substitution = parse_substitution(&name);
        }
        if let Some(name) = toml.boost_level {
            self.boost_level = parse_boost(&name);
        }
    }

    /// Overlay environment variables via `get` (injected for testability).
    fn apply_env(&mut self, get: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        macro_rules! parse_env {
            ($field:ident, $name:expr) => {
                if let Some(raw) = get(concat!("AIVI_", $name)) {
                    self.$field = raw.parse().map_err(|e| {
                        Error::Config(format!("AIVI_{}: {}", $name, e))
                    })?;
                }
            };
        }

        if let Some(key) = get("AIVI_TRANSCRIPTION_API_KEY") {
            self.api_key = key;
        }
        if let Some(url) = get("AIVI_TRANSCRIPTION_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(lang) = get("AIVI_DEFAULT_LANGUAGE") {
            self.default_language = lang;
        }
        if let Some(raw) = get("AIVI_SUPPORTED_LANGUAGES") {
            self.supported_languages = split_list(&raw);
        }
        if let Some(raw) = get("AIVI_PII_POLICIES") {
            self.pii_policies = split_list(&raw);
        }
        if let Some(raw) = get("AIVI_PII_SUBSTITUTION") {
            self.pii_substitution = parse_substitution(&raw);
        }
        if let Some(raw) = get("AIVI_BOOST_LEVEL") {
            self.boost_level = parse_boost(&raw);
        }

        parse_env!(max_file_size_mb, "MAX_FILE_SIZE_MB");
        parse_env!(min_duration_seconds, "MIN_DURATION_SECONDS");
        parse_env!(max_duration_seconds, "MAX_DURATION_SECONDS");
        parse_env!(confidence_threshold, "CONFIDENCE_THRESHOLD");
        parse_env!(language_detection, "LANGUAGE_DETECTION");
        parse_env!(punctuate, "PUNCTUATE");
        parse_env!(format_text, "FORMAT_TEXT");
        parse_env!(disfluencies, "DISFLUENCIES");
        parse_env!(speaker_labels, "SPEAKER_LABELS");
        parse_env!(redact_pii, "REDACT_PII");
        parse_env!(summarization, "SUMMARIZATION");
        parse_env!(auto_chapters, "AUTO_CHAPTERS");
        parse_env!(content_safety, "CONTENT_SAFETY");
        parse_env!(topic_detection, "TOPIC_DETECTION");
        parse_env!(iab_categories, "IAB_CATEGORIES");
        parse_env!(entity_detection, "ENTITY_DETECTION");
        parse_env!(sentiment_analysis, "SENTIMENT_ANALYSIS");
        parse_env!(concurrent_requests, "CONCURRENT_REQUESTS");
        parse_env!(retry_attempts, "RETRY_ATTEMPTS");
        parse_env!(retry_delay_seconds, "RETRY_DELAY_SECONDS");
        parse_env!(max_retry_delay_seconds, "MAX_RETRY_DELAY_SECONDS");
        parse_env!(poll_timeout_seconds, "POLL_TIMEOUT_SECONDS");

        Ok(())
    }

    /// Fail fast on out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config(format!(
                "Transcription API key not configured. Set {}TRANSCRIPTION_API_KEY \
                 or transcription_api_key in {}",
                ENV_PREFIX,
                common_config::config_file_path("aivi-vt").display()
            )));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("Transcription base URL is empty".to_string()));
        }
        if self.max_file_size_mb == 0 {
            return Err(Error::Config("max_file_size_mb must be positive".to_string()));
        }
        if self.min_duration_seconds < 0.0 {
            return Err(Error::Config(
                "min_duration_seconds must be non-negative".to_string(),
            ));
        }
        if self.min_duration_seconds >= self.max_duration_seconds {
            return Err(Error::Config(format!(
                "min_duration_seconds ({}) must be below max_duration_seconds ({})",
                self.min_duration_seconds, self.max_duration_seconds
            )));
        }
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("high_confidence_threshold", self.high_confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be within 0..=1, got {}",
                    name, value
                )));
            }
        }
        if self.concurrent_requests == 0 {
            return Err(Error::Config(
                "concurrent_requests must be positive".to_string(),
            ));
        }
        if self.retry_delay_seconds < 0.0 {
            return Err(Error::Config(
                "retry_delay_seconds must be non-negative".to_string(),
            ));
        }
        if self.max_retry_delay_seconds < self.retry_delay_seconds {
            return Err(Error::Config(
                "max_retry_delay_seconds must be at least retry_delay_seconds".to_string(),
            ));
        }
        if self.poll_timeout_seconds == 0 {
            return Err(Error::Config("poll_timeout_seconds must be positive".to_string()));
        }
        if !self.supported_languages.contains(&self.default_language) {
            return Err(Error::Config(format!(
                "default_language '{}' is not in supported_languages",
                self.default_language
            )));
        }
        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_substitution(name: &str) -> PiiSubstitution {
    PiiSubstitution::from_name(name).unwrap_or_else(|| {
        tracing::warn!(name, "unknown PII substitution policy, using hash");
        PiiSubstitution::Hash
    })
}

fn parse_boost(name: &str) -> BoostLevel {
    BoostLevel::from_name(name).unwrap_or_else(|| {
        tracing::warn!(name, "unknown boost level, using default");
        BoostLevel::Default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_validate_once_key_is_set() {
        let config = VoiceConfig::with_api_key("test-key");
        assert!(config.validate().is_ok());
        assert_eq!(config.max_file_size_mb, 25);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.poll_timeout_seconds, 300);
    }

    #[test]
    fn missing_api_key_fails_validation() {
        let config = VoiceConfig::default();
        assert!(config.validate().is_err());

        let config = VoiceConfig::with_api_key("   ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_defaults() {
        let env = env_of(&[
            ("AIVI_TRANSCRIPTION_API_KEY", "env-key"),
            ("AIVI_MAX_FILE_SIZE_MB", "10"),
            ("AIVI_SPEAKER_LABELS", "true"),
            ("AIVI_SUPPORTED_LANGUAGES", "en, ru"),
            ("AIVI_PII_SUBSTITUTION", "entity_type"),
            ("AIVI_BOOST_LEVEL", "high"),
        ]);

        let mut config = VoiceConfig::default();
        config.apply_env(&|name| env.get(name).cloned()).unwrap();

        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.max_file_size_mb, 10);
        assert!(config.speaker_labels);
        assert_eq!(config.supported_languages, vec!["en", "ru"]);
        assert_eq!(config.pii_substitution, PiiSubstitution::EntityType);
        assert_eq!(config.boost_level, BoostLevel::High);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_takes_priority_over_toml() {
        let mut config = VoiceConfig::default();
        config.apply_toml(TomlConfig {
            transcription_api_key: Some("toml-key".to_string()),
            retry_attempts: Some(7),
            ..TomlConfig::default()
        });
        let env = env_of(&[("AIVI_TRANSCRIPTION_API_KEY", "env-key")]);
        config.apply_env(&|name| env.get(name).cloned()).unwrap();

        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.retry_attempts, 7);
    }

    #[test]
    fn unparseable_env_value_is_a_config_error() {
        let env = env_of(&[("AIVI_MAX_FILE_SIZE_MB", "twenty-five")]);
        let mut config = VoiceConfig::default();
        assert!(config.apply_env(&|name| env.get(name).cloned()).is_err());
    }

    #[test]
    fn bound_ordering_is_enforced() {
        let mut config = VoiceConfig::with_api_key("k");
        config.min_duration_seconds = 700.0;
        assert!(config.validate().is_err());

        let mut config = VoiceConfig::with_api_key("k");
        config.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = VoiceConfig::with_api_key("k");
        config.concurrent_requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_language_must_be_supported() {
        let mut config = VoiceConfig::with_api_key("k");
        config.default_language = "xx".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_policy_strings_fall_back_with_warning() {
        assert_eq!(parse_substitution("redact-all"), PiiSubstitution::Hash);
        assert_eq!(parse_boost("turbo"), BoostLevel::Default);
    }
}
