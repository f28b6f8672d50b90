//! Transcription request configuration
//!
//! Built fresh per transcription attempt from static configuration,
//! immutable once built, serialized as the create-transcript body.

use serde::Serialize;

/// PII span categories the service can redact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiPolicy {
    PersonName,
    PhoneNumber,
    EmailAddress,
    DateOfBirth,
    CreditCardNumber,
    UsSocialSecurityNumber,
    MedicalCondition,
    Drug,
    Location,
}

impl PiiPolicy {
    /// Map a configured policy name to the service enum.
    ///
    /// Unrecognized names return `None` and are silently dropped by the
    /// request builder rather than failing the call.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "person_name" => Some(PiiPolicy::PersonName),
            "phone_number" => Some(PiiPolicy::PhoneNumber),
            "email_address" => Some(PiiPolicy::EmailAddress),
            "date_of_birth" => Some(PiiPolicy::DateOfBirth),
            "credit_card_number" => Some(PiiPolicy::CreditCardNumber),
            "social_security_number" => Some(PiiPolicy::UsSocialSecurityNumber),
            "medical_condition" => Some(PiiPolicy::MedicalCondition),
            "drug" => Some(PiiPolicy::Drug),
            "location" => Some(PiiPolicy::Location),
            _ => None,
        }
    }
}

/// How redacted PII spans are substituted in the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PiiSubstitution {
    /// Irreversible hash placeholder (default)
    #[default]
    Hash,
    /// Type placeholder, e.g. `[PERSON_NAME]`
    EntityType,
}

impl PiiSubstitution {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "hash" => Some(PiiSubstitution::Hash),
            "entity_type" => Some(PiiSubstitution::EntityType),
            _ => None,
        }
    }
}

/// Relative accuracy-boost level passed to the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoostLevel {
    Low,
    #[default]
    Default,
    High,
}

impl BoostLevel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "low" => Some(BoostLevel::Low),
            "default" => Some(BoostLevel::Default),
            "high" => Some(BoostLevel::High),
            _ => None,
        }
    }
}

/// Resolved feature configuration for one transcription call.
///
/// Exactly one of `language_code` / `language_detection` is active:
/// the builder sets `language_code` only when detection is off.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionRequest {
    pub language_detection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    pub punctuate: bool,
    pub format_text: bool,
    pub disfluencies: bool,
    pub speaker_labels: bool,
    pub redact_pii: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub redact_pii_policies: Vec<PiiPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redact_pii_sub: Option<PiiSubstitution>,
    pub summarization: bool,
    pub auto_chapters: bool,
    pub content_safety: bool,
    pub topic_detection: bool,
    pub iab_categories: bool,
    pub entity_detection: bool,
    pub sentiment_analysis: bool,
    pub boost_param: BoostLevel,
}
