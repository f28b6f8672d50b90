//! Transcription service client
//!
//! Drives one normalized clip through the external speech-to-text REST
//! API to a terminal state: validate, build the feature request, upload,
//! create the transcript, poll until completion, retry transient failures
//! with exponential backoff, and extract requested enrichment.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::VoiceConfig;
use crate::error::{Result, VoiceError};
use crate::models::{
    AudioAsset, Chapter, ClipMetadata, ContentSafetyLabel, Enrichment, PiiPolicy,
    SentimentResult, TopicLabel, TopicResult, TranscriptionOutcome, TranscriptionRequest,
    WordMatch, WordSearchResults,
};
use crate::services::quality::QualityClassifier;
use crate::services::rate_limiter::RateLimiter;
use crate::utils::retry::{retry_with_backoff, BackoffPolicy};

const UPLOAD_ENDPOINT: &str = "/v2/upload";
const TRANSCRIPT_ENDPOINT: &str = "/v2/transcript";
const USER_AGENT: &str = concat!("AIVI/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval starts at 2s and grows 1.2x per poll, capped at 10s
const POLL_INITIAL_INTERVAL: Duration = Duration::from_secs(2);
const POLL_INTERVAL_GROWTH: f64 = 1.2;
const POLL_MAX_INTERVAL: Duration = Duration::from_secs(10);

/// Client for the external transcription service
pub struct TranscriptionClient {
    http: reqwest::Client,
    config: Arc<VoiceConfig>,
    rate_limiter: RateLimiter,
    quality: QualityClassifier,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct CreateTranscriptBody<'a> {
    audio_url: &'a str,
    #[serde(flatten)]
    request: &'a TranscriptionRequest,
}

/// Transcript resource as returned by the service; optional fields are
/// present only when the corresponding feature produced data.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TranscriptResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub language_confidence: Option<f64>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub utterances: Option<Vec<WireUtterance>>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub chapters: Option<Vec<WireChapter>>,
    #[serde(default)]
    pub content_safety_labels: Option<WireContentSafety>,
    #[serde(default)]
    pub topics: Option<Vec<WireTopic>>,
    #[serde(default)]
    pub sentiment_analysis_results: Option<Vec<WireSentiment>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireUtterance {
    #[serde(default)]
    pub speaker: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireChapter {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireContentSafety {
    #[serde(default)]
    pub results: Vec<WireSafetyLabel>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireSafetyLabel {
    pub label: String,
    pub confidence: f64,
    #[serde(default)]
    pub severity: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireTopic {
    pub text: String,
    #[serde(default)]
    pub labels: Vec<WireTopicLabel>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireTopicLabel {
    pub relevance: f64,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireSentiment {
    pub text: String,
    pub sentiment: String,
    pub confidence: f64,
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Deserialize)]
struct WireWordSearch {
    #[serde(default)]
    matches: Vec<WireWordSearchMatch>,
}

#[derive(Debug, Deserialize)]
struct WireWordSearchMatch {
    text: String,
    count: usize,
}

impl TranscriptionClient {
    pub fn new(config: Arc<VoiceConfig>) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(VoiceError::Authentication(
                "transcription API key is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| VoiceError::Network(e.to_string()))?;

        info!(
            language_detection = config.language_detection,
            speaker_labels = config.speaker_labels,
            pii_redaction = config.redact_pii,
            summarization = config.summarization,
            auto_chapters = config.auto_chapters,
            content_safety = config.content_safety,
            topic_detection = config.topic_detection,
            sentiment_analysis = config.sentiment_analysis,
            "transcription client initialized"
        );

        Ok(Self {
            http,
            rate_limiter: RateLimiter::new(config.concurrent_requests),
            quality: QualityClassifier::from_config(&config),
            config,
        })
    }

    /// Transcribe one normalized clip.
    ///
    /// Never returns an error: any failure is converted to a `Failed`
    /// outcome carrying the error category and message.
    pub async fn transcribe(
        &self,
        asset: &AudioAsset,
        meta: &ClipMetadata,
    ) -> TranscriptionOutcome {
        let started = Instant::now();
        let _permit = self.rate_limiter.acquire().await;

        match self.try_transcribe(asset).await {
            Ok(transcript) => {
                let processing_time = started.elapsed().as_secs_f64();
                let outcome = self.build_outcome(transcript, meta, processing_time);
                info!(
                    duration_seconds = meta.duration_seconds,
                    confidence = outcome.confidence,
                    quality = outcome.quality.as_str(),
                    processing_time_seconds = processing_time,
                    text_length = outcome.text.len(),
                    "transcription completed"
                );
                outcome
            }
            Err(err) => {
                let processing_time = started.elapsed().as_secs_f64();
                error!(
                    path = %asset.path.display(),
                    error = %err,
                    category = ?err.category(),
                    processing_time_seconds = processing_time,
                    file_size_bytes = meta.size_bytes,
                    duration_seconds = meta.duration_seconds,
                    "transcription failed"
                );
                TranscriptionOutcome::failed(
                    &err,
                    meta.duration_seconds,
                    meta.size_bytes,
                    meta.source_format.clone(),
                    processing_time,
                )
            }
        }
    }

    async fn try_transcribe(&self, asset: &AudioAsset) -> Result<TranscriptResponse> {
        self.validate(asset)?;
        let request = self.build_request();
        self.submit_with_retry(asset, &request).await
    }

    /// Pre-submission validation; checked in order, the first violation
    /// wins, and none of these are ever retried.
    fn validate(&self, asset: &AudioAsset) -> Result<()> {
        if !asset.path.exists() {
            return Err(VoiceError::file_missing(&asset.path));
        }

        let file_size_mb = asset.size_bytes as f64 / (1024.0 * 1024.0);
        if file_size_mb > self.config.max_file_size_mb as f64 {
            return Err(VoiceError::FileTooLarge(format!(
                "{:.1}MB (max: {}MB)",
                file_size_mb, self.config.max_file_size_mb
            )));
        }

        if asset.duration_seconds < self.config.min_duration_seconds {
            return Err(VoiceError::TooShort(format!(
                "{:.1}s (min: {}s)",
                asset.duration_seconds, self.config.min_duration_seconds
            )));
        }

        if asset.duration_seconds > self.config.max_duration_seconds {
            return Err(VoiceError::TooLong(format!(
                "{:.1}s (max: {}s)",
                asset.duration_seconds, self.config.max_duration_seconds
            )));
        }

        Ok(())
    }

    /// Map static configuration onto the per-call feature request.
    ///
    /// Exactly one of auto-detection / explicit language code ends up
    /// active. Unrecognized PII policy names are dropped, not an error.
    fn build_request(&self) -> TranscriptionRequest {
        let policies: Vec<PiiPolicy> = if self.config.redact_pii {
            self.config
                .pii_policies
                .iter()
                .filter_map(|name| {
                    let policy = PiiPolicy::from_name(name);
                    if policy.is_none() {
                        debug!(name, "dropping unrecognized PII policy");
                    }
                    policy
                })
                .collect()
        } else {
            Vec::new()
        };
        let redact_on = self.config.redact_pii && !policies.is_empty();

        TranscriptionRequest {
            language_detection: self.config.language_detection,
            language_code: (!self.config.language_detection)
                .then(|| self.config.default_language.clone()),
            punctuate: self.config.punctuate,
            format_text: self.config.format_text,
            disfluencies: self.config.disfluencies,
            speaker_labels: self.config.speaker_labels,
            redact_pii: redact_on,
            redact_pii_policies: if redact_on { policies } else { Vec::new() },
            redact_pii_sub: redact_on.then_some(self.config.pii_substitution),
            summarization: self.config.summarization,
            auto_chapters: self.config.auto_chapters,
            content_safety: self.config.content_safety,
            topic_detection: self.config.topic_detection,
            iab_categories: self.config.iab_categories,
            entity_detection: self.config.entity_detection,
            sentiment_analysis: self.config.sentiment_analysis,
            boost_param: self.config.boost_level,
        }
    }

    /// Submit with up to `retry_attempts` tries; terminal errors stop the
    /// loop immediately, transient ones back off exponentially.
    pub(crate) async fn submit_with_retry(
        &self,
        asset: &AudioAsset,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptResponse> {
        let policy = BackoffPolicy {
            attempts: self.config.retry_attempts,
            base_delay: Duration::from_secs_f64(self.config.retry_delay_seconds),
            max_delay: Duration::from_secs_f64(self.config.max_retry_delay_seconds),
        };

        retry_with_backoff("transcription", &policy, || self.submit_once(asset, request)).await
    }

    /// One full attempt: upload, create, poll to a terminal state.
    async fn submit_once(
        &self,
        asset: &AudioAsset,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptResponse> {
        let audio_url = self.upload(&asset.path).await?;
        let transcript = self.create_transcript(&audio_url, request).await?;

        match transcript.status.as_str() {
            "completed" => Ok(transcript),
            "error" => Err(VoiceError::from_service_message(
                transcript
                    .error
                    .unwrap_or_else(|| "unknown transcription error".to_string()),
            )),
            "queued" | "processing" => self.poll_until_complete(&transcript.id).await,
            other => Err(VoiceError::Service(format!(
                "transcription finished with status: {}",
                other
            ))),
        }
    }

    async fn upload(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        debug!(size_bytes = bytes.len(), "uploading audio for transcription");

        let response = self
            .http
            .post(format!("{}{}", self.config.api_base_url, UPLOAD_ENDPOINT))
            .header("authorization", &self.config.api_key)
            .body(bytes)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Service(format!("malformed upload response: {}", e)))?;
        Ok(upload.upload_url)
    }

    async fn create_transcript(
        &self,
        audio_url: &str,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptResponse> {
        let body = CreateTranscriptBody { audio_url, request };

        let response = self
            .http
            .post(format!("{}{}", self.config.api_base_url, TRANSCRIPT_ENDPOINT))
            .header("authorization", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| VoiceError::Service(format!("malformed transcript response: {}", e)))
    }

    async fn fetch_transcript(&self, id: &str) -> Result<TranscriptResponse> {
        let response = self
            .http
            .get(format!(
                "{}{}/{}",
                self.config.api_base_url, TRANSCRIPT_ENDPOINT, id
            ))
            .header("authorization", &self.config.api_key)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| VoiceError::Service(format!("malformed transcript response: {}", e)))
    }

    /// Poll on a growing interval until the transcript reaches a terminal
    /// state or the overall wait ceiling is exceeded.
    async fn poll_until_complete(&self, id: &str) -> Result<TranscriptResponse> {
        let started = Instant::now();
        let ceiling = Duration::from_secs(self.config.poll_timeout_seconds);
        let mut interval = POLL_INITIAL_INTERVAL;

        loop {
            if started.elapsed() > ceiling {
                return Err(VoiceError::Timeout(format!(
                    "transcription exceeded {}s",
                    self.config.poll_timeout_seconds
                )));
            }

            tokio::time::sleep(interval).await;

            let transcript = self.fetch_transcript(id).await?;
            match transcript.status.as_str() {
                "completed" => return Ok(transcript),
                "error" => {
                    return Err(VoiceError::from_service_message(
                        transcript
                            .error
                            .unwrap_or_else(|| "unknown transcription error".to_string()),
                    ))
                }
                status => {
                    debug!(
                        transcript_id = id,
                        status,
                        elapsed_seconds = started.elapsed().as_secs_f64(),
                        "waiting for transcription completion"
                    );
                }
            }

            interval = interval.mul_f64(POLL_INTERVAL_GROWTH).min(POLL_MAX_INTERVAL);
        }
    }

    /// Build the outcome, populating enrichment fields only when the
    /// corresponding feature was requested AND the service returned data.
    fn build_outcome(
        &self,
        transcript: TranscriptResponse,
        meta: &ClipMetadata,
        processing_time_seconds: f64,
    ) -> TranscriptionOutcome {
        let text = transcript.text.clone().unwrap_or_default();
        let confidence = transcript.confidence.unwrap_or(0.0);
        let quality = self.quality.classify(confidence, &text, meta.duration_seconds);

        let (language, language_confidence) = match transcript.language_code.clone() {
            Some(code) => (Some(code), transcript.language_confidence),
            None => (Some(self.config.default_language.clone()), None),
        };

        let mut enrichment = Enrichment {
            transcript_id: Some(transcript.id.clone()),
            word_count: text.split_whitespace().count(),
            character_count: text.chars().count(),
            audio_url: transcript.audio_url.clone(),
            language_confidence,
            ..Enrichment::default()
        };

        if self.config.speaker_labels {
            if let Some(utterances) = &transcript.utterances {
                let mut speakers: Vec<String> = Vec::new();
                for utterance in utterances {
                    if let Some(speaker) = &utterance.speaker {
                        if !speakers.contains(speaker) {
                            speakers.push(speaker.clone());
                        }
                    }
                }
                if !speakers.is_empty() {
                    enrichment.speakers = Some(speakers);
                }
            }
        }
        if self.config.summarization {
            enrichment.summary = transcript.summary.clone();
        }
        if self.config.auto_chapters {
            enrichment.chapters = transcript.chapters.map(|chapters| {
                chapters
                    .into_iter()
                    .map(|c| Chapter {
                        headline: c.headline,
                        summary: c.summary,
                        start_ms: c.start,
                        end_ms: c.end,
                    })
                    .collect()
            });
        }
        if self.config.content_safety {
            enrichment.content_safety = transcript.content_safety_labels.map(|cs| {
                cs.results
                    .into_iter()
                    .map(|l| ContentSafetyLabel {
                        label: l.label,
                        confidence: l.confidence,
                        severity: l.severity,
                    })
                    .collect()
            });
        }
        if self.config.topic_detection || self.config.iab_categories {
            enrichment.topics = transcript.topics.map(|topics| {
                topics
                    .into_iter()
                    .map(|t| TopicResult {
                        text: t.text,
                        labels: t
                            .labels
                            .into_iter()
                            .map(|l| TopicLabel {
                                relevance: l.relevance,
                                label: l.label,
                            })
                            .collect(),
                    })
                    .collect()
            });
        }
        if self.config.sentiment_analysis {
            enrichment.sentiment = transcript.sentiment_analysis_results.map(|results| {
                results
                    .into_iter()
                    .map(|s| SentimentResult {
                        text: s.text,
                        sentiment: s.sentiment,
                        confidence: s.confidence,
                        start_ms: s.start,
                        end_ms: s.end,
                    })
                    .collect()
            });
        }

        TranscriptionOutcome {
            text,
            confidence,
            quality,
            language,
            duration_seconds: meta.duration_seconds,
            processing_time_seconds,
            file_size_bytes: meta.size_bytes,
            format: meta.source_format.clone(),
            error: None,
            enrichment: Some(enrichment),
        }
    }

    /// Search for words in a completed outcome.
    ///
    /// Prefers the service's indexed search (counts are authoritative,
    /// offsets located in the local text so both paths share one result
    /// shape); falls back to a local scan when the service call fails.
    pub async fn search_words(
        &self,
        outcome: &TranscriptionOutcome,
        words: &[String],
    ) -> WordSearchResults {
        if outcome.is_failed() || outcome.text.is_empty() {
            return WordSearchResults::new();
        }

        let transcript_id = outcome
            .enrichment
            .as_ref()
            .and_then(|e| e.transcript_id.clone());

        if let Some(id) = transcript_id {
            match self.native_word_search(&id, &outcome.text, words).await {
                Ok(results) => return results,
                Err(err) => {
                    warn!(error = %err, "word search failed, falling back to text search");
                }
            }
        }

        fallback_word_search(&outcome.text, words)
    }

    async fn native_word_search(
        &self,
        transcript_id: &str,
        text: &str,
        words: &[String],
    ) -> Result<WordSearchResults> {
        let response = self
            .http
            .get(format!(
                "{}{}/{}/word-search",
                self.config.api_base_url, TRANSCRIPT_ENDPOINT, transcript_id
            ))
            .header("authorization", &self.config.api_key)
            .query(&[("words", words.join(","))])
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;

        let wire: WireWordSearch = response
            .json()
            .await
            .map_err(|e| VoiceError::Service(format!("malformed word search response: {}", e)))?;

        let mut results = WordSearchResults::new();
        for word in words {
            let reported = wire
                .matches
                .iter()
                .find(|m| m.text.eq_ignore_ascii_case(word))
                .map(|m| m.count)
                .unwrap_or(0);
            let matches = if reported > 0 {
                locate_word(text, word)
            } else {
                Vec::new()
            };
            results.insert(word.clone(), matches);
        }
        Ok(results)
    }
}

/// Local case-insensitive whole-word scan with character offsets.
///
/// Whole-word `\b` boundaries assume whitespace-delimited words; text in
/// languages without them (e.g. some CJK scripts) will under- or
/// over-match. Inherited limitation, kept until multilingual matching
/// requirements are settled.
pub(crate) fn fallback_word_search(text: &str, words: &[String]) -> WordSearchResults {
    let mut results = WordSearchResults::new();
    for word in words {
        results.insert(word.clone(), locate_word(text, word));
    }
    results
}

/// All whole-word occurrences of `word` in `text` as character offsets.
fn locate_word(text: &str, word: &str) -> Vec<WordMatch> {
    let pattern = format!(r"\b{}\b", regex::escape(word));
    let re = match regex::RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let spans: Vec<(usize, usize)> = re
        .find_iter(text)
        .map(|m| {
            let start_char = text[..m.start()].chars().count();
            let end_char = start_char + text[m.start()..m.end()].chars().count();
            (start_char, end_char)
        })
        .collect();

    let count = spans.len();
    spans
        .into_iter()
        .map(|(start_char, end_char)| WordMatch {
            text: word.to_string(),
            start_char,
            end_char,
            count,
        })
        .collect()
}

fn map_reqwest_error(err: reqwest::Error) -> VoiceError {
    if err.is_timeout() {
        VoiceError::Timeout(err.to_string())
    } else {
        VoiceError::Network(err.to_string())
    }
}

/// Map HTTP status codes to the error taxonomy; the body text feeds the
/// message-pattern classifier for anything unrecognized.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    let message = if message.is_empty() {
        status.to_string()
    } else {
        message
    };

    Err(match status.as_u16() {
        401 | 403 => VoiceError::Authentication(message),
        413 => VoiceError::PayloadTooLarge(message),
        400 => VoiceError::MalformedRequest(message),
        code if code >= 500 => VoiceError::Service(format!("server error {}: {}", code, message)),
        _ => VoiceError::from_service_message(message),
    })
}
