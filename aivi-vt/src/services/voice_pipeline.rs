//! Voice pipeline orchestrator
//!
//! Sequences the full pipeline for one inbound voice message: processing
//! indicator, download, normalization, rate-limited transcription,
//! statistics, and cleanup of every temp file on every exit path. Under
//! normal operation `process` never returns an error; every failure
//! becomes a `Failed` outcome.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::VoiceConfig;
use crate::error::{Result, VoiceError};
use crate::models::{ClipMetadata, TranscriptionOutcome, WordSearchResults};
use crate::services::audio_processor::AudioProcessor;
use crate::services::response_formatter::ResponseFormatter;
use crate::services::transcription_client::TranscriptionClient;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::transport::{VoiceAttachment, VoiceTransport};

/// Default stale temp file age for the periodic sweep
const STALE_SWEEP_HOURS: u64 = 24;

/// The full voice-message pipeline
pub struct VoicePipeline {
    config: Arc<VoiceConfig>,
    audio: AudioProcessor,
    client: TranscriptionClient,
    formatter: ResponseFormatter,
    stats: PipelineStats,
}

impl VoicePipeline {
    pub fn new(config: VoiceConfig) -> Result<Self> {
        let audio = AudioProcessor::new()?;
        Self::assemble(config, audio)
    }

    /// Stage temp files under an explicit directory (tests, embedders).
    pub fn with_temp_dir(config: VoiceConfig, temp_dir: PathBuf) -> Result<Self> {
        let audio = AudioProcessor::with_temp_dir(temp_dir)?;
        Self::assemble(config, audio)
    }

    fn assemble(config: VoiceConfig, audio: AudioProcessor) -> Result<Self> {
        let config = Arc::new(config);
        Ok(Self {
            audio,
            client: TranscriptionClient::new(config.clone())?,
            formatter: ResponseFormatter::new(config.clone()),
            stats: PipelineStats::new(),
            config,
        })
    }

    /// Process one inbound voice message to a transcription outcome.
    ///
    /// Never fails: any error at any stage is caught, counted, and
    /// converted to a `Failed` outcome; temp files staged during the run
    /// are removed on both paths.
    pub async fn process(
        &self,
        transport: &dyn VoiceTransport,
        attachment: &VoiceAttachment,
        owner_id: i64,
    ) -> TranscriptionOutcome {
        info!(
            owner_id,
            file_id = %attachment.file_id,
            declared_duration = ?attachment.duration_seconds,
            declared_size = ?attachment.size_bytes,
            declared_mime = ?attachment.mime_type,
            "processing voice message"
        );

        self.stats.record_message();
        let started = Instant::now();
        let mut scratch: Vec<PathBuf> = Vec::new();

        let outcome = match self
            .run(transport, attachment, owner_id, &mut scratch)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(owner_id, error = %err, "voice processing failed");
                TranscriptionOutcome::failed(
                    &err,
                    attachment.duration_seconds.unwrap_or(0.0),
                    attachment.size_bytes.unwrap_or(0),
                    attachment
                        .mime_type
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string()),
                    started.elapsed().as_secs_f64(),
                )
            }
        };

        self.stats.record_outcome(&outcome);

        if outcome.is_failed() {
            warn!(
                owner_id,
                error = ?outcome.error.as_ref().map(|e| &e.message),
                "voice transcription failed"
            );
        } else {
            let preview: String = outcome.text.chars().take(100).collect();
            info!(
                owner_id,
                text_preview = %preview,
                confidence = outcome.confidence,
                quality = outcome.quality.as_str(),
                "voice transcription successful"
            );
        }

        self.cleanup_scratch(&scratch).await;
        outcome
    }

    async fn run(
        &self,
        transport: &dyn VoiceTransport,
        attachment: &VoiceAttachment,
        owner_id: i64,
        scratch: &mut Vec<PathBuf>,
    ) -> Result<TranscriptionOutcome> {
        transport
            .notify_processing(owner_id)
            .await
            .map_err(|e| VoiceError::Internal(format!("processing indicator failed: {}", e)))?;

        let raw = self
            .audio
            .download(transport, attachment, owner_id, scratch)
            .await?;
        let (normalized, report) = self.audio.normalize(&raw, scratch).await?;
        let meta = ClipMetadata::from_report(&report, attachment);

        Ok(self.client.transcribe(&normalized, &meta).await)
    }

    /// Remove every temp file staged during one run. Deletion failures
    /// are logged and swallowed; they never mask the primary outcome.
    async fn cleanup_scratch(&self, scratch: &[PathBuf]) {
        for path in scratch {
            if !path.exists() {
                continue;
            }
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), error = %e, "failed to clean up temp file");
            }
        }
    }

    /// Snapshot of the running statistics, rates derived on read.
    pub fn statistics(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Delete pipeline temp files older than `max_age_hours`.
    pub fn cleanup_stale(&self, max_age_hours: u64) -> usize {
        self.audio.cleanup_stale(max_age_hours)
    }

    /// Periodic sweep entry point with the default 24h age.
    pub fn cleanup_periodic(&self) -> usize {
        self.cleanup_stale(STALE_SWEEP_HOURS)
    }

    /// Search a completed outcome for words (service search with local
    /// fallback).
    pub async fn search_words(
        &self,
        outcome: &TranscriptionOutcome,
        words: &[String],
    ) -> WordSearchResults {
        self.client.search_words(outcome, words).await
    }

    /// Render an outcome as the user-visible reply.
    pub fn format_response(&self, outcome: &TranscriptionOutcome, include_extras: bool) -> String {
        self.formatter.format_outcome(outcome, include_extras)
    }

    /// Render word-search results for display.
    pub fn format_search_results(&self, results: &WordSearchResults) -> String {
        ResponseFormatter::format_search_results(results)
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }
}
