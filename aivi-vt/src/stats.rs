//! Pipeline statistics
//!
//! Running counters owned by the orchestrator, mutated once per pipeline
//! run under a mutex whose critical section is a handful of increments.
//! Derived rates are computed lazily on snapshot, never stored. Counters
//! reset only on process restart.

use std::sync::Mutex;

use serde::Serialize;

use crate::models::TranscriptionOutcome;

#[derive(Debug, Default, Clone)]
struct StatsInner {
    messages_processed: u64,
    successful_transcriptions: u64,
    failed_transcriptions: u64,
    total_audio_duration_seconds: f64,
    total_processing_time_seconds: f64,
}

/// Process-wide running counters
#[derive(Debug, Default)]
pub struct PipelineStats {
    inner: Mutex<StatsInner>,
}

/// Read-only snapshot with lazily derived rates
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub messages_processed: u64,
    pub successful_transcriptions: u64,
    pub failed_transcriptions: u64,
    pub total_audio_duration_seconds: f64,
    pub total_processing_time_seconds: f64,
    /// successes / messages, 0 when nothing was processed
    pub success_rate: f64,
    pub avg_processing_time_seconds: f64,
    pub avg_audio_duration_seconds: f64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an inbound message before processing begins.
    pub fn record_message(&self) {
        let mut inner = self.inner.lock().expect("stats mutex poisoned");
        inner.messages_processed += 1;
    }

    /// Fold one finished pipeline run into the counters.
    pub fn record_outcome(&self, outcome: &TranscriptionOutcome) {
        let mut inner = self.inner.lock().expect("stats mutex poisoned");
        inner.total_audio_duration_seconds += outcome.duration_seconds;
        inner.total_processing_time_seconds += outcome.processing_time_seconds;
        if outcome.is_failed() {
            inner.failed_transcriptions += 1;
        } else {
            inner.successful_transcriptions += 1;
        }
    }

    /// Snapshot with derived rates computed on read.
    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock().expect("stats mutex poisoned").clone();

        let (success_rate, avg_processing, avg_duration) = if inner.messages_processed > 0 {
            let messages = inner.messages_processed as f64;
            (
                inner.successful_transcriptions as f64 / messages,
                inner.total_processing_time_seconds / messages,
                inner.total_audio_duration_seconds / messages,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        StatsSnapshot {
            messages_processed: inner.messages_processed,
            successful_transcriptions: inner.successful_transcriptions,
            failed_transcriptions: inner.failed_transcriptions,
            total_audio_duration_seconds: inner.total_audio_duration_seconds,
            total_processing_time_seconds: inner.total_processing_time_seconds,
            success_rate,
            avg_processing_time_seconds: avg_processing,
            avg_audio_duration_seconds: avg_duration,
        }
    }
}
