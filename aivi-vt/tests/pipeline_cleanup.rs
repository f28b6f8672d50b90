//! Pipeline failure paths and the temp-file cleanup invariant
//!
//! For every run — success or induced failure at any stage — no file
//! staged by that run may remain on disk after `process` returns. None
//! of these tests reach the network: each induced failure fires before
//! any service call (the configured base URL points at a discard port to
//! make an accidental call fail fast and visibly).

mod common;

use aivi_vt::error::ErrorCategory;
use aivi_vt::{VoiceConfig, VoicePipeline};
use common::{attachment, staged_files, wav_fixture, MockTransport, Payload};

fn offline_config() -> VoiceConfig {
    let mut config = VoiceConfig::with_api_key("test-key");
    config.api_base_url = "http://127.0.0.1:9".to_string();
    config
}

fn pipeline_in(dir: &tempfile::TempDir, config: VoiceConfig) -> VoicePipeline {
    VoicePipeline::with_temp_dir(config, dir.path().to_path_buf()).unwrap()
}

#[tokio::test]
async fn download_failure_yields_failed_outcome_and_clean_dir() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(&dir, offline_config());
    let transport = MockTransport {
        payload: Payload::FailDownload,
    };

    let outcome = pipeline.process(&transport, &attachment(3.0, 9_000), 42).await;

    assert!(outcome.is_failed());
    let error = outcome.error.as_ref().unwrap();
    assert_eq!(error.category, ErrorCategory::Network);
    assert!(error.message.contains("download failed"));
    assert!(staged_files(dir.path()).is_empty(), "temp dir must be clean");

    let stats = pipeline.statistics();
    assert_eq!(stats.messages_processed, 1);
    assert_eq!(stats.failed_transcriptions, 1);
    assert_eq!(stats.success_rate, 0.0);
}

#[tokio::test]
async fn undecodable_audio_yields_format_failure_and_clean_dir() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(&dir, offline_config());
    let transport = MockTransport {
        payload: Payload::Bytes(b"not an audio container at all".to_vec()),
    };

    let outcome = pipeline.process(&transport, &attachment(3.0, 29), 42).await;

    assert!(outcome.is_failed());
    assert_eq!(
        outcome.error.as_ref().unwrap().category,
        ErrorCategory::Format
    );
    assert!(staged_files(dir.path()).is_empty(), "temp dir must be clean");
}

#[tokio::test]
async fn too_short_clip_fails_validation_without_a_service_call() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(&dir, offline_config());
    // 0.2s decodes fine but sits below the 0.5s minimum
    let transport = MockTransport {
        payload: Payload::Bytes(wav_fixture(16_000, 1, 0.2)),
    };

    let outcome = pipeline.process(&transport, &attachment(0.2, 6_400), 42).await;

    assert!(outcome.is_failed());
    let error = outcome.error.as_ref().unwrap();
    // Validation error, not the Network error a service call would produce
    assert_eq!(error.category, ErrorCategory::TooShort);
    assert!(staged_files(dir.path()).is_empty(), "temp dir must be clean");
}

#[tokio::test]
async fn oversized_clip_fails_validation_without_a_service_call() {
    let mut config = offline_config();
    config.max_file_size_mb = 1;
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(&dir, config);
    // 35s of 16 kHz mono 16-bit PCM ≈ 1.1 MB, above the 1 MB cap
    let transport = MockTransport {
        payload: Payload::Bytes(wav_fixture(16_000, 1, 35.0)),
    };

    let outcome = pipeline.process(&transport, &attachment(35.0, 1_120_000), 42).await;

    assert!(outcome.is_failed());
    let error = outcome.error.as_ref().unwrap();
    assert_eq!(error.category, ErrorCategory::FileSize);
    assert!(error.message.contains("too large"));
    assert!(staged_files(dir.path()).is_empty(), "temp dir must be clean");
}

#[tokio::test]
async fn indicator_failure_is_caught_and_dir_stays_clean() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(&dir, offline_config());
    let transport = MockTransport {
        payload: Payload::FailIndicator,
    };

    let outcome = pipeline.process(&transport, &attachment(3.0, 9_000), 42).await;

    assert!(outcome.is_failed());
    assert_eq!(
        outcome.error.as_ref().unwrap().category,
        ErrorCategory::Generic
    );
    assert!(staged_files(dir.path()).is_empty());
}

#[tokio::test]
async fn failure_counters_accumulate_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(&dir, offline_config());

    for _ in 0..3 {
        let transport = MockTransport {
            payload: Payload::FailDownload,
        };
        let outcome = pipeline.process(&transport, &attachment(2.0, 1_000), 7).await;
        assert!(outcome.is_failed());
    }

    let stats = pipeline.statistics();
    assert_eq!(stats.messages_processed, 3);
    assert_eq!(stats.failed_transcriptions, 3);
    assert_eq!(stats.successful_transcriptions, 0);
}

#[tokio::test]
async fn failed_outcome_renders_guidance_not_taxonomy() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(&dir, offline_config());
    let transport = MockTransport {
        payload: Payload::Bytes(wav_fixture(16_000, 1, 0.2)),
    };

    let outcome = pipeline.process(&transport, &attachment(0.2, 6_400), 42).await;
    let rendered = pipeline.format_response(&outcome, false);

    assert!(rendered.contains("too short"));
    assert!(rendered.contains("0.5"));
    assert!(!rendered.contains("VoiceError"));
}

#[tokio::test]
async fn stale_sweep_runs_through_the_pipeline_entry_point() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(&dir, offline_config());

    std::fs::write(dir.path().join("voice_9_dead.ogg"), b"leaked").unwrap();
    std::fs::write(dir.path().join("unrelated.log"), b"keep me").unwrap();

    let cleaned = pipeline.cleanup_stale(0);

    assert_eq!(cleaned, 1);
    assert!(!dir.path().join("voice_9_dead.ogg").exists());
    assert!(dir.path().join("unrelated.log").exists());
}
