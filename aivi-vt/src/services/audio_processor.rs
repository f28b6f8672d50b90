//! Audio staging and normalization
//!
//! Downloads a voice attachment to a uniquely named temp file, converts it
//! to the canonical transcription form (mono, 16 kHz, peak-normalized,
//! high-pass filtered WAV), and sweeps stale temp files left behind by
//! crashed invocations.
//!
//! This service never deletes the files it stages on failure; the
//! orchestrator's cleanup owns removal on every exit path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::audio::{self, HIGH_PASS_CUTOFF_HZ, TARGET_SAMPLE_RATE};
use crate::error::{Result, VoiceError};
use crate::models::{AudioAsset, AudioStage, NormalizeReport, StreamInfo};
use crate::transport::{VoiceAttachment, VoiceTransport};

/// Temp files staged by this pipeline carry this prefix; the stale sweep
/// never touches anything else.
const TEMP_FILE_PREFIX: &str = "voice_";

/// Audio file staging and optimization
pub struct AudioProcessor {
    temp_dir: PathBuf,
}

impl AudioProcessor {
    /// Use the system temp directory (`<tmp>/aivi_audio`).
    pub fn new() -> std::io::Result<Self> {
        Self::with_temp_dir(std::env::temp_dir().join("aivi_audio"))
    }

    /// Use an explicit staging directory (tests, embedders).
    pub fn with_temp_dir(temp_dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&temp_dir)?;
        Ok(Self { temp_dir })
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Fetch the attachment's bytes to a uniquely named local file.
    ///
    /// The destination path is recorded in `scratch` before the transfer
    /// starts so the caller's cleanup also covers partial downloads.
    pub async fn download(
        &self,
        transport: &dyn VoiceTransport,
        attachment: &VoiceAttachment,
        owner_id: i64,
        scratch: &mut Vec<PathBuf>,
    ) -> Result<AudioAsset> {
        let mime_type = attachment
            .mime_type
            .clone()
            .unwrap_or_else(|| "audio/ogg".to_string());
        let extension = mime_to_extension(&mime_type);
        let dest = self.staging_path(owner_id, &attachment.file_id, extension);
        scratch.push(dest.clone());

        let started = Instant::now();
        transport
            .download_to(attachment, &dest)
            .await
            .map_err(|e| VoiceError::Download(e.to_string()))?;

        let size_bytes = std::fs::metadata(&dest)
            .map_err(|_| VoiceError::Download("no bytes were written".to_string()))?
            .len();
        if size_bytes == 0 {
            return Err(VoiceError::Download("no bytes were written".to_string()));
        }

        info!(
            owner_id,
            file_id = %attachment.file_id,
            size_bytes,
            download_seconds = started.elapsed().as_secs_f64(),
            path = %dest.display(),
            "voice message downloaded"
        );

        Ok(AudioAsset {
            path: dest,
            mime_type,
            size_bytes,
            duration_seconds: attachment.duration_seconds.unwrap_or(0.0),
            channels: 0,
            sample_rate: 0,
            stage: AudioStage::Raw,
        })
    }

    /// Decode, downmix to mono, resample to 16 kHz, peak-normalize,
    /// high-pass at ~100 Hz, and re-encode as WAV next to the input.
    ///
    /// The codec work is CPU-bound and runs on a blocking worker so it
    /// cannot starve concurrent pipeline invocations.
    pub async fn normalize(
        &self,
        asset: &AudioAsset,
        scratch: &mut Vec<PathBuf>,
    ) -> Result<(AudioAsset, NormalizeReport)> {
        let source = asset.path.clone();
        let output = source.with_extension("wav");
        if output != source {
            scratch.push(output.clone());
        }

        let source_format = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("unknown")
            .to_ascii_lowercase();

        let started = Instant::now();
        let worker_output = output.clone();
        let (source_rate, source_channels, source_duration, normalized_frames) =
            tokio::task::spawn_blocking(move || -> Result<(u32, u16, f64, usize)> {
                let decoded = audio::decode_file(&source)?;
                let source_rate = decoded.sample_rate;
                let source_channels = decoded.source_channels;
                let source_duration = decoded.duration_seconds();

                let mut samples = if source_rate != TARGET_SAMPLE_RATE {
                    audio::resample_mono(decoded.samples, source_rate, TARGET_SAMPLE_RATE)?
                } else {
                    decoded.samples
                };
                audio::peak_normalize(&mut samples);
                audio::high_pass(&mut samples, TARGET_SAMPLE_RATE, HIGH_PASS_CUTOFF_HZ);
                audio::write_wav(&worker_output, &samples, TARGET_SAMPLE_RATE)?;

                Ok((source_rate, source_channels, source_duration, samples.len()))
            })
            .await
            .map_err(|e| VoiceError::Internal(format!("audio worker task failed: {}", e)))??;

        let processing_time_seconds = started.elapsed().as_secs_f64();
        let normalized_size = std::fs::metadata(&output)?.len();
        let normalized_duration = normalized_frames as f64 / TARGET_SAMPLE_RATE as f64;

        let report = NormalizeReport {
            original: StreamInfo {
                duration_seconds: source_duration,
                channels: source_channels,
                sample_rate: source_rate,
                size_bytes: asset.size_bytes,
                format: source_format,
            },
            normalized: StreamInfo {
                duration_seconds: normalized_duration,
                channels: 1,
                sample_rate: TARGET_SAMPLE_RATE,
                size_bytes: normalized_size,
                format: "wav".to_string(),
            },
            compression_ratio: if asset.size_bytes > 0 {
                normalized_size as f64 / asset.size_bytes as f64
            } else {
                0.0
            },
            processing_time_seconds,
        };

        info!(
            source_format = %report.original.format,
            source_rate,
            source_channels,
            duration_seconds = normalized_duration,
            normalized_size,
            compression_ratio = report.compression_ratio,
            processing_time_seconds,
            "audio normalization complete"
        );

        let normalized = AudioAsset {
            path: output,
            mime_type: "audio/wav".to_string(),
            size_bytes: normalized_size,
            duration_seconds: normalized_duration,
            channels: 1,
            sample_rate: TARGET_SAMPLE_RATE,
            stage: AudioStage::Normalized,
        };

        Ok((normalized, report))
    }

    /// Delete pipeline-owned temp files older than `max_age_hours`.
    ///
    /// Safety net against leaks from crashed invocations; files not
    /// matching the pipeline's naming pattern are never touched.
    pub fn cleanup_stale(&self, max_age_hours: u64) -> usize {
        let cutoff = Duration::from_secs(max_age_hours * 3600);
        let entries = match std::fs::read_dir(&self.temp_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, dir = %self.temp_dir.display(), "temp dir sweep failed");
                return 0;
            }
        };

        let mut cleaned = 0usize;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(TEMP_FILE_PREFIX) {
                continue;
            }

            let stale = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .map(|age| age >= cutoff)
                .unwrap_or(false);

            if stale {
                match std::fs::remove_file(entry.path()) {
                    Ok(()) => cleaned += 1,
                    Err(e) => warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "failed to delete stale temp file"
                    ),
                }
            }
        }

        if cleaned > 0 {
            info!(count = cleaned, "cleaned up stale temp audio files");
        }
        cleaned
    }

    /// Collision-safe staging path derived from the owner, a timestamp,
    /// and the attachment id.
    fn staging_path(&self, owner_id: i64, file_id: &str, extension: &str) -> PathBuf {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let mut hasher = Sha256::new();
        hasher.update(format!("{}_{}_{}", owner_id, timestamp, file_id));
        let digest = hasher.finalize();
        let short_hash: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();

        self.temp_dir
            .join(format!("{}{}_{}.{}", TEMP_FILE_PREFIX, owner_id, short_hash, extension))
    }
}

/// Map a transport-declared MIME type to a file extension; unrecognized
/// types default to the transport's usual container.
fn mime_to_extension(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/wav" => "wav",
        "audio/webm" => "webm",
        "audio/opus" => "opus",
        _ => "ogg",
    }
}
