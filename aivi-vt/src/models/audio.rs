//! Staged audio files and their derived metadata

use std::path::PathBuf;

use crate::transport::VoiceAttachment;

/// Processing stage of a staged audio file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioStage {
    /// As downloaded from the transport, format unknown until decoded
    Raw,
    /// Canonical form: mono, 16 kHz, amplitude-normalized WAV
    Normalized,
}

/// A staged audio file plus derived metadata.
///
/// The file is exclusively owned by the pipeline invocation that created
/// it and is deleted by that invocation's cleanup, success or failure.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    /// Local path of the staged file
    pub path: PathBuf,
    /// MIME type declared by the transport
    pub mime_type: String,
    /// File size on disk
    pub size_bytes: u64,
    /// Duration in seconds (transport-declared for `Raw`, decoded for `Normalized`)
    pub duration_seconds: f64,
    /// Channel count (0 for `Raw` until decoded; always 1 for `Normalized`)
    pub channels: u16,
    /// Sample rate in Hz (0 for `Raw` until decoded; always 16000 for `Normalized`)
    pub sample_rate: u32,
    /// Processing stage tag
    pub stage: AudioStage,
}

/// Decoded stream properties of one side (input or output) of normalization
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub duration_seconds: f64,
    pub channels: u16,
    pub sample_rate: u32,
    pub size_bytes: u64,
    /// Container/extension tag ("ogg", "mp3", "wav", ...)
    pub format: String,
}

/// Metadata produced by one normalization run
#[derive(Debug, Clone)]
pub struct NormalizeReport {
    pub original: StreamInfo,
    pub normalized: StreamInfo,
    /// Normalized size over original size
    pub compression_ratio: f64,
    /// Wall-clock decode/resample/encode time in seconds
    pub processing_time_seconds: f64,
}

/// The metadata bundle handed to the transcription client: decoded facts
/// about the normalized clip plus the transport's (approximate) declares.
#[derive(Debug, Clone)]
pub struct ClipMetadata {
    /// Decoded duration of the normalized clip
    pub duration_seconds: f64,
    /// Size of the normalized file submitted to the service
    pub size_bytes: u64,
    /// Format tag of the source file, before normalization
    pub source_format: String,
    /// Duration the transport declared for the attachment
    pub declared_duration_seconds: Option<f64>,
    /// Size the transport declared for the attachment
    pub declared_size_bytes: Option<u64>,
    /// MIME type the transport declared for the attachment
    pub declared_mime_type: Option<String>,
}

impl ClipMetadata {
    /// Merge a normalization report with the transport's declared metadata.
    pub fn from_report(report: &NormalizeReport, attachment: &VoiceAttachment) -> Self {
        Self {
            duration_seconds: report.normalized.duration_seconds,
            size_bytes: report.normalized.size_bytes,
            source_format: report.original.format.clone(),
            declared_duration_seconds: attachment.duration_seconds,
            declared_size_bytes: attachment.size_bytes,
            declared_mime_type: attachment.mime_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> NormalizeReport {
        NormalizeReport {
            original: StreamInfo {
                duration_seconds: 5.2,
                channels: 2,
                sample_rate: 48_000,
                size_bytes: 80_000,
                format: "ogg".to_string(),
            },
            normalized: StreamInfo {
                duration_seconds: 5.2,
                channels: 1,
                sample_rate: 16_000,
                size_bytes: 166_400,
                format: "wav".to_string(),
            },
            compression_ratio: 2.08,
            processing_time_seconds: 0.4,
        }
    }

    #[test]
    fn clip_metadata_keeps_source_format_and_normalized_size() {
        let attachment = VoiceAttachment {
            file_id: "f1".to_string(),
            mime_type: Some("audio/ogg".to_string()),
            duration_seconds: Some(5.0),
            size_bytes: Some(80_000),
        };

        let meta = ClipMetadata::from_report(&report(), &attachment);

        assert_eq!(meta.source_format, "ogg");
        assert_eq!(meta.size_bytes, 166_400);
        assert_eq!(meta.declared_duration_seconds, Some(5.0));
    }
}
