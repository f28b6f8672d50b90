//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::path::Path;

use async_trait::async_trait;

use aivi_vt::transport::{VoiceAttachment, VoiceTransport};

/// What the stub transport does on download
pub enum Payload {
    Bytes(Vec<u8>),
    FailDownload,
    FailIndicator,
}

/// Chat-transport stub backed by an in-memory payload
pub struct MockTransport {
    pub payload: Payload,
}

#[async_trait]
impl VoiceTransport for MockTransport {
    async fn download_to(
        &self,
        _attachment: &VoiceAttachment,
        dest: &Path,
    ) -> std::io::Result<()> {
        match &self.payload {
            Payload::Bytes(bytes) => std::fs::write(dest, bytes),
            Payload::FailDownload => Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "transport read failed",
            )),
            Payload::FailIndicator => std::fs::write(dest, b"unused"),
        }
    }

    async fn notify_processing(&self, _owner_id: i64) -> std::io::Result<()> {
        match self.payload {
            Payload::FailIndicator => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "chat action failed",
            )),
            _ => Ok(()),
        }
    }
}

/// Mono/stereo PCM WAV with a 330 Hz tone
pub fn wav_fixture(sample_rate: u32, channels: u16, seconds: f64) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let frames = (sample_rate as f64 * seconds) as usize;
        for i in 0..frames {
            let t = i as f64 / sample_rate as f64;
            let value =
                ((2.0 * std::f64::consts::PI * 330.0 * t).sin() * 0.4 * i16::MAX as f64) as i16;
            for _ in 0..channels {
                writer.write_sample(value).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

pub fn attachment(duration_seconds: f64, size_bytes: u64) -> VoiceAttachment {
    VoiceAttachment {
        file_id: "file-under-test".to_string(),
        mime_type: Some("audio/wav".to_string()),
        duration_seconds: Some(duration_seconds),
        size_bytes: Some(size_bytes),
    }
}

/// Files left in the staging directory after a run
pub fn staged_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}
