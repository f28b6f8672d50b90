//! Audio decoding and speech-optimized signal processing
//!
//! Turns arbitrary voice-note containers (Ogg/Opus, MP3, M4A, WAV, ...)
//! into the canonical transcription form: mono, 16 kHz, peak-normalized,
//! high-pass filtered PCM.

mod decoder;
mod dsp;

pub use decoder::{decode_file, DecodedAudio};
pub use dsp::{high_pass, peak_normalize, resample_mono, write_wav};

/// Canonical sample rate for speech recognition input
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// High-pass cutoff to suppress low-frequency noise (handling rumble, hum)
pub const HIGH_PASS_CUTOFF_HZ: f32 = 100.0;
