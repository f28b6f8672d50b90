//! Speech-optimization DSP: resampling, amplitude normalization,
//! high-pass filtering, and canonical WAV encoding.

use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

use crate::error::{Result, VoiceError};

/// Peak target leaving ~0.1 dB headroom, matching the amplitude
/// normalization the transcription service is tuned for.
const PEAK_TARGET: f32 = 0.988;

/// Resample mono PCM to `target_rate`.
///
/// Sinc interpolation with a BlackmanHarris2 window, 256-tap filter and
/// 0.95 cutoff; single-pass with chunk size equal to the input length.
pub fn resample_mono(samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if samples.is_empty() || source_rate == target_rate {
        return Ok(samples);
    }
    if source_rate == 0 || target_rate == 0 {
        return Err(VoiceError::Internal(
            "sample rate must be greater than zero".to_string(),
        ));
    }

    let num_frames = samples.len();
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let resample_ratio = target_rate as f64 / source_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(resample_ratio, 2.0, params, num_frames, 1)
        .map_err(|e| VoiceError::Internal(format!("failed to create resampler: {}", e)))?;

    let output_channels = resampler
        .process(&[samples], None)
        .map_err(|e| VoiceError::Internal(format!("resampling failed: {}", e)))?;

    let output = output_channels
        .into_iter()
        .next()
        .unwrap_or_default();

    debug!(
        "resampled {} frames ({} Hz) -> {} frames ({} Hz)",
        num_frames,
        source_rate,
        output.len(),
        target_rate
    );

    Ok(output)
}

/// Scale samples so the peak hits `PEAK_TARGET`. Silence is left untouched.
pub fn peak_normalize(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= f32::EPSILON {
        return;
    }

    let gain = PEAK_TARGET / peak;
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}

/// First-order RC high-pass, in place.
///
/// Removes low-frequency noise (handling rumble, mains hum) below
/// `cutoff_hz` before submission to speech recognition.
pub fn high_pass(samples: &mut [f32], sample_rate: u32, cutoff_hz: f32) {
    if samples.is_empty() || sample_rate == 0 || cutoff_hz <= 0.0 {
        return;
    }

    let dt = 1.0 / sample_rate as f32;
    let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
    let alpha = rc / (rc + dt);

    let mut prev_input = samples[0];
    let mut prev_output = samples[0];

    for sample in samples.iter_mut().skip(1) {
        let input = *sample;
        let output = alpha * (prev_output + input - prev_input);
        prev_input = input;
        prev_output = output;
        *sample = output;
    }
}

/// Encode mono samples as 16-bit PCM WAV at `sample_rate`.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| VoiceError::Internal(format!("failed to create WAV writer: {}", e)))?;

    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * i16::MAX as f32) as i16;
        writer
            .write_sample(value)
            .map_err(|e| VoiceError::Internal(format!("failed to write WAV sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| VoiceError::Internal(format!("failed to finalize WAV: {}", e)))?;

    Ok(())
}
