//! Audio decoder using symphonia
//!
//! Decodes voice-note audio (Ogg/Opus, MP3, M4A/AAC, WAV, FLAC, Vorbis) to
//! mono f32 PCM. Multi-channel sources are downmixed by averaging.

use std::path::Path;
use std::sync::OnceLock;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{CodecRegistry, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use symphonia_adapter_libopus::OpusDecoder;
use tracing::{debug, warn};

use crate::error::{Result, VoiceError};

/// Decoded mono PCM plus source stream properties
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Source sample rate in Hz
    pub sample_rate: u32,
    /// Channel count of the source before downmix
    pub source_channels: u16,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Codec registry with Opus support.
///
/// Chat transports deliver voice notes as Ogg/Opus, which symphonia does
/// not decode natively; the libopus adapter is registered alongside the
/// stock decoders.
fn codec_registry() -> &'static CodecRegistry {
    static CODEC_REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();
    CODEC_REGISTRY.get_or_init(|| {
        let mut registry = CodecRegistry::new();
        registry.register_all::<OpusDecoder>();
        registry.register_all::<symphonia::default::codecs::MpaDecoder>();
        registry.register_all::<symphonia::default::codecs::PcmDecoder>();
        registry.register_all::<symphonia::default::codecs::VorbisDecoder>();
        registry.register_all::<symphonia::default::codecs::FlacDecoder>();
        registry.register_all::<symphonia::default::codecs::AdpcmDecoder>();
        registry.register_all::<symphonia::default::codecs::AacDecoder>();
        registry
    })
}

/// Decode an entire audio file to mono f32 PCM.
///
/// # Errors
/// `UnsupportedFormat` when the container cannot be probed, no audio track
/// exists, the decoder cannot be created, or no frame decodes (corrupted
/// input). This failure is terminal and is never retried.
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    debug!("decoding audio file: {}", path.display());

    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| VoiceError::UnsupportedFormat(format!("failed to probe format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| VoiceError::UnsupportedFormat("no audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| VoiceError::UnsupportedFormat("sample rate not declared".to_string()))?;
    let channels = codec_params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| VoiceError::UnsupportedFormat("channel count not declared".to_string()))?;

    let mut decoder = codec_registry()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| VoiceError::UnsupportedFormat(format!("failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                warn!("error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => downmix_buffer(&decoded, &mut samples),
            Err(e) => {
                warn!("decode error: {}", e);
                continue;
            }
        }
    }

    if samples.is_empty() {
        return Err(VoiceError::UnsupportedFormat(
            "no decodable audio frames".to_string(),
        ));
    }

    debug!(
        "decoded {} mono samples ({} Hz, {} source channels)",
        samples.len(),
        sample_rate,
        channels
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        source_channels: channels,
    })
}

/// Downmix one decoded buffer to mono and append to `out`.
fn downmix_buffer(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => downmix_planar(buf, out),
        AudioBufferRef::F64(buf) => downmix_planar(buf, out),
        AudioBufferRef::S32(buf) => downmix_planar(buf, out),
        AudioBufferRef::S24(buf) => downmix_planar(buf, out),
        AudioBufferRef::S16(buf) => downmix_planar(buf, out),
        AudioBufferRef::S8(buf) => downmix_planar(buf, out),
        AudioBufferRef::U32(buf) => downmix_planar(buf, out),
        AudioBufferRef::U24(buf) => downmix_planar(buf, out),
        AudioBufferRef::U16(buf) => downmix_planar(buf, out),
        AudioBufferRef::U8(buf) => downmix_planar(buf, out),
    }
}

/// Average all channels of a planar buffer into mono f32 frames.
fn downmix_planar<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count();
    let num_frames = buf.frames();
    if num_channels == 0 {
        return;
    }

    out.reserve(num_frames);
    for frame_idx in 0..num_frames {
        let mut acc = 0.0f32;
        for ch_idx in 0..num_channels {
            acc += f32::from_sample(buf.chan(ch_idx)[frame_idx]);
        }
        out.push(acc / num_channels as f32);
    }
}
