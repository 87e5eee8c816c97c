//! Audio feature extraction
//!
//! Decodes a downloaded audio file with symphonia at its native rate,
//! recovers the metadata of the original resource (duration, channels,
//! native sample rate), mixes to mono, and resamples the mono signal to
//! the tagger rate when the native rate differs. CPU-bound; callers run
//! it on the worker pool.

use std::path::Path;

use anyhow::{Context, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::models::AudioFeatures;
use klang_common::Error;

/// Sample rate the tagger model expects
pub const TAGGER_SAMPLE_RATE: u32 = 16_000;

/// Decoded mono waveforms: the native-rate signal for the heuristic
/// classifier and the tagger-rate signal for the model classifier.
#[derive(Debug, Clone)]
pub struct WaveformPair {
    /// Mono samples at the native rate, range [-1.0, 1.0]
    pub native: Vec<f32>,
    /// Native sample rate in Hz
    pub native_rate: u32,
    /// Mono samples resampled to `TAGGER_SAMPLE_RATE`
    pub tagger: Vec<f32>,
}

/// Decode an audio file and derive its features and waveforms.
///
/// Fails with `Error::Decode` carrying the underlying cause when the file
/// cannot be parsed as audio.
pub fn extract_features(path: &Path) -> klang_common::Result<(AudioFeatures, WaveformPair)> {
    let decoded = decode_mono(path).map_err(|e| Error::Decode(format!("{:#}", e)))?;

    let duration = decoded.samples.len() as f64 / decoded.sample_rate as f64;
    let features = AudioFeatures {
        duration: (duration * 100.0).round() / 100.0,
        sample_rate: decoded.sample_rate,
        channels: decoded.channels,
    };

    let tagger = if decoded.sample_rate == TAGGER_SAMPLE_RATE {
        decoded.samples.clone()
    } else {
        resample_mono(&decoded.samples, decoded.sample_rate, TAGGER_SAMPLE_RATE)
            .map_err(|e| Error::Internal(format!("resampling failed: {:#}", e)))?
    };

    debug!(
        duration = features.duration,
        sample_rate = features.sample_rate,
        channels = features.channels,
        tagger_samples = tagger.len(),
        "Feature extraction complete"
    );

    Ok((
        features,
        WaveformPair {
            native: decoded.samples,
            native_rate: decoded.sample_rate,
            tagger,
        },
    ))
}

struct DecodedMono {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u32,
}

/// Decode all packets of the default audio track into mono f32 samples.
fn decode_mono(path: &Path) -> Result<DecodedMono> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open audio file {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("unsupported or corrupt container")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("no audio track found")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("sample rate unknown")?;
    let channels = track
        .codec_params
        .channels
        .context("channel layout unknown")?
        .count() as u32;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("failed to create decoder for track codec")?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e).context("failed to read packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet).context("failed to decode packet")?;
        mix_to_mono(&decoded, &mut samples);
    }

    Ok(DecodedMono {
        samples,
        sample_rate,
        channels,
    })
}

/// Append the buffer's frames to `out` as mono samples (channel average).
fn mix_to_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    macro_rules! mix {
        ($buf:expr) => {{
            let channels = $buf.spec().channels.count();
            let frames = $buf.frames();
            out.reserve(frames);
            for frame in 0..frames {
                let mut acc = 0.0f32;
                for ch in 0..channels {
                    acc += f32::from_sample($buf.chan(ch)[frame]);
                }
                out.push(acc / channels as f32);
            }
        }};
    }

    match decoded {
        AudioBufferRef::U8(buf) => mix!(buf),
        AudioBufferRef::U16(buf) => mix!(buf),
        AudioBufferRef::U24(buf) => mix!(buf),
        AudioBufferRef::U32(buf) => mix!(buf),
        AudioBufferRef::S8(buf) => mix!(buf),
        AudioBufferRef::S16(buf) => mix!(buf),
        AudioBufferRef::S24(buf) => mix!(buf),
        AudioBufferRef::S32(buf) => mix!(buf),
        AudioBufferRef::F32(buf) => mix!(buf),
        AudioBufferRef::F64(buf) => mix!(buf),
    }
}

/// Resample a mono signal with sinc interpolation (single pass, chunk
/// size equal to the input length).
fn resample_mono(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)
        .context("failed to create resampler")?;

    let mut output = resampler
        .process(&[samples.to_vec()], None)
        .context("resampling failed")?;

    debug!(
        input_frames = samples.len(),
        output_frames = output[0].len(),
        source_rate,
        target_rate,
        "Resampled mono signal"
    );

    Ok(output.remove(0))
}
