//! Signal-statistics classifier
//!
//! Model-free fallback strategy: three frame-averaged statistics (RMS
//! energy, zero-crossing rate, spectral centroid) feed an ordered rule
//! set. Pure and deterministic: the same waveform always yields the same
//! label, and classification never fails.

use apodize::hanning_iter;
use rustfft::{num_complex::Complex, FftPlanner};
use tracing::debug;

use crate::models::TaxonomyLabel;

/// Analysis frame length in samples
pub const FRAME_SIZE: usize = 2048;
/// Hop between successive frames in samples
pub const HOP_SIZE: usize = 512;

/// Mean RMS below this is silence
const SILENCE_RMS_THRESHOLD: f32 = 0.005;
/// Speech rule: centroid below this...
const SPEECH_CENTROID_MAX_HZ: f32 = 1000.0;
/// ...and ZCR below this
const SPEECH_ZCR_MAX: f32 = 0.1;
/// Music rule: centroid inside (min, max)...
const MUSIC_CENTROID_MIN_HZ: f32 = 1200.0;
const MUSIC_CENTROID_MAX_HZ: f32 = 3500.0;
/// ...and ZCR below this
const MUSIC_ZCR_MAX: f32 = 0.12;

/// Frame-averaged waveform statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalStats {
    /// Mean frame RMS amplitude
    pub rms: f32,
    /// Mean fraction of sample-to-sample sign changes per frame
    pub zcr: f32,
    /// Mean spectral centroid in Hz
    pub centroid_hz: f32,
}

/// Classify a mono waveform by its signal statistics.
///
/// Decision order (first match wins):
/// 1. mean RMS below 0.005 -> silence
/// 2. centroid < 1000 Hz and ZCR < 0.1 -> speech
/// 3. centroid in (1200, 3500) Hz and ZCR < 0.12 -> music
/// 4. otherwise -> noise
pub fn classify(samples: &[f32], sample_rate: u32) -> TaxonomyLabel {
    let stats = signal_stats(samples, sample_rate);
    debug!(
        rms = format!("{:.4}", stats.rms),
        zcr = format!("{:.4}", stats.zcr),
        centroid_hz = format!("{:.1}", stats.centroid_hz),
        "Heuristic metrics"
    );

    if stats.rms < SILENCE_RMS_THRESHOLD {
        return TaxonomyLabel::Silence;
    }

    if stats.centroid_hz < SPEECH_CENTROID_MAX_HZ && stats.zcr < SPEECH_ZCR_MAX {
        return TaxonomyLabel::Speech;
    }

    if stats.centroid_hz > MUSIC_CENTROID_MIN_HZ
        && stats.centroid_hz < MUSIC_CENTROID_MAX_HZ
        && stats.zcr < MUSIC_ZCR_MAX
    {
        return TaxonomyLabel::Music;
    }

    TaxonomyLabel::Noise
}

/// Compute the three frame-averaged statistics over the full waveform.
///
/// Waveforms shorter than one frame are analyzed as a single frame.
pub fn signal_stats(samples: &[f32], sample_rate: u32) -> SignalStats {
    if samples.is_empty() {
        return SignalStats {
            rms: 0.0,
            zcr: 0.0,
            centroid_hz: 0.0,
        };
    }

    let mut rms_sum = 0.0f64;
    let mut zcr_sum = 0.0f64;
    let mut frame_count = 0usize;

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FRAME_SIZE);
    let mut fft_buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); FRAME_SIZE];
    let mut scratch: Vec<Complex<f32>> =
        vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
    let window: Vec<f32> = hanning_iter(FRAME_SIZE).map(|x| x as f32).collect();

    let mut centroid_sum = 0.0f64;
    let mut centroid_frames = 0usize;

    for frame in frames(samples) {
        rms_sum += frame_rms(frame) as f64;
        zcr_sum += frame_zcr(frame) as f64;
        frame_count += 1;

        if frame.len() < 2 {
            continue;
        }

        // Hann-windowed magnitude spectrum, zero-padded to FRAME_SIZE.
        // Short frames get a window of their own length so the taper
        // still reaches zero before the padding.
        let short_window: Vec<f32>;
        let coeffs = if frame.len() == FRAME_SIZE {
            &window
        } else {
            short_window = hanning_iter(frame.len()).map(|x| x as f32).collect();
            &short_window
        };
        for (i, slot) in fft_buffer.iter_mut().enumerate() {
            let sample = match frame.get(i) {
                Some(&s) => s * coeffs[i],
                None => 0.0,
            };
            *slot = Complex::new(sample, 0.0);
        }
        fft.process_with_scratch(&mut fft_buffer, &mut scratch);

        let mut weighted = 0.0f64;
        let mut total = 0.0f64;
        for (bin, value) in fft_buffer.iter().take(FRAME_SIZE / 2 + 1).enumerate() {
            let magnitude = value.norm() as f64;
            let freq = bin as f64 * sample_rate as f64 / FRAME_SIZE as f64;
            weighted += freq * magnitude;
            total += magnitude;
        }
        if total > 1e-10 {
            centroid_sum += weighted / total;
            centroid_frames += 1;
        }
    }

    SignalStats {
        rms: (rms_sum / frame_count as f64) as f32,
        zcr: (zcr_sum / frame_count as f64) as f32,
        centroid_hz: if centroid_frames > 0 {
            (centroid_sum / centroid_frames as f64) as f32
        } else {
            0.0
        },
    }
}

/// Frame iterator: hop-spaced full frames, or the whole waveform when it
/// is shorter than one frame.
fn frames(samples: &[f32]) -> impl Iterator<Item = &[f32]> + '_ {
    let step = if samples.len() >= FRAME_SIZE {
        samples.len() - FRAME_SIZE
    } else {
        0
    };
    (0..=step)
        .step_by(HOP_SIZE)
        .map(move |start| &samples[start..samples.len().min(start + FRAME_SIZE)])
}

fn frame_rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = frame.iter().map(|&s| s * s).sum();
    (sum_squares / frame.len() as f32).sqrt()
}

/// Fraction of adjacent sample pairs whose sign differs, relative to the
/// frame length. Zero counts as positive.
fn frame_zcr(frame: &[f32]) -> f32 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|pair| (pair[0] < 0.0) != (pair[1] < 0.0))
        .count();
    crossings as f32 / frame.len() as f32
}
