//! Shared numeric helpers
//!
//! Level conversions and time-constant math used by every processor.

use tracing::warn;

use crate::error::DspError;

/// Linear floor applied before any logarithm, keeps silence at -160dB instead of -inf
pub const EPSILON: f32 = 1e-8;

/// Rate used when a constructor is handed an unusable sample rate
pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;

pub const MIN_SAMPLE_RATE: f64 = 8000.0;
pub const MAX_SAMPLE_RATE: f64 = 384000.0;

/// Convert decibels to linear amplitude
/// Formula: amplitude = 10^(dB/20)
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels, flooring at [`EPSILON`]
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    20.0 * linear.max(EPSILON).log10()
}

/// One-pole smoothing coefficient for a time constant: `exp(-1 / (t * fs))`
#[inline]
pub fn time_constant_coeff(time_ms: f32, sample_rate: f64) -> f32 {
    let samples = time_ms * 0.001 * sample_rate as f32;
    if samples <= 0.0 {
        // Zero time constant means "jump straight to target"
        return 0.0;
    }
    (-1.0 / samples).exp()
}

/// Check that a sample rate is finite and inside the supported range
pub fn validate_sample_rate(sample_rate: f64) -> Result<f64, DspError> {
    if sample_rate.is_finite() && (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        Ok(sample_rate)
    } else {
        Err(DspError::InvalidSampleRate {
            got: sample_rate,
            min: MIN_SAMPLE_RATE,
            max: MAX_SAMPLE_RATE,
        })
    }
}

/// Constructor-side rate check: falls back to [`DEFAULT_SAMPLE_RATE`] so a
/// freshly built processor always has sized buffers.
pub(crate) fn sample_rate_or_default(sample_rate: f64, processor: &str) -> f64 {
    match validate_sample_rate(sample_rate) {
        Ok(rate) => rate,
        Err(e) => {
            warn!("{}: {}, falling back to {}Hz", processor, e, DEFAULT_SAMPLE_RATE);
            DEFAULT_SAMPLE_RATE
        }
    }
}
