//! Feed-forward Compressor
//!
//! Per sample:
//! 1. Stereo-linked peak level in dB (`max(|L|, |R|)`, floored at 1e-8)
//! 2. Static curve: target reduction from threshold, ratio and knee
//! 3. One-pole envelope toward the target gain (attack down, release up)
//! 4. Both channels scaled by `envelope * makeup`
//!
//! # Auto makeup
//!
//! The metered reduction is averaged with a 2 s one-pole filter. With auto
//! makeup enabled the makeup gain becomes the negated average, capped at
//! [`AUTO_MAKEUP_MAX_DB`], so heavier average compression gets more gain
//! back without the makeup running away on sustained deep reduction.

use tracing::debug;

use crate::dynamics::{EnvelopeFollower, LinkedPeakDetector, DETECTOR_CHUNK};
use crate::error::DspError;
use crate::params::CompressorParams;
use crate::processor::AudioProcessor;
use crate::util::{db_to_linear, linear_to_db, sample_rate_or_default, time_constant_coeff, validate_sample_rate};

/// Time constant of the reduction average driving auto makeup
pub const AUTO_MAKEUP_AVERAGE_MS: f32 = 2000.0;

/// Upper bound on auto makeup
pub const AUTO_MAKEUP_MAX_DB: f32 = 12.0;

/// Static gain-reduction curve, in dB (always <= 0)
///
/// Below `threshold - knee/2` nothing happens, above `threshold + knee/2` the
/// full ratio applies, and inside the knee the slope is blended in
/// quadratically so the curve is continuous at both edges.
#[inline]
pub fn gain_reduction_db(level_db: f32, threshold_db: f32, ratio: f32, knee_db: f32) -> f32 {
    let slope = 1.0 / ratio - 1.0;
    let half_knee = knee_db / 2.0;

    if level_db <= threshold_db - half_knee {
        0.0
    } else if knee_db > 0.0 && level_db < threshold_db + half_knee {
        let into_knee = level_db - threshold_db + half_knee;
        let knee_fraction = into_knee / knee_db;
        slope * knee_fraction * into_knee / 2.0
    } else {
        slope * (level_db - threshold_db)
    }
}

/// Makeup applied for a given average reduction
#[inline]
pub fn auto_makeup_db(average_reduction_db: f32) -> f32 {
    (-average_reduction_db).clamp(0.0, AUTO_MAKEUP_MAX_DB)
}

pub struct Compressor {
    params: CompressorParams,
    sample_rate: f64,
    detector: LinkedPeakDetector,
    envelope: EnvelopeFollower,
    /// Smoothed reduction reported to meters
    gain_reduction_db: f32,
    average_reduction_db: f32,
    average_coeff: f32,
}

impl Compressor {
    pub fn new(sample_rate: f64) -> Self {
        let mut compressor = Self {
            params: CompressorParams::default(),
            sample_rate: sample_rate_or_default(sample_rate, "Compressor"),
            detector: LinkedPeakDetector::new(),
            envelope: EnvelopeFollower::new(),
            gain_reduction_db: 0.0,
            average_reduction_db: 0.0,
            average_coeff: 0.0,
        };
        compressor.update_coefficients();
        compressor
    }

    /// Apply a new parameter record, clamped to the physical ranges
    pub fn configure(&mut self, params: CompressorParams) {
        self.params = params.clamped();
        self.update_coefficients();
    }

    pub fn params(&self) -> &CompressorParams {
        &self.params
    }

    /// Makeup gain currently applied, in dB
    pub fn makeup_gain_db(&self) -> f32 {
        if self.params.auto_makeup {
            auto_makeup_db(self.average_reduction_db)
        } else {
            self.params.makeup_gain_db
        }
    }

    fn update_coefficients(&mut self) {
        self.envelope
            .set_times(self.params.attack_ms, self.params.release_ms, self.sample_rate);
        self.average_coeff = time_constant_coeff(AUTO_MAKEUP_AVERAGE_MS, self.sample_rate);
    }

    /// Compress with detection driven by an external key
    ///
    /// With `sidechain = None` the program material is its own key. The frame
    /// count is the shortest of all slices involved.
    pub fn process_block_with_sidechain(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        sidechain: Option<(&[f32], &[f32])>,
    ) {
        let mut frames = left.len().min(right.len());
        if let Some((key_left, key_right)) = sidechain {
            frames = frames.min(key_left.len()).min(key_right.len());
        }

        let CompressorParams {
            threshold_db,
            ratio,
            knee_db,
            auto_makeup,
            ..
        } = self.params;
        let static_makeup = db_to_linear(self.params.makeup_gain_db);

        let mut start = 0;
        while start < frames {
            let end = (start + DETECTOR_CHUNK).min(frames);
            let levels = match sidechain {
                Some((key_left, key_right)) => self
                    .detector
                    .levels_db(&key_left[start..end], &key_right[start..end]),
                None => self.detector.levels_db(&left[start..end], &right[start..end]),
            };

            for (offset, &level_db) in levels.iter().enumerate() {
                let target = db_to_linear(gain_reduction_db(level_db, threshold_db, ratio, knee_db));
                let gain = self.envelope.next(target);
                self.gain_reduction_db = linear_to_db(gain);

                self.average_reduction_db = self.average_coeff * self.average_reduction_db
                    + (1.0 - self.average_coeff) * self.gain_reduction_db;
                let makeup = if auto_makeup {
                    db_to_linear(auto_makeup_db(self.average_reduction_db))
                } else {
                    static_makeup
                };

                let total = gain * makeup;
                left[start + offset] *= total;
                right[start + offset] *= total;
            }
            start = end;
        }
    }
}

impl AudioProcessor for Compressor {
    fn initialize(&mut self, sample_rate: f64) -> Result<(), DspError> {
        self.sample_rate = validate_sample_rate(sample_rate)?;
        self.reset();
        self.update_coefficients();
        debug!("Compressor initialized at {}Hz", self.sample_rate);
        Ok(())
    }

    fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.process_block_with_sidechain(left, right, None);
    }

    fn reset(&mut self) {
        self.envelope.reset();
        self.gain_reduction_db = 0.0;
        self.average_reduction_db = 0.0;
    }

    fn name(&self) -> &'static str {
        "Compressor"
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn current_meter(&self) -> Option<f32> {
        Some(self.gain_reduction_db)
    }
}
