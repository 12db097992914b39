//! Building blocks shared by the compressor and the limiter

use crate::simd;
use crate::util::time_constant_coeff;

/// Frames the detector converts to dB in one pass
pub const DETECTOR_CHUNK: usize = 64;

/// Stereo-linked peak detector
///
/// Produces one level per frame, `max(dB|left|, dB|right|)`, so both
/// channels receive the same gain and the stereo image does not shift.
/// dB conversion is monotonic, so this equals the dB of the larger peak.
pub struct LinkedPeakDetector {
    left_db: [f32; DETECTOR_CHUNK],
    right_db: [f32; DETECTOR_CHUNK],
    level_db: [f32; DETECTOR_CHUNK],
}

impl LinkedPeakDetector {
    pub fn new() -> Self {
        Self {
            left_db: [0.0; DETECTOR_CHUNK],
            right_db: [0.0; DETECTOR_CHUNK],
            level_db: [0.0; DETECTOR_CHUNK],
        }
    }

    /// Linked levels for up to [`DETECTOR_CHUNK`] frames
    #[inline]
    pub fn levels_db(&mut self, left: &[f32], right: &[f32]) -> &[f32] {
        let n = left.len().min(right.len()).min(DETECTOR_CHUNK);
        simd::to_decibels(&mut self.left_db[..n], &left[..n]);
        simd::to_decibels(&mut self.right_db[..n], &right[..n]);
        simd::max(&mut self.level_db[..n], &self.left_db[..n], &self.right_db[..n]);
        &self.level_db[..n]
    }
}

impl Default for LinkedPeakDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// One-pole gain smoother with separate attack and release
///
/// Attack applies while the gain is being pulled down further, release
/// while it recovers toward unity.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeFollower {
    attack_coeff: f32,
    release_coeff: f32,
    gain: f32,
}

impl EnvelopeFollower {
    pub fn new() -> Self {
        Self {
            attack_coeff: 0.0,
            release_coeff: 0.0,
            gain: 1.0,
        }
    }

    pub fn set_times(&mut self, attack_ms: f32, release_ms: f32, sample_rate: f64) {
        self.attack_coeff = time_constant_coeff(attack_ms, sample_rate);
        self.release_coeff = time_constant_coeff(release_ms, sample_rate);
    }

    /// Advance one sample toward `target` (linear gain) and return the new gain
    #[inline]
    pub fn next(&mut self, target: f32) -> f32 {
        let coeff = if target < self.gain {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.gain = coeff * self.gain + (1.0 - coeff) * target;
        self.gain
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn reset(&mut self) {
        self.gain = 1.0;
    }
}

impl Default for EnvelopeFollower {
    fn default() -> Self {
        Self::new()
    }
}
