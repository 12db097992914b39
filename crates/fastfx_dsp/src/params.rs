//! Parameter records
//!
//! Plain value records in engineering units, one per processor kind.
//! A processor never trusts a record as given: `configure` runs it through
//! `clamped()` first, so hosts may send anything during automation.

use serde::{Deserialize, Serialize};

/// Physical ranges shared by processors and whatever adapter drives them
pub mod ranges {
    pub const THRESHOLD_DB: (f32, f32) = (-60.0, 0.0);
    pub const RATIO: (f32, f32) = (1.0, 20.0);
    pub const ATTACK_MS: (f32, f32) = (0.05, 250.0);
    pub const RELEASE_MS: (f32, f32) = (10.0, 2500.0);
    pub const KNEE_DB: (f32, f32) = (0.0, 12.0);
    pub const MAKEUP_DB: (f32, f32) = (-12.0, 24.0);

    pub const LIMITER_OUTPUT_DB: (f32, f32) = (-60.0, 0.0);

    pub const EQ_FREQUENCY_HZ: (f32, f32) = (20.0, 20000.0);
    pub const EQ_GAIN_DB: (f32, f32) = (-24.0, 24.0);
    pub const EQ_Q: (f32, f32) = (0.1, 10.0);
    pub const EQ_OUTPUT_DB: (f32, f32) = (-12.0, 12.0);

    pub const DELAY_TIME_MS: (f32, f32) = (0.0, 2000.0);
    /// Dry/wet as a fraction, 1.0 = 100% wet
    pub const DELAY_MIX: (f32, f32) = (0.0, 1.0);
}

/// Clamp into an inclusive `(min, max)` range; NaN lands on the minimum
#[inline]
pub(crate) fn clamp_to(value: f32, (min, max): (f32, f32)) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// Compressor controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressorParams {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    /// Knee width, 0 = hard knee
    pub knee_db: f32,
    pub makeup_gain_db: f32,
    /// Derive makeup from the long-term average reduction instead of `makeup_gain_db`
    pub auto_makeup: bool,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_ms: 5.0,
            release_ms: 50.0,
            knee_db: 0.0,
            makeup_gain_db: 0.0,
            auto_makeup: false,
        }
    }
}

impl CompressorParams {
    pub fn clamped(self) -> Self {
        Self {
            threshold_db: clamp_to(self.threshold_db, ranges::THRESHOLD_DB),
            ratio: clamp_to(self.ratio, ranges::RATIO),
            attack_ms: clamp_to(self.attack_ms, ranges::ATTACK_MS),
            release_ms: clamp_to(self.release_ms, ranges::RELEASE_MS),
            knee_db: clamp_to(self.knee_db, ranges::KNEE_DB),
            makeup_gain_db: clamp_to(self.makeup_gain_db, ranges::MAKEUP_DB),
            auto_makeup: self.auto_makeup,
        }
    }
}

/// Limiter controls
///
/// Attack, release and lookahead are fixed by the limiter itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimiterParams {
    /// Detection threshold
    pub threshold_db: f32,
    /// Ceiling the limited signal is scaled to
    pub output_level_db: f32,
}

impl Default for LimiterParams {
    fn default() -> Self {
        Self {
            threshold_db: -0.1,
            output_level_db: -0.1,
        }
    }
}

impl LimiterParams {
    pub fn clamped(self) -> Self {
        Self {
            threshold_db: clamp_to(self.threshold_db, ranges::THRESHOLD_DB),
            output_level_db: clamp_to(self.output_level_db, ranges::LIMITER_OUTPUT_DB),
        }
    }
}

/// Filter shape for a biquad stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterShape {
    /// High-pass
    LowCut,
    /// Low-pass
    HighCut,
    LowShelf,
    HighShelf,
    /// Peaking
    Bell,
}

impl FilterShape {
    /// Cut filters ignore the gain control
    pub fn uses_gain(self) -> bool {
        !matches!(self, Self::LowCut | Self::HighCut)
    }
}

/// Single EQ band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandParams {
    pub shape: FilterShape,
    pub frequency_hz: f32,
    pub gain_db: f32,
    pub q: f32,
    pub enabled: bool,
}

impl BandParams {
    pub fn new(shape: FilterShape, frequency_hz: f32, q: f32) -> Self {
        Self {
            shape,
            frequency_hz,
            gain_db: 0.0,
            q,
            enabled: true,
        }
    }

    pub fn clamped(self) -> Self {
        Self {
            shape: self.shape,
            frequency_hz: clamp_to(self.frequency_hz, ranges::EQ_FREQUENCY_HZ),
            gain_db: clamp_to(self.gain_db, ranges::EQ_GAIN_DB),
            q: clamp_to(self.q, ranges::EQ_Q),
            enabled: self.enabled,
        }
    }
}

/// Number of bands in the equalizer
pub const EQ_BAND_COUNT: usize = 4;

/// Complete EQ configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqParams {
    pub bands: [BandParams; EQ_BAND_COUNT],
    pub output_gain_db: f32,
    pub bypass: bool,
}

impl Default for EqParams {
    fn default() -> Self {
        Self {
            bands: [
                BandParams::new(FilterShape::LowShelf, 100.0, 0.707),
                BandParams::new(FilterShape::Bell, 500.0, 1.0),
                BandParams::new(FilterShape::Bell, 2000.0, 1.0),
                BandParams::new(FilterShape::HighShelf, 8000.0, 0.707),
            ],
            output_gain_db: 0.0,
            bypass: false,
        }
    }
}

impl EqParams {
    pub fn clamped(self) -> Self {
        Self {
            bands: self.bands.map(BandParams::clamped),
            output_gain_db: clamp_to(self.output_gain_db, ranges::EQ_OUTPUT_DB),
            bypass: self.bypass,
        }
    }
}

/// Delay controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayParams {
    pub delay_time_ms: f32,
    /// 0.0 = dry only, 1.0 = wet only
    pub mix: f32,
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            delay_time_ms: 500.0,
            mix: 0.5,
        }
    }
}

impl DelayParams {
    pub fn clamped(self) -> Self {
        Self {
            delay_time_ms: clamp_to(self.delay_time_ms, ranges::DELAY_TIME_MS),
            mix: clamp_to(self.mix, ranges::DELAY_MIX),
        }
    }
}
