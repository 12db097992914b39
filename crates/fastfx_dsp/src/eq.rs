//! 4-Band Parametric Equalizer
//!
//! Implements a cascade of biquad stages for audio equalization.
//! Each band can be a cut, shelf or bell; bands run in index order and a
//! disabled band is skipped outright, so its history stays frozen until it
//! is enabled again.

use tracing::debug;

use crate::error::DspError;
use crate::filter::BiquadStage;
use crate::params::{BandParams, EqParams, EQ_BAND_COUNT};
use crate::processor::AudioProcessor;
use crate::simd;
use crate::util::{db_to_linear, sample_rate_or_default, validate_sample_rate};

/// The main equalizer processor
///
/// Holds the filter state and processes audio samples.
/// Designed for real-time use: no allocations in `process_block()`.
pub struct Equalizer {
    // Each channel needs its own filter state
    filters_left: [BiquadStage; EQ_BAND_COUNT],
    filters_right: [BiquadStage; EQ_BAND_COUNT],
    params: EqParams,
    sample_rate: f64,
    output_gain_linear: f32,
}

impl Equalizer {
    /// Create a new equalizer with the default (flat) band layout
    pub fn new(sample_rate: f64) -> Self {
        let mut eq = Self {
            filters_left: Default::default(),
            filters_right: Default::default(),
            params: EqParams::default(),
            sample_rate: sample_rate_or_default(sample_rate, "Equalizer"),
            output_gain_linear: 1.0,
        };
        eq.configure(EqParams::default());
        eq
    }

    /// Apply a full EQ configuration
    ///
    /// Call this between buffer processing, not during.
    /// Recalculates all filter coefficients; filter history is kept.
    pub fn configure(&mut self, params: EqParams) {
        self.params = params.clamped();
        for index in 0..EQ_BAND_COUNT {
            self.update_band(index);
        }
        self.output_gain_linear = db_to_linear(self.params.output_gain_db);
    }

    /// Replace a single band (0-3)
    pub fn set_band(&mut self, index: usize, band: BandParams) -> Result<(), DspError> {
        if index >= EQ_BAND_COUNT {
            return Err(DspError::InvalidBandIndex(index));
        }
        self.params.bands[index] = band.clamped();
        self.update_band(index);
        Ok(())
    }

    pub fn set_bypass(&mut self, bypass: bool) {
        self.params.bypass = bypass;
    }

    pub fn params(&self) -> &EqParams {
        &self.params
    }

    fn update_band(&mut self, index: usize) {
        let band = self.params.bands[index];
        let gain_db = if band.shape.uses_gain() { band.gain_db } else { 0.0 };
        for filter in [&mut self.filters_left[index], &mut self.filters_right[index]] {
            filter.configure(
                band.shape,
                band.frequency_hz as f64,
                gain_db as f64,
                band.q as f64,
                self.sample_rate,
            );
        }
    }

    /// Run one stereo frame through the enabled bands
    ///
    /// Bypass and output gain are block-level concerns handled by
    /// `process_block`.
    #[inline]
    pub fn process_sample(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mut l = left;
        let mut r = right;

        for (i, band) in self.params.bands.iter().enumerate() {
            if band.enabled {
                l = self.filters_left[i].process(l);
                r = self.filters_right[i].process(r);
            }
        }

        (l, r)
    }
}

impl AudioProcessor for Equalizer {
    fn initialize(&mut self, sample_rate: f64) -> Result<(), DspError> {
        self.sample_rate = validate_sample_rate(sample_rate)?;
        self.reset();
        for index in 0..EQ_BAND_COUNT {
            self.update_band(index);
        }
        debug!("Equalizer initialized at {}Hz", self.sample_rate);
        Ok(())
    }

    fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        if self.params.bypass {
            return;
        }

        let frames = left.len().min(right.len());
        let (left, right) = (&mut left[..frames], &mut right[..frames]);

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (new_l, new_r) = self.process_sample(*l, *r);
            *l = new_l;
            *r = new_r;
        }

        simd::apply_gain(left, self.output_gain_linear);
        simd::apply_gain(right, self.output_gain_linear);
    }

    /// Reset filter state (clear delay lines)
    fn reset(&mut self) {
        for (left, right) in self.filters_left.iter_mut().zip(self.filters_right.iter_mut()) {
            left.reset();
            right.reset();
        }
    }

    fn name(&self) -> &'static str {
        "Equalizer"
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FilterShape;

    const FS: f64 = 48000.0;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / FS as f32).sin() * 0.5)
            .collect()
    }

    /// RMS after the filters have settled
    fn rms(buffer: &[f32]) -> f32 {
        let tail = &buffer[buffer.len() / 4..];
        (tail.iter().map(|s| s * s).sum::<f32>() / tail.len() as f32).sqrt()
    }

    fn single_band(band: BandParams) -> EqParams {
        let mut params = EqParams::default();
        for b in params.bands.iter_mut() {
            b.enabled = false;
        }
        params.bands[0] = band;
        params
    }

    fn run(eq: &mut Equalizer, input: &[f32]) -> Vec<f32> {
        let mut left = input.to_vec();
        let mut right = input.to_vec();
        eq.process_block(&mut left, &mut right);
        assert_eq!(left, right);
        left
    }

    #[test]
    fn test_silence_in_silence_out() {
        let mut eq = Equalizer::new(FS);
        let mut params = EqParams::default();
        params.bands[1].gain_db = 18.0;
        params.bands[3].gain_db = -12.0;
        params.output_gain_db = 12.0;
        eq.configure(params);

        let out = run(&mut eq, &vec![0.0; 2048]);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_bypass_leaves_buffer_untouched() {
        let mut eq = Equalizer::new(FS);
        let mut params = EqParams::default();
        params.bands[2].gain_db = 12.0;
        params.output_gain_db = -6.0;
        params.bypass = true;
        eq.configure(params);

        let input = sine(2000.0, 4800);
        assert_eq!(run(&mut eq, &input), input);
    }

    #[test]
    fn test_all_bands_disabled_is_transparent() {
        let mut eq = Equalizer::new(FS);
        let mut params = EqParams::default();
        for band in params.bands.iter_mut() {
            band.gain_db = 12.0;
            band.enabled = false;
        }
        eq.configure(params);

        let input = sine(440.0, 4800);
        let out = run(&mut eq, &input);
        for (o, i) in out.iter().zip(&input) {
            assert!((o - i).abs() < 1e-3);
        }
    }

    #[test]
    fn test_flat_defaults_are_near_transparent() {
        let mut eq = Equalizer::new(FS);
        let input = sine(1000.0, 9600);
        let out = run(&mut eq, &input);
        assert!((rms(&out) - rms(&input)).abs() < 1e-3);
    }

    #[test]
    fn test_low_cut_attenuates_lows() {
        let mut eq = Equalizer::new(FS);
        eq.configure(single_band(BandParams::new(FilterShape::LowCut, 1000.0, 0.707)));

        let low = sine(200.0, 9600);
        let high = sine(5000.0, 9600);
        let low_ratio = rms(&run(&mut eq, &low)) / rms(&low);
        eq.reset();
        let high_ratio = rms(&run(&mut eq, &high)) / rms(&high);

        assert!(high_ratio > low_ratio);
        assert!(high_ratio > 0.9);
        assert!(low_ratio < 0.1);
    }

    #[test]
    fn test_high_cut_attenuates_highs() {
        let mut eq = Equalizer::new(FS);
        eq.configure(single_band(BandParams::new(FilterShape::HighCut, 1000.0, 0.707)));

        let low = sine(200.0, 9600);
        let high = sine(5000.0, 9600);
        let low_ratio = rms(&run(&mut eq, &low)) / rms(&low);
        eq.reset();
        let high_ratio = rms(&run(&mut eq, &high)) / rms(&high);

        assert!(low_ratio > high_ratio);
        assert!(high_ratio < 0.1);
    }

    #[test]
    fn test_bell_boost_more_than_doubles() {
        let mut eq = Equalizer::new(FS);
        let mut band = BandParams::new(FilterShape::Bell, 1000.0, 1.0);
        band.gain_db = 12.0;
        eq.configure(single_band(band));

        let input = sine(1000.0, 9600);
        let out = run(&mut eq, &input);
        assert!(rms(&out) > 2.0 * rms(&input));
    }

    #[test]
    fn test_output_gain_applied() {
        let mut eq = Equalizer::new(FS);
        let mut params = single_band(BandParams::new(FilterShape::Bell, 1000.0, 1.0));
        params.bands[0].enabled = false;
        params.output_gain_db = 6.0;
        eq.configure(params);

        let input = sine(440.0, 1000);
        let out = run(&mut eq, &input);
        let expected = db_to_linear(6.0);
        for (o, i) in out.iter().zip(&input) {
            assert!((o - i * expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_set_band_rejects_bad_index() {
        let mut eq = Equalizer::new(FS);
        let band = BandParams::new(FilterShape::Bell, 1000.0, 1.0);
        assert!(eq.set_band(3, band).is_ok());
        assert_eq!(eq.set_band(4, band), Err(DspError::InvalidBandIndex(4)));
    }

    #[test]
    fn test_set_band_clamps() {
        let mut eq = Equalizer::new(FS);
        let mut band = BandParams::new(FilterShape::Bell, 50000.0, 0.0);
        band.gain_db = 40.0;
        eq.set_band(1, band).unwrap();

        let stored = eq.params().bands[1];
        assert_eq!(stored.frequency_hz, 20000.0);
        assert_eq!(stored.q, 0.1);
        assert_eq!(stored.gain_db, 24.0);
    }

    #[test]
    fn test_corner_above_nyquist_stays_stable() {
        let mut eq = Equalizer::new(16000.0);
        let mut band = BandParams::new(FilterShape::HighShelf, 20000.0, 0.707);
        band.gain_db = 12.0;
        eq.configure(single_band(band));

        let out = run(&mut eq, &sine(3000.0, 4800));
        assert!(out.iter().all(|s| s.is_finite() && s.abs() < 10.0));
    }

    #[test]
    fn test_disabled_band_history_is_frozen() {
        let mut band = BandParams::new(FilterShape::Bell, 800.0, 2.0);
        band.gain_db = 9.0;
        let enabled = single_band(band);
        let mut disabled = enabled;
        disabled.bands[0].enabled = false;

        let first = sine(300.0, 500);
        let middle = sine(3000.0, 500);
        let last = sine(1200.0, 500);

        let mut interrupted = Equalizer::new(FS);
        interrupted.configure(enabled);
        run(&mut interrupted, &first);
        interrupted.configure(disabled);
        run(&mut interrupted, &middle);
        interrupted.configure(enabled);

        let mut reference = Equalizer::new(FS);
        reference.configure(enabled);
        run(&mut reference, &first);

        assert_eq!(run(&mut interrupted, &last), run(&mut reference, &last));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut eq = Equalizer::new(FS);
        let mut band = BandParams::new(FilterShape::Bell, 100.0, 4.0);
        band.gain_db = 12.0;
        eq.configure(single_band(band));

        let mut impulse = vec![0.0; 64];
        impulse[0] = 1.0;
        run(&mut eq, &impulse);

        eq.reset();
        let out = run(&mut eq, &vec![0.0; 256]);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_initialize_changes_rate() {
        let mut eq = Equalizer::new(FS);
        assert!(eq.initialize(96000.0).is_ok());
        assert_eq!(eq.sample_rate(), 96000.0);
        assert!(eq.initialize(1.0).is_err());
        assert_eq!(eq.sample_rate(), 96000.0);
    }
}
