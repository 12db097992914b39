//! Biquad Filter Stage
//!
//! One second-order IIR cell. Coefficients are derived here from the RBJ
//! (Robert Bristow-Johnson) Audio EQ Cookbook in double precision and
//! evaluated with the `biquad` crate's Direct Form I, which keeps the
//! input history (x1, x2) and output history (y1, y2) in f64 as well:
//!
//! ```text
//! y = b0*x + b1*x1 + b2*x2 - a1*y1 - a2*y2
//! ```
//!
//! f32 coefficients audibly quantize low-frequency shelves and bells, so
//! only the sample storage is f32.

use std::f64::consts::PI;

use ::biquad::{Biquad, Coefficients, DirectForm1};

use crate::params::FilterShape;

/// Corner frequencies are kept just below Nyquist
const NYQUIST_LIMIT: f64 = 0.49;

/// Pass-through coefficients (b0 = 1, everything else 0)
pub fn unity() -> Coefficients<f64> {
    Coefficients {
        a1: 0.0,
        a2: 0.0,
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
    }
}

/// Design normalized (a0 = 1) coefficients for a filter shape
///
/// `gain_db` is ignored by the cut shapes.
pub fn design(
    shape: FilterShape,
    frequency_hz: f64,
    gain_db: f64,
    q: f64,
    sample_rate: f64,
) -> Coefficients<f64> {
    let frequency = frequency_hz.clamp(1.0, sample_rate * NYQUIST_LIMIT);
    let q = q.max(1e-3);

    let omega = 2.0 * PI * frequency / sample_rate;
    let (sin_w, cos_w) = omega.sin_cos();
    let alpha = sin_w / (2.0 * q);
    // Amplitude for shelf/bell: sqrt of the linear gain
    let a = 10.0_f64.powf(gain_db / 40.0);

    let (b0, b1, b2, a0, a1, a2) = match shape {
        FilterShape::HighCut => (
            (1.0 - cos_w) / 2.0,
            1.0 - cos_w,
            (1.0 - cos_w) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        ),
        FilterShape::LowCut => (
            (1.0 + cos_w) / 2.0,
            -(1.0 + cos_w),
            (1.0 + cos_w) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        ),
        FilterShape::LowShelf => {
            let beta = a.sqrt() / q;
            (
                a * ((a + 1.0) - (a - 1.0) * cos_w + beta * sin_w),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
                a * ((a + 1.0) - (a - 1.0) * cos_w - beta * sin_w),
                (a + 1.0) + (a - 1.0) * cos_w + beta * sin_w,
                -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
                (a + 1.0) + (a - 1.0) * cos_w - beta * sin_w,
            )
        }
        FilterShape::HighShelf => {
            let beta = a.sqrt() / q;
            (
                a * ((a + 1.0) + (a - 1.0) * cos_w + beta * sin_w),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w),
                a * ((a + 1.0) + (a - 1.0) * cos_w - beta * sin_w),
                (a + 1.0) - (a - 1.0) * cos_w + beta * sin_w,
                2.0 * ((a - 1.0) - (a + 1.0) * cos_w),
                (a + 1.0) - (a - 1.0) * cos_w - beta * sin_w,
            )
        }
        FilterShape::Bell => (
            1.0 + alpha * a,
            -2.0 * cos_w,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_w,
            1.0 - alpha / a,
        ),
    };

    Coefficients {
        a1: a1 / a0,
        a2: a2 / a0,
        b0: b0 / a0,
        b1: b1 / a0,
        b2: b2 / a0,
    }
}

/// Magnitude of the transfer function at `frequency_hz`, linear
pub fn magnitude_response(coeffs: &Coefficients<f64>, frequency_hz: f64, sample_rate: f64) -> f64 {
    let w = 2.0 * PI * frequency_hz / sample_rate;
    let (sin1, cos1) = w.sin_cos();
    let (sin2, cos2) = (2.0 * w).sin_cos();

    let num_re = coeffs.b0 + coeffs.b1 * cos1 + coeffs.b2 * cos2;
    let num_im = -(coeffs.b1 * sin1 + coeffs.b2 * sin2);
    let den_re = 1.0 + coeffs.a1 * cos1 + coeffs.a2 * cos2;
    let den_im = -(coeffs.a1 * sin1 + coeffs.a2 * sin2);

    (num_re.hypot(num_im)) / (den_re.hypot(den_im))
}

/// A single filter cell with its own history
///
/// One instance per channel: histories are never shared.
pub struct BiquadStage {
    filter: DirectForm1<f64>,
    coeffs: Coefficients<f64>,
}

impl BiquadStage {
    /// Create a pass-through stage
    pub fn new() -> Self {
        let coeffs = unity();
        Self {
            filter: DirectForm1::<f64>::new(coeffs),
            coeffs,
        }
    }

    /// Recompute coefficients; history is kept so a running filter does
    /// not click when its shape changes
    pub fn configure(
        &mut self,
        shape: FilterShape,
        frequency_hz: f64,
        gain_db: f64,
        q: f64,
        sample_rate: f64,
    ) {
        self.coeffs = design(shape, frequency_hz, gain_db, q, sample_rate);
        self.filter.update_coefficients(self.coeffs);
    }

    /// Run one sample through the difference equation
    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        self.filter.run(sample as f64) as f32
    }

    /// Zero the input and output history
    pub fn reset(&mut self) {
        self.filter.reset_state();
    }

    pub fn coefficients(&self) -> &Coefficients<f64> {
        &self.coeffs
    }
}

impl Default for BiquadStage {
    fn default() -> Self {
        Self::new()
    }
}
