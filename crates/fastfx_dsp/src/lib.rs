//! fastfx DSP - Real-time Audio Processors
//!
//! This crate provides the signal-processing engine for fastfx, including:
//! - Feed-forward compressor with soft knee, sidechain and auto makeup
//! - Brick-wall limiter with a 5ms lookahead
//! - 4-band parametric equalizer built from double-precision biquads
//! - Stereo delay line with dry/wet mix
//! - Vector math kernels with runtime AVX/NEON dispatch
//!
//! # Architecture
//!
//! Every processor implements [`AudioProcessor`] and follows a strict
//! "no allocation in audio callback" rule. Buffers are sized in the
//! constructor and in `initialize()`; parameter records are applied with
//! `configure()` between blocks and clamped to their physical ranges.

mod compressor;
mod delay;
mod dynamics;
mod eq;
mod error;
mod filter;
mod limiter;
mod params;
mod processor;
pub mod simd;
mod util;

pub use compressor::{auto_makeup_db, gain_reduction_db, Compressor, AUTO_MAKEUP_MAX_DB};
pub use delay::{Delay, DelayLine};
pub use dynamics::{EnvelopeFollower, LinkedPeakDetector};
pub use eq::Equalizer;
pub use error::DspError;
pub use filter::{design as design_biquad, magnitude_response, BiquadStage};
pub use limiter::{Limiter, LookaheadBuffer};
pub use params::{
    ranges, BandParams, CompressorParams, DelayParams, EqParams, FilterShape, LimiterParams,
    EQ_BAND_COUNT,
};
pub use processor::AudioProcessor;
pub use simd::{is_simd_available, simd_level, SimdLevel};
pub use util::{
    db_to_linear, linear_to_db, validate_sample_rate, DEFAULT_SAMPLE_RATE, EPSILON,
    MAX_SAMPLE_RATE, MIN_SAMPLE_RATE,
};
