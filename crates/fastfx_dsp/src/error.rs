//! DSP Error Types
//!
//! Only the non-real-time surface can fail. Block processing never returns
//! an error, and out-of-range parameters are clamped instead of rejected.

use thiserror::Error;

/// Errors that can occur while setting up a processor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Sample rate must be between {min}Hz and {max}Hz, got {got}")]
    InvalidSampleRate { got: f64, min: f64, max: f64 },

    #[error("Invalid band index: {0} (must be 0-3)")]
    InvalidBandIndex(usize),
}
