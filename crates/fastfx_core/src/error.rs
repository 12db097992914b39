//! Engine Error Types

use thiserror::Error;

use crate::state::ProcessorKind;

/// Errors that can occur around the processor rack
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Stream configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown processor: {0}")]
    UnknownProcessor(String),

    #[error("Slot {index} out of range (rack has {len} slots)")]
    SlotOutOfRange { index: usize, len: usize },

    #[error("Slot {slot} holds a {expected}, got {found} state")]
    KindMismatch {
        slot: usize,
        expected: ProcessorKind,
        found: ProcessorKind,
    },

    #[error("State has {found} slots, rack has {expected}")]
    SlotCountMismatch { expected: usize, found: usize },

    #[error("Unsupported state version {found} (expected {expected})")]
    UnsupportedStateVersion { found: u32, expected: u32 },

    #[error("State decode error: {0}")]
    StateDecode(#[from] serde_json::Error),

    #[error("DSP error: {0}")]
    DspError(#[from] fastfx_dsp::DspError),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
