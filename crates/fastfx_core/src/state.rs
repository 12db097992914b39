//! Parameter-State Persistence
//!
//! Parameter records are saved as an opaque byte blob for hosts that store
//! plugin state. The blob is JSON underneath and carries a version number so
//! older layouts can be rejected instead of misread.
//!
//! Restoring never bypasses clamping: decoded records go through each
//! processor's `configure`.

use std::fmt;
use std::str::FromStr;

use fastfx_dsp::{CompressorParams, DelayParams, EqParams, LimiterParams};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Current blob layout
pub const STATE_VERSION: u32 = 1;

/// The processor types a rack slot can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    Equalizer,
    Compressor,
    Limiter,
    Delay,
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equalizer => "equalizer",
            Self::Compressor => "compressor",
            Self::Limiter => "limiter",
            Self::Delay => "delay",
        };
        f.write_str(name)
    }
}

impl FromStr for ProcessorKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eq" | "equalizer" => Ok(Self::Equalizer),
            "comp" | "compressor" => Ok(Self::Compressor),
            "limiter" => Ok(Self::Limiter),
            "delay" => Ok(Self::Delay),
            other => Err(EngineError::UnknownProcessor(other.to_string())),
        }
    }
}

/// One processor's parameter record, tagged with its kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "lowercase")]
pub enum ProcessorState {
    Equalizer(EqParams),
    Compressor(CompressorParams),
    Limiter(LimiterParams),
    Delay(DelayParams),
}

impl ProcessorState {
    /// Default parameters for a processor kind
    pub fn default_for(kind: ProcessorKind) -> Self {
        match kind {
            ProcessorKind::Equalizer => Self::Equalizer(EqParams::default()),
            ProcessorKind::Compressor => Self::Compressor(CompressorParams::default()),
            ProcessorKind::Limiter => Self::Limiter(LimiterParams::default()),
            ProcessorKind::Delay => Self::Delay(DelayParams::default()),
        }
    }

    pub fn kind(&self) -> ProcessorKind {
        match self {
            Self::Equalizer(_) => ProcessorKind::Equalizer,
            Self::Compressor(_) => ProcessorKind::Compressor,
            Self::Limiter(_) => ProcessorKind::Limiter,
            Self::Delay(_) => ProcessorKind::Delay,
        }
    }

    pub fn to_bytes(&self) -> EngineResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> EngineResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A slot's saved parameters plus its bypass flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotState {
    pub processor: ProcessorState,
    #[serde(default)]
    pub bypassed: bool,
}

/// Saved state of a whole rack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RackState {
    pub version: u32,
    pub slots: Vec<SlotState>,
}

impl RackState {
    pub fn new(slots: Vec<SlotState>) -> Self {
        Self {
            version: STATE_VERSION,
            slots,
        }
    }

    pub fn kinds(&self) -> Vec<ProcessorKind> {
        self.slots.iter().map(|slot| slot.processor.kind()).collect()
    }

    pub fn to_bytes(&self) -> EngineResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a blob, rejecting versions this build does not understand
    pub fn from_bytes(bytes: &[u8]) -> EngineResult<Self> {
        let state: RackState = serde_json::from_slice(bytes)?;
        if state.version != STATE_VERSION {
            return Err(EngineError::UnsupportedStateVersion {
                found: state.version,
                expected: STATE_VERSION,
            });
        }
        debug!("Decoded rack state with {} slots", state.slots.len());
        Ok(state)
    }
}
