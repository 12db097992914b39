//! Stream and Rack Configuration

use fastfx_dsp::{MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::state::ProcessorKind;

/// Longest chain a rack accepts
pub const MAX_SLOTS: usize = 16;

/// Audio stream configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate: u32,

    /// Number of audio channels; every processor is stereo
    pub channels: u16,

    /// Buffer size in frames (lower = less latency, higher = more stability)
    pub buffer_size: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            buffer_size: 512,
        }
    }
}

impl StreamConfig {
    /// Calculate latency in milliseconds for this configuration
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Validate configuration
    pub fn validate(&self) -> EngineResult<()> {
        let rate = self.sample_rate as f64;
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate) {
            return Err(EngineError::ConfigError(format!(
                "Invalid sample rate: {}",
                self.sample_rate
            )));
        }
        if self.channels != 2 {
            return Err(EngineError::ConfigError(format!(
                "Invalid channel count: {} (processors are stereo)",
                self.channels
            )));
        }
        if self.buffer_size < 16 || self.buffer_size > 8192 {
            return Err(EngineError::ConfigError(format!(
                "Invalid buffer size: {}",
                self.buffer_size
            )));
        }
        Ok(())
    }
}

/// Which processors a rack runs, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RackConfig {
    pub stream: StreamConfig,

    #[serde(default = "default_chain")]
    pub chain: Vec<ProcessorKind>,
}

fn default_chain() -> Vec<ProcessorKind> {
    vec![
        ProcessorKind::Equalizer,
        ProcessorKind::Compressor,
        ProcessorKind::Limiter,
    ]
}

impl Default for RackConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            chain: default_chain(),
        }
    }
}

impl RackConfig {
    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 48000,
                channels: 2,
                buffer_size: 128, // ~2.6ms latency
            },
            ..Default::default()
        }
    }

    /// Single delay slot, for send/return style use
    pub fn delay_send() -> Self {
        Self {
            chain: vec![ProcessorKind::Delay],
            ..Default::default()
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.stream.validate()?;
        if self.chain.len() > MAX_SLOTS {
            return Err(EngineError::ConfigError(format!(
                "Chain has {} slots, at most {} allowed",
                self.chain.len(),
                MAX_SLOTS
            )));
        }
        Ok(())
    }
}
