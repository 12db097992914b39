//! fastfx Core - Processor Rack
//!
//! This crate wraps the `fastfx_dsp` processors for a host, including:
//! - Stream and rack configuration with validation
//! - An ordered processor chain with per-slot bypass
//! - Parameter-state persistence to an opaque byte blob
//! - Lock-free gain-reduction meters readable from any thread
//! - Tracing subscriber setup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Control Thread                         │
//! │   RackConfig ──▶ Rack::new     RackState ◀──▶ bytes         │
//! │   apply_state / configure_slot / set_slot_bypass            │
//! └─────────────────────────────────────────────────────────────┘
//!            │ (between blocks)             ▲ Arc<MeterTap>
//!            ▼                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Audio Thread                           │
//! │   buffer ──▶ EQ ──▶ Compressor ──▶ Limiter ──▶ buffer       │
//! │              (Zero allocation in this path)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The rack does no locking of its own: the host applies configuration
//! between blocks, as it would for a single processor.

mod config;
mod error;
pub mod logging;
mod meter;
mod rack;
mod state;

pub use config::{RackConfig, StreamConfig, MAX_SLOTS};
pub use error::{EngineError, EngineResult};
pub use meter::{AtomicF32, MeterTap};
pub use rack::{Rack, SlotProcessor};
pub use state::{ProcessorKind, ProcessorState, RackState, SlotState, STATE_VERSION};

// Re-export DSP types for convenience
pub use fastfx_dsp::{
    AudioProcessor, BandParams, Compressor, CompressorParams, Delay, DelayParams, EqParams,
    Equalizer, FilterShape, Limiter, LimiterParams,
};
