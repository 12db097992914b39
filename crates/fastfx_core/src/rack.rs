//! Processor Rack
//!
//! An ordered chain of processors sharing one stereo buffer. Each slot can be
//! bypassed on its own; after every block the dynamics slots publish their
//! gain reduction into a [`MeterTap`] that other threads can read.
//!
//! ```text
//!   in ──▶ [slot 0] ──▶ [slot 1] ──▶ ... ──▶ [slot n] ──▶ out
//!              │            │                    │
//!              └────────────┴──── MeterTap ──────┘
//! ```

use std::sync::Arc;

use fastfx_dsp::{AudioProcessor, Compressor, Delay, Equalizer, Limiter};
use tracing::{debug, info};

use crate::config::RackConfig;
use crate::error::{EngineError, EngineResult};
use crate::meter::MeterTap;
use crate::state::{ProcessorKind, ProcessorState, RackState, SlotState};

/// A concrete processor held by a slot
pub enum SlotProcessor {
    Equalizer(Equalizer),
    Compressor(Compressor),
    Limiter(Limiter),
    Delay(Delay),
}

impl SlotProcessor {
    pub fn new(kind: ProcessorKind, sample_rate: f64) -> Self {
        match kind {
            ProcessorKind::Equalizer => Self::Equalizer(Equalizer::new(sample_rate)),
            ProcessorKind::Compressor => Self::Compressor(Compressor::new(sample_rate)),
            ProcessorKind::Limiter => Self::Limiter(Limiter::new(sample_rate)),
            ProcessorKind::Delay => Self::Delay(Delay::new(sample_rate)),
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

    pub fn as_processor(&self) -> &dyn AudioProcessor {
        match self {
            Self::Equalizer(p) => p,
            Self::Compressor(p) => p,
            Self::Limiter(p) => p,
            Self::Delay(p) => p,
        }
    }

    pub fn as_processor_mut(&mut self) -> &mut dyn AudioProcessor {
        match self {
            Self::Equalizer(p) => p,
            Self::Compressor(p) => p,
            Self::Limiter(p) => p,
            Self::Delay(p) => p,
        }
    }

    /// Current parameters as a saveable record
    pub fn state(&self) -> ProcessorState {
        match self {
            Self::Equalizer(p) => ProcessorState::Equalizer(*p.params()),
            Self::Compressor(p) => ProcessorState::Compressor(*p.params()),
            Self::Limiter(p) => ProcessorState::Limiter(*p.params()),
            Self::Delay(p) => ProcessorState::Delay(*p.params()),
        }
    }

    /// Apply a record of the matching kind; returns the kind found on mismatch
    pub fn configure(&mut self, state: &ProcessorState) -> Result<(), ProcessorKind> {
        match (self, state) {
            (Self::Equalizer(p), ProcessorState::Equalizer(params)) => p.configure(*params),
            (Self::Compressor(p), ProcessorState::Compressor(params)) => p.configure(*params),
            (Self::Limiter(p), ProcessorState::Limiter(params)) => p.configure(*params),
            (Self::Delay(p), ProcessorState::Delay(params)) => p.configure(*params),
            (_, other) => return Err(other.kind()),
        }
        Ok(())
    }
}

struct Slot {
    processor: SlotProcessor,
    bypassed: bool,
}

pub struct Rack {
    slots: Vec<Slot>,
    sample_rate: f64,
    meters: Arc<MeterTap>,
}

impl Rack {
    pub fn new(config: &RackConfig) -> EngineResult<Self> {
        config.validate()?;
        let sample_rate = config.stream.sample_rate as f64;

        let slots: Vec<Slot> = config
            .chain
            .iter()
            .map(|&kind| Slot {
                processor: SlotProcessor::new(kind, sample_rate),
                bypassed: false,
            })
            .collect();

        info!(
            "Rack created: {} slots at {}Hz ({})",
            slots.len(),
            sample_rate,
            config
                .chain
                .iter()
                .map(|kind| kind.to_string())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(Self {
            meters: Arc::new(MeterTap::new(slots.len())),
            slots,
            sample_rate,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn kinds(&self) -> Vec<ProcessorKind> {
        self.slots.iter().map(|slot| slot.processor.kind()).collect()
    }

    /// Shared handle to the meters, for reading from another thread
    pub fn meters(&self) -> Arc<MeterTap> {
        Arc::clone(&self.meters)
    }

    pub fn slot(&self, index: usize) -> EngineResult<&SlotProcessor> {
        self.slots
            .get(index)
            .map(|slot| &slot.processor)
            .ok_or(EngineError::SlotOutOfRange {
                index,
                len: self.slots.len(),
            })
    }

    fn slot_mut(&mut self, index: usize) -> EngineResult<&mut Slot> {
        let len = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(EngineError::SlotOutOfRange { index, len })
    }

    /// Re-initialize every slot at a new sample rate
    pub fn set_sample_rate(&mut self, sample_rate: f64) -> EngineResult<()> {
        for slot in self.slots.iter_mut() {
            slot.processor.as_processor_mut().initialize(sample_rate)?;
        }
        self.sample_rate = sample_rate;
        self.meters.clear();
        info!("Rack re-initialized at {}Hz", sample_rate);
        Ok(())
    }

    /// Process separate left/right channel buffers in-place
    ///
    /// # Real-time Safety
    /// No allocations, no locks, no logging.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !slot.bypassed {
                slot.processor.as_processor_mut().process_block(left, right);
            }
            self.meters.publish(index, slot_meter(slot));
        }
    }

    /// Process an interleaved stereo buffer in-place
    ///
    /// Buffer format: [L0, R0, L1, R1, L2, R2, ...]
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !slot.bypassed {
                slot.processor.as_processor_mut().process_interleaved(buffer);
            }
            self.meters.publish(index, slot_meter(slot));
        }
    }

    /// Clear all transient state; parameters and bypass flags are kept
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.processor.as_processor_mut().reset();
        }
        self.meters.clear();
        debug!("Rack reset");
    }

    pub fn set_slot_bypass(&mut self, index: usize, bypassed: bool) -> EngineResult<()> {
        let slot = self.slot_mut(index)?;
        slot.bypassed = bypassed;
        debug!(
            "Slot {} ({}) bypass = {}",
            index,
            slot.processor.kind(),
            bypassed
        );
        Ok(())
    }

    pub fn is_slot_bypassed(&self, index: usize) -> EngineResult<bool> {
        self.slots
            .get(index)
            .map(|slot| slot.bypassed)
            .ok_or(EngineError::SlotOutOfRange {
                index,
                len: self.slots.len(),
            })
    }

    /// Apply parameters to one slot
    pub fn configure_slot(&mut self, index: usize, state: &ProcessorState) -> EngineResult<()> {
        let slot = self.slot_mut(index)?;
        let expected = slot.processor.kind();
        slot.processor
            .configure(state)
            .map_err(|found| EngineError::KindMismatch {
                slot: index,
                expected,
                found,
            })
    }

    /// Restore a saved rack state
    ///
    /// The saved chain must match this rack's chain slot for slot; nothing
    /// is applied unless every slot matches.
    pub fn apply_state(&mut self, state: &RackState) -> EngineResult<()> {
        if state.slots.len() != self.slots.len() {
            return Err(EngineError::SlotCountMismatch {
                expected: self.slots.len(),
                found: state.slots.len(),
            });
        }
        for (index, (slot, saved)) in self.slots.iter().zip(&state.slots).enumerate() {
            let found = saved.processor.kind();
            if slot.processor.kind() != found {
                return Err(EngineError::KindMismatch {
                    slot: index,
                    expected: slot.processor.kind(),
                    found,
                });
            }
        }

        for (index, saved) in state.slots.iter().enumerate() {
            self.configure_slot(index, &saved.processor)?;
            self.slots[index].bypassed = saved.bypassed;
        }
        info!("Restored state for {} slots", state.slots.len());
        Ok(())
    }

    /// Current parameters and bypass flags of every slot
    pub fn snapshot(&self) -> RackState {
        RackState::new(
            self.slots
                .iter()
                .map(|slot| SlotState {
                    processor: slot.processor.state(),
                    bypassed: slot.bypassed,
                })
                .collect(),
        )
    }

    /// Total delay through the active slots
    pub fn latency_samples(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !slot.bypassed)
            .map(|slot| slot.processor.as_processor().latency_samples())
            .sum()
    }
}

/// Bypassed slots and slots without a meter read 0dB
fn slot_meter(slot: &Slot) -> f32 {
    if slot.bypassed {
        0.0
    } else {
        slot.processor.as_processor().current_meter().unwrap_or(0.0)
    }
}
