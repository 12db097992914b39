//! Lock-free Meter Taps
//!
//! The audio thread publishes each dynamics slot's gain reduction after every
//! block; UI or host threads read it at any time without locking.

use std::sync::atomic::{AtomicU32, Ordering};

/// An `f32` stored as its bit pattern
///
/// AtomicF32 doesn't exist, so we use bit-casting.
#[derive(Debug)]
pub struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    /// Relaxed ordering is enough: each meter is an independent value
    #[inline]
    pub fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// One gain-reduction reading per rack slot, in dB
///
/// Slots without a meter (EQ, delay) and bypassed slots read 0.0.
#[derive(Debug)]
pub struct MeterTap {
    slots: Box<[AtomicF32]>,
}

impl MeterTap {
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: (0..slot_count).map(|_| AtomicF32::default()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Out-of-range slots are ignored
    #[inline]
    pub fn publish(&self, slot: usize, gain_reduction_db: f32) {
        if let Some(meter) = self.slots.get(slot) {
            meter.store(gain_reduction_db);
        }
    }

    pub fn read(&self, slot: usize) -> Option<f32> {
        self.slots.get(slot).map(AtomicF32::load)
    }

    /// Copy of every slot's reading
    pub fn snapshot(&self) -> Vec<f32> {
        self.slots.iter().map(AtomicF32::load).collect()
    }

    pub fn clear(&self) {
        for meter in self.slots.iter() {
            meter.store(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_atomic_f32_roundtrip() {
        let value = AtomicF32::new(1.5);
        assert_eq!(value.load(), 1.5);
        value.store(-12.25);
        assert_eq!(value.load(), -12.25);
    }

    #[test]
    fn test_tap_defaults_to_zero() {
        let tap = MeterTap::new(3);
        assert_eq!(tap.len(), 3);
        assert_eq!(tap.snapshot(), vec![0.0, 0.0, 0.0]);
        assert!(tap.read(3).is_none());
    }

    #[test]
    fn test_publish_and_clear() {
        let tap = MeterTap::new(2);
        tap.publish(1, -6.0);
        tap.publish(7, -1.0);
        assert_eq!(tap.read(1), Some(-6.0));
        assert_eq!(tap.snapshot(), vec![0.0, -6.0]);

        tap.clear();
        assert_eq!(tap.read(1), Some(0.0));
    }

    #[test]
    fn test_read_from_other_thread() {
        let tap = Arc::new(MeterTap::new(1));
        let writer = Arc::clone(&tap);

        thread::spawn(move || writer.publish(0, -3.5))
            .join()
            .unwrap();

        assert_eq!(tap.read(0), Some(-3.5));
    }
}
