//! Audio Processor Trait
//!
//! The common block-processing surface shared by the compressor, limiter,
//! equalizer and delay. Parameter records are typed per processor, so
//! `configure` lives on each concrete type rather than on the trait.

use crate::error::DspError;

/// Frames handled per pass when de-interleaving onto the stack
const INTERLEAVE_CHUNK: usize = 128;

/// Trait for stereo processors
///
/// # Real-time Safety Contract
///
/// Implementors MUST follow these rules in `process_block()`:
/// - NO heap allocations (no Vec::push, no Box::new, no String)
/// - NO syscalls (no file I/O, no network, no mutex locks, no logging)
/// - NO unbounded loops
/// - O(n) time complexity where n = frame count
///
/// `initialize()` is the place for allocation; call it before the first
/// block and again whenever the sample rate changes.
pub trait AudioProcessor: Send {
    /// (Re)establish the sample rate: sizes buffers, recomputes
    /// time-based coefficients and clears transient state
    fn initialize(&mut self, sample_rate: f64) -> Result<(), DspError>;

    /// Process separate left/right channel buffers in-place
    ///
    /// The frame count is the shorter of the two slices.
    fn process_block(&mut self, left: &mut [f32], right: &mut [f32]);

    /// Clear envelopes, filter history and delay lines; parameters are kept
    fn reset(&mut self);

    /// Human-readable name for debugging/UI
    fn name(&self) -> &'static str;

    fn sample_rate(&self) -> f64;

    /// Delay the processor adds to the signal path
    fn latency_samples(&self) -> usize {
        0
    }

    /// Most recent smoothed gain reduction in dB (dynamics processors only)
    fn current_meter(&self) -> Option<f32> {
        None
    }

    /// Process an interleaved stereo buffer in-place
    ///
    /// Buffer format: [L0, R0, L1, R1, L2, R2, ...]. A trailing odd sample
    /// is left untouched.
    fn process_interleaved(&mut self, buffer: &mut [f32]) {
        let mut left = [0.0_f32; INTERLEAVE_CHUNK];
        let mut right = [0.0_f32; INTERLEAVE_CHUNK];

        for chunk in buffer.chunks_mut(INTERLEAVE_CHUNK * 2) {
            let frames = chunk.len() / 2;
            for (i, frame) in chunk.chunks_exact(2).enumerate() {
                left[i] = frame[0];
                right[i] = frame[1];
            }

            self.process_block(&mut left[..frames], &mut right[..frames]);

            for (i, frame) in chunk.chunks_exact_mut(2).enumerate() {
                frame[0] = left[i];
                frame[1] = right[i];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Swaps channels and negates, enough to see de-interleaving at work
    struct SwapInvert;

    impl AudioProcessor for SwapInvert {
        fn initialize(&mut self, _sample_rate: f64) -> Result<(), DspError> {
            Ok(())
        }

        fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
            for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                let (a, b) = (*l, *r);
                *l = -b;
                *r = -a;
            }
        }

        fn reset(&mut self) {}

        fn name(&self) -> &'static str {
            "Swap/Invert"
        }

        fn sample_rate(&self) -> f64 {
            48000.0
        }
    }

    #[test]
    fn test_interleaved_routes_channels() {
        let mut processor = SwapInvert;
        let mut buffer = vec![0.1, 0.2, 0.3, 0.4];
        processor.process_interleaved(&mut buffer);
        assert_eq!(buffer, vec![-0.2, -0.1, -0.4, -0.3]);
    }

    #[test]
    fn test_interleaved_spans_multiple_chunks() {
        let mut processor = SwapInvert;
        let frames = INTERLEAVE_CHUNK * 3 + 5;
        let mut buffer: Vec<f32> = (0..frames * 2).map(|i| i as f32).collect();
        processor.process_interleaved(&mut buffer);

        for (i, frame) in buffer.chunks_exact(2).enumerate() {
            assert_eq!(frame[0], -((2 * i + 1) as f32));
            assert_eq!(frame[1], -((2 * i) as f32));
        }
    }

    #[test]
    fn test_interleaved_leaves_odd_tail() {
        let mut processor = SwapInvert;
        let mut buffer = vec![1.0, 2.0, 3.0];
        processor.process_interleaved(&mut buffer);
        assert_eq!(buffer, vec![-2.0, -1.0, 3.0]);
    }

    #[test]
    fn test_default_meter_and_latency() {
        let processor = SwapInvert;
        assert_eq!(processor.latency_samples(), 0);
        assert!(processor.current_meter().is_none());
    }
}
