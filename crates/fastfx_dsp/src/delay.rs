//! Stereo delay
//!
//! One circular buffer per channel, read behind the write cursor. There is
//! no feedback path: the delayed sample is read before the input is written,
//! then dry and wet are mixed as `input * (1 - mix) + delayed * mix`.

use tracing::debug;

use crate::error::DspError;
use crate::params::{ranges, DelayParams};
use crate::processor::AudioProcessor;
use crate::simd;
use crate::util::{sample_rate_or_default, validate_sample_rate};

/// Frames mixed per kernel pass
const DELAY_CHUNK: usize = 128;

/// Buffer capacity for the longest supported delay
fn capacity_for(sample_rate: f64) -> usize {
    let max_ms = ranges::DELAY_TIME_MS.1 as f64;
    (max_ms * 0.001 * sample_rate).round() as usize + 1
}

/// A single channel's circular buffer
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(2)],
            write_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Reallocate and zero; only for non-real-time paths
    pub fn resize(&mut self, capacity: usize) {
        self.buffer.clear();
        self.buffer.resize(capacity.max(2), 0.0);
        self.write_pos = 0;
    }

    /// For each input sample, read `delay` samples behind the write cursor
    /// into `delayed`, then store the input and advance
    ///
    /// `delay` is clamped to `[1, capacity - 1]`.
    #[inline]
    pub fn read_write(&mut self, input: &[f32], delayed: &mut [f32], delay: usize) {
        let capacity = self.buffer.len();
        let delay = delay.clamp(1, capacity - 1);
        let mut read_pos = (self.write_pos + capacity - delay) % capacity;

        for (sample, out) in input.iter().zip(delayed.iter_mut()) {
            *out = self.buffer[read_pos];
            self.buffer[self.write_pos] = *sample;

            read_pos += 1;
            if read_pos == capacity {
                read_pos = 0;
            }
            self.write_pos += 1;
            if self.write_pos == capacity {
                self.write_pos = 0;
            }
        }
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

pub struct Delay {
    params: DelayParams,
    sample_rate: f64,
    line_left: DelayLine,
    line_right: DelayLine,
    delay_samples: usize,
    scratch_left: [f32; DELAY_CHUNK],
    scratch_right: [f32; DELAY_CHUNK],
}

impl Delay {
    pub fn new(sample_rate: f64) -> Self {
        let sample_rate = sample_rate_or_default(sample_rate, "Delay");
        let capacity = capacity_for(sample_rate);
        let mut delay = Self {
            params: DelayParams::default(),
            sample_rate,
            line_left: DelayLine::new(capacity),
            line_right: DelayLine::new(capacity),
            delay_samples: 1,
            scratch_left: [0.0; DELAY_CHUNK],
            scratch_right: [0.0; DELAY_CHUNK],
        };
        delay.update_delay_samples();
        delay
    }

    /// Apply new time and mix. The buffers are not cleared, so a time change
    /// under playback jumps the read position.
    pub fn configure(&mut self, params: DelayParams) {
        self.params = params.clamped();
        self.update_delay_samples();
    }

    pub fn params(&self) -> &DelayParams {
        &self.params
    }

    /// Current delay in samples, always within `[1, capacity - 1]`
    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    pub fn capacity(&self) -> usize {
        self.line_left.capacity()
    }

    fn update_delay_samples(&mut self) {
        let samples = (self.params.delay_time_ms as f64 * 0.001 * self.sample_rate).round() as usize;
        self.delay_samples = samples.clamp(1, self.capacity() - 1);
    }
}

impl AudioProcessor for Delay {
    fn initialize(&mut self, sample_rate: f64) -> Result<(), DspError> {
        self.sample_rate = validate_sample_rate(sample_rate)?;
        let capacity = capacity_for(self.sample_rate);
        self.line_left.resize(capacity);
        self.line_right.resize(capacity);
        self.update_delay_samples();
        debug!(
            "Delay initialized at {}Hz, capacity {} samples",
            self.sample_rate, capacity
        );
        Ok(())
    }

    fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let wet = self.params.mix;
        let dry = 1.0 - wet;

        for (left, right) in left[..frames]
            .chunks_mut(DELAY_CHUNK)
            .zip(right[..frames].chunks_mut(DELAY_CHUNK))
        {
            let n = left.len();
            let delayed_left = &mut self.scratch_left[..n];
            let delayed_right = &mut self.scratch_right[..n];

            self.line_left.read_write(left, delayed_left, self.delay_samples);
            self.line_right.read_write(right, delayed_right, self.delay_samples);

            simd::apply_gain(left, dry);
            simd::multiply_add(left, delayed_left, wet);
            simd::apply_gain(right, dry);
            simd::multiply_add(right, delayed_right, wet);
        }
    }

    fn reset(&mut self) {
        self.line_left.clear();
        self.line_right.clear();
    }

    fn name(&self) -> &'static str {
        "Delay"
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 48000.0;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| ((i % 97) as f32 - 48.0) / 50.0).collect()
    }

    fn wet_delay(samples: usize) -> Delay {
        let mut delay = Delay::new(FS);
        delay.configure(DelayParams {
            delay_time_ms: (samples as f64 / FS * 1000.0) as f32,
            mix: 1.0,
        });
        assert_eq!(delay.delay_samples(), samples);
        delay
    }

    #[test]
    fn test_delay_line_clamps_out_of_range_delay() {
        let input = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

        // Zero behaves as a one-sample delay
        let mut line = DelayLine::new(4);
        let mut delayed = [0.0; 6];
        line.read_write(&input, &mut delayed, 0);
        assert_eq!(delayed, [0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

        // Longer than the buffer behaves as capacity - 1
        let mut line = DelayLine::new(4);
        let mut delayed = [0.0; 6];
        line.read_write(&input, &mut delayed, 1000);
        assert_eq!(delayed, [0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_capacity_covers_max_delay() {
        let delay = Delay::new(FS);
        assert_eq!(delay.capacity(), 96001);
    }

    #[test]
    fn test_wet_output_reproduces_input_after_delay() {
        for samples in [1, 37, 480, 5000] {
            let mut delay = wet_delay(samples);
            let input = ramp(samples + 1000);
            let mut left = input.clone();
            let mut right = input.clone();
            delay.process_block(&mut left, &mut right);

            assert!(left[..samples].iter().all(|s| *s == 0.0));
            for k in 0..1000 {
                assert_eq!(left[samples + k], input[k]);
                assert_eq!(right[samples + k], input[k]);
            }
        }
    }

    #[test]
    fn test_round_trip_across_blocks() {
        let mut delay = wet_delay(300);
        let input = ramp(2000);
        let mut output = Vec::new();
        for block in input.chunks(61) {
            let mut left = block.to_vec();
            let mut right = block.to_vec();
            delay.process_block(&mut left, &mut right);
            output.extend_from_slice(&left);
        }
        for k in 0..1700 {
            assert_eq!(output[300 + k], input[k]);
        }
    }

    #[test]
    fn test_dry_mix_is_passthrough() {
        let mut delay = Delay::new(FS);
        delay.configure(DelayParams {
            delay_time_ms: 10.0,
            mix: 0.0,
        });
        let input = ramp(1000);
        let mut left = input.clone();
        let mut right = input.clone();
        delay.process_block(&mut left, &mut right);
        assert_eq!(left, input);
    }

    #[test]
    fn test_half_mix_blends() {
        let mut delay = Delay::new(FS);
        delay.configure(DelayParams {
            delay_time_ms: 1.0,
            mix: 0.5,
        });
        let mut left = vec![0.0; 100];
        left[0] = 1.0;
        let mut right = left.clone();
        delay.process_block(&mut left, &mut right);

        assert_eq!(left[0], 0.5);
        assert_eq!(left[48], 0.5);
        assert_eq!(left.iter().filter(|s| **s != 0.0).count(), 2);
    }

    #[test]
    fn test_silence_after_flush() {
        let mut delay = wet_delay(200);
        let mut left = ramp(500);
        let mut right = ramp(500);
        delay.process_block(&mut left, &mut right);

        let mut left = vec![0.0; 400];
        let mut right = vec![0.0; 400];
        delay.process_block(&mut left, &mut right);
        assert!(left[200..].iter().all(|s| *s == 0.0));
        assert!(right[200..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_delay_time_clamped() {
        let mut delay = Delay::new(FS);

        delay.configure(DelayParams {
            delay_time_ms: 0.0,
            mix: 1.0,
        });
        assert_eq!(delay.delay_samples(), 1);

        delay.configure(DelayParams {
            delay_time_ms: 5000.0,
            mix: 1.0,
        });
        assert_eq!(delay.delay_samples(), 96000);
        assert!(delay.delay_samples() <= delay.capacity() - 1);

        delay.configure(DelayParams {
            delay_time_ms: 100.0,
            mix: 3.0,
        });
        assert_eq!(delay.params().mix, 1.0);
    }

    #[test]
    fn test_time_change_keeps_buffer() {
        let mut delay = wet_delay(100);
        let mut left = vec![0.0; 50];
        left[0] = 1.0;
        let mut right = left.clone();
        delay.process_block(&mut left, &mut right);

        // Impulse sits 50 samples behind the cursor; at 60 samples it
        // surfaces 10 samples into the next block
        delay.configure(DelayParams {
            delay_time_ms: (60.0 / FS * 1000.0) as f32,
            mix: 1.0,
        });
        let mut left = vec![0.0; 50];
        let mut right = vec![0.0; 50];
        delay.process_block(&mut left, &mut right);
        assert_eq!(left[10], 1.0);
        assert_eq!(right[10], 1.0);
    }

    #[test]
    fn test_reset_zeroes_buffers() {
        let mut delay = wet_delay(64);
        let mut left = vec![1.0; 64];
        let mut right = vec![1.0; 64];
        delay.process_block(&mut left, &mut right);

        delay.reset();
        let mut left = vec![0.0; 128];
        let mut right = vec![0.0; 128];
        delay.process_block(&mut left, &mut right);
        assert!(left.iter().chain(right.iter()).all(|s| *s == 0.0));
    }

    #[test]
    fn test_initialize_resizes() {
        let mut delay = Delay::new(FS);
        delay.initialize(96000.0).unwrap();
        assert_eq!(delay.capacity(), 192001);
        // 500ms default
        assert_eq!(delay.delay_samples(), 48000);
        assert!(delay.initialize(f64::INFINITY).is_err());
    }

    #[test]
    fn test_channels_are_independent() {
        let mut delay = wet_delay(10);
        let mut left = vec![0.0; 40];
        let mut right = vec![0.0; 40];
        left[0] = 1.0;
        right[5] = -1.0;
        delay.process_block(&mut left, &mut right);

        assert_eq!(left[10], 1.0);
        assert_eq!(right[10], 0.0);
        assert_eq!(right[15], -1.0);
        assert_eq!(left[15], 0.0);
    }
}
