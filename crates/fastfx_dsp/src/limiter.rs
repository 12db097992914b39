//! Lookahead Limiter
//!
//! A compressor with an infinite ratio and fixed timing. Detection runs on
//! the incoming samples while the audio itself travels through a short delay
//! line, so gain reduction is already in place when a transient reaches the
//! output. The gain target follows the loudest level still inside the delay
//! line, so release cannot start until the peak that caused the reduction
//! has been emitted.
//!
//! Output is scaled by `10^((output_level - threshold) / 20)`, which puts the
//! limited signal at the configured output level instead of the threshold.

use tracing::debug;

use crate::dynamics::{EnvelopeFollower, LinkedPeakDetector, DETECTOR_CHUNK};
use crate::error::DspError;
use crate::params::LimiterParams;
use crate::processor::AudioProcessor;
use crate::util::{db_to_linear, linear_to_db, sample_rate_or_default, validate_sample_rate};

/// Attack time (ms)
pub const ATTACK_MS: f32 = 0.1;
/// Release time (ms)
pub const RELEASE_MS: f32 = 50.0;
/// Lookahead (ms)
pub const LOOKAHEAD_MS: f64 = 5.0;

/// Fixed-length delay line used on the limiter's audio path
#[derive(Debug, Clone)]
pub struct LookaheadBuffer {
    buffer: Vec<f32>,
    position: usize,
}

impl LookaheadBuffer {
    pub fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            position: 0,
        }
    }

    /// Change the length; contents and cursor are cleared
    pub fn resize(&mut self, length: usize) {
        self.buffer.clear();
        self.buffer.resize(length.max(1), 0.0);
        self.position = 0;
    }

    /// Store `input` and return the sample pushed `latency_samples()` calls ago
    #[inline]
    pub fn push(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.position];
        self.buffer[self.position] = input;
        self.position += 1;
        if self.position == self.buffer.len() {
            self.position = 0;
        }
        delayed
    }

    /// Delay in samples; never zero
    pub fn latency_samples(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.position = 0;
    }
}

/// Running maximum over the last `window` pushed values
///
/// Monotonic deque on a fixed ring: entries are kept in decreasing order, so
/// the front is always the window maximum. Storage is sized once, `push`
/// never allocates.
#[derive(Debug, Clone)]
struct PeakWindow {
    values: Vec<f32>,
    stamps: Vec<u64>,
    head: usize,
    len: usize,
    clock: u64,
}

impl PeakWindow {
    fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            values: vec![0.0; window],
            stamps: vec![0; window],
            head: 0,
            len: 0,
            clock: 0,
        }
    }

    fn resize(&mut self, window: usize) {
        *self = Self::new(window);
    }

    fn window(&self) -> usize {
        self.values.len()
    }

    fn slot(&self, offset: usize) -> usize {
        (self.head + offset) % self.window()
    }

    /// Add a value and return the maximum of the current window
    #[inline]
    fn push(&mut self, value: f32) -> f32 {
        let window = self.window() as u64;

        // Expire the front once it has slid out
        if self.len > 0 && self.stamps[self.head] + window <= self.clock {
            self.head = self.slot(1);
            self.len -= 1;
        }

        while self.len > 0 && self.values[self.slot(self.len - 1)] <= value {
            self.len -= 1;
        }

        let back = self.slot(self.len);
        self.values[back] = value;
        self.stamps[back] = self.clock;
        self.len += 1;
        self.clock += 1;

        self.values[self.head]
    }

    fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
        self.clock = 0;
    }
}

/// Lookahead length in samples at a given rate
fn lookahead_samples(sample_rate: f64) -> usize {
    ((LOOKAHEAD_MS * 0.001 * sample_rate).round() as usize).max(1)
}

pub struct Limiter {
    params: LimiterParams,
    sample_rate: f64,
    detector: LinkedPeakDetector,
    envelope: EnvelopeFollower,
    lookahead_left: LookaheadBuffer,
    lookahead_right: LookaheadBuffer,
    peak_window: PeakWindow,
    output_gain: f32,
    gain_reduction_db: f32,
}

impl Limiter {
    pub fn new(sample_rate: f64) -> Self {
        let sample_rate = sample_rate_or_default(sample_rate, "Limiter");
        let length = lookahead_samples(sample_rate);

        let mut envelope = EnvelopeFollower::new();
        envelope.set_times(ATTACK_MS, RELEASE_MS, sample_rate);

        let params = LimiterParams::default();
        Self {
            params,
            sample_rate,
            detector: LinkedPeakDetector::new(),
            envelope,
            lookahead_left: LookaheadBuffer::new(length),
            lookahead_right: LookaheadBuffer::new(length),
            peak_window: PeakWindow::new(length + 1),
            output_gain: output_gain(&params),
            gain_reduction_db: 0.0,
        }
    }

    pub fn configure(&mut self, params: LimiterParams) {
        self.params = params.clamped();
        self.output_gain = output_gain(&self.params);
    }

    pub fn params(&self) -> &LimiterParams {
        &self.params
    }

    /// Level limited material ends up at, in linear amplitude
    pub fn ceiling(&self) -> f32 {
        db_to_linear(self.params.output_level_db)
    }
}

fn output_gain(params: &LimiterParams) -> f32 {
    db_to_linear(params.output_level_db - params.threshold_db)
}

impl AudioProcessor for Limiter {
    fn initialize(&mut self, sample_rate: f64) -> Result<(), DspError> {
        self.sample_rate = validate_sample_rate(sample_rate)?;
        let length = lookahead_samples(self.sample_rate);
        self.lookahead_left.resize(length);
        self.lookahead_right.resize(length);
        self.peak_window.resize(length + 1);
        self.envelope.set_times(ATTACK_MS, RELEASE_MS, self.sample_rate);
        self.reset();
        debug!(
            "Limiter initialized at {}Hz, lookahead {} samples",
            self.sample_rate, length
        );
        Ok(())
    }

    fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let threshold_db = self.params.threshold_db;

        let mut start = 0;
        while start < frames {
            let end = (start + DETECTOR_CHUNK).min(frames);
            let levels = self.detector.levels_db(&left[start..end], &right[start..end]);

            for (offset, &level_db) in levels.iter().enumerate() {
                let index = start + offset;
                // Covers every frame still waiting in the delay line plus this one
                let peak_db = self.peak_window.push(level_db);
                let target = db_to_linear((threshold_db - peak_db).min(0.0));
                let gain = self.envelope.next(target);
                self.gain_reduction_db = linear_to_db(gain);

                let total = gain * self.output_gain;
                left[index] = self.lookahead_left.push(left[index]) * total;
                right[index] = self.lookahead_right.push(right[index]) * total;
            }
            start = end;
        }
    }

    fn reset(&mut self) {
        self.envelope.reset();
        self.gain_reduction_db = 0.0;
        self.lookahead_left.clear();
        self.lookahead_right.clear();
        self.peak_window.clear();
    }

    fn name(&self) -> &'static str {
        "Limiter"
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn latency_samples(&self) -> usize {
        self.lookahead_left.latency_samples()
    }

    fn current_meter(&self) -> Option<f32> {
        Some(self.gain_reduction_db)
    }
}
