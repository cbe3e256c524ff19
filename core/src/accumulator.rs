//! Sample accumulator: FIFO of decoded samples awaiting analysis
//!
//! Samples are appended at the tail and only ever removed from the head.
//! The backing store is a `Vec` rather than a `VecDeque` because the
//! analysis engine reads the pending samples as one contiguous slice.

/// Ordered buffer of single-channel samples not yet consumed by the engine.
#[derive(Debug, Default, Clone)]
pub struct SampleAccumulator {
    samples: Vec<f32>,
}

impl SampleAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty accumulator with room for `capacity` samples
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Append one sample at the tail
    pub fn append(&mut self, sample: f32) {
        self.samples.push(sample);
    }

    /// Append a run of samples at the tail, preserving their order
    pub fn extend(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    /// Number of pending samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are pending
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Pending samples, oldest first
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Remove `count` samples from the head.
    ///
    /// Only a strict prefix is ever removed: when `count` is zero or would
    /// remove the entire buffer (`count >= len()`), the buffer is left
    /// unchanged. Returns `true` if samples were removed.
    pub fn trim(&mut self, count: usize) -> bool {
        if count == 0 || count >= self.samples.len() {
            return false;
        }
        self.samples.drain(..count);
        true
    }

    /// Drop the oldest samples so that at most `max` remain.
    ///
    /// Returns the number of samples dropped.
    pub fn drop_oldest_beyond(&mut self, max: usize) -> usize {
        let excess = self.samples.len().saturating_sub(max);
        if excess > 0 {
            self.samples.drain(..excess);
        }
        excess
    }

    /// Remove every pending sample
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
