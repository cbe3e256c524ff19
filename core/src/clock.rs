//! Playback clock tracker
//!
//! Converts readings of the host audio clock into elapsed playback time and
//! a derived sample position. The clock reading is always injected, so the
//! tracker can be driven in tests without an audio device.

/// Clock bookkeeping for one playback segment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClockState {
    /// Host clock time observed at the last committed tick (seconds)
    pub previous_clock_time: f64,
    /// Accumulated playback time of the current segment (seconds)
    pub elapsed_audio_time: f64,
    /// Sample position reached at the last committed tick
    pub previous_sample_position: usize,
}

/// Result of feeding one clock reading into the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockReading {
    /// The raw host clock reading
    pub current_time: f64,
    /// Time elapsed since the previous reading, never negative
    pub delta: f64,
    /// `floor(elapsed_audio_time * sample_rate)` after this reading
    pub current_sample_position: usize,
}

/// Tracks elapsed audio time against the host audio clock.
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    state: ClockState,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current bookkeeping
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Zero all state and anchor the clock at `now` for a new segment
    pub fn begin(&mut self, now: f64) {
        self.state = ClockState {
            previous_clock_time: now,
            ..ClockState::default()
        };
    }

    /// Zero all state (stop/reset)
    pub fn reset(&mut self) {
        self.state = ClockState::default();
    }

    /// Feed a clock reading.
    ///
    /// A reading at or before the previous one is treated as a clock reset
    /// point: the anchor moves to `current_time` and the delta is zero.
    pub fn advance(&mut self, current_time: f64, sample_rate: u32) -> ClockReading {
        if current_time <= self.state.previous_clock_time {
            self.state.previous_clock_time = current_time;
        }

        let delta = (current_time - self.state.previous_clock_time).max(0.0);
        self.state.elapsed_audio_time += delta;

        ClockReading {
            current_time,
            delta,
            current_sample_position: sample_position(self.state.elapsed_audio_time, sample_rate),
        }
    }

    /// Record a processed reading as the new reference point
    pub fn commit(&mut self, reading: &ClockReading) {
        self.state.previous_clock_time = reading.current_time;
        self.state.previous_sample_position = reading.current_sample_position;
    }
}

/// Sample index reached after `elapsed` seconds at `sample_rate`
pub fn sample_position(elapsed: f64, sample_rate: u32) -> usize {
    if elapsed <= 0.0 || !elapsed.is_finite() {
        return 0;
    }
    (elapsed * sample_rate as f64).floor() as usize
}
