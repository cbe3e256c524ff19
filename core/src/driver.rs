//! Sync driver: the per-frame tick
//!
//! Each tick reads the host clock, slices the samples that have played since
//! the previous tick out of the decoded segment, appends them to the
//! accumulator, lets the analysis engine consume them and retires whatever
//! the engine reports as processed.

use std::ops::Range;

use tracing::{trace, warn};

use crate::accumulator::SampleAccumulator;
use crate::audio::DecodedAudio;
use crate::clock::{ClockState, PlaybackClock};
use crate::config::SyncConfig;
use crate::engine::{AnalysisEngine, ProcessedCountMode};
use crate::model::ParameterTable;

/// What one tick did
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Audio time elapsed since the previous tick (seconds)
    pub delta: f64,
    /// Sample range sliced from the segment
    pub range: Range<usize>,
    /// Samples dropped from the head to respect the pending cap
    pub dropped: usize,
    /// Whether the analysis engine ran
    pub analysed: bool,
    /// Samples retired after analysis
    pub trimmed: usize,
    /// Samples left in the accumulator
    pub buffered: usize,
}

impl TickReport {
    /// Number of samples appended this tick
    pub fn appended(&self) -> usize {
        self.range.len()
    }
}

/// Streams played samples from a decoded segment into an analysis engine.
#[derive(Debug)]
pub struct SyncDriver {
    clock: PlaybackClock,
    accumulator: SampleAccumulator,
    mode: ProcessedCountMode,
    max_pending: usize,
    last_reported_total: usize,
}

impl SyncDriver {
    pub fn new(mode: ProcessedCountMode, max_pending: usize) -> Self {
        Self {
            clock: PlaybackClock::new(),
            accumulator: SampleAccumulator::new(),
            mode,
            max_pending,
            last_reported_total: 0,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.processed_count, config.max_pending_samples)
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn accumulator(&self) -> &SampleAccumulator {
        &self.accumulator
    }

    /// Start a new segment anchored at host clock time `now`
    pub fn begin(&mut self, now: f64) {
        self.clock.begin(now);
        self.accumulator.clear();
    }

    /// Zero clock state and drop all pending samples
    pub fn reset(&mut self) {
        self.clock.reset();
        self.accumulator.clear();
    }

    /// Forget the engine's last reported total (new engine instance)
    pub fn reset_engine_tracking(&mut self) {
        self.last_reported_total = 0;
    }

    /// Run one tick at host clock time `now`.
    ///
    /// Without an engine the tick only accumulates samples. Returns `None`
    /// once the whole segment has been consumed.
    pub fn tick(
        &mut self,
        now: f64,
        audio: &DecodedAudio,
        engine: Option<&mut dyn AnalysisEngine>,
        model: &mut dyn ParameterTable,
    ) -> Option<TickReport> {
        let reading = self.clock.advance(now, audio.sample_rate());
        let previous = self.clock.state().previous_sample_position;
        if previous > audio.len() {
            return None;
        }

        let end = reading.current_sample_position.min(audio.len());
        let start = previous.min(end);
        if let Some(channel) = audio.channel_data(0) {
            self.accumulator.extend(&channel[start..end]);
        }

        let dropped = self.accumulator.drop_oldest_beyond(self.max_pending);
        if dropped > 0 {
            warn!(
                "Analysis is lagging playback: dropped {} pending samples",
                dropped
            );
        }

        let mut trimmed = 0;
        let analysed = engine.is_some();
        if let Some(engine) = engine {
            engine.set_sound_buffer(0, self.accumulator.as_slice(), 0);
            engine.update_parameters(model, reading.delta);
            let reported = engine.last_total_processed_count(0);
            let processed = self.processed_since_last(reported);
            trimmed = self.retire(processed);
        }

        self.clock.commit(&reading);

        let report = TickReport {
            delta: reading.delta,
            range: start..end,
            dropped,
            analysed,
            trimmed,
            buffered: self.accumulator.len(),
        };
        trace!(?report, "sync tick");
        Some(report)
    }

    /// Convert the engine's reported count into samples processed this tick
    fn processed_since_last(&mut self, reported: usize) -> usize {
        match self.mode {
            ProcessedCountMode::PerUpdate => reported,
            ProcessedCountMode::Cumulative => {
                let processed = if reported >= self.last_reported_total {
                    reported - self.last_reported_total
                } else {
                    // Engine restarted its count
                    reported
                };
                self.last_reported_total = reported;
                processed
            }
        }
    }

    /// Remove `processed` samples from the head of the accumulator
    fn retire(&mut self, processed: usize) -> usize {
        let pending = self.accumulator.len();
        if processed == 0 {
            return 0;
        }
        if processed >= pending {
            if processed > pending {
                warn!(
                    "Engine reported {} processed samples but only {} were pending",
                    processed, pending
                );
            }
            self.accumulator.clear();
            return pending;
        }
        self.accumulator.trim(processed);
        processed
    }
}
