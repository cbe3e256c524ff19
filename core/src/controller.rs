//! Playback controller
//!
//! Owns the audio source lifecycle for one model: play, stop, queueing,
//! volume and the mouth reset after a segment ends. [`PlaybackController::update`]
//! is the per-frame entry point and runs the sync tick.

mod queue;

#[cfg(test)]
mod tests;

pub use queue::{PlaybackCompletion, PlaybackOutcome, PlaybackQueue, QueuedSegment, SegmentPoll};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioBackend, AudioSource, DecodedAudio};
use crate::config::SyncConfig;
use crate::driver::{SyncDriver, TickReport};
use crate::error::Result;
use crate::model::ParameterTable;
use crate::session::SyncSession;

/// Audio playback plus the sync driver for one model
pub struct PlaybackController<B: AudioBackend> {
    backend: B,
    driver: SyncDriver,
    session: Option<SyncSession>,
    /// Segment currently bound to `source`
    audio: Option<Arc<DecodedAudio>>,
    source: Option<B::Source>,
    completion: Option<oneshot::Sender<PlaybackOutcome>>,
    queue: PlaybackQueue,
    /// Audio clock time at which the mouth is closed
    pending_mouth_reset: Option<f64>,
    volume: f32,
    max_volume: f32,
    mouth_reset_delay: Duration,
}

impl<B: AudioBackend> PlaybackController<B> {
    pub fn new(mut backend: B, config: &SyncConfig) -> Self {
        let max_volume = if config.audio.max_volume.is_finite() {
            config.audio.max_volume.max(0.0)
        } else {
            1.0
        };
        let volume = if config.audio.volume.is_finite() {
            config.audio.volume.clamp(0.0, max_volume)
        } else {
            max_volume
        };
        backend.set_gain(volume);

        Self {
            backend,
            driver: SyncDriver::from_config(config),
            session: None,
            audio: None,
            source: None,
            completion: None,
            queue: PlaybackQueue::new(),
            pending_mouth_reset: None,
            volume,
            max_volume,
            mouth_reset_delay: config.mouth_reset_delay(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn driver(&self) -> &SyncDriver {
        &self.driver
    }

    pub fn session(&self) -> Option<&SyncSession> {
        self.session.as_ref()
    }

    /// Install a new session, returning the previous one
    pub fn replace_session(&mut self, session: SyncSession) -> Option<SyncSession> {
        self.driver.reset_engine_tracking();
        self.session.replace(session)
    }

    /// Drop the current session
    pub fn clear_session(&mut self) -> Option<SyncSession> {
        self.driver.reset_engine_tracking();
        self.session.take()
    }

    pub fn is_playing(&self) -> bool {
        self.source.is_some()
    }

    /// Segments waiting behind the current one
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Play `audio` now.
    ///
    /// With `stop_others` the current segment, the queue and the mouth are
    /// reset first. Otherwise only the current source is released and the
    /// queue is left alone.
    pub fn play_decoded(
        &mut self,
        audio: Arc<DecodedAudio>,
        stop_others: bool,
        model: &mut dyn ParameterTable,
    ) -> Result<PlaybackCompletion> {
        if stop_others {
            self.stop(model);
        }
        self.start_segment(audio)
    }

    /// Queue a segment; starts playing right away when idle
    pub fn append_play(&mut self, segment: QueuedSegment) {
        self.queue.push(segment);
        if !self.is_playing() {
            self.play_next_segment();
        }
    }

    /// Start the next playable segment from the queue.
    ///
    /// Failed segments are dropped and the next one is tried. A segment
    /// whose decode is still running stays at the head.
    pub fn play_next_segment(&mut self) -> Option<PlaybackCompletion> {
        loop {
            let segment = self.queue.front_mut()?;
            match segment.poll() {
                SegmentPoll::Waiting => return None,
                SegmentPoll::Failed(e) => {
                    warn!("Skipping queued segment: {}", e);
                    self.queue.pop_front();
                }
                SegmentPoll::Ready(audio) => {
                    self.queue.pop_front();
                    match self.start_segment(audio) {
                        Ok(completion) => return Some(completion),
                        Err(e) => warn!("Skipping queued segment: {}", e),
                    }
                }
            }
        }
    }

    /// Halt playback, clear pending samples and the queue, close the mouth
    pub fn stop(&mut self, model: &mut dyn ParameterTable) {
        self.release_source();
        self.audio = None;
        self.driver.reset();
        self.queue.clear();
        self.pending_mouth_reset = None;
        self.reset_mouth(model);
        debug!("Playback stopped");
    }

    /// Same as [`stop`](Self::stop)
    pub fn reset(&mut self, model: &mut dyn ParameterTable) {
        self.stop(model);
    }

    /// Set the output volume, clamped to `0.0..=max_volume`.
    /// Non-finite levels are ignored.
    pub fn set_volume(&mut self, level: f32) {
        if !level.is_finite() {
            warn!("Ignoring non-finite volume {}", level);
            return;
        }
        self.volume = level.clamp(0.0, self.max_volume);
        self.backend.set_gain(self.volume);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Per-frame entry point, run after the model's own update
    pub fn update(&mut self, model: &mut dyn ParameterTable) -> Option<TickReport> {
        let now = self.backend.current_time();

        if self.pending_mouth_reset.is_some_and(|due| now >= due) {
            self.pending_mouth_reset = None;
            self.reset_mouth(model);
        }

        let mut report = None;
        if let (Some(_), Some(audio)) = (&self.source, self.audio.clone()) {
            let engine = self.session.as_mut().map(|s| s.engine_mut());
            report = self.driver.tick(now, &audio, engine, model);
        }

        if self.source.as_ref().is_some_and(|s| s.has_ended()) {
            self.finish_segment(now);
        }

        if !self.is_playing() && !self.queue.is_empty() {
            self.play_next_segment();
        }

        report
    }

    fn start_segment(&mut self, audio: Arc<DecodedAudio>) -> Result<PlaybackCompletion> {
        self.release_source();
        self.pending_mouth_reset = None;
        self.audio = None;
        self.driver.reset();

        let mut source = self.backend.create_source(audio.clone())?;
        if let Err(e) = source.start() {
            source.disconnect();
            return Err(e);
        }
        let now = self.backend.current_time();
        self.driver.begin(now);

        debug!(
            "Playing {} frames at {} Hz ({:.2}s)",
            audio.len(),
            audio.sample_rate(),
            audio.duration()
        );
        self.audio = Some(audio);
        self.source = Some(source);

        let (tx, rx) = oneshot::channel();
        self.completion = Some(tx);
        Ok(PlaybackCompletion::new(rx))
    }

    /// Stop and detach the current source; its completion resolves as stopped
    fn release_source(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.stop();
            source.disconnect();
        }
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(PlaybackOutcome::Stopped);
        }
    }

    fn finish_segment(&mut self, now: f64) {
        if let Some(mut source) = self.source.take() {
            source.disconnect();
        }
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(PlaybackOutcome::Finished);
        }
        self.audio = None;
        self.driver.reset();
        self.pending_mouth_reset = Some(now + self.mouth_reset_delay.as_secs_f64());
        info!("Playback finished");
    }

    /// Zero the session's mouth parameters. Failures are logged only.
    fn reset_mouth(&self, model: &mut dyn ParameterTable) {
        let Some(session) = &self.session else {
            return;
        };
        let indices = match session.mouth_parameter_indices() {
            Ok(indices) => indices,
            Err(e) => {
                error!("Failed to reset mouth: {}", e);
                return;
            }
        };
        let count = model.parameter_count();
        for index in indices {
            if index >= count {
                warn!("Mouth parameter index {} out of range ({})", index, count);
                continue;
            }
            model.set_parameter_value_by_index(index, 0.0);
        }
    }
}
