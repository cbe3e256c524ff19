//! Host audio graph interfaces
//!
//! The controller never talks to an audio device directly. A host provides
//! an [`AudioBackend`] that exposes a monotonic clock, creates one source per
//! segment routed through a shared gain stage, and reports when a source has
//! played to its end.

use std::sync::Arc;

use super::DecodedAudio;
use crate::error::Result;

/// Monotonic host audio clock
pub trait AudioClock {
    /// Current audio time in seconds
    fn current_time(&self) -> f64;
}

/// One playing segment in the host audio graph
pub trait AudioSource {
    /// Begin playback immediately
    fn start(&mut self) -> Result<()>;

    /// Halt playback; no end-of-playback is reported afterwards
    fn stop(&mut self);

    /// Detach from the output graph
    fn disconnect(&mut self);

    /// Whether the source played its buffer to the end
    fn has_ended(&self) -> bool;
}

/// Host audio graph: clock, source factory and gain stage
pub trait AudioBackend: AudioClock {
    /// Source type produced by this backend
    type Source: AudioSource;

    /// Create a source bound to `audio`, connected through the gain stage to
    /// the output. The source does not play until [`AudioSource::start`].
    fn create_source(&mut self, audio: Arc<DecodedAudio>) -> Result<Self::Source>;

    /// Set the gain applied to every source
    fn set_gain(&mut self, gain: f32);
}
