//! MotionSync Core - streaming audio-to-mouth synchronization
//!
//! This crate feeds audio that is currently playing into a lip-sync
//! analysis engine, one frame at a time, and writes the resulting mouth
//! parameters to a host-owned model.
//!
//! # Architecture
//!
//! - [`SampleAccumulator`] - FIFO of samples awaiting analysis
//! - [`PlaybackClock`] - elapsed audio time and sample position from the host clock
//! - [`SyncDriver`] - the per-frame tick: slice, append, analyse, trim
//! - [`PlaybackController`] - source lifecycle, queue, volume and mouth reset
//! - [`MotionSync`] - configuration loading and the post-update frame hook
//!
//! The audio graph ([`AudioBackend`]), analysis engine ([`AnalysisEngine`]),
//! model ([`ParameterTable`]) and frame loop ([`FrameHost`]) are supplied by
//! the host.

pub mod accumulator;
pub mod audio;
pub mod clock;
pub mod config;
pub mod controller;
pub mod driver;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod model;
pub mod motion_sync;
pub mod session;
pub mod settings;
#[cfg(test)]
pub mod test_utils;

pub use accumulator::SampleAccumulator;
pub use audio::{AudioBackend, AudioClock, AudioSource, DecodedAudio, Decoder, WavDecoder};
pub use clock::{ClockReading, ClockState, PlaybackClock};
pub use config::{AudioConfig, SyncConfig};
pub use controller::{
    PlaybackCompletion, PlaybackController, PlaybackOutcome, PlaybackQueue, QueuedSegment,
};
pub use driver::{SyncDriver, TickReport};
pub use engine::{
    AnalysisEngine, EngineFactory, EngineRuntime, LevelEngine, LevelEngineFactory,
    ProcessedCountMode,
};
pub use error::{Result, SyncError};
pub use fetch::{AssetFetcher, DefaultFetcher};
pub use loader::{AudioInput, AudioLoader};
pub use model::{FrameHooks, FrameHost, HookId, ParameterTable, PostUpdateHook};
pub use motion_sync::MotionSync;
pub use session::{ConfigSource, FALLBACK_CONFIG, SyncSession};
pub use settings::ModelSettings;
