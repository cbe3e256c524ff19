//! Analysis engine interfaces
//!
//! The analysis engine turns raw samples into mouth parameter values. It is
//! an external collaborator: the core only feeds it samples, asks it to
//! update the model, and reads back how many samples it consumed.
//!
//! - [`AnalysisEngine`] - one engine instance bound to a loaded configuration
//! - [`EngineFactory`] - process-wide start-up and instance creation
//! - [`EngineRuntime`] - idempotent start-up / teardown around a factory
//! - [`LevelEngine`] - bundled amplitude-driven reference engine

mod level;
mod runtime;

pub use level::{LevelEngine, LevelEngineFactory, MotionSyncDocument, MotionSyncSetting};
pub use runtime::EngineRuntime;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::ParameterTable;

/// One analysis engine instance
pub trait AnalysisEngine: Send {
    /// Hand the engine the pending samples of `channel`, starting at `offset`
    fn set_sound_buffer(&mut self, channel: usize, samples: &[f32], offset: usize);

    /// Analyse the buffered samples and write parameter values to `model`
    fn update_parameters(&mut self, model: &mut dyn ParameterTable, delta_time: f64);

    /// Processed-sample count reported after the last update
    ///
    /// Whether this is a lifetime total or a per-update count is described
    /// by [`ProcessedCountMode`].
    fn last_total_processed_count(&self, channel: usize) -> usize;

    /// Model parameter indices driven by this engine's configuration
    fn mouth_parameter_indices(&self) -> Result<Vec<usize>>;
}

/// Process-wide engine library entry points
pub trait EngineFactory: Send + Sync {
    /// One-time library initialization
    fn start_up(&self) -> Result<()> {
        Ok(())
    }

    /// Create an engine from a serialized sync configuration
    fn create(
        &self,
        model: &dyn ParameterTable,
        config: &[u8],
        sample_rate: u32,
    ) -> Result<Box<dyn AnalysisEngine>>;

    /// Library teardown, called once after a successful start-up
    fn dispose(&self) {}
}

/// How [`AnalysisEngine::last_total_processed_count`] is to be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessedCountMode {
    /// Running total over the engine's lifetime; the driver trims by the
    /// difference to the previously seen total
    #[default]
    Cumulative,
    /// Count consumed by the most recent update only
    PerUpdate,
}
