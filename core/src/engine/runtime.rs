//! Engine library lifecycle

use std::sync::Mutex;

use tracing::{debug, info};

use super::{AnalysisEngine, EngineFactory};
use crate::error::Result;
use crate::model::ParameterTable;

/// Owns an [`EngineFactory`] and its one-time start-up.
///
/// `ensure_ready` is called lazily before the first engine is created and
/// is a no-op afterwards. The factory is disposed when the runtime drops,
/// so share it behind an `Arc` for process-wide use.
pub struct EngineRuntime {
    factory: Box<dyn EngineFactory>,
    ready: Mutex<bool>,
}

impl EngineRuntime {
    pub fn new(factory: impl EngineFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            ready: Mutex::new(false),
        }
    }

    /// Start the engine library if it has not been started yet
    pub fn ensure_ready(&self) -> Result<()> {
        let mut ready = self.ready.lock().unwrap_or_else(|e| e.into_inner());
        if !*ready {
            self.factory.start_up()?;
            *ready = true;
            info!("Analysis engine started");
        }
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create an engine instance, starting the library first if needed
    pub fn create_engine(
        &self,
        model: &dyn ParameterTable,
        config: &[u8],
        sample_rate: u32,
    ) -> Result<Box<dyn AnalysisEngine>> {
        self.ensure_ready()?;
        self.factory.create(model, config, sample_rate)
    }
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        let ready = self.ready.get_mut().map(|r| *r).unwrap_or_else(|e| *e.into_inner());
        if ready {
            self.factory.dispose();
            debug!("Analysis engine disposed");
        }
    }
}
