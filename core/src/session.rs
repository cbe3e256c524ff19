//! Sync sessions and configuration loading with fallback

use tracing::{debug, warn};

use crate::engine::{AnalysisEngine, EngineRuntime};
use crate::error::{Result, SyncError};
use crate::fetch::AssetFetcher;
use crate::model::ParameterTable;
use crate::settings::ModelSettings;

/// Configuration used when a model has no usable sync asset
pub const FALLBACK_CONFIG: &[u8] = include_bytes!("../assets/fallback.motionsync3.json");

/// Where a session's configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Fetched from the resolved asset location
    Asset(String),
    /// Bundled fallback configuration
    Fallback,
    /// Caller-supplied bytes
    Bytes,
}

/// One loaded configuration bound to a model, owning its engine instance
pub struct SyncSession {
    engine: Box<dyn AnalysisEngine>,
    source: ConfigSource,
    sample_rate: u32,
}

impl SyncSession {
    pub fn new(engine: Box<dyn AnalysisEngine>, source: ConfigSource, sample_rate: u32) -> Self {
        Self {
            engine,
            source,
            sample_rate,
        }
    }

    pub fn engine_mut(&mut self) -> &mut dyn AnalysisEngine {
        &mut *self.engine
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Sample rate the engine was created for
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn mouth_parameter_indices(&self) -> Result<Vec<usize>> {
        self.engine.mouth_parameter_indices()
    }
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("source", &self.source)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

/// Create a session from serialized configuration bytes.
///
/// # Errors
///
/// Empty buffers are rejected with [`SyncError::InvalidConfig`]; engine
/// start-up and creation errors are passed through.
pub fn session_from_bytes(
    runtime: &EngineRuntime,
    model: &dyn ParameterTable,
    bytes: &[u8],
    sample_rate: u32,
    source: ConfigSource,
) -> Result<SyncSession> {
    if bytes.is_empty() {
        return Err(SyncError::InvalidConfig("configuration is empty".into()));
    }
    let engine = runtime.create_engine(model, bytes, sample_rate)?;
    debug!("Created sync session from {:?} at {} Hz", source, sample_rate);
    Ok(SyncSession::new(engine, source, sample_rate))
}

/// Load the session referenced by `settings`.
///
/// Missing or malformed references, fetch failures and engine creation
/// failures on the fetched asset all fall back to [`FALLBACK_CONFIG`]. Only
/// a failure of the fallback itself is returned.
pub async fn load_session<F: AssetFetcher>(
    runtime: &EngineRuntime,
    settings: &ModelSettings,
    fetcher: &F,
    model: &dyn ParameterTable,
    sample_rate: u32,
) -> Result<SyncSession> {
    let url = match settings.motion_sync_reference() {
        Some(reference) => Some(settings.resolve_url(reference)),
        None => {
            warn!(
                "'{}' has no FileReferences.MotionSync, using fallback configuration",
                settings.location()
            );
            None
        }
    };
    fetch_or_fallback(runtime, url, fetcher, model, sample_rate).await
}

/// Load the configuration at `url`, falling back like [`load_session`]
pub async fn load_session_from_url<F: AssetFetcher>(
    runtime: &EngineRuntime,
    url: &str,
    fetcher: &F,
    model: &dyn ParameterTable,
    sample_rate: u32,
) -> Result<SyncSession> {
    fetch_or_fallback(runtime, Some(url.to_string()), fetcher, model, sample_rate).await
}

async fn fetch_or_fallback<F: AssetFetcher>(
    runtime: &EngineRuntime,
    url: Option<String>,
    fetcher: &F,
    model: &dyn ParameterTable,
    sample_rate: u32,
) -> Result<SyncSession> {
    if let Some(url) = url {
        match fetcher.fetch(&url).await {
            Ok(bytes) => {
                let source = ConfigSource::Asset(url);
                match session_from_bytes(runtime, model, &bytes, sample_rate, source) {
                    Ok(session) => return Ok(session),
                    Err(e) => warn!("{}, using fallback configuration", e),
                }
            }
            Err(e) => warn!("{}, using fallback configuration", e),
        }
    }

    session_from_bytes(runtime, model, FALLBACK_CONFIG, sample_rate, ConfigSource::Fallback)
}
