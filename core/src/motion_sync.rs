//! Per-model lip-sync handle
//!
//! [`MotionSync`] ties a [`PlaybackController`] to a model's frame loop. The
//! controller lives behind `Arc<Mutex<_>>` so the registered post-update
//! observer and the application take turns on it; the observer only uses
//! `try_lock` and skips a frame rather than blocking the render thread.

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use tracing::{debug, info, trace, warn};

use crate::audio::AudioBackend;
use crate::config::SyncConfig;
use crate::controller::{PlaybackCompletion, PlaybackController, QueuedSegment};
use crate::engine::EngineRuntime;
use crate::error::Result;
use crate::fetch::AssetFetcher;
use crate::loader::{AudioInput, AudioLoader};
use crate::model::{FrameHost, HookId, ParameterTable};
use crate::session::{self, ConfigSource, FALLBACK_CONFIG, SyncSession};
use crate::settings::ModelSettings;

type SharedController<B> = Arc<Mutex<PlaybackController<B>>>;

/// Lip-sync for one model
pub struct MotionSync<B: AudioBackend> {
    controller: SharedController<B>,
    runtime: Arc<EngineRuntime>,
    config: SyncConfig,
    hook: Option<HookId>,
}

impl<B> MotionSync<B>
where
    B: AudioBackend + Send + 'static,
    B::Source: Send,
{
    pub fn new(backend: B, runtime: Arc<EngineRuntime>, config: SyncConfig) -> Self {
        let controller = PlaybackController::new(backend, &config);
        Self {
            controller: Arc::new(Mutex::new(controller)),
            runtime,
            config,
            hook: None,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Lock the controller. A poisoned lock is recovered.
    pub fn lock(&self) -> MutexGuard<'_, PlaybackController<B>> {
        self.controller.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registered observer, if installed
    pub fn hook(&self) -> Option<HookId> {
        self.hook
    }

    /// Load the sync configuration referenced by `settings` and hook the
    /// model's frame loop.
    ///
    /// Falls back to the bundled configuration when the settings carry no
    /// usable reference or the asset cannot be fetched or loaded.
    pub async fn load_motion_sync<F: AssetFetcher>(
        &mut self,
        settings: &ModelSettings,
        fetcher: &F,
        model: &dyn ParameterTable,
        host: &mut dyn FrameHost,
    ) -> Result<ConfigSource> {
        let session = session::load_session(
            &self.runtime,
            settings,
            fetcher,
            model,
            self.config.samples_per_sec,
        )
        .await?;
        Ok(self.activate(session, host))
    }

    /// Fetch the configuration at `url` directly, skipping the settings
    /// document. Fetch and load failures fall back to the bundled
    /// configuration.
    pub async fn load_motion_sync_from_url<F: AssetFetcher>(
        &mut self,
        url: &str,
        fetcher: &F,
        model: &dyn ParameterTable,
        host: &mut dyn FrameHost,
    ) -> Result<ConfigSource> {
        let session = session::load_session_from_url(
            &self.runtime,
            url,
            fetcher,
            model,
            self.config.samples_per_sec,
        )
        .await?;
        Ok(self.activate(session, host))
    }

    /// Load a serialized configuration directly.
    ///
    /// Empty or unusable buffers are rejected with a warning and the
    /// previous session stays active.
    pub fn load_motion_sync_from_bytes(
        &mut self,
        bytes: &[u8],
        model: &dyn ParameterTable,
        host: &mut dyn FrameHost,
    ) -> Result<()> {
        let session = session::session_from_bytes(
            &self.runtime,
            model,
            bytes,
            self.config.samples_per_sec,
            ConfigSource::Bytes,
        )
        .inspect_err(|e| warn!("Failed to load motion sync: {}", e))?;
        self.activate(session, host);
        Ok(())
    }

    /// Load the bundled fallback configuration
    pub fn load_default_motion_sync(
        &mut self,
        model: &dyn ParameterTable,
        host: &mut dyn FrameHost,
    ) -> Result<()> {
        let session = session::session_from_bytes(
            &self.runtime,
            model,
            FALLBACK_CONFIG,
            self.config.samples_per_sec,
            ConfigSource::Fallback,
        )?;
        self.activate(session, host);
        Ok(())
    }

    fn activate(&mut self, session: SyncSession, host: &mut dyn FrameHost) -> ConfigSource {
        let source = session.source().clone();
        info!("Motion sync loaded from {:?}", source);
        self.lock().replace_session(session);
        self.install(host);
        source
    }

    /// Register the per-frame observer with `host`. Idempotent.
    pub fn install(&mut self, host: &mut dyn FrameHost) -> HookId {
        if let Some(id) = self.hook {
            return id;
        }
        let controller = self.controller.clone();
        let id = host.subscribe_post_update(Box::new(move |model: &mut dyn ParameterTable| {
            match controller.try_lock() {
                Ok(mut c) => {
                    c.update(model);
                }
                Err(TryLockError::WouldBlock) => trace!("Controller busy, skipping sync tick"),
                Err(TryLockError::Poisoned(poisoned)) => {
                    poisoned.into_inner().update(model);
                }
            }
        }));
        self.hook = Some(id);
        id
    }

    /// Drop the session and unregister the observer
    pub fn unload(&mut self, host: &mut dyn FrameHost) {
        if let Some(id) = self.hook.take() {
            host.unsubscribe_post_update(id);
        }
        self.lock().clear_session();
        debug!("Motion sync unloaded");
    }

    /// Fetch/decode `input` if needed and play it.
    ///
    /// # Errors
    ///
    /// Fetch, decode and source start failures.
    pub async fn play<F: AssetFetcher + 'static>(
        &self,
        loader: &AudioLoader<F>,
        input: impl Into<AudioInput>,
        stop_others: bool,
        model: &mut dyn ParameterTable,
    ) -> Result<PlaybackCompletion> {
        let audio = loader.resolve(input.into()).await?;
        self.lock().play_decoded(audio, stop_others, model)
    }

    pub fn append_play(&self, segment: QueuedSegment) {
        self.lock().append_play(segment);
    }

    pub fn stop(&self, model: &mut dyn ParameterTable) {
        self.lock().stop(model);
    }

    pub fn reset(&self, model: &mut dyn ParameterTable) {
        self.lock().reset(model);
    }

    pub fn set_volume(&self, level: f32) {
        self.lock().set_volume(level);
    }

    pub fn volume(&self) -> f32 {
        self.lock().volume()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().is_playing()
    }
}
