//! Fetch + decode of playback audio

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::debug;

use crate::audio::{DecodedAudio, Decoder, WavDecoder};
use crate::controller::QueuedSegment;
use crate::error::{Result, SyncError};
use crate::fetch::AssetFetcher;

/// Audio handed to `play`
#[derive(Debug, Clone)]
pub enum AudioInput {
    /// Location to fetch and decode
    Location(String),
    /// Encoded bytes to decode
    Encoded(Vec<u8>),
    /// Already decoded audio
    Decoded(Arc<DecodedAudio>),
}

impl From<&str> for AudioInput {
    fn from(location: &str) -> Self {
        Self::Location(location.to_string())
    }
}

impl From<String> for AudioInput {
    fn from(location: String) -> Self {
        Self::Location(location)
    }
}

impl From<Vec<u8>> for AudioInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Encoded(bytes)
    }
}

impl From<DecodedAudio> for AudioInput {
    fn from(audio: DecodedAudio) -> Self {
        Self::Decoded(Arc::new(audio))
    }
}

impl From<Arc<DecodedAudio>> for AudioInput {
    fn from(audio: Arc<DecodedAudio>) -> Self {
        Self::Decoded(audio)
    }
}

/// Fetcher and decoder pair used to turn [`AudioInput`] into samples
pub struct AudioLoader<F> {
    fetcher: Arc<F>,
    decoder: Arc<dyn Decoder>,
}

impl<F> Clone for AudioLoader<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            decoder: self.decoder.clone(),
        }
    }
}

impl<F: AssetFetcher + 'static> AudioLoader<F> {
    /// Loader decoding WAV data
    pub fn new(fetcher: F) -> Self {
        Self::with_decoder(fetcher, WavDecoder)
    }

    pub fn with_decoder(fetcher: F, decoder: impl Decoder + 'static) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            decoder: Arc::new(decoder),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch and decode `location` without playing it
    pub async fn load(&self, location: &str) -> Result<Arc<DecodedAudio>> {
        let bytes = self.fetcher.fetch(location).await?;
        debug!("Fetched {} bytes from {}", bytes.len(), location);
        self.decode(&bytes)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Arc<DecodedAudio>> {
        if bytes.is_empty() {
            return Err(SyncError::NoAudio);
        }
        Ok(Arc::new(self.decoder.decode(bytes)?))
    }

    pub async fn resolve(&self, input: AudioInput) -> Result<Arc<DecodedAudio>> {
        match input {
            AudioInput::Location(location) => self.load(&location).await,
            AudioInput::Encoded(bytes) => self.decode(&bytes),
            AudioInput::Decoded(audio) => Ok(audio),
        }
    }

    /// Start fetch + decode on `handle` and return the segment that will
    /// become ready once it completes
    pub fn spawn_segment(&self, handle: &Handle, input: impl Into<AudioInput>) -> QueuedSegment {
        let input = input.into();
        if let AudioInput::Decoded(audio) = input {
            return QueuedSegment::Ready(audio);
        }
        let (tx, rx) = oneshot::channel();
        let loader = self.clone();
        handle.spawn(async move {
            let result = loader.resolve(input).await;
            // Receiver is gone if the queue was cleared meanwhile
            let _ = tx.send(result);
        });
        QueuedSegment::Pending(rx)
    }
}
