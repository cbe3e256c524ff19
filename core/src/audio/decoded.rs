//! Decoded audio segment

use crate::error::{Result, SyncError};

/// Decoded sample data for one playback segment.
///
/// Channels are stored as separate planes of equal length (`len()` frames).
/// The segment is immutable once built and shared behind an `Arc` by the
/// controller and the audio backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
    length: usize,
}

impl DecodedAudio {
    /// Build a segment from per-channel sample planes
    ///
    /// # Errors
    ///
    /// Fails if there are no channels, the planes differ in length or the
    /// sample rate is zero.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SyncError::Decode("sample rate must be non-zero".into()));
        }
        let Some(first) = channels.first() else {
            return Err(SyncError::Decode("audio has no channels".into()));
        };
        let length = first.len();
        if let Some(bad) = channels.iter().position(|c| c.len() != length) {
            return Err(SyncError::Decode(format!(
                "channel {} has {} frames, expected {}",
                bad,
                channels[bad].len(),
                length
            )));
        }
        Ok(Self {
            channels,
            sample_rate,
            length,
        })
    }

    /// Single-channel segment
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Samples of one channel, `None` if the channel does not exist
    pub fn channel_data(&self, channel: usize) -> Option<&[f32]> {
        self.channels.get(channel).map(Vec::as_slice)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in frames (samples per channel)
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.length as f64 / self.sample_rate as f64
    }
}
