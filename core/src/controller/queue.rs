//! Pending segments and completion signals

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::audio::DecodedAudio;
use crate::error::{Result, SyncError};

/// A queued playback segment
#[derive(Debug)]
pub enum QueuedSegment {
    /// Decoded and ready to play
    Ready(Arc<DecodedAudio>),
    /// Fetch/decode still running elsewhere
    Pending(oneshot::Receiver<Result<Arc<DecodedAudio>>>),
}

/// Non-blocking view of a segment's state
#[derive(Debug)]
pub enum SegmentPoll {
    Ready(Arc<DecodedAudio>),
    Failed(SyncError),
    Waiting,
}

impl QueuedSegment {
    /// Check the segment without blocking
    pub fn poll(&mut self) -> SegmentPoll {
        match self {
            Self::Ready(audio) => SegmentPoll::Ready(audio.clone()),
            Self::Pending(rx) => match rx.try_recv() {
                Ok(Ok(audio)) => {
                    *self = Self::Ready(audio.clone());
                    SegmentPoll::Ready(audio)
                }
                Ok(Err(e)) => SegmentPoll::Failed(e),
                Err(TryRecvError::Empty) => SegmentPoll::Waiting,
                Err(TryRecvError::Closed) => SegmentPoll::Failed(SyncError::NoAudio),
            },
        }
    }
}

impl From<Arc<DecodedAudio>> for QueuedSegment {
    fn from(audio: Arc<DecodedAudio>) -> Self {
        Self::Ready(audio)
    }
}

impl From<DecodedAudio> for QueuedSegment {
    fn from(audio: DecodedAudio) -> Self {
        Self::Ready(Arc::new(audio))
    }
}

/// FIFO of segments waiting to be played
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    segments: VecDeque<QueuedSegment>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: QueuedSegment) {
        self.segments.push_back(segment);
    }

    pub fn front_mut(&mut self) -> Option<&mut QueuedSegment> {
        self.segments.front_mut()
    }

    pub fn pop_front(&mut self) -> Option<QueuedSegment> {
        self.segments.pop_front()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }
}

/// How a segment's playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Played to the end
    Finished,
    /// Stopped or replaced before the end
    Stopped,
}

/// Resolves when the segment started by `play` ends
#[derive(Debug)]
pub struct PlaybackCompletion {
    rx: oneshot::Receiver<PlaybackOutcome>,
    outcome: Option<PlaybackOutcome>,
}

impl PlaybackCompletion {
    pub(crate) fn new(rx: oneshot::Receiver<PlaybackOutcome>) -> Self {
        Self { rx, outcome: None }
    }

    /// Outcome if playback has ended, without blocking
    pub fn try_outcome(&mut self) -> Option<PlaybackOutcome> {
        if self.outcome.is_none() {
            self.outcome = match self.rx.try_recv() {
                Ok(outcome) => Some(outcome),
                Err(TryRecvError::Empty) => None,
                // Controller dropped
                Err(TryRecvError::Closed) => Some(PlaybackOutcome::Stopped),
            };
        }
        self.outcome
    }

    /// Wait for playback to end
    pub async fn wait(self) -> PlaybackOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        self.rx.await.unwrap_or(PlaybackOutcome::Stopped)
    }
}
