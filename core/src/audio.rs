//! Audio-side collaborators of the synchronization core
//!
//! - [`DecodedAudio`] - immutable sample planes for one playback segment
//! - [`AudioClock`] / [`AudioBackend`] / [`AudioSource`] - the host audio graph
//! - [`Decoder`] / [`WavDecoder`] - encoded bytes to [`DecodedAudio`]

mod backend;
mod decoded;
mod decoder;

pub use backend::{AudioBackend, AudioClock, AudioSource};
pub use decoded::DecodedAudio;
pub use decoder::{Decoder, WavDecoder};
