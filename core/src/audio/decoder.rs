//! Audio decoding

use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use super::DecodedAudio;
use crate::error::{Result, SyncError};

/// Converts encoded audio bytes into [`DecodedAudio`]
pub trait Decoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedAudio>;
}

/// RIFF/WAVE decoder for integer and float PCM
#[derive(Debug, Default, Clone, Copy)]
pub struct WavDecoder;

impl Decoder for WavDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedAudio> {
        let reader =
            WavReader::new(Cursor::new(bytes)).map_err(|e| SyncError::Decode(e.to_string()))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            return Err(SyncError::Decode("WAV header declares zero channels".into()));
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| SyncError::Decode(e.to_string()))?,
            SampleFormat::Int => {
                // Full-scale value for the declared bit depth
                let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| SyncError::Decode(e.to_string()))?
            }
        };

        let frames = interleaved.len() / channels;
        let mut planes = vec![Vec::with_capacity(frames); channels];
        for frame in interleaved.chunks_exact(channels) {
            for (plane, &sample) in planes.iter_mut().zip(frame) {
                plane.push(sample);
            }
        }

        DecodedAudio::new(planes, spec.sample_rate)
    }
}
