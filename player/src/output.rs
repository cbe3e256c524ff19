//! Audio output using cpal and ring buffer
//!
//! The device callback drains interleaved samples from a ring buffer. The
//! main loop refills it once per frame from the playing segment with
//! [`CpalBackend::pump`]. The audio clock is the number of frames the
//! device has requested, so it advances even while nothing is playing.
//!
//! Stopping a source requests a flush: the callback drops whatever is still
//! queued in the ring, and `pump` holds off until the flush is acknowledged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, error, trace};

use motionsync_core::{AudioBackend, AudioClock, AudioSource, DecodedAudio, SyncError};

/// Ring buffer size in samples (~100ms of 48 kHz stereo)
const RING_BUFFER_SIZE: usize = 9600;

/// Progress reported by the device callback
#[derive(Debug, Default)]
pub struct OutputCounters {
    device_frames: AtomicU64,
    /// Samples removed from the ring, played or flushed
    popped_samples: AtomicU64,
    flush_requested: AtomicU64,
    flush_done: AtomicU64,
}

impl OutputCounters {
    fn record(&self, popped: usize, frames: usize) {
        self.popped_samples.fetch_add(popped as u64, Ordering::Release);
        self.device_frames.fetch_add(frames as u64, Ordering::Release);
    }

    fn request_flush(&self) {
        self.flush_requested.fetch_add(1, Ordering::AcqRel);
    }

    fn flush_pending(&self) -> bool {
        self.flush_requested.load(Ordering::Acquire) != self.flush_done.load(Ordering::Acquire)
    }

    fn device_frames(&self) -> u64 {
        self.device_frames.load(Ordering::Acquire)
    }

    fn popped_samples(&self) -> u64 {
        self.popped_samples.load(Ordering::Acquire)
    }
}

/// Consumer side of the ring, owned by the device callback
struct RingReader {
    consumer: HeapCons<f32>,
    counters: Arc<OutputCounters>,
    channels: usize,
}

impl RingReader {
    /// Fill `data` from the ring, silence for the rest. Returns samples read.
    fn read(&mut self, data: &mut [f32]) -> usize {
        let mut flushed = 0;
        let requested = self.counters.flush_requested.load(Ordering::Acquire);
        if requested != self.counters.flush_done.load(Ordering::Acquire) {
            flushed = self.consumer.clear();
            self.counters.flush_done.store(requested, Ordering::Release);
        }

        let popped = self.consumer.pop_slice(data);
        data[popped..].fill(0.0);
        self.counters.record(flushed + popped, data.len() / self.channels);
        popped
    }
}

/// Keeps the cpal stream alive. Output stops when this is dropped.
pub struct AudioOutput {
    _stream: cpal::Stream,
}

/// Open the default output device
pub fn open() -> Result<(AudioOutput, CpalBackend)> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("No audio output device available"))?;

    let config = device.default_output_config()?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    let ring = HeapRb::<f32>::new(RING_BUFFER_SIZE);
    let (producer, consumer) = ring.split();
    let counters = Arc::new(OutputCounters::default());
    let mut reader = RingReader {
        consumer,
        counters: counters.clone(),
        channels: channels.max(1),
    };

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let config = config.into();
            device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    reader.read(data);
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )?
        }
        cpal::SampleFormat::I16 => {
            let config = config.into();
            let mut temp_buffer: Vec<f32> = vec![0.0; 4096];
            device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    if temp_buffer.len() < data.len() {
                        temp_buffer.resize(data.len(), 0.0);
                    }
                    reader.read(&mut temp_buffer[..data.len()]);
                    let len = data.len();
                    for (out, &f) in data.iter_mut().zip(&temp_buffer[..len]) {
                        *out = (f * 32767.0).clamp(-32768.0, 32767.0) as i16;
                    }
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )?
        }
        other => return Err(anyhow!("Unsupported sample format: {:?}", other)),
    };

    stream.play()?;
    debug!(
        "Audio stream started: {} Hz, {} channels",
        sample_rate, channels
    );

    let backend = CpalBackend::new(producer, counters, sample_rate, channels);
    Ok((AudioOutput { _stream: stream }, backend))
}

#[derive(Debug)]
struct Voice {
    audio: Arc<DecodedAudio>,
    /// Read position in source frames
    position: f64,
    /// Source frames per device frame
    step: f64,
    started: bool,
    released: bool,
    /// Total pushed sample count once the last sample is in the ring
    end_marker: Option<u64>,
}

/// [`AudioBackend`] writing into the output ring buffer
pub struct CpalBackend {
    producer: HeapProd<f32>,
    counters: Arc<OutputCounters>,
    sample_rate: u32,
    channels: usize,
    gain: f32,
    pushed: u64,
    voice: Option<Arc<Mutex<Voice>>>,
    scratch: Vec<f32>,
}

impl CpalBackend {
    fn new(
        producer: HeapProd<f32>,
        counters: Arc<OutputCounters>,
        sample_rate: u32,
        channels: usize,
    ) -> Self {
        Self {
            producer,
            counters,
            sample_rate,
            channels: channels.max(1),
            gain: 1.0,
            pushed: 0,
            voice: None,
            scratch: Vec::with_capacity(RING_BUFFER_SIZE),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Top up the ring buffer from the playing segment
    pub fn pump(&mut self) {
        let Some(shared) = self.voice.clone() else {
            return;
        };
        let mut voice = shared.lock().unwrap_or_else(|e| e.into_inner());
        if voice.released {
            self.voice = None;
            return;
        }
        if !voice.started || voice.end_marker.is_some() || self.counters.flush_pending() {
            return;
        }

        let frames = self.producer.vacant_len() / self.channels;
        let len = voice.audio.len();
        let last_channel = voice.audio.channel_count().saturating_sub(1);
        self.scratch.clear();

        for _ in 0..frames {
            let index = voice.position as usize;
            if index >= len {
                break;
            }
            let frac = (voice.position - index as f64) as f32;
            for c in 0..self.channels {
                let plane = voice.audio.channel_data(c.min(last_channel)).unwrap_or(&[]);
                let a = plane.get(index).copied().unwrap_or(0.0);
                let b = plane.get(index + 1).copied().unwrap_or(a);
                self.scratch.push((a + (b - a) * frac) * self.gain);
            }
            voice.position += voice.step;
        }

        self.pushed += self.producer.push_slice(&self.scratch) as u64;
        if voice.position as usize >= len {
            voice.end_marker = Some(self.pushed);
            trace!("Segment fully queued at sample {}", self.pushed);
        }
    }
}

impl AudioClock for CpalBackend {
    fn current_time(&self) -> f64 {
        self.counters.device_frames() as f64 / self.sample_rate as f64
    }
}

impl AudioBackend for CpalBackend {
    type Source = CpalSource;

    fn create_source(&mut self, audio: Arc<DecodedAudio>) -> motionsync_core::Result<CpalSource> {
        if self.sample_rate == 0 {
            return Err(SyncError::Backend("output sample rate is zero".into()));
        }
        let step = audio.sample_rate() as f64 / self.sample_rate as f64;
        let voice = Arc::new(Mutex::new(Voice {
            audio,
            position: 0.0,
            step,
            started: false,
            released: false,
            end_marker: None,
        }));
        self.voice = Some(voice.clone());
        Ok(CpalSource {
            voice,
            counters: self.counters.clone(),
        })
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }
}

/// Handle to the segment currently fed by [`CpalBackend::pump`]
pub struct CpalSource {
    voice: Arc<Mutex<Voice>>,
    counters: Arc<OutputCounters>,
}

impl CpalSource {
    fn with_voice<T>(&self, f: impl FnOnce(&mut Voice) -> T) -> T {
        f(&mut self.voice.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Silence the voice and drop its samples still queued in the ring
    fn release(&mut self) {
        let was_released = self.with_voice(|v| std::mem::replace(&mut v.released, true));
        if !was_released {
            self.counters.request_flush();
        }
    }
}

impl AudioSource for CpalSource {
    fn start(&mut self) -> motionsync_core::Result<()> {
        self.with_voice(|v| v.started = true);
        Ok(())
    }

    fn stop(&mut self) {
        self.release();
    }

    fn disconnect(&mut self) {
        self.release();
    }

    fn has_ended(&self) -> bool {
        let popped = self.counters.popped_samples();
        self.with_voice(|v| v.end_marker.is_some_and(|marker| popped >= marker))
    }
}
