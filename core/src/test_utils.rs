//! Shared test utilities for unit tests

use std::collections::HashMap;
use std::future::Future;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use crate::audio::{AudioBackend, AudioClock, AudioSource, DecodedAudio};
use crate::engine::AnalysisEngine;
use crate::error::{Result, SyncError};
use crate::fetch::AssetFetcher;
use crate::model::ParameterTable;

// ============================================================================
// Test Model
// ============================================================================

/// Parameter table backed by plain vectors
#[derive(Debug, Clone, Default)]
pub struct TestModel {
    ids: Vec<String>,
    values: Vec<f32>,
    set_calls: usize,
}

impl TestModel {
    pub fn with_parameters(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|id| id.to_string()).collect(),
            values: vec![0.0; ids.len()],
            set_calls: 0,
        }
    }

    /// Number of `set_parameter_value_by_index` calls so far
    pub fn set_calls(&self) -> usize {
        self.set_calls
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

impl ParameterTable for TestModel {
    fn parameter_count(&self) -> usize {
        self.values.len()
    }

    fn parameter_index(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|p| p == id)
    }

    fn parameter_value(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    fn set_parameter_value_by_index(&mut self, index: usize, value: f32) {
        self.set_calls += 1;
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }
}

// ============================================================================
// Scripted Analysis Engine
// ============================================================================

/// What a [`ScriptedEngine`] observed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineLog {
    /// Buffer length handed over before each update
    pub buffer_lens: Vec<usize>,
    /// First buffered sample before each update
    pub first_samples: Vec<Option<f32>>,
    /// Delta time passed to each update
    pub deltas: Vec<f64>,
}

/// Engine with a scripted consumption pattern.
///
/// By default it consumes its whole buffer on every update and reports a
/// lifetime total.
#[derive(Debug)]
pub struct ScriptedEngine {
    consume: Option<usize>,
    per_update: bool,
    mouth: Option<Vec<usize>>,
    writes: Option<(usize, f32)>,
    buffer: Vec<f32>,
    total: usize,
    last: usize,
    log: Arc<Mutex<EngineLog>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            consume: None,
            per_update: false,
            mouth: Some(Vec::new()),
            writes: None,
            buffer: Vec::new(),
            total: 0,
            last: 0,
            log: Arc::new(Mutex::new(EngineLog::default())),
        }
    }

    /// Consume at most `count` samples per update
    pub fn consuming(mut self, count: usize) -> Self {
        self.consume = Some(count);
        self
    }

    /// Report the per-update count instead of a lifetime total
    pub fn per_update(mut self) -> Self {
        self.per_update = true;
        self
    }

    pub fn with_mouth(mut self, indices: &[usize]) -> Self {
        self.mouth = Some(indices.to_vec());
        self
    }

    /// Fail mouth index lookups
    pub fn without_mouth(mut self) -> Self {
        self.mouth = None;
        self
    }

    /// Write `value` to parameter `index` on every update
    pub fn writing(mut self, index: usize, value: f32) -> Self {
        self.writes = Some((index, value));
        self
    }

    pub fn log(&self) -> EngineLog {
        self.log.lock().unwrap().clone()
    }

    /// Handle that outlives the engine once it is boxed into a session
    pub fn shared_log(&self) -> Arc<Mutex<EngineLog>> {
        self.log.clone()
    }
}

impl AnalysisEngine for ScriptedEngine {
    fn set_sound_buffer(&mut self, channel: usize, samples: &[f32], offset: usize) {
        if channel == 0 {
            self.buffer = samples[offset..].to_vec();
        }
    }

    fn update_parameters(&mut self, model: &mut dyn ParameterTable, delta_time: f64) {
        {
            let mut log = self.log.lock().unwrap();
            log.buffer_lens.push(self.buffer.len());
            log.first_samples.push(self.buffer.first().copied());
            log.deltas.push(delta_time);
        }
        let consumed = self
            .consume
            .map_or(self.buffer.len(), |n| n.min(self.buffer.len()));
        self.last = consumed;
        self.total += consumed;
        if let Some((index, value)) = self.writes {
            model.set_parameter_value_by_index(index, value);
        }
    }

    fn last_total_processed_count(&self, _channel: usize) -> usize {
        if self.per_update { self.last } else { self.total }
    }

    fn mouth_parameter_indices(&self) -> Result<Vec<usize>> {
        self.mouth
            .clone()
            .ok_or_else(|| SyncError::MouthParameters("scripted failure".into()))
    }
}

// ============================================================================
// Test Audio Graph
// ============================================================================

/// Observable state of one created source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceProbe {
    pub frames: usize,
    pub started: bool,
    pub stopped: bool,
    pub disconnected: bool,
    pub ended: bool,
}

#[derive(Debug, Default)]
struct GraphState {
    time: f64,
    gain: f32,
    sources: Vec<SourceProbe>,
    fail_create: bool,
}

/// Manually clocked audio graph shared by a [`TestBackend`] and the test
#[derive(Debug, Clone, Default)]
pub struct TestAudioGraph {
    state: Arc<Mutex<GraphState>>,
}

impl TestAudioGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(&self) -> TestBackend {
        TestBackend {
            graph: self.clone(),
        }
    }

    pub fn set_time(&self, time: f64) {
        self.state.lock().unwrap().time = time;
    }

    pub fn advance(&self, seconds: f64) {
        self.state.lock().unwrap().time += seconds;
    }

    pub fn gain(&self) -> f32 {
        self.state.lock().unwrap().gain
    }

    pub fn fail_create(&self, fail: bool) {
        self.state.lock().unwrap().fail_create = fail;
    }

    pub fn source_count(&self) -> usize {
        self.state.lock().unwrap().sources.len()
    }

    pub fn probe(&self, index: usize) -> SourceProbe {
        self.state.lock().unwrap().sources[index].clone()
    }

    /// Mark source `index` as played to its end
    pub fn end_source(&self, index: usize) {
        self.state.lock().unwrap().sources[index].ended = true;
    }
}

/// [`AudioBackend`] over a [`TestAudioGraph`]
#[derive(Debug)]
pub struct TestBackend {
    graph: TestAudioGraph,
}

impl AudioClock for TestBackend {
    fn current_time(&self) -> f64 {
        self.graph.state.lock().unwrap().time
    }
}

impl AudioBackend for TestBackend {
    type Source = TestSource;

    fn create_source(&mut self, audio: Arc<DecodedAudio>) -> Result<TestSource> {
        let mut state = self.graph.state.lock().unwrap();
        if state.fail_create {
            return Err(SyncError::Backend("source creation refused".into()));
        }
        state.sources.push(SourceProbe {
            frames: audio.len(),
            ..Default::default()
        });
        Ok(TestSource {
            graph: self.graph.clone(),
            index: state.sources.len() - 1,
        })
    }

    fn set_gain(&mut self, gain: f32) {
        self.graph.state.lock().unwrap().gain = gain;
    }
}

#[derive(Debug)]
pub struct TestSource {
    graph: TestAudioGraph,
    index: usize,
}

impl TestSource {
    fn with_probe(&self, f: impl FnOnce(&mut SourceProbe)) {
        f(&mut self.graph.state.lock().unwrap().sources[self.index]);
    }
}

impl AudioSource for TestSource {
    fn start(&mut self) -> Result<()> {
        self.with_probe(|p| p.started = true);
        Ok(())
    }

    fn stop(&mut self) {
        self.with_probe(|p| p.stopped = true);
    }

    fn disconnect(&mut self) {
        self.with_probe(|p| p.disconnected = true);
    }

    fn has_ended(&self) -> bool {
        self.graph.state.lock().unwrap().sources[self.index].ended
    }
}

// ============================================================================
// Static Fetcher
// ============================================================================

/// In-memory asset store; unknown locations fail to fetch
#[derive(Debug, Default)]
pub struct StaticFetcher {
    assets: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, location: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.assets.insert(location.to_string(), bytes.into());
        self
    }

    /// Locations requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl AssetFetcher for StaticFetcher {
    fn fetch(&self, location: &str) -> impl Future<Output = Result<Vec<u8>>> + Send {
        self.requests.lock().unwrap().push(location.to_string());
        let result = self
            .assets
            .get(location)
            .cloned()
            .ok_or_else(|| SyncError::fetch(location, "not found"));
        async move { result }
    }
}

// ============================================================================
// Audio Fixtures
// ============================================================================

/// Encode 16-bit stereo frames as an in-memory WAV file
pub fn wav_bytes(frames: &[[i16; 2]], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for frame in frames {
            writer.write_sample(frame[0]).unwrap();
            writer.write_sample(frame[1]).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Mono segment whose sample `i` has the value `i`
pub fn ramp_audio(len: usize, sample_rate: u32) -> DecodedAudio {
    DecodedAudio::mono((0..len).map(|i| i as f32).collect(), sample_rate).unwrap()
}
