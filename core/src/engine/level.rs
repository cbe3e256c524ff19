//! Amplitude-driven reference analysis engine
//!
//! Reads a motionsync3-style JSON configuration and opens the configured
//! mouth parameters in proportion to the smoothed RMS level of the incoming
//! audio. Samples are consumed in whole analysis windows from the head of
//! the buffer; the processed count is a lifetime total.

use serde::Deserialize;
use tracing::{debug, warn};

use super::{AnalysisEngine, EngineFactory};
use crate::error::{Result, SyncError};
use crate::model::ParameterTable;

/// Top level of a motionsync3 configuration document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MotionSyncDocument {
    #[serde(default)]
    pub version: u32,
    pub settings: Vec<MotionSyncSetting>,
}

/// One analysis setting
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MotionSyncSetting {
    pub id: String,
    pub cubism_parameters: Vec<CubismParameter>,
    #[serde(default)]
    pub post_processing: PostProcessing,
}

/// Model parameter driven by a setting
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CubismParameter {
    #[serde(default)]
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub min: f32,
    #[serde(default = "default_max")]
    pub max: f32,
}

/// Smoothing and output shaping
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PostProcessing {
    /// Weight of the new value against the parameter's current value (0-1)
    #[serde(default = "default_blend_ratio")]
    pub blend_ratio: f32,
    /// Exponential smoothing of the level between windows (0-1)
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    /// Analysis windows per second
    #[serde(default = "default_analysis_rate")]
    pub sample_rate: f32,
    /// Multiplier from RMS to normalized mouth opening
    #[serde(default = "default_gain")]
    pub gain: f32,
}

impl Default for PostProcessing {
    fn default() -> Self {
        Self {
            blend_ratio: default_blend_ratio(),
            smoothing: default_smoothing(),
            sample_rate: default_analysis_rate(),
            gain: default_gain(),
        }
    }
}

fn default_max() -> f32 {
    1.0
}
fn default_blend_ratio() -> f32 {
    1.0
}
fn default_smoothing() -> f32 {
    0.5
}
fn default_analysis_rate() -> f32 {
    60.0
}
fn default_gain() -> f32 {
    4.0
}

impl MotionSyncDocument {
    /// Parse a serialized configuration
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let document: Self =
            serde_json::from_slice(bytes).map_err(|e| SyncError::InvalidConfig(e.to_string()))?;
        if document.settings.is_empty() {
            return Err(SyncError::InvalidConfig("configuration has no settings".into()));
        }
        Ok(document)
    }
}

#[derive(Debug, Clone)]
struct MouthTarget {
    id: String,
    index: Option<usize>,
    min: f32,
    max: f32,
}

/// Reference engine mapping audio level to mouth opening
#[derive(Debug)]
pub struct LevelEngine {
    setting_id: String,
    targets: Vec<MouthTarget>,
    window: usize,
    smoothing: f32,
    blend_ratio: f32,
    gain: f32,
    pending: Vec<f32>,
    level: f32,
    total_processed: usize,
}

impl LevelEngine {
    /// Build an engine from the first setting of a configuration document
    pub fn from_config(
        model: &dyn ParameterTable,
        config: &[u8],
        sample_rate: u32,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SyncError::Engine("sample rate must be non-zero".into()));
        }
        let document = MotionSyncDocument::parse(config)?;
        let setting = &document.settings[0];
        let post = &setting.post_processing;

        let targets = setting
            .cubism_parameters
            .iter()
            .map(|p| {
                let index = model.parameter_index(&p.id);
                if index.is_none() {
                    warn!("Mouth parameter '{}' not found on model", p.id);
                }
                MouthTarget {
                    id: p.id.clone(),
                    index,
                    min: p.min,
                    max: p.max,
                }
            })
            .collect();

        let analysis_rate = if post.sample_rate > 0.0 {
            post.sample_rate
        } else {
            default_analysis_rate()
        };
        let window = ((sample_rate as f32 / analysis_rate) as usize).max(1);

        debug!(
            "Level engine '{}': window {} samples at {} Hz",
            setting.id, window, sample_rate
        );

        Ok(Self {
            setting_id: setting.id.clone(),
            targets,
            window,
            smoothing: post.smoothing.clamp(0.0, 1.0),
            blend_ratio: post.blend_ratio.clamp(0.0, 1.0),
            gain: post.gain.max(0.0),
            pending: Vec::new(),
            level: 0.0,
            total_processed: 0,
        })
    }

    /// Id of the active setting
    pub fn setting_id(&self) -> &str {
        &self.setting_id
    }

    /// Samples per analysis window
    pub fn window(&self) -> usize {
        self.window
    }

    /// Smoothed level after the last update (0-1)
    pub fn level(&self) -> f32 {
        self.level
    }
}

impl AnalysisEngine for LevelEngine {
    fn set_sound_buffer(&mut self, channel: usize, samples: &[f32], offset: usize) {
        if channel != 0 {
            return;
        }
        self.pending.clear();
        if let Some(tail) = samples.get(offset..) {
            self.pending.extend_from_slice(tail);
        }
    }

    fn update_parameters(&mut self, model: &mut dyn ParameterTable, _delta_time: f64) {
        let windows = self.pending.len() / self.window;
        if windows == 0 {
            return;
        }

        for chunk in self.pending.chunks_exact(self.window).take(windows) {
            let target = (rms_level(chunk) * self.gain).min(1.0);
            self.level = self.smoothing * self.level + (1.0 - self.smoothing) * target;
        }
        let processed = windows * self.window;
        self.pending.drain(..processed);
        self.total_processed += processed;

        for target in &self.targets {
            let Some(index) = target.index else { continue };
            let value = target.min + (target.max - target.min) * self.level;
            let current = model.parameter_value(index).unwrap_or(value);
            let blended = current + (value - current) * self.blend_ratio;
            model.set_parameter_value_by_index(index, blended);
        }
    }

    fn last_total_processed_count(&self, channel: usize) -> usize {
        if channel == 0 { self.total_processed } else { 0 }
    }

    fn mouth_parameter_indices(&self) -> Result<Vec<usize>> {
        let indices: Vec<usize> = self.targets.iter().filter_map(|t| t.index).collect();
        if indices.is_empty() {
            let ids: Vec<&str> = self.targets.iter().map(|t| t.id.as_str()).collect();
            return Err(SyncError::MouthParameters(format!(
                "none of {:?} exist on the model",
                ids
            )));
        }
        Ok(indices)
    }
}

/// Factory for [`LevelEngine`]; needs no library start-up
#[derive(Debug, Default, Clone, Copy)]
pub struct LevelEngineFactory;

impl EngineFactory for LevelEngineFactory {
    fn create(
        &self,
        model: &dyn ParameterTable,
        config: &[u8],
        sample_rate: u32,
    ) -> Result<Box<dyn AnalysisEngine>> {
        Ok(Box::new(LevelEngine::from_config(model, config, sample_rate)?))
    }
}

fn rms_level(x: &[f32]) -> f32 {
    if x.is_empty() {
        return 0.0;
    }
    let mut sum = 0.0f64;
    for &v in x {
        sum += (v as f64) * (v as f64);
    }
    (sum / x.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FALLBACK_CONFIG;
    use crate::test_utils::TestModel;

    fn model() -> TestModel {
        TestModel::with_parameters(&["ParamAngleX", "ParamMouthOpenY", "ParamA"])
    }

    #[test]
    fn test_fallback_config_parses() {
        let document = MotionSyncDocument::parse(FALLBACK_CONFIG).unwrap();
        assert_eq!(document.settings.len(), 1);
        assert_eq!(document.settings[0].cubism_parameters[0].id, "ParamMouthOpenY");
    }

    #[test]
    fn test_parse_rejects_empty_settings() {
        let result = MotionSyncDocument::parse(br#"{"Version": 1, "Settings": []}"#);
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(MotionSyncDocument::parse(b"<xml/>").is_err());
    }

    #[test]
    fn test_resolves_mouth_indices() {
        let engine = LevelEngine::from_config(&model(), FALLBACK_CONFIG, 48_000).unwrap();
        assert_eq!(engine.mouth_parameter_indices().unwrap(), vec![1, 2]);
        assert_eq!(engine.window(), 800);
    }

    #[test]
    fn test_missing_parameters_fail_index_lookup() {
        let bare = TestModel::with_parameters(&["ParamAngleX"]);
        let engine = LevelEngine::from_config(&bare, FALLBACK_CONFIG, 48_000).unwrap();
        assert!(matches!(
            engine.mouth_parameter_indices(),
            Err(SyncError::MouthParameters(_))
        ));
    }

    #[test]
    fn test_consumes_whole_windows_only() {
        let mut m = model();
        let mut engine = LevelEngine::from_config(&m, FALLBACK_CONFIG, 48_000).unwrap();

        engine.set_sound_buffer(0, &vec![0.0; 1000], 0);
        engine.update_parameters(&mut m, 1.0 / 60.0);
        assert_eq!(engine.last_total_processed_count(0), 800);

        engine.set_sound_buffer(0, &vec![0.0; 700], 0);
        engine.update_parameters(&mut m, 1.0 / 60.0);
        assert_eq!(engine.last_total_processed_count(0), 800);

        engine.set_sound_buffer(0, &vec![0.0; 1700], 100);
        engine.update_parameters(&mut m, 1.0 / 60.0);
        assert_eq!(engine.last_total_processed_count(0), 2400);
        assert_eq!(engine.last_total_processed_count(1), 0);
    }

    #[test]
    fn test_loud_audio_opens_mouth() {
        let mut m = model();
        let mut engine = LevelEngine::from_config(&m, FALLBACK_CONFIG, 48_000).unwrap();

        let loud: Vec<f32> = (0..8000).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        engine.set_sound_buffer(0, &loud, 0);
        engine.update_parameters(&mut m, 1.0 / 60.0);

        let open = m.parameter_value(1).unwrap();
        let a = m.parameter_value(2).unwrap();
        assert!(open > 0.9, "mouth open was {open}");
        assert!(a <= 0.7 && a > 0.6, "A was {a}");
        assert_eq!(m.parameter_value(0), Some(0.0));
    }

    #[test]
    fn test_silence_keeps_mouth_closed() {
        let mut m = model();
        let mut engine = LevelEngine::from_config(&m, FALLBACK_CONFIG, 48_000).unwrap();
        engine.set_sound_buffer(0, &vec![0.0; 4800], 0);
        engine.update_parameters(&mut m, 0.1);
        assert_eq!(m.parameter_value(1), Some(0.0));
        assert_eq!(engine.level(), 0.0);
    }

    #[test]
    fn test_rms_level() {
        assert_eq!(rms_level(&[]), 0.0);
        assert!((rms_level(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
    }
}
