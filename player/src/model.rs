//! Headless stand-in for a rendered avatar model

use motionsync_core::ParameterTable;

/// Parameter ids of a typical avatar rig
const STANDARD_PARAMETERS: &[&str] = &[
    "ParamAngleX",
    "ParamAngleY",
    "ParamEyeLOpen",
    "ParamEyeROpen",
    "ParamMouthForm",
    "ParamMouthOpenY",
    "ParamA",
    "ParamI",
    "ParamU",
    "ParamE",
    "ParamO",
];

/// Parameter table with an idle sway as its own per-frame update
#[derive(Debug, Clone)]
pub struct HeadlessModel {
    ids: Vec<String>,
    values: Vec<f32>,
    elapsed: f32,
}

impl HeadlessModel {
    pub fn standard() -> Self {
        Self {
            ids: STANDARD_PARAMETERS.iter().map(|id| id.to_string()).collect(),
            values: vec![0.0; STANDARD_PARAMETERS.len()],
            elapsed: 0.0,
        }
    }

    /// The model's own update, run before the post-update hooks
    pub fn update(&mut self, delta: f32) {
        self.elapsed += delta;
        let sway = (self.elapsed * 0.8).sin() * 10.0;
        if let Some(index) = self.parameter_index("ParamAngleX") {
            self.values[index] = sway;
        }
    }

    /// Current value of a parameter by id
    pub fn value(&self, id: &str) -> Option<f32> {
        self.parameter_index(id).map(|index| self.values[index])
    }
}

impl ParameterTable for HeadlessModel {
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
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }
}

/// Text meter of a 0-1 value, e.g. `[######    ]`
pub fn meter(value: f32, width: usize) -> String {
    let filled = ((value.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), " ".repeat(width - filled))
}
