//! Viewer configuration (`periscope.toml` or built in code).

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stage::StageType;

/// Options for [`Viewer::new`](crate::Viewer::new).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ViewerOptions {
    /// `"gpu"` or `"headless"`. Absent means auto-detect.
    #[serde(default)]
    pub stage_type: Option<String>,
    /// Default duration of scene switches and `look_to`.
    #[serde(default = "default_transition_duration_ms")]
    pub transition_duration_ms: u64,
    /// Default for [`Viewer::layer_spec`](crate::Viewer::layer_spec).
    #[serde(default)]
    pub pin_first_level: bool,
    /// Idle time before the idle movement starts. Absent means never.
    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,
    #[serde(default)]
    pub controls: ControlsConfig,
}

fn default_transition_duration_ms() -> u64 {
    1000
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            stage_type: None,
            transition_duration_ms: default_transition_duration_ms(),
            pin_first_level: false,
            idle_timeout_ms: None,
            controls: ControlsConfig::default(),
        }
    }
}

impl ViewerOptions {
    /// Defaults with the headless stage requested.
    pub fn headless() -> Self {
        Self {
            stage_type: Some(StageType::Headless.name().to_string()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse the requested stage type. Unknown names are an error.
    pub fn requested_stage_type(&self) -> Result<Option<StageType>> {
        self.stage_type.as_deref().map(str::parse::<StageType>).transpose()
    }

    pub fn transition_duration(&self) -> Duration {
        Duration::from_millis(self.transition_duration_ms)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }
}

/// Input handling settings.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct ControlsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Radians of yaw/pitch per pixel dragged.
    #[serde(default = "default_drag_sensitivity")]
    pub drag_sensitivity: f32,
    /// Radians of field of view per wheel line.
    #[serde(default = "default_zoom_sensitivity")]
    pub zoom_sensitivity: f32,
}

fn default_true() -> bool {
    true
}

fn default_drag_sensitivity() -> f32 {
    0.005
}

fn default_zoom_sensitivity() -> f32 {
    0.05
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            drag_sensitivity: default_drag_sensitivity(),
            zoom_sensitivity: default_zoom_sensitivity(),
        }
    }
}
