use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Parameters, Result, Rgb, Viewport};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub parameters: Parameters,
    pub render: RenderConfig,
    /// Fixed seed for reproducible output; a random one is used when absent.
    pub seed: Option<u64>,
}

impl AppConfig {
    /// Reads a JSON config file. Missing keys fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.parameters.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Output surface settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Stroke width in view-box units; the view box spans 2 units.
    pub stroke_width: f64,
    /// Opaque backdrop for raster export.
    pub background: Option<Rgb>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            width: viewport.width,
            height: viewport.height,
            stroke_width: 0.02,
            background: None,
        }
    }
}

impl RenderConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.width,
            height: self.height,
        }
    }
}
