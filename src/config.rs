//! Viewer settings. Every field has a default; overrides come from a JSON document.

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Vertical field of view, degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Length the largest declared mesh dimension is scaled to.
    pub reference_length: f32,
    /// Multiplier on the tight framing distance (1.5 leaves 50% room around the model).
    pub framing_padding: f32,
    /// Fraction of the pending orbit motion applied per frame.
    pub damping_factor: f32,
    /// Radians per dragged pixel.
    pub rotate_speed: f32,
    /// Relative dolly per scrolled point.
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Id of the `<canvas>` the web build attaches to.
    pub canvas_id: String,
    /// Prefix for `/get_model_data` and `/static/uploads`. Empty means the page origin.
    pub asset_base: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            reference_length: 5.0,
            framing_padding: 1.5,
            damping_factor: 0.25,
            rotate_speed: 0.005,
            zoom_speed: 0.001,
            min_distance: 0.1,
            max_distance: 500.0,
            canvas_id: "model_canvas".to_owned(),
            asset_base: String::new(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text).context("viewer config is not valid JSON")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.fov_degrees > 0.0 && self.fov_degrees < 180.0,
            "fov_degrees must be in (0, 180), got {}",
            self.fov_degrees
        );
        anyhow::ensure!(
            self.near > 0.0 && self.far > self.near,
            "clip planes must satisfy 0 < near < far, got {}..{}",
            self.near,
            self.far
        );
        anyhow::ensure!(self.reference_length > 0.0, "reference_length must be positive");
        anyhow::ensure!(self.framing_padding > 0.0, "framing_padding must be positive");
        anyhow::ensure!(
            self.damping_factor > 0.0 && self.damping_factor <= 1.0,
            "damping_factor must be in (0, 1], got {}",
            self.damping_factor
        );
        anyhow::ensure!(
            self.min_distance > 0.0 && self.max_distance > self.min_distance,
            "orbit distances must satisfy 0 < min < max"
        );
        Ok(())
    }

    pub fn fov_radians(&self) -> f32 {
        self.fov_degrees.to_radians()
    }

    /// Overrides from `localStorage["cad_preview.config"]`, defaults otherwise.
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let stored = web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .and_then(|s| s.get_item(STORAGE_KEY).ok().flatten());
        Self::or_default(stored.as_deref(), STORAGE_KEY)
    }

    /// Overrides from the file named by `CAD_PREVIEW_CONFIG`, defaults otherwise.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let Ok(path) = std::env::var(CONFIG_ENV) else {
            return Self::default();
        };
        match std::fs::read_to_string(&path).with_context(|| format!("reading {path}")) {
            Ok(text) => Self::or_default(Some(&text), &path),
            Err(e) => {
                log::error!("{e:#}; using default viewer settings");
                Self::default()
            }
        }
    }

    fn or_default(text: Option<&str>, origin: &str) -> Self {
        let Some(text) = text else {
            return Self::default();
        };
        match Self::from_json(text) {
            Ok(config) => {
                log::debug!("viewer settings loaded from {origin}");
                config
            }
            Err(e) => {
                log::error!("ignoring viewer settings from {origin}: {e:#}");
                Self::default()
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
const STORAGE_KEY: &str = "cad_preview.config";

#[cfg(not(target_arch = "wasm32"))]
pub const CONFIG_ENV: &str = "CAD_PREVIEW_CONFIG";
