//! Configuration management for wallfit

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::fitting::{CabinetModel, REFERENCE_PITCH_MM};
use crate::magnifier::MagnifierConfig;

/// Built-in cabinet catalog
pub fn default_cabinets() -> Vec<CabinetModel> {
    vec![
        CabinetModel::new("500x500", "Standard 500x500", 500.0, 500.0, 7.5, 150.0, 60.0),
        CabinetModel::new("500x1000", "Standard 500x1000", 500.0, 1000.0, 13.5, 300.0, 120.0),
        CabinetModel::new("640x480", "640x480 (320x160 modules)", 640.0, 480.0, 6.8, 130.0, 50.0),
        CabinetModel::new("960x960", "Fixed frame 960x960", 960.0, 960.0, 28.0, 600.0, 240.0),
        CabinetModel::new("1200x675", "16:9 series 1200x675", 1200.0, 675.0, 14.0, 280.0, 110.0),
    ]
}

/// Built-in list of standard pixel pitches (mm)
pub fn default_pitches() -> Vec<f64> {
    vec![1.25, 1.53, 1.86, 2.0, 2.5, 2.6, 2.97, 3.91, 4.81, 6.0, 8.0, 10.0]
}

/// Cabinet models and pixel pitches offered to the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Standard pixel pitches in millimeters
    #[serde(default = "default_pitches")]
    pub pitches: Vec<f64>,

    #[serde(default = "default_cabinets")]
    pub cabinets: Vec<CabinetModel>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            pitches: default_pitches(),
            cabinets: default_cabinets(),
        }
    }
}

/// Values a fresh session starts with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Target wall width in meters
    pub target_width_m: f64,
    /// Target wall height in meters
    pub target_height_m: f64,
    pub cabinet_id: String,
    pub pitch_mm: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            target_width_m: 5.0,
            target_height_m: 3.0,
            cabinet_id: "500x500".to_string(),
            pitch_mm: REFERENCE_PITCH_MM,
        }
    }
}

/// Geometry of the overlay placed on the photo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Logical width of the rectangle the homography maps from
    pub logical_width: f64,
    /// Logical height of the rectangle the homography maps from
    pub logical_height: f64,
    /// Half-size of a freshly reset quad, as a fraction of the surface's shorter side
    pub reset_fraction: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            logical_width: 300.0,
            logical_height: 200.0,
            reset_fraction: 0.25,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8092,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub overlay: OverlayConfig,

    #[serde(default)]
    pub magnifier: MagnifierConfig,
}

impl Config {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            config
                .validate()
                .with_context(|| format!("Invalid configuration in {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Reject values the core would refuse at runtime
    pub fn validate(&self) -> Result<()> {
        if self.catalog.cabinets.is_empty() {
            bail!("catalog.cabinets must list at least one cabinet");
        }
        for cabinet in &self.catalog.cabinets {
            cabinet
                .validate()
                .with_context(|| format!("cabinet '{}'", cabinet.id))?;
        }
        if let Some(p) = self.catalog.pitches.iter().find(|p| !(p.is_finite() && **p > 0.0)) {
            bail!("catalog.pitches contains non-positive pitch {}", p);
        }

        let overlay = &self.overlay;
        if !(overlay.logical_width > 0.0 && overlay.logical_height > 0.0) {
            bail!("overlay logical rectangle must have a positive size");
        }
        if !(overlay.reset_fraction > 0.0 && overlay.reset_fraction <= 0.5) {
            bail!("overlay.reset_fraction must be in (0, 0.5]");
        }

        let defaults = &self.defaults;
        if !(defaults.target_width_m > 0.0
            && defaults.target_height_m > 0.0
            && defaults.pitch_mm > 0.0)
        {
            bail!("defaults must have positive target size and pitch");
        }
        if !(self.magnifier.zoom > 0.0 && self.magnifier.size > 0.0) {
            bail!("magnifier zoom and size must be positive");
        }
        Ok(())
    }
}
