use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::engine::mesh::MAX_RESOLUTION;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// FIFO presentation when set, mailbox (if available) otherwise
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            title: "Bouncing Sphere".to_string(),
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SphereConfig {
    /// Samples along both the polar and the azimuthal direction
    pub resolution: u32,
    /// Image file inside the resource directory
    pub texture: String,
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            resolution: 50,
            texture: "tamu.jpg".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fovy_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub initial_distance: f32,
    /// Radians per pixel
    pub rotate_speed: f32,
    /// World units per pixel
    pub pan_speed: f32,
    /// Fraction of the distance per pixel
    pub zoom_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy_degrees: 45.0,
            znear: 0.1,
            zfar: 1000.0,
            initial_distance: 2.0,
            rotate_speed: 0.01,
            pan_speed: 0.001,
            zoom_speed: 0.005,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub sphere: SphereConfig,
    pub camera: CameraConfig,
}

impl Config {
    /// Reads `config.toml` from the resource directory. A missing file means
    /// defaults; a file that does not parse is an error.
    pub fn load(resource_dir: &Path) -> anyhow::Result<Config> {
        let path = resource_dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            log::info!("No {} found, using default settings", path.display());
            return Ok(Config::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Config::parse(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        log::info!("Loaded settings from {}", path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (2..=MAX_RESOLUTION).contains(&self.sphere.resolution),
            "sphere.resolution must be between 2 and {}, got {}",
            MAX_RESOLUTION,
            self.sphere.resolution
        );
        anyhow::ensure!(
            self.window.width > 0 && self.window.height > 0,
            "window size must be non-zero"
        );
        let cam = &self.camera;
        anyhow::ensure!(
            cam.fovy_degrees > 0.0 && cam.fovy_degrees < 180.0,
            "camera.fovy_degrees must be in (0, 180)"
        );
        anyhow::ensure!(
            cam.znear > 0.0 && cam.zfar > cam.znear,
            "camera clip planes must satisfy 0 < znear < zfar"
        );
        anyhow::ensure!(
            cam.initial_distance > 0.0,
            "camera.initial_distance must be positive"
        );
        Ok(())
    }
}
