use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::animation::AnimationPolicy;
use crate::color::Color;
use crate::scene::Light;

/// Element identifier the web host attaches its canvas to.
pub const DEFAULT_MOUNT_ID: &str = "viewer";

/// Every tunable of the viewer. Missing JSON fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub mount_id: String,
    /// Packed `0xRRGGBB` scene background.
    pub background: u32,
    pub camera: CameraConfig,
    pub directional_light: DirectionalLightConfig,
    pub ambient_light: AmbientLightConfig,
    pub material: MaterialConfig,
    pub spin: SpinConfig,
    pub animation: AnimationPolicy,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            mount_id: DEFAULT_MOUNT_ID.to_string(),
            background: 0xf5f5f5,
            camera: CameraConfig::default(),
            directional_light: DirectionalLightConfig::default(),
            ambient_light: AmbientLightConfig::default(),
            material: MaterialConfig::default(),
            spin: SpinConfig::default(),
            animation: AnimationPolicy::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid viewer configuration")
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("in {}", path.display()))
    }

    pub fn background_color(&self) -> Color {
        Color::from_hex(self.background)
    }

    /// Lights added to the scene at bootstrap, in insertion order.
    pub fn lights(&self) -> [Light; 2] {
        [
            Light::Directional {
                color: Color::from_hex(self.directional_light.color),
                intensity: self.directional_light.intensity,
                position: self.directional_light.position,
            },
            Light::Ambient {
                color: Color::from_hex(self.ambient_light.color),
                intensity: self.ambient_light.intensity,
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 0.0, 3.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLightConfig {
    pub color: u32,
    pub intensity: f32,
    pub position: Vec3,
}

impl Default for DirectionalLightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 1.0,
            position: Vec3::new(5.0, 5.0, 5.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientLightConfig {
    pub color: u32,
    pub intensity: f32,
}

impl Default for AmbientLightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub roughness: f32,
    pub metalness: f32,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            roughness: 0.5,
            metalness: 0.1,
        }
    }
}

/// Radians added to the displayed mesh's rotation on every frame callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinConfig {
    pub x: f64,
    pub y: f64,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self { x: 0.005, y: 0.01 }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_viewer_constants() {
        let config = ViewerConfig::default();
        assert_eq!(config.mount_id, "viewer");
        assert_eq!(config.camera.fov, 75.0);
        assert_eq!(config.camera.far, 1000.0);
        assert_eq!(config.spin, SpinConfig { x: 0.005, y: 0.01 });
        assert_eq!(config.animation, AnimationPolicy::Restart);
        assert_eq!(config.background_color().to_hex(), 0xf5f5f5);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json_str(
            r#"{ "mount_id": "stage", "spin": { "y": 0.02 }, "animation": "stack" }"#,
        )
        .unwrap();
        assert_eq!(config.mount_id, "stage");
        assert_eq!(config.spin.y, 0.02);
        assert_eq!(config.spin.x, 0.005);
        assert_eq!(config.animation, AnimationPolicy::Stack);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "background": 0, "camera": {{ "fov": 60.0 }} }}"#).unwrap();
        let config = ViewerConfig::from_path(file.path()).unwrap();
        assert_eq!(config.background, 0);
        assert_eq!(config.camera.fov, 60.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(ViewerConfig::from_json_str("{ mount_id: }").is_err());
        assert!(ViewerConfig::from_path("/definitely/not/here.json").is_err());
    }

    #[test]
    fn lights_follow_config() {
        let config = ViewerConfig::default();
        let [directional, ambient] = config.lights();
        assert_eq!(directional.direction(), Some(Vec3::splat(5.0).normalize()));
        assert_eq!(ambient.radiance(), Vec3::splat(0.4));
    }
}
