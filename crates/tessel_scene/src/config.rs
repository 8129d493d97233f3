//! Camera and render pass settings
//!
//! Angles are in degrees. Files only need the fields they change:
//!
//! ```toml
//! [camera]
//! speed = 4.0
//!
//! [render_pass]
//! clear_color = [0.1, 0.1, 0.1, 1.0]
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// World units per second
    pub speed: f32,
    /// Degrees per pixel of pointer motion
    pub sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 10.0],
            yaw: -90.0,
            pitch: 0.0,
            fov: 90.0,
            near: 0.01,
            far: 100.0,
            speed: 10.0,
            sensitivity: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderPassConfig {
    /// Fixed attachment size; `None` follows the surface
    pub resolution: Option<(u32, u32)>,
    pub clear_color: [f32; 4],
}

impl Default for RenderPassConfig {
    fn default() -> Self {
        Self {
            resolution: None,
            clear_color: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

/// Everything a [`Scene`](crate::Scene) is built from
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub render_pass: RenderPassConfig,
}

impl SceneConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = SceneConfig::from_toml_str(
            "[camera]\nspeed = 4.0\n\n[render_pass]\nresolution = [320, 200]\n",
        )
        .unwrap();
        assert_eq!(config.camera.speed, 4.0);
        assert_eq!(config.camera.fov, 90.0);
        assert_eq!(config.render_pass.resolution, Some((320, 200)));
        assert_eq!(config.render_pass.clear_color, [0.0; 4]);
    }

    #[test]
    fn test_bad_field_type_is_rejected() {
        assert!(SceneConfig::from_toml_str("[camera]\nfov = \"wide\"\n").is_err());
    }
}
