//! Stream configuration

use crate::attributes::ImageGeometry;
use serde::{Deserialize, Serialize};

/// Settings for one [`EventStream`](super::EventStream)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Stream name, recorded on every attribute set it feeds
    pub name: String,
    /// Hardware units to scene units (1000.0 turns meters into millimeters)
    pub unit_scale: f64,
    /// Geometry given to raw image payloads, which carry none of their own
    pub image_geometry: ImageGeometry,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            name: "igt".to_string(),
            unit_scale: 1.0,
            image_geometry: ImageGeometry::default(),
        }
    }
}

impl StreamConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}
