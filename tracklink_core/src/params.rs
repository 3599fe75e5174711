//! Runtime parameters for TRACKLINK
//!
//! One TOML document holds every tunable the runtime reads. Missing sections
//! and keys fall back to their defaults, so an empty file is valid.
//!
//! ```toml
//! [polling]
//! speed_ms = 200
//! batch_size = 10
//! tool_index = 0
//!
//! [stream]
//! name = "igt"
//! unit_scale = 1000.0
//!
//! [needle]
//! tube_length = 100.0
//! ```

use crate::communication::StreamConfig;
use crate::error::TrackResult;
use crate::scheduling::PollingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default location, relative to the working directory
pub const DEFAULT_PARAMS_PATH: &str = ".tracklink/params.toml";

/// Display parameters for the needle model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedleConfig {
    /// Length of the tube drawn along the needle axis, in scene units
    pub tube_length: f64,
}

impl Default for NeedleConfig {
    fn default() -> Self {
        Self { tube_length: 100.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackParams {
    pub polling: PollingConfig,
    pub stream: StreamConfig,
    pub needle: NeedleConfig,
}

impl TrackParams {
    pub fn from_toml_str(text: &str) -> TrackResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> TrackResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> TrackResult<Self> {
        if !path.exists() {
            log::debug!("no params at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn save(&self, path: &Path) -> TrackResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}
