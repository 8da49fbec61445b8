//! Configuration file.
use std::{fs, path::Path};

use chip8::Chip8Conf;
use serde::Deserialize;

use crate::error::AppError;

/// Settings read from a YAML file.
///
/// VM parameters sit at the top level next to the host settings.
/// Every field is optional.
///
/// ```yaml
/// instructions_per_tick: 10
/// sprite_edge: clip
/// frames: 600
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    #[serde(flatten)]
    pub vm: Chip8Conf,
    /// Stop after this many 60 Hz frames. Runs until a fault when `None`.
    pub frames: Option<u64>,
    /// Run as fast as possible instead of pacing to 60 Hz.
    pub no_throttle: bool,
}

impl CliConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, AppError> {
        Ok(serde_yaml::from_str(text)?)
    }
}
