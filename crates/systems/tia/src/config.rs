use std::fs;
use std::path::Path;

use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::types::VideoStandard;
use serde::{Deserialize, Serialize};

use crate::TiaError;

/// Television standard selection; `Auto` lets the frame manager decide from
/// the scanline count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStandardSetting {
    #[default]
    Auto,
    Ntsc,
    Pal,
}

impl VideoStandardSetting {
    pub fn fixed(self) -> Option<VideoStandard> {
        match self {
            VideoStandardSetting::Auto => None,
            VideoStandardSetting::Ntsc => Some(VideoStandard::Ntsc),
            VideoStandardSetting::Pal => Some(VideoStandard::Pal),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TiaConfig {
    /// Drive the six undriven read bits with random values instead of the
    /// last data bus value
    pub tia_driven_pins: bool,
    /// Seed for the undriven bit generator
    pub driven_pins_seed: u64,
    /// Reuse the previous line for lines without register changes
    pub line_caching: bool,
    pub video_standard: VideoStandardSetting,
}

impl Default for TiaConfig {
    fn default() -> Self {
        Self {
            tia_driven_pins: false,
            driven_pins_seed: 0x2600,
            line_caching: true,
            video_standard: VideoStandardSetting::Auto,
        }
    }
}

impl TiaConfig {
    pub fn from_json(json: &str) -> Result<Self, TiaError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file, falling back to defaults if it is missing or
    /// malformed
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => config,
                Err(e) => {
                    log(LogCategory::State, LogLevel::Warn, || {
                        format!(
                            "TIA: failed to parse {}: {}, using defaults",
                            path.display(),
                            e
                        )
                    });
                    Self::default()
                }
            },
            // Missing file is the normal first-run case
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), TiaError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
