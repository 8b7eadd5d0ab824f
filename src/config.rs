// Acquisition configuration, loaded from TOML

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scaling::CountPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Name used to prefix instrument log messages.
    pub alias: String,
    pub mismatch_policy: CountPolicy,
    /// Re-read the preamble before each waveform fetch.
    pub refresh_preamble: bool,
    pub default_channel: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            alias: "SDS814XHD".to_string(),
            mismatch_policy: CountPolicy::Reject,
            refresh_preamble: true,
            default_channel: "C1".to_string(),
        }
    }
}

impl AcquisitionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
