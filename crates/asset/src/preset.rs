//! TOML parameter presets.
//!
//! Every field is optional; missing ones keep the panel defaults. Values
//! outside a slider's range are clamped with a warning rather than rejected.

use std::path::Path;

use anyhow::Context;
use corelib::{CoreError, PanelParams, Param};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ParamsPreset {
    pub metalness: Option<f32>,
    pub roughness: Option<f32>,
    pub exposure: Option<f32>,
    pub progress: Option<f32>,
    pub speed: Option<f32>,
    pub holo_intensity: Option<f32>,
    pub bloom_exposure: Option<f32>,
    pub bloom_threshold: Option<f32>,
    pub bloom_strength: Option<f32>,
    pub bloom_radius: Option<f32>,
}

impl ParamsPreset {
    pub fn from_toml_str(src: &str) -> anyhow::Result<Self> {
        toml::from_str(src).context("Failed to parse parameter preset")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preset {}", path.display()))?;
        let preset = Self::from_toml_str(&src)?;
        log::info!("Loaded parameter preset from {}", path.display());
        Ok(preset)
    }

    pub fn value(&self, param: Param) -> Option<f32> {
        match param {
            Param::Metalness => self.metalness,
            Param::Roughness => self.roughness,
            Param::Exposure => self.exposure,
            Param::Progress => self.progress,
            Param::Speed => self.speed,
            Param::HoloIntensity => self.holo_intensity,
            Param::BloomExposure => self.bloom_exposure,
            Param::BloomThreshold => self.bloom_threshold,
            Param::BloomStrength => self.bloom_strength,
            Param::BloomRadius => self.bloom_radius,
        }
    }

    /// Write the preset into `params` in panel order. Returns how many values
    /// had to be clamped.
    pub fn apply(&self, params: &mut PanelParams) -> usize {
        let mut clamped = 0;
        for param in Param::ALL {
            let Some(value) = self.value(param) else {
                continue;
            };
            if let Err(err @ CoreError::ParamOutOfRange { .. }) = params.try_set(param, value) {
                let stored = params.set(param, value);
                log::warn!("Preset {}: {err}; using {stored}", param.key());
                clamped += 1;
            }
        }
        clamped
    }
}
