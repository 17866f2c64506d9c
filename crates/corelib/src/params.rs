//! Live-tunable scalar uniforms and their allowed ranges.
//!
//! Every write goes through [`PanelParams::set`], so a stored value never
//! leaves its range. The two exposure parameters also drive the shared
//! tone-mapping exposure; whichever was changed last wins.

use crate::error::{CoreError, CoreResult};

/// Tone-mapping exposure the renderer starts with, before any slider moves.
pub const INITIAL_TONE_MAPPING_EXPOSURE: f32 = 0.8;

/// Slider bounds and granularity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ParamRange {
    const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// NaN collapses to `min`.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Param {
    Metalness,
    Roughness,
    Exposure,
    Progress,
    Speed,
    HoloIntensity,
    BloomExposure,
    BloomThreshold,
    BloomStrength,
    BloomRadius,
}

impl Param {
    pub const COUNT: usize = 10;

    /// Panel order.
    pub const ALL: [Param; Param::COUNT] = [
        Param::Metalness,
        Param::Roughness,
        Param::Exposure,
        Param::Progress,
        Param::Speed,
        Param::HoloIntensity,
        Param::BloomExposure,
        Param::BloomThreshold,
        Param::BloomStrength,
        Param::BloomRadius,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Param::Metalness => "Material metalness",
            Param::Roughness => "Material roughness",
            Param::Exposure => "Material exposure",
            Param::Progress => "state changer",
            Param::Speed => "speed changer",
            Param::HoloIntensity => "Holo Intensity changer",
            Param::BloomExposure => "Bloom exposure",
            Param::BloomThreshold => "bloomThreshold",
            Param::BloomStrength => "bloomStrength",
            Param::BloomRadius => "bloomRadius",
        }
    }

    /// Key used in TOML presets.
    pub fn key(self) -> &'static str {
        match self {
            Param::Metalness => "metalness",
            Param::Roughness => "roughness",
            Param::Exposure => "exposure",
            Param::Progress => "progress",
            Param::Speed => "speed",
            Param::HoloIntensity => "holo_intensity",
            Param::BloomExposure => "bloom_exposure",
            Param::BloomThreshold => "bloom_threshold",
            Param::BloomStrength => "bloom_strength",
            Param::BloomRadius => "bloom_radius",
        }
    }

    pub fn range(self) -> ParamRange {
        match self {
            Param::Metalness | Param::Roughness => ParamRange::new(0.0, 1.0, 0.0001),
            Param::Exposure => ParamRange::new(0.0, 3.0, 0.001),
            Param::Progress => ParamRange::new(0.0, 3.0, 0.0001),
            Param::Speed => ParamRange::new(0.0, 50.0, 0.0001),
            Param::HoloIntensity => ParamRange::new(0.0, 40.0, 0.0001),
            Param::BloomExposure => ParamRange::new(0.1, 2.0, 0.0001),
            Param::BloomThreshold => ParamRange::new(0.0, 1.0, 0.0001),
            Param::BloomStrength => ParamRange::new(0.0, 3.0, 0.0001),
            Param::BloomRadius => ParamRange::new(0.0, 1.0, 0.001),
        }
    }

    pub fn default_value(self) -> f32 {
        match self {
            Param::Metalness => 1.0,
            Param::Roughness => 0.28,
            Param::Exposure => 2.0,
            Param::Progress => 0.0,
            Param::Speed => 2.0,
            Param::HoloIntensity => 0.5,
            Param::BloomExposure => 0.75,
            Param::BloomThreshold => 0.05,
            Param::BloomStrength => 1.0,
            Param::BloomRadius => 0.8,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PanelParams {
    values: [f32; Param::COUNT],
    tone_mapping_exposure: f32,
}

impl PanelParams {
    #[inline]
    pub fn get(&self, param: Param) -> f32 {
        self.values[param.index()]
    }

    /// Clamp `value` into the parameter's range, store it and apply side
    /// effects. Returns the value actually stored.
    pub fn set(&mut self, param: Param, value: f32) -> f32 {
        let stored = param.range().clamp(value);
        self.values[param.index()] = stored;
        match param {
            Param::Exposure => self.tone_mapping_exposure = stored,
            Param::BloomExposure => self.tone_mapping_exposure = stored.powi(4),
            _ => {}
        }
        stored
    }

    /// Like [`Self::set`] but rejects out-of-range input instead of clamping.
    pub fn try_set(&mut self, param: Param, value: f32) -> CoreResult<()> {
        let range = param.range();
        if !range.contains(value) {
            return Err(CoreError::ParamOutOfRange {
                param,
                value,
                min: range.min,
                max: range.max,
            });
        }
        self.set(param, value);
        Ok(())
    }

    /// Exposure fed to the ACES tone-mapping curve.
    #[inline]
    pub fn tone_mapping_exposure(&self) -> f32 {
        self.tone_mapping_exposure
    }

    /// Iterate `(param, value)` in panel order.
    pub fn iter(&self) -> impl Iterator<Item = (Param, f32)> + '_ {
        Param::ALL.iter().map(move |&p| (p, self.get(p)))
    }
}

impl Default for PanelParams {
    fn default() -> Self {
        let mut values = [0.0; Param::COUNT];
        for p in Param::ALL {
            values[p.index()] = p.default_value();
        }
        Self {
            values,
            tone_mapping_exposure: INITIAL_TONE_MAPPING_EXPOSURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_inside_ranges() {
        let params = PanelParams::default();
        for (p, v) in params.iter() {
            assert!(p.range().contains(v), "{p:?} default {v} out of range");
        }
        assert_eq!(params.tone_mapping_exposure(), INITIAL_TONE_MAPPING_EXPOSURE);
    }

    #[test]
    fn set_clamps_into_range() {
        let mut params = PanelParams::default();
        assert_eq!(params.set(Param::Speed, 120.0), 50.0);
        assert_eq!(params.set(Param::Roughness, -1.0), 0.0);
        assert_eq!(params.set(Param::BloomExposure, 0.0), 0.1);
        assert_eq!(params.set(Param::Metalness, f32::NAN), 0.0);
        assert_eq!(params.get(Param::Speed), 50.0);
    }

    #[test]
    fn exposure_sliders_share_tone_mapping() {
        let mut params = PanelParams::default();
        params.set(Param::Exposure, 1.5);
        assert!((params.tone_mapping_exposure() - 1.5).abs() < 1e-6);

        params.set(Param::BloomExposure, 0.5);
        assert!((params.tone_mapping_exposure() - 0.0625).abs() < 1e-6);

        params.set(Param::Exposure, 2.0);
        assert!((params.tone_mapping_exposure() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn other_params_leave_exposure_alone() {
        let mut params = PanelParams::default();
        params.set(Param::BloomStrength, 2.5);
        params.set(Param::HoloIntensity, 10.0);
        assert_eq!(params.tone_mapping_exposure(), INITIAL_TONE_MAPPING_EXPOSURE);
    }

    #[test]
    fn try_set_rejects_out_of_range() {
        let mut params = PanelParams::default();
        let err = params.try_set(Param::HoloIntensity, 41.0).unwrap_err();
        assert!(matches!(err, CoreError::ParamOutOfRange { param: Param::HoloIntensity, .. }));
        assert_eq!(params.get(Param::HoloIntensity), 0.5);
        params.try_set(Param::HoloIntensity, 40.0).unwrap();
        assert_eq!(params.get(Param::HoloIntensity), 40.0);
    }

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = Param::ALL.iter().map(|p| p.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), Param::COUNT);
    }
}
