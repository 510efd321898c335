//! Enhancement toggles and numeric knobs.

use crate::error::{EnhancementError, Result};
use serde::{Deserialize, Serialize};

/// Range accepted for color knobs.
pub const COLOR_RANGE: (f32, f32) = (-100.0, 100.0);
/// Range accepted for audio strengths and stabilization strength.
pub const STRENGTH_RANGE: (f32, f32) = (0.0, 100.0);

/// One independently switchable enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Enhancement {
    ColorCorrection,
    Brightness,
    Contrast,
    WhiteBalance,
    NoiseReduction,
    VolumeNormalization,
    VoiceEnhancement,
    EchoCancellation,
    Stabilization,
}

impl Enhancement {
    pub const ALL: [Enhancement; 9] = [
        Self::ColorCorrection,
        Self::Brightness,
        Self::Contrast,
        Self::WhiteBalance,
        Self::NoiseReduction,
        Self::VolumeNormalization,
        Self::VoiceEnhancement,
        Self::EchoCancellation,
        Self::Stabilization,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::ColorCorrection => "Color Correction",
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::WhiteBalance => "White Balance",
            Self::NoiseReduction => "Noise Reduction",
            Self::VolumeNormalization => "Volume Normalization",
            Self::VoiceEnhancement => "Voice Enhancement",
            Self::EchoCancellation => "Echo Cancellation",
            Self::Stabilization => "Stabilization",
        }
    }

    pub fn is_audio(self) -> bool {
        matches!(
            self,
            Self::NoiseReduction
                | Self::VolumeNormalization
                | Self::VoiceEnhancement
                | Self::EchoCancellation
        )
    }

    /// Parse the camelCase name used in presets and error context.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.key() == name)
    }

    /// camelCase key, matching the serialized form.
    pub fn key(self) -> &'static str {
        match self {
            Self::ColorCorrection => "colorCorrection",
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::WhiteBalance => "whiteBalance",
            Self::NoiseReduction => "noiseReduction",
            Self::VolumeNormalization => "volumeNormalization",
            Self::VoiceEnhancement => "voiceEnhancement",
            Self::EchoCancellation => "echoCancellation",
            Self::Stabilization => "stabilization",
        }
    }
}

/// Boolean toggle per enhancement. Toggles are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnhancementConfig {
    pub color_correction: bool,
    pub brightness: bool,
    pub contrast: bool,
    pub white_balance: bool,
    pub noise_reduction: bool,
    pub volume_normalization: bool,
    pub voice_enhancement: bool,
    pub echo_cancellation: bool,
    pub stabilization: bool,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            color_correction: true,
            brightness: true,
            contrast: true,
            white_balance: true,
            noise_reduction: true,
            volume_normalization: true,
            voice_enhancement: false,
            echo_cancellation: false,
            stabilization: false,
        }
    }
}

impl EnhancementConfig {
    /// Every enhancement switched on.
    pub fn all() -> Self {
        let mut config = Self::none();
        for e in Enhancement::ALL {
            config.set(e, true);
        }
        config
    }

    /// Every enhancement switched off.
    pub fn none() -> Self {
        Self {
            color_correction: false,
            brightness: false,
            contrast: false,
            white_balance: false,
            noise_reduction: false,
            volume_normalization: false,
            voice_enhancement: false,
            echo_cancellation: false,
            stabilization: false,
        }
    }

    pub fn is_enabled(&self, enhancement: Enhancement) -> bool {
        match enhancement {
            Enhancement::ColorCorrection => self.color_correction,
            Enhancement::Brightness => self.brightness,
            Enhancement::Contrast => self.contrast,
            Enhancement::WhiteBalance => self.white_balance,
            Enhancement::NoiseReduction => self.noise_reduction,
            Enhancement::VolumeNormalization => self.volume_normalization,
            Enhancement::VoiceEnhancement => self.voice_enhancement,
            Enhancement::EchoCancellation => self.echo_cancellation,
            Enhancement::Stabilization => self.stabilization,
        }
    }

    pub fn set(&mut self, enhancement: Enhancement, enabled: bool) {
        let slot = match enhancement {
            Enhancement::ColorCorrection => &mut self.color_correction,
            Enhancement::Brightness => &mut self.brightness,
            Enhancement::Contrast => &mut self.contrast,
            Enhancement::WhiteBalance => &mut self.white_balance,
            Enhancement::NoiseReduction => &mut self.noise_reduction,
            Enhancement::VolumeNormalization => &mut self.volume_normalization,
            Enhancement::VoiceEnhancement => &mut self.voice_enhancement,
            Enhancement::EchoCancellation => &mut self.echo_cancellation,
            Enhancement::Stabilization => &mut self.stabilization,
        };
        *slot = enabled;
    }

    /// Enabled enhancements, in declaration order.
    pub fn enabled(&self) -> impl Iterator<Item = Enhancement> + '_ {
        Enhancement::ALL.into_iter().filter(|e| self.is_enabled(*e))
    }

    pub fn any_video(&self) -> bool {
        self.enabled().any(|e| !e.is_audio())
    }

    pub fn any_audio(&self) -> bool {
        self.enabled().any(Enhancement::is_audio)
    }
}

/// How loudness is measured before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMethod {
    #[default]
    Peak,
    Rms,
}

/// Numeric knobs. Color knobs are in [-100, 100], strengths in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnhancementSettings {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub temperature: f32,
    pub white_balance: f32,

    pub noise_reduction: f32,
    pub echo_reduction: f32,
    pub voice_clarity: f32,
    pub target_volume: f32,

    pub stabilization_strength: f32,

    pub adaptive_noise_threshold: bool,
    pub detect_echo_delay: bool,
    pub preserve_naturalness: bool,
    pub normalization_method: NormalizationMethod,
    pub prevent_clipping: bool,
}

impl Default for EnhancementSettings {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 0.0,
            saturation: 0.0,
            temperature: 0.0,
            white_balance: 0.0,
            noise_reduction: 50.0,
            echo_reduction: 50.0,
            voice_clarity: 50.0,
            target_volume: 80.0,
            stabilization_strength: 50.0,
            adaptive_noise_threshold: true,
            detect_echo_delay: true,
            preserve_naturalness: true,
            normalization_method: NormalizationMethod::Peak,
            prevent_clipping: true,
        }
    }
}

impl EnhancementSettings {
    /// Every numeric knob with its name and accepted range.
    pub fn ranged_fields(&self) -> [(&'static str, f32, (f32, f32)); 10] {
        [
            ("brightness", self.brightness, COLOR_RANGE),
            ("contrast", self.contrast, COLOR_RANGE),
            ("saturation", self.saturation, COLOR_RANGE),
            ("temperature", self.temperature, COLOR_RANGE),
            ("whiteBalance", self.white_balance, COLOR_RANGE),
            ("noiseReduction", self.noise_reduction, STRENGTH_RANGE),
            ("echoReduction", self.echo_reduction, STRENGTH_RANGE),
            ("voiceClarity", self.voice_clarity, STRENGTH_RANGE),
            ("targetVolume", self.target_volume, STRENGTH_RANGE),
            ("stabilizationStrength", self.stabilization_strength, STRENGTH_RANGE),
        ]
    }

    /// Reject any knob outside its range. Values are never clamped here.
    pub fn validate(&self) -> Result<()> {
        for (name, value, (min, max)) in self.ranged_fields() {
            if !value.is_finite() || value < min || value > max {
                return Err(EnhancementError::invalid_setting(name, value, min, max));
            }
        }
        Ok(())
    }

    /// Every numeric knob multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            brightness: self.brightness * factor,
            contrast: self.contrast * factor,
            saturation: self.saturation * factor,
            temperature: self.temperature * factor,
            white_balance: self.white_balance * factor,
            noise_reduction: self.noise_reduction * factor,
            echo_reduction: self.echo_reduction * factor,
            voice_clarity: self.voice_clarity * factor,
            target_volume: self.target_volume * factor,
            stabilization_strength: self.stabilization_strength * factor,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn defaults_validate() {
        assert!(EnhancementSettings::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_is_rejected_not_clamped() {
        let settings = EnhancementSettings {
            brightness: 120.0,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSettings);
        assert_eq!(err.context["field"], "brightness");
        assert_eq!(settings.brightness, 120.0);

        let settings = EnhancementSettings {
            noise_reduction: -1.0,
            ..Default::default()
        };
        assert_eq!(settings.validate().unwrap_err().context["field"], "noiseReduction");
    }

    #[test]
    fn nan_is_rejected() {
        let settings = EnhancementSettings {
            contrast: f32::NAN,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn scaled_reduces_every_knob() {
        let settings = EnhancementSettings {
            brightness: 50.0,
            temperature: -40.0,
            ..Default::default()
        };
        let reduced = settings.scaled(0.8);
        assert!((reduced.brightness - 40.0).abs() < 1e-4);
        assert!((reduced.temperature + 32.0).abs() < 1e-4);
        assert!((reduced.noise_reduction - 40.0).abs() < 1e-4);
        assert_eq!(reduced.normalization_method, settings.normalization_method);
    }

    #[test]
    fn config_toggles_are_independent() {
        let mut config = EnhancementConfig::none();
        config.set(Enhancement::EchoCancellation, true);
        assert_eq!(config.enabled().collect::<Vec<_>>(), vec![Enhancement::EchoCancellation]);
        assert!(config.any_audio());
        assert!(!config.any_video());
        assert_eq!(EnhancementConfig::all().enabled().count(), 9);
    }

    #[test]
    fn config_deserializes_camel_case_with_defaults() {
        let config: EnhancementConfig =
            serde_json::from_str(r#"{"stabilization": true, "noiseReduction": false}"#).unwrap();
        assert!(config.stabilization);
        assert!(!config.noise_reduction);
        assert!(config.color_correction);
        assert_eq!(Enhancement::from_name("whiteBalance"), Some(Enhancement::WhiteBalance));
    }
}
