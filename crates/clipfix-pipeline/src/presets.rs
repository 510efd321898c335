//! Named bundles of enhancement toggles and settings.

use clipfix_core::{EnhancementConfig, EnhancementError, EnhancementSettings, ErrorCode, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

const EMBEDDED_PRESETS: &str = include_str!("presets.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementPreset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub config: EnhancementConfig,
    #[serde(default)]
    pub settings: EnhancementSettings,
}

impl EnhancementPreset {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(EnhancementError::new(ErrorCode::InvalidSettings)
                .with_context("preset", "<empty id>"));
        }
        self.settings
            .validate()
            .map_err(|e| e.with_context("preset", &self.id))
    }
}

/// Source of validated presets.
pub trait PresetStore {
    fn get(&self, id: &str) -> Option<&EnhancementPreset>;

    fn by_category(&self, category: &str) -> Vec<&EnhancementPreset>;

    fn all(&self) -> &[EnhancementPreset];
}

/// Presets parsed from a JSON array.
#[derive(Debug, Clone, Default)]
pub struct JsonPresetStore {
    presets: Vec<EnhancementPreset>,
}

impl JsonPresetStore {
    /// Parse and validate every record. One bad record rejects the document.
    pub fn from_json(json: &str) -> Result<Self> {
        let presets: Vec<EnhancementPreset> = serde_json::from_str(json).map_err(|e| {
            EnhancementError::new(ErrorCode::InvalidSettings).with_context("presets", e)
        })?;

        let mut seen = HashSet::new();
        for preset in &presets {
            preset.validate()?;
            if !seen.insert(preset.id.as_str()) {
                return Err(EnhancementError::new(ErrorCode::InvalidSettings)
                    .with_context("preset", &preset.id)
                    .with_context("reason", "duplicate id"));
            }
        }
        debug!(count = presets.len(), "presets loaded");
        Ok(Self { presets })
    }

    /// The presets shipped with the library.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_PRESETS)
    }
}

impl PresetStore for JsonPresetStore {
    fn get(&self, id: &str) -> Option<&EnhancementPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    fn by_category(&self, category: &str) -> Vec<&EnhancementPreset> {
        self.presets.iter().filter(|p| p.category == category).collect()
    }

    fn all(&self) -> &[EnhancementPreset] {
        &self.presets
    }
}
