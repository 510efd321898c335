//! Sequences the audio stages and records what ran.

use crate::analysis::{amplitude_to_db, noise_reduction_db};
use crate::context::AudioRenderContext;
use crate::echo::{estimate_echo_reduction, EchoCancellation};
use crate::noise::NoiseReduction;
use crate::stage::AudioStage;
use crate::voice::VoiceEnhancement;
use crate::volume::VolumeNormalization;
use clipfix_core::{AudioChunk, Enhancement, EnhancementConfig, EnhancementSettings, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

/// Fixed stage order: clean first, reshape next, level last.
pub const STAGE_ORDER: [Enhancement; 4] = [
    Enhancement::NoiseReduction,
    Enhancement::EchoCancellation,
    Enhancement::VoiceEnhancement,
    Enhancement::VolumeNormalization,
];

pub type StageList = SmallVec<[Enhancement; 4]>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStageMetrics {
    pub noise_reduction_db: f32,
    pub echo_reduction: f32,
    pub volume_gain_db: f32,
}

#[derive(Debug, Clone)]
pub struct AudioOutcome {
    pub chunk: AudioChunk,
    pub applied: StageList,
    pub skipped: StageList,
    pub metrics: AudioStageMetrics,
}

/// Build the stage for one enhancement from the session settings.
pub fn build_stage(enhancement: Enhancement, settings: &EnhancementSettings) -> Option<Box<dyn AudioStage>> {
    let stage: Box<dyn AudioStage> = match enhancement {
        Enhancement::NoiseReduction => Box::new(NoiseReduction::new(
            settings.noise_reduction,
            settings.adaptive_noise_threshold,
        )),
        Enhancement::EchoCancellation => Box::new(EchoCancellation::new(
            settings.echo_reduction,
            settings.detect_echo_delay,
        )),
        Enhancement::VoiceEnhancement => Box::new(VoiceEnhancement::new(
            settings.voice_clarity,
            settings.preserve_naturalness,
        )),
        Enhancement::VolumeNormalization => Box::new(VolumeNormalization::new(
            settings.target_volume,
            settings.normalization_method,
            settings.prevent_clipping,
        )),
        _ => return None,
    };
    Some(stage)
}

pub struct AudioProcessor {
    context: AudioRenderContext,
}

impl AudioProcessor {
    pub fn new(context: AudioRenderContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AudioRenderContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut AudioRenderContext {
        &mut self.context
    }

    /// Run every enabled stage in [`STAGE_ORDER`]. Disabled stages are
    /// reported as skipped.
    pub fn process(
        &self,
        chunk: &AudioChunk,
        config: &EnhancementConfig,
        settings: &EnhancementSettings,
    ) -> Result<AudioOutcome> {
        self.context.check_input(chunk)?;
        let mut current = chunk.clone();
        let mut applied = StageList::new();
        let mut skipped = StageList::new();
        let mut metrics = AudioStageMetrics::default();

        for enhancement in STAGE_ORDER {
            let stage = match build_stage(enhancement, settings) {
                Some(stage) if config.is_enabled(enhancement) => stage,
                _ => {
                    skipped.push(enhancement);
                    continue;
                }
            };

            let before = current;
            current = self
                .context
                .render(&before, |c| stage.process(c))
                .map_err(|e| e.with_context("stage", enhancement.key()))?;
            debug!(stage = stage.name(), "audio stage applied");

            match enhancement {
                Enhancement::NoiseReduction => {
                    metrics.noise_reduction_db = noise_reduction_db(&before, &current);
                }
                Enhancement::EchoCancellation => {
                    metrics.echo_reduction = estimate_echo_reduction(&before, &current);
                }
                Enhancement::VolumeNormalization => {
                    let gain = crate::analysis::peak(&current)
                        / crate::analysis::peak(&before).max(f32::EPSILON);
                    metrics.volume_gain_db = if gain > 0.0 { amplitude_to_db(gain) } else { 0.0 };
                }
                _ => {}
            }
            applied.push(enhancement);
        }

        Ok(AudioOutcome {
            chunk: current,
            applied,
            skipped,
            metrics,
        })
    }
}
