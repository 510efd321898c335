//! Single-frame enhancement: stabilization, color, white balance.

use crate::context::SharedContext;
use clipfix_color::{white_balance, ColorAdjustment};
use clipfix_core::{
    Enhancement, EnhancementConfig, EnhancementError, EnhancementSettings, FrameData,
    MotionVector, ProcessingBackend, Result,
};
use clipfix_stabilize::{apply_stabilization, StabilizationParams, StabilizationResult, Stabilizer};
use smallvec::SmallVec;
use tracing::trace;

pub type EnhancementList = SmallVec<[Enhancement; 4]>;

#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub frame: FrameData,
    pub applied: EnhancementList,
    pub skipped: EnhancementList,
    pub backend: ProcessingBackend,
    pub stabilization: Option<StabilizationResult>,
    pub shake_reduction: f32,
    /// GPU failure that forced this frame onto the CPU.
    pub gpu_error: Option<EnhancementError>,
}

pub struct FrameProcessor {
    context: SharedContext,
    stabilizer: Stabilizer,
}

impl FrameProcessor {
    pub fn new(context: SharedContext) -> Self {
        Self::with_params(context, StabilizationParams::default())
    }

    pub fn with_params(context: SharedContext, params: StabilizationParams) -> Self {
        Self {
            context,
            stabilizer: Stabilizer::new(params),
        }
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Forget motion history, e.g. between clips.
    pub fn reset(&mut self) {
        self.stabilizer.reset();
    }

    /// Enhance one frame. The input is never modified.
    pub fn process(
        &mut self,
        frame: &FrameData,
        config: &EnhancementConfig,
        settings: &EnhancementSettings,
        motion: Option<MotionVector>,
    ) -> Result<FrameOutcome> {
        let mut applied = EnhancementList::new();
        let mut skipped = EnhancementList::new();
        let mut current = frame.clone();
        let mut stabilization = None;
        let mut shake_reduction = 0.0;

        // Stabilize first so color runs on the final framing
        match motion {
            Some(motion) if config.stabilization => {
                self.stabilizer.set_strength(settings.stabilization_strength);
                let (result, reduction) = self.stabilizer.push(motion);
                stabilization = Some(result);
                if result.stabilized {
                    current = apply_stabilization(&current, &result.transform)
                        .map_err(|e| e.with_context("stage", Enhancement::Stabilization.key()))?;
                    shake_reduction = reduction;
                    applied.push(Enhancement::Stabilization);
                } else {
                    skipped.push(Enhancement::Stabilization);
                }
            }
            _ => skipped.push(Enhancement::Stabilization),
        }

        let adjustment = masked_adjustment(config, settings);
        // Each stage is applied only when its own masked knobs move pixels
        let color_stages = [
            (
                Enhancement::ColorCorrection,
                adjustment.saturation != 0.0 || adjustment.temperature != 0.0,
            ),
            (Enhancement::Brightness, adjustment.brightness != 0.0),
            (Enhancement::Contrast, adjustment.contrast != 0.0),
        ];
        let mut backend = ProcessingBackend::Cpu;
        let mut gpu_error = None;
        if adjustment.is_neutral() {
            skipped.extend(color_stages.map(|(stage, _)| stage));
        } else {
            let (out, used, err) = self
                .context
                .lock()
                .color_correct(&current, &adjustment)
                .map_err(|e| e.with_context("stage", Enhancement::ColorCorrection.key()))?;
            current = out;
            backend = used;
            gpu_error = err;
            for (stage, active) in color_stages {
                if active {
                    applied.push(stage);
                } else {
                    skipped.push(stage);
                }
            }
        }

        if config.white_balance && settings.white_balance != 0.0 {
            current = white_balance::apply_frame(&current, settings.white_balance)
                .map_err(|e| e.with_context("stage", Enhancement::WhiteBalance.key()))?;
            applied.push(Enhancement::WhiteBalance);
        } else {
            skipped.push(Enhancement::WhiteBalance);
        }

        trace!(index = frame.index, applied = applied.len(), "frame enhanced");
        Ok(FrameOutcome {
            frame: current,
            applied,
            skipped,
            backend,
            stabilization,
            shake_reduction,
            gpu_error,
        })
    }
}

/// Color knobs with disabled toggles zeroed. Saturation and temperature
/// follow the color correction toggle.
pub fn masked_adjustment(config: &EnhancementConfig, settings: &EnhancementSettings) -> ColorAdjustment {
    let knob = |on: bool, v: f32| if on { v } else { 0.0 };
    ColorAdjustment {
        brightness: knob(config.brightness, settings.brightness),
        contrast: knob(config.contrast, settings.contrast),
        saturation: knob(config.color_correction, settings.saturation),
        temperature: knob(config.color_correction, settings.temperature),
    }
}
