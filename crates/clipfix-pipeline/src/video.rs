//! Session-level routing, frame analysis, and recommended settings.

use crate::context::SharedContext;
use clipfix_color::analysis::{analyze_pixels, DominantColor};
use clipfix_color::correction::{optimal_brightness, optimal_contrast};
use clipfix_color::white_balance::{self, optimal_for_temperature};
use clipfix_color::{ColorAdjustment, CorrectionTargets};
use clipfix_core::{
    EnhancementError, EnhancementSettings, FrameData, MotionVector, ProcessingBackend, Result,
};
use clipfix_stabilize::{calculate_stabilization_transform, StabilizationResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Measurements of a frame plus the settings that would correct it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameAnalysis {
    pub brightness: f32,
    pub contrast: f32,
    pub temperature: f32,
    pub dominant_colors: Vec<DominantColor>,
    pub recommended_settings: EnhancementSettings,
}

/// A frame from [`VideoProcessor::process_frame`]. `gpu_error` is set when
/// the GPU failed and the frame was redone on the CPU.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub frame: FrameData,
    pub backend: ProcessingBackend,
    pub gpu_error: Option<EnhancementError>,
}

pub struct VideoProcessor {
    context: SharedContext,
    targets: CorrectionTargets,
    max_crop_fraction: f32,
}

impl VideoProcessor {
    pub fn new(context: SharedContext) -> Self {
        Self {
            context,
            targets: CorrectionTargets::default(),
            max_crop_fraction: clipfix_stabilize::stabilize::DEFAULT_MAX_CROP_FRACTION,
        }
    }

    pub fn with_targets(mut self, targets: CorrectionTargets) -> Self {
        self.targets = targets;
        self
    }

    pub fn targets(&self) -> &CorrectionTargets {
        &self.targets
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Whether frames in this session render on the GPU.
    pub fn use_gpu(&self) -> bool {
        self.context.lock().use_gpu()
    }

    pub fn analyze_frame(&self, pixels: &[u8]) -> FrameAnalysis {
        let analysis = analyze_pixels(pixels);
        FrameAnalysis {
            recommended_settings: self.recommend(
                analysis.brightness,
                analysis.contrast,
                analysis.temperature,
            ),
            brightness: analysis.brightness,
            contrast: analysis.contrast,
            temperature: analysis.temperature,
            dominant_colors: analysis.dominant_colors,
        }
    }

    /// Map measured brightness, contrast, and temperature onto settings.
    pub fn recommend(&self, brightness: f32, contrast: f32, temperature: f32) -> EnhancementSettings {
        EnhancementSettings {
            brightness: optimal_brightness(brightness, &self.targets),
            contrast: optimal_contrast(contrast, &self.targets),
            temperature: optimal_for_temperature(temperature, self.targets.temperature),
            ..EnhancementSettings::default()
        }
    }

    /// Color correction followed by white balance when one is requested.
    pub fn process_frame(
        &self,
        frame: &FrameData,
        settings: &EnhancementSettings,
    ) -> Result<ProcessedFrame> {
        let adjustment = ColorAdjustment::from_settings(settings);
        let (corrected, backend, gpu_error) = self.context.lock().color_correct(frame, &adjustment)?;
        if let Some(err) = &gpu_error {
            warn!(index = frame.index, code = %err.code, "GPU failed, frame redone on CPU");
        }
        debug!(index = frame.index, backend = ?backend, "frame processed");
        let frame = if settings.white_balance != 0.0 {
            white_balance::apply_frame(&corrected, settings.white_balance)?
        } else {
            corrected
        };
        Ok(ProcessedFrame {
            frame,
            backend,
            gpu_error,
        })
    }

    pub fn backend(&self) -> ProcessingBackend {
        if self.use_gpu() {
            ProcessingBackend::Gpu
        } else {
            ProcessingBackend::Cpu
        }
    }

    /// Stabilization transform for one frame's current and smoothed motion.
    pub fn calculate_transform(&self, current: MotionVector, smoothed: MotionVector) -> StabilizationResult {
        calculate_stabilization_transform(current, smoothed, self.max_crop_fraction)
    }

    pub(crate) fn shares_context(&self, other: &SharedContext) -> bool {
        Arc::ptr_eq(&self.context, other)
    }
}
