//! ClipFix Color - Frame analysis, CPU color correction, and white balance.

pub mod analysis;
pub mod correction;
pub mod white_balance;

pub use analysis::{analyze, analyze_pixels, ColorAnalysis, DominantColor};
pub use correction::{
    apply_color_correction, calculate_optimal_color_correction, correct_frame, ColorAdjustment,
    CorrectionTargets,
};

/// Full automatic correction recommendation for one frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameRecommendation {
    pub analysis: ColorAnalysis,
    pub recommended: ColorAdjustment,
}

/// Analyze a buffer and derive the recommended knobs.
pub fn recommend(pixels: &[u8], targets: &CorrectionTargets) -> FrameRecommendation {
    FrameRecommendation {
        analysis: analyze_pixels(pixels),
        recommended: calculate_optimal_color_correction(pixels, targets),
    }
}
