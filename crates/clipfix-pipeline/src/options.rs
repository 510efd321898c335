//! Pipeline and analysis options.

use clipfix_core::memory_budget::DEFAULT_MEMORY_BUDGET;
use clipfix_core::{EnhancementError, ErrorCode, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineOptions {
    /// Opt in to GPU rendering. The GPU is still only used if detected.
    pub use_gpu: bool,
    pub enable_audio: bool,
    pub audio_sample_rate: u32,
    pub memory_budget_bytes: usize,
    pub seek_timeout_ms: u64,
    /// Errors kept by the error handler.
    pub max_history: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            use_gpu: false,
            enable_audio: true,
            audio_sample_rate: 48_000,
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET,
            seek_timeout_ms: 1_000,
            max_history: 100,
        }
    }
}

impl PipelineOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            EnhancementError::new(ErrorCode::InvalidSettings).with_context("options", e)
        })
    }

    pub fn seek_timeout(&self) -> Duration {
        Duration::from_millis(self.seek_timeout_ms)
    }
}

/// How `analyze_video` samples its source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzeOptions {
    pub sample_frames: usize,
    /// Seconds between samples. `None` spreads samples evenly over the clip.
    pub sample_interval: Option<f64>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            sample_frames: 10,
            sample_interval: None,
        }
    }
}

impl AnalyzeOptions {
    /// Timestamps to sample from a clip of `duration` seconds.
    pub fn timestamps(&self, duration: f64) -> Vec<f64> {
        let n = self.sample_frames.max(1);
        let duration = duration.max(0.0);
        match self.sample_interval {
            Some(step) if step > 0.0 => (0..n).map(|i| (i as f64 * step).min(duration)).collect(),
            _ => {
                let step = duration / n as f64;
                (0..n).map(|i| (i as f64 + 0.5) * step).collect()
            }
        }
    }
}
