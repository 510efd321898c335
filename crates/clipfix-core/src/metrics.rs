//! Session-scoped enhancement metrics.

use serde::{Deserialize, Serialize};

/// Which implementation rendered a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessingBackend {
    Gpu,
    Cpu,
}

/// Cumulative counters for one enhancement run. Reset at the start of each run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementMetrics {
    /// Mean luminance change of enhanced frames (0-255 scale).
    pub brightness_delta: f32,
    /// Change in luminance standard deviation.
    pub contrast_delta: f32,
    /// Change in red/blue balance on the temperature scale.
    pub temperature_delta: f32,
    /// Noise floor reduction in dB, averaged over chunks.
    pub noise_reduction_db: f32,
    /// Echo reduction on the normalized [0, 100] scale, averaged over chunks.
    pub echo_reduction: f32,
    /// Gain applied by normalization in dB, averaged over chunks.
    pub volume_gain_db: f32,
    /// Percentage of measured shake removed by stabilization.
    pub shake_reduction_percent: f32,

    pub frames_processed: u64,
    pub gpu_frames: u64,
    pub cpu_frames: u64,
    pub stabilized_frames: u64,
    pub audio_chunks_processed: u64,
}

impl EnhancementMetrics {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fold one frame's measurements into the running means.
    pub fn record_frame(
        &mut self,
        backend: ProcessingBackend,
        brightness_delta: f32,
        contrast_delta: f32,
        temperature_delta: f32,
    ) {
        self.frames_processed += 1;
        match backend {
            ProcessingBackend::Gpu => self.gpu_frames += 1,
            ProcessingBackend::Cpu => self.cpu_frames += 1,
        }
        let n = self.frames_processed as f32;
        self.brightness_delta += (brightness_delta - self.brightness_delta) / n;
        self.contrast_delta += (contrast_delta - self.contrast_delta) / n;
        self.temperature_delta += (temperature_delta - self.temperature_delta) / n;
    }

    /// Record a stabilized frame and how much of its shake was removed.
    pub fn record_stabilization(&mut self, reduction_percent: f32) {
        self.stabilized_frames += 1;
        let n = self.stabilized_frames as f32;
        self.shake_reduction_percent += (reduction_percent - self.shake_reduction_percent) / n;
    }

    /// Fold one audio chunk's measurements into the running means.
    pub fn record_audio(&mut self, noise_reduction_db: f32, echo_reduction: f32, gain_db: f32) {
        self.audio_chunks_processed += 1;
        let n = self.audio_chunks_processed as f32;
        self.noise_reduction_db += (noise_reduction_db - self.noise_reduction_db) / n;
        self.echo_reduction += (echo_reduction - self.echo_reduction) / n;
        self.volume_gain_db += (gain_db - self.volume_gain_db) / n;
    }
}
