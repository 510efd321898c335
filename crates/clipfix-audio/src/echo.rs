//! Echo cancellation: find the dominant delayed copy and subtract it.

use crate::stage::AudioStage;
use clipfix_core::{AudioChunk, Enhancement, Result};
use tracing::debug;

const MIN_DELAY_SECS: f32 = 0.02;
const MAX_DELAY_SECS: f32 = 0.6;
/// Delay assumed when detection is disabled.
const DEFAULT_DELAY_SECS: f32 = 0.1;
/// Echo gain assumed when detection is disabled.
const DEFAULT_ECHO_GAIN: f32 = 0.3;
/// Correlation below this is not treated as an echo.
const MIN_CORRELATION: f32 = 0.1;
/// Detection runs on roughly this rate.
const ANALYSIS_RATE: u32 = 8_000;
/// Longest stretch of audio searched for an echo.
const MAX_ANALYSIS_SECS: f32 = 2.0;

/// A detected delayed copy of the signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoEstimate {
    pub delay_samples: usize,
    /// Normalized correlation at the delay, 0-1.
    pub correlation: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoCancellation {
    /// 0-100
    pub reduction: f32,
    pub detect_delay: bool,
}

impl EchoCancellation {
    pub fn new(reduction: f32, detect_delay: bool) -> Self {
        Self {
            reduction: reduction.clamp(0.0, 100.0),
            detect_delay,
        }
    }

    fn estimate_for(&self, chunk: &AudioChunk) -> Option<EchoEstimate> {
        if self.detect_delay {
            let mono = mixdown(chunk);
            estimate_echo(&mono, chunk.sample_rate)
        } else {
            let delay = (DEFAULT_DELAY_SECS * chunk.sample_rate as f32) as usize;
            (delay > 0 && delay < chunk.frame_length()).then_some(EchoEstimate {
                delay_samples: delay,
                correlation: DEFAULT_ECHO_GAIN,
            })
        }
    }
}

impl AudioStage for EchoCancellation {
    fn enhancement(&self) -> Enhancement {
        Enhancement::EchoCancellation
    }

    fn process(&self, chunk: &AudioChunk) -> Result<AudioChunk> {
        let Some(echo) = self.estimate_for(chunk) else {
            return Ok(chunk.clone());
        };
        let gain = self.reduction / 100.0 * echo.correlation.min(0.9);
        debug!(
            delay_samples = echo.delay_samples,
            correlation = echo.correlation,
            gain,
            "echo cancellation"
        );
        let lag = echo.delay_samples;
        Ok(chunk.map_channels(|samples| {
            samples
                .iter()
                .enumerate()
                .map(|(n, &x)| if n >= lag { x - gain * samples[n - lag] } else { x })
                .collect()
        }))
    }
}

fn mixdown(chunk: &AudioChunk) -> Vec<f32> {
    let n = chunk.frame_length();
    let scale = 1.0 / chunk.channel_count().max(1) as f32;
    (0..n)
        .map(|i| chunk.channels.iter().map(|c| c[i]).sum::<f32>() * scale)
        .collect()
}

/// Box-filter down to roughly the analysis rate. Returns the decimation factor.
fn decimate(samples: &[f32], sample_rate: u32) -> (Vec<f32>, usize) {
    let factor = (sample_rate / ANALYSIS_RATE).max(1) as usize;
    let limit = ((MAX_ANALYSIS_SECS * sample_rate as f32) as usize).min(samples.len());
    let decimated = samples[..limit]
        .chunks(factor)
        .map(|c| c.iter().sum::<f32>() / c.len() as f32)
        .collect();
    (decimated, factor)
}

/// Peak search over normalized autocorrelation within 20-600 ms.
/// Returns the delay in samples at the input rate.
pub fn estimate_echo(samples: &[f32], sample_rate: u32) -> Option<EchoEstimate> {
    let (decimated, factor) = decimate(samples, sample_rate);
    let rate = sample_rate as f32 / factor as f32;

    let min_lag = ((MIN_DELAY_SECS * rate) as usize).max(1);
    let max_lag = ((MAX_DELAY_SECS * rate) as usize).min(decimated.len() / 2);
    if min_lag >= max_lag {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;
    for lag in min_lag..=max_lag {
        let r = normalized_correlation(&decimated, lag);
        if r > best.map_or(MIN_CORRELATION, |(_, b)| b) {
            best = Some((lag, r));
        }
    }

    best.map(|(lag, r)| EchoEstimate {
        delay_samples: lag * factor,
        correlation: r,
    })
}

fn normalized_correlation(x: &[f32], lag: usize) -> f32 {
    let (mut xy, mut xx, mut yy) = (0.0f64, 0.0f64, 0.0f64);
    for n in lag..x.len() {
        let a = x[n] as f64;
        let b = x[n - lag] as f64;
        xy += a * b;
        xx += a * a;
        yy += b * b;
    }
    let denom = (xx * yy).sqrt();
    if denom <= 1e-12 {
        0.0
    } else {
        (xy / denom) as f32
    }
}

/// How much delayed self-similarity was removed, on a [0, 100] scale.
/// Identical inputs give 0.
pub fn estimate_echo_reduction(original: &AudioChunk, processed: &AudioChunk) -> f32 {
    let orig = mixdown(original);
    let Some(echo) = estimate_echo(&orig, original.sample_rate) else {
        return 0.0;
    };
    let before = echo.correlation;
    let (decimated, factor) = decimate(&mixdown(processed), processed.sample_rate);
    let lag = echo.delay_samples / factor;
    let after = if lag == 0 || lag >= decimated.len() {
        before
    } else {
        normalized_correlation(&decimated, lag).max(0.0)
    };
    ((before - after) / before * 100.0).clamp(0.0, 100.0)
}
