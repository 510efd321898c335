//! The enhancement orchestrator.

use crate::context::{ProcessingContext, SharedContext};
use crate::error_handler::ErrorHandler;
use crate::fallback::{GpuFallbackManager, GpuState};
use crate::frame::{EnhancementList, FrameProcessor};
use crate::memory::MemoryManager;
use crate::options::{AnalyzeOptions, PipelineOptions};
use crate::presets::EnhancementPreset;
use crate::source::{Encoder, FrameSource};
use crate::video::{FrameAnalysis, VideoProcessor};
use clipfix_audio::{AudioRenderContext, STAGE_ORDER};
use clipfix_color::analysis::{luminance_stats, DominantColor};
use clipfix_color::white_balance::measure_temperature;
use clipfix_core::{
    AudioChunk, Enhancement, EnhancementConfig, EnhancementError, EnhancementMetrics,
    EnhancementSettings, ErrorCategory, ErrorCode, FrameData, MotionVector, RecoveryStrategy,
    Result,
};
use clipfix_gpu::{GpuCapabilities, GpuColorRenderer, GpuContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Share of `enhance_video` progress spent on frames when audio follows.
const VIDEO_PROGRESS_SHARE: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Uninitialized,
    Initializing,
    Ready,
    Processing,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorState {
    None,
    Error,
    Recovering,
}

/// Averaged analysis of sampled frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalysis {
    pub samples: usize,
    pub brightness: f32,
    pub contrast: f32,
    pub temperature: f32,
    pub dominant_colors: Vec<DominantColor>,
    pub recommended_settings: EnhancementSettings,
}

/// Side-by-side frames for comparison. Always the same size.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub original: FrameData,
    pub enhanced: FrameData,
}

struct Session {
    context: SharedContext,
    video: VideoProcessor,
    frames: FrameProcessor,
}

/// Owns one processing session: context, processors, metrics, and
/// error/recovery state.
pub struct EnhancementPipeline {
    session_id: Uuid,
    options: PipelineOptions,
    state: PipelineState,
    error_state: ErrorState,
    config: EnhancementConfig,
    settings: EnhancementSettings,
    /// Stages switched off by recovery.
    disabled: EnhancementList,
    session: Option<Session>,
    error_handler: ErrorHandler,
    memory: MemoryManager,
    metrics: EnhancementMetrics,
    last_error: Option<EnhancementError>,
    applied: Vec<Enhancement>,
    skipped: Vec<Enhancement>,
}

impl EnhancementPipeline {
    pub fn new(options: PipelineOptions, error_handler: ErrorHandler) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            memory: MemoryManager::new(options.memory_budget_bytes),
            options,
            state: PipelineState::Uninitialized,
            error_state: ErrorState::None,
            config: EnhancementConfig::default(),
            settings: EnhancementSettings::default(),
            disabled: EnhancementList::new(),
            session: None,
            error_handler,
            metrics: EnhancementMetrics::default(),
            last_error: None,
            applied: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Pipeline with its own error handler sized from the options.
    pub fn with_options(options: PipelineOptions) -> Self {
        let handler = ErrorHandler::new(options.max_history);
        Self::new(options, handler)
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Build the processing context and processors. A second call is a
    /// no-op.
    pub async fn initialize(&mut self) -> Result<()> {
        match self.state {
            PipelineState::Uninitialized => {}
            PipelineState::Disposed => {
                return Err(EnhancementError::new(ErrorCode::NotInitialized)
                    .with_context("state", "disposed"))
            }
            _ => {
                warn!(session = %self.session_id, "Pipeline already initialized");
                return Ok(());
            }
        }
        self.state = PipelineState::Initializing;
        info!(
            session = %self.session_id,
            use_gpu = self.options.use_gpu,
            enable_audio = self.options.enable_audio,
            "Initializing enhancement pipeline"
        );

        let (renderer, capabilities) = if self.options.use_gpu {
            create_gpu().await
        } else {
            (None, None)
        };
        let fallback = GpuFallbackManager::new(capabilities, self.options.use_gpu);

        let audio = if self.options.enable_audio {
            match AudioRenderContext::try_new(self.options.audio_sample_rate) {
                Ok(ctx) => Some(ctx),
                Err(e) => {
                    warn!(error = %e, "Audio context unavailable; audio enhancements disabled");
                    self.error_handler.handle(e);
                    None
                }
            }
        } else {
            None
        };

        let context = ProcessingContext::new(renderer, audio, fallback).into_shared();
        let video = VideoProcessor::new(Arc::clone(&context));
        let frames = FrameProcessor::new(Arc::clone(&context));
        debug_assert!(video.shares_context(frames.context()));

        info!(
            session = %self.session_id,
            gpu = video.use_gpu(),
            audio = context.lock().has_audio(),
            "Pipeline ready"
        );
        self.session = Some(Session {
            context,
            video,
            frames,
        });
        self.state = PipelineState::Ready;
        Ok(())
    }

    /// Release GPU resources and close the audio context. Idempotent.
    pub fn dispose(&mut self) {
        if self.state == PipelineState::Disposed {
            return;
        }
        if let Some(session) = self.session.take() {
            session.context.lock().dispose();
        }
        self.state = PipelineState::Disposed;
        info!(session = %self.session_id, "Pipeline disposed");
    }

    // ── Configuration ───────────────────────────────────────────

    /// Accept new toggles and settings. Out-of-range settings are rejected.
    pub fn configure(&mut self, config: EnhancementConfig, settings: EnhancementSettings) -> Result<()> {
        if let Err(e) = settings.validate() {
            return Err(self.fail(e));
        }
        self.config = config;
        self.settings = settings;
        Ok(())
    }

    pub fn apply_preset(&mut self, preset: &EnhancementPreset) -> Result<()> {
        if let Err(e) = preset.validate() {
            return Err(self.fail(e));
        }
        info!(session = %self.session_id, preset = %preset.id, "Applying preset");
        self.configure(preset.config, preset.settings)
    }

    /// Toggles with stages disabled by recovery switched off.
    pub fn effective_config(&self) -> EnhancementConfig {
        let mut config = self.config;
        for stage in &self.disabled {
            config.set(*stage, false);
        }
        config
    }

    // ── Analysis ────────────────────────────────────────────────

    /// Sample frames across the clip and average their analysis.
    pub async fn analyze_video<S: FrameSource>(
        &mut self,
        source: &mut S,
        options: &AnalyzeOptions,
    ) -> Result<VideoAnalysis> {
        self.ensure_ready()?;
        match self.analyze_samples(source, options).await {
            Ok(analysis) => Ok(analysis),
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn analyze_samples<S: FrameSource>(
        &mut self,
        source: &mut S,
        options: &AnalyzeOptions,
    ) -> Result<VideoAnalysis> {
        let timeout = self.options.seek_timeout();
        let mut samples: Vec<FrameAnalysis> = Vec::new();
        for t in options.timestamps(source.duration()) {
            seek_with_timeout(source, t, timeout).await?;
            let frame = source.current_frame()?;
            let session = self.session()?;
            let mut ctx = session.context.lock();
            ctx.surface_mut().draw(&frame);
            samples.push(session.video.analyze_frame(ctx.surface().pixels()));
        }

        let n = samples.len().max(1) as f32;
        let mean = |f: fn(&FrameAnalysis) -> f32| samples.iter().map(f).sum::<f32>() / n;
        let brightness = mean(|a: &FrameAnalysis| a.brightness);
        let contrast = mean(|a: &FrameAnalysis| a.contrast);
        let temperature = mean(|a: &FrameAnalysis| a.temperature);
        let dominant_colors = samples
            .get(samples.len() / 2)
            .map(|a| a.dominant_colors.clone())
            .unwrap_or_default();

        let recommended_settings = self.session()?.video.recommend(brightness, contrast, temperature);
        debug!(samples = samples.len(), brightness, contrast, temperature, "video analyzed");
        Ok(VideoAnalysis {
            samples: samples.len(),
            brightness,
            contrast,
            temperature,
            dominant_colors,
            recommended_settings,
        })
    }

    /// Original and enhanced frame at `timestamp`, default the midpoint.
    pub async fn generate_preview<S: FrameSource>(
        &mut self,
        source: &mut S,
        timestamp: Option<f64>,
    ) -> Result<Preview> {
        self.ensure_ready()?;
        let t = timestamp.unwrap_or(source.duration() / 2.0);
        let original = match self.capture(source, t).await {
            Ok(frame) => frame,
            Err(e) => return Err(self.fail(e)),
        };
        let enhanced = self.process_frame(&original, None)?;
        Ok(Preview { original, enhanced })
    }

    /// Seek, draw the frame on the session surface, and copy it back out.
    async fn capture<S: FrameSource>(&mut self, source: &mut S, timestamp: f64) -> Result<FrameData> {
        seek_with_timeout(source, timestamp, self.options.seek_timeout()).await?;
        let frame = source.current_frame()?;
        let mut ctx = self.session()?.context.lock();
        ctx.surface_mut().draw(&frame);
        Ok(ctx.surface().snapshot()?.at(timestamp, frame.index))
    }

    // ── Processing ──────────────────────────────────────────────

    /// Enhance one frame with the current configuration.
    pub fn process_frame(&mut self, frame: &FrameData, motion: Option<MotionVector>) -> Result<FrameData> {
        self.ensure_ready()?;
        self.state = PipelineState::Processing;
        let result = self.run_frame(frame, motion);
        self.state = PipelineState::Ready;
        result.map_err(|e| self.fail(e))
    }

    /// Run the audio chain with the current configuration. Without an
    /// audio context the chunk comes back unchanged.
    pub fn process_audio(&mut self, chunk: &AudioChunk) -> Result<AudioChunk> {
        self.ensure_ready()?;
        self.state = PipelineState::Processing;
        let result = self.run_audio(chunk);
        self.state = PipelineState::Ready;
        result.map_err(|e| self.fail(e))
    }

    /// Enhance a whole clip: every frame, then the audio, into `encoder`.
    ///
    /// `on_progress` receives non-decreasing values from 0.0 to 1.0.
    pub async fn enhance_video<S, E>(
        &mut self,
        source: &mut S,
        audio: Option<&AudioChunk>,
        encoder: &mut E,
        mut on_progress: impl FnMut(f32),
    ) -> Result<Vec<u8>>
    where
        S: FrameSource,
        E: Encoder,
    {
        self.ensure_ready()?;
        self.metrics.reset();
        let mut progress = Progress::new(&mut on_progress);
        progress.report(0.0);

        self.state = PipelineState::Processing;
        let held = self.memory.in_use();
        let result = self.enhance_frames(source, audio, encoder, &mut progress).await;
        self.memory.release(self.memory.in_use().saturating_sub(held));
        self.state = PipelineState::Ready;

        match result {
            Ok(bytes) => {
                progress.report(1.0);
                info!(
                    session = %self.session_id,
                    frames = self.metrics.frames_processed,
                    bytes = bytes.len(),
                    "Video enhanced"
                );
                Ok(bytes)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn enhance_frames<S, E, F>(
        &mut self,
        source: &mut S,
        audio: Option<&AudioChunk>,
        encoder: &mut E,
        progress: &mut Progress<'_, F>,
    ) -> Result<Vec<u8>>
    where
        S: FrameSource,
        E: Encoder,
        F: FnMut(f32),
    {
        let (width, height) = source.dimensions();
        let fps = source.frame_rate();
        let duration = source.duration();
        if !(fps > 0.0 && duration > 0.0 && fps.is_finite() && duration.is_finite()) {
            return Err(EnhancementError::new(ErrorCode::InvalidInput)
                .with_context("fps", fps)
                .with_context("duration", duration));
        }

        let total = ((duration * fps - 1e-6).ceil() as u64).max(1);
        let audio_secs = audio.map(AudioChunk::duration_secs).unwrap_or(0.0);
        self.memory.check_frame(width, height)?;
        self.memory
            .check_input(MemoryManager::estimate_video_bytes(width, height, total, audio_secs))?;

        let chunks = if self.memory.allow_chunking() {
            self.memory.plan_chunks(total, width, height)
        } else {
            vec![0..total]
        };
        let video_share = if audio.is_some() { VIDEO_PROGRESS_SHARE } else { 1.0 };
        let frame_bytes = MemoryManager::estimate_frame_bytes(width, height);
        let timeout = self.options.seek_timeout();
        info!(
            session = %self.session_id,
            frames = total,
            chunks = chunks.len(),
            width,
            height,
            "Enhancing video"
        );

        if let Ok(session) = self.session_mut() {
            session.frames.reset();
        }
        for chunk in chunks {
            let chunk_bytes = frame_bytes * (chunk.end - chunk.start) as usize;
            self.memory.reserve(chunk_bytes)?;
            for index in chunk {
                let t = index as f64 / fps;
                seek_with_timeout(source, t, timeout).await?;
                let frame = source.current_frame()?.at(t, index);
                let enhanced = self.run_frame(&frame, source.motion_at(index))?;
                encoder.push_frame(&enhanced)?;
                progress.report((index + 1) as f32 / total as f32 * video_share);
            }
            self.memory.release(chunk_bytes);
        }

        if let Some(chunk) = audio {
            let enhanced = self.run_audio(chunk)?;
            encoder.push_audio(&enhanced)?;
        }
        encoder.finish()
    }

    fn run_frame(&mut self, frame: &FrameData, motion: Option<MotionVector>) -> Result<FrameData> {
        let config = self.effective_config();
        let settings = self.settings;
        let outcome = self
            .session_mut()?
            .frames
            .process(frame, &config, &settings, motion)?;

        if let Some(err) = outcome.gpu_error {
            warn!(session = %self.session_id, code = %err.code, "GPU failure, continuing on CPU");
            self.error_handler.handle(err);
        }

        let (lum_before, std_before) = luminance_stats(&frame.pixels);
        let (lum_after, std_after) = luminance_stats(&outcome.frame.pixels);
        self.metrics.record_frame(
            outcome.backend,
            lum_after - lum_before,
            std_after - std_before,
            measure_temperature(&outcome.frame.pixels) - measure_temperature(&frame.pixels),
        );
        if outcome.applied.contains(&Enhancement::Stabilization) {
            self.metrics.record_stabilization(outcome.shake_reduction);
        }
        self.track(&outcome.applied, &outcome.skipped);
        Ok(outcome.frame)
    }

    fn run_audio(&mut self, chunk: &AudioChunk) -> Result<AudioChunk> {
        let config = self.effective_config();
        let settings = self.settings;
        let outcome = {
            let session = self.session()?;
            let ctx = session.context.lock();
            match ctx.audio() {
                Some(processor) => Some(processor.process(chunk, &config, &settings)?),
                None => None,
            }
        };

        match outcome {
            Some(outcome) => {
                self.metrics.record_audio(
                    outcome.metrics.noise_reduction_db,
                    outcome.metrics.echo_reduction,
                    outcome.metrics.volume_gain_db,
                );
                self.track(&outcome.applied, &outcome.skipped);
                Ok(outcome.chunk)
            }
            None => {
                debug!("no audio context; audio passed through");
                self.track(&[], &STAGE_ORDER);
                Ok(chunk.clone())
            }
        }
    }

    // ── Errors and recovery ─────────────────────────────────────

    /// Act on the last error's recovery strategy and return to ready.
    ///
    /// Errors that need the user, or cannot be recovered, are returned
    /// as-is and the error state is kept.
    pub fn attempt_recovery(&mut self) -> Result<RecoveryStrategy> {
        let Some(error) = self.last_error.clone() else {
            return Ok(RecoveryStrategy::None);
        };
        let strategy = error.recovery_strategy;
        if !error.is_recoverable()
            || matches!(strategy, RecoveryStrategy::UserIntervention | RecoveryStrategy::None)
        {
            warn!(session = %self.session_id, code = %error.code, "Error is not recoverable");
            return Err(error);
        }

        self.error_state = ErrorState::Recovering;
        info!(session = %self.session_id, code = %error.code, ?strategy, "Attempting recovery");
        match strategy {
            RecoveryStrategy::FallbackToCpu => {
                self.options.use_gpu = false;
                if let Ok(session) = self.session() {
                    session.context.lock().disable_gpu(&error.to_string());
                }
            }
            RecoveryStrategy::ReduceQuality => {
                self.settings = self.settings.scaled(0.8);
            }
            RecoveryStrategy::ChunkProcessing => {
                self.memory.set_allow_chunking(true);
            }
            RecoveryStrategy::SkipEnhancement => {
                for stage in stages_to_skip(&error) {
                    if !self.disabled.contains(&stage) {
                        info!(stage = stage.display_name(), "Skipping enhancement");
                        self.disabled.push(stage);
                    }
                }
            }
            RecoveryStrategy::Retry => {}
            RecoveryStrategy::UserIntervention | RecoveryStrategy::None => {}
        }

        self.last_error = None;
        self.error_state = ErrorState::None;
        if self.state != PipelineState::Disposed && self.session.is_some() {
            self.state = PipelineState::Ready;
        }
        Ok(strategy)
    }

    fn fail(&mut self, error: EnhancementError) -> EnhancementError {
        let error = self.error_handler.handle(error);
        warn!(
            session = %self.session_id,
            code = %error.code,
            strategy = ?error.recovery_strategy,
            "Enhancement failed"
        );
        self.last_error = Some(error.clone());
        self.error_state = ErrorState::Error;
        error
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn error_state(&self) -> ErrorState {
        self.error_state
    }

    pub fn last_error(&self) -> Option<&EnhancementError> {
        self.last_error.as_ref()
    }

    pub fn metrics(&self) -> &EnhancementMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &EnhancementConfig {
        &self.config
    }

    pub fn settings(&self) -> &EnhancementSettings {
        &self.settings
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn error_handler(&self) -> &ErrorHandler {
        &self.error_handler
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    /// Enhancements applied at least once this session.
    pub fn applied_enhancements(&self) -> &[Enhancement] {
        &self.applied
    }

    /// Enhancements skipped and never applied this session.
    pub fn skipped_enhancements(&self) -> &[Enhancement] {
        &self.skipped
    }

    pub fn gpu_state(&self) -> Option<GpuState> {
        self.session.as_ref().map(|s| s.context.lock().gpu_state())
    }

    pub fn video_processor(&self) -> Option<&VideoProcessor> {
        self.session.as_ref().map(|s| &s.video)
    }

    pub fn has_audio(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.context.lock().has_audio())
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            PipelineState::Ready => Ok(()),
            state => Err(EnhancementError::new(ErrorCode::NotInitialized)
                .with_context("state", format!("{state:?}"))),
        }
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| EnhancementError::new(ErrorCode::NotInitialized))
    }

    fn session_mut(&mut self) -> Result<&mut Session> {
        self.session
            .as_mut()
            .ok_or_else(|| EnhancementError::new(ErrorCode::NotInitialized))
    }

    fn track(&mut self, applied: &[Enhancement], skipped: &[Enhancement]) {
        for e in applied {
            if !self.applied.contains(e) {
                self.applied.push(*e);
            }
            self.skipped.retain(|s| s != e);
        }
        for e in skipped {
            if !self.applied.contains(e) && !self.skipped.contains(e) {
                self.skipped.push(*e);
            }
        }
    }
}

/// Stages named by an error's `stage` context, or every audio stage for
/// audio context failures.
fn stages_to_skip(error: &EnhancementError) -> Vec<Enhancement> {
    if let Some(stage) = error.context.get("stage").and_then(|s| Enhancement::from_name(s)) {
        return vec![stage];
    }
    if error.category() == ErrorCategory::AudioContext {
        return STAGE_ORDER.to_vec();
    }
    Vec::new()
}

async fn create_gpu() -> (Option<GpuColorRenderer>, Option<GpuCapabilities>) {
    let Some(capabilities) = GpuCapabilities::probe() else {
        warn!("No GPU adapter found; rendering on CPU");
        return (None, None);
    };
    match GpuContext::new()
        .await
        .and_then(|ctx| GpuColorRenderer::new(Arc::new(ctx)))
    {
        Ok(renderer) => (Some(renderer), Some(capabilities)),
        Err(e) => {
            warn!(error = %e, "GPU initialization failed; rendering on CPU");
            (None, Some(capabilities))
        }
    }
}

/// Seek, but never wait longer than `timeout`. On timeout the source's
/// current frame is used.
async fn seek_with_timeout<S: FrameSource>(source: &mut S, timestamp: f64, timeout: Duration) -> Result<()> {
    match tokio::time::timeout(timeout, source.seek(timestamp)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timestamp, timeout_ms = timeout.as_millis() as u64, "Seek timed out; using current frame");
            Ok(())
        }
    }
}

/// Forwards only values above the last one reported.
struct Progress<'a, F: FnMut(f32)> {
    callback: &'a mut F,
    last: Option<f32>,
}

impl<'a, F: FnMut(f32)> Progress<'a, F> {
    fn new(callback: &'a mut F) -> Self {
        Self {
            callback,
            last: None,
        }
    }

    fn report(&mut self, value: f32) {
        let value = value.clamp(0.0, 1.0);
        if self.last.map_or(true, |last| value > last) {
            self.last = Some(value);
            (self.callback)(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StillSource {
        frames: Vec<FrameData>,
        fps: f64,
        position: usize,
        stall: bool,
    }

    impl StillSource {
        fn gray(levels: &[u8]) -> Self {
            Self {
                frames: levels
                    .iter()
                    .map(|&l| FrameData::solid(8, 8, [l, l, l, 255]))
                    .collect(),
                fps: 10.0,
                position: 0,
                stall: false,
            }
        }
    }

    impl FrameSource for StillSource {
        fn duration(&self) -> f64 {
            self.frames.len() as f64 / self.fps
        }

        fn frame_rate(&self) -> f64 {
            self.fps
        }

        fn dimensions(&self) -> (u32, u32) {
            (8, 8)
        }

        async fn seek(&mut self, timestamp: f64) -> Result<()> {
            if self.stall {
                std::future::pending::<()>().await;
            }
            self.position = ((timestamp * self.fps) as usize).min(self.frames.len() - 1);
            Ok(())
        }

        fn current_frame(&self) -> Result<FrameData> {
            Ok(self.frames[self.position].clone())
        }
    }

    #[derive(Default)]
    struct CountingEncoder {
        frames: usize,
        audio: usize,
    }

    impl Encoder for CountingEncoder {
        fn push_frame(&mut self, _frame: &FrameData) -> Result<()> {
            self.frames += 1;
            Ok(())
        }

        fn push_audio(&mut self, _chunk: &AudioChunk) -> Result<()> {
            self.audio += 1;
            Ok(())
        }

        fn finish(&mut self) -> Result<Vec<u8>> {
            Ok(vec![self.frames as u8, self.audio as u8])
        }
    }

    fn fast_options() -> PipelineOptions {
        PipelineOptions {
            seek_timeout_ms: 20,
            ..Default::default()
        }
    }

    async fn ready() -> EnhancementPipeline {
        let mut pipeline = EnhancementPipeline::with_options(fast_options());
        pipeline.initialize().await.unwrap();
        pipeline
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let mut pipeline = ready().await;
        let id = pipeline.session_id();
        pipeline.initialize().await.unwrap();
        assert_eq!(pipeline.state(), PipelineState::Ready);
        assert_eq!(pipeline.session_id(), id);
        assert_eq!(pipeline.gpu_state(), Some(GpuState::CpuFallback));
        assert!(pipeline.has_audio());
    }

    #[test]
    fn processing_before_initialize_fails() {
        let mut pipeline = EnhancementPipeline::with_options(fast_options());
        let frame = FrameData::solid(2, 2, [0, 0, 0, 255]);
        let err = pipeline.process_frame(&frame, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotInitialized);
    }

    #[tokio::test]
    async fn dispose_then_initialize_is_an_error() {
        let mut pipeline = ready().await;
        pipeline.dispose();
        pipeline.dispose();
        assert_eq!(pipeline.state(), PipelineState::Disposed);
        assert!(pipeline.initialize().await.is_err());
        assert!(pipeline.process_audio(&AudioChunk::silent(1, 48_000, 10)).is_err());
    }

    #[tokio::test]
    async fn configure_rejects_out_of_range() {
        let mut pipeline = ready().await;
        let bad = EnhancementSettings {
            saturation: 101.0,
            ..Default::default()
        };
        let err = pipeline.configure(EnhancementConfig::default(), bad).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSettings);
        assert_eq!(pipeline.settings().saturation, 0.0);
        assert_eq!(pipeline.error_state(), ErrorState::Error);
        // Validation errors need the user
        assert!(pipeline.attempt_recovery().is_err());
    }

    #[tokio::test]
    async fn analyze_video_averages_samples() {
        let mut pipeline = ready().await;
        let mut source = StillSource::gray(&[40, 60, 80, 100]);
        let analysis = pipeline
            .analyze_video(
                &mut source,
                &AnalyzeOptions {
                    sample_frames: 4,
                    sample_interval: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(analysis.samples, 4);
        assert!((analysis.brightness - 70.0).abs() < 1.0);
        assert!(analysis.recommended_settings.brightness > 0.0);
    }

    #[tokio::test]
    async fn stalled_seek_times_out_instead_of_hanging() {
        let mut pipeline = ready().await;
        let mut source = StillSource::gray(&[50, 200]);
        source.stall = true;
        let analysis = pipeline
            .analyze_video(&mut source, &AnalyzeOptions::default())
            .await
            .unwrap();
        // Stuck on the first frame
        assert!((analysis.brightness - 50.0).abs() < 1.0);
    }

    #[tokio::test]
    async fn preview_returns_same_size_pair() {
        let mut pipeline = ready().await;
        pipeline
            .configure(
                EnhancementConfig::default(),
                EnhancementSettings {
                    brightness: 20.0,
                    ..Default::default()
                },
            )
            .unwrap();
        let mut source = StillSource::gray(&[60, 90, 120]);
        let preview = pipeline.generate_preview(&mut source, None).await.unwrap();
        assert_eq!(preview.original.pixels.len(), preview.enhanced.pixels.len());
        assert_eq!(preview.original.pixels[0], 90);
        assert!(preview.enhanced.pixels[0] > 90);
    }

    #[tokio::test]
    async fn enhance_video_reports_monotonic_progress() {
        let mut pipeline = ready().await;
        let mut source = StillSource::gray(&[10, 20, 30, 40, 50]);
        let mut encoder = CountingEncoder::default();
        let audio = AudioChunk::silent(2, 48_000, 24_000);
        let mut seen = Vec::new();
        let bytes = pipeline
            .enhance_video(&mut source, Some(&audio), &mut encoder, |p| seen.push(p))
            .await
            .unwrap();
        assert_eq!(bytes, vec![5, 1]);
        assert_eq!(seen.first(), Some(&0.0));
        assert_eq!(seen.last(), Some(&1.0));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(pipeline.metrics().frames_processed, 5);
        assert_eq!(pipeline.metrics().audio_chunks_processed, 1);
        assert_eq!(pipeline.memory().in_use(), 0);
    }

    #[tokio::test]
    async fn oversized_video_recovers_by_chunking() {
        let mut pipeline = EnhancementPipeline::with_options(PipelineOptions {
            memory_budget_bytes: 600,
            enable_audio: false,
            ..fast_options()
        });
        pipeline.initialize().await.unwrap();
        let mut source = StillSource::gray(&[10, 20, 30, 40]);
        let mut encoder = CountingEncoder::default();

        // 4 frames of 256 bytes exceed 600
        let err = pipeline
            .enhance_video(&mut source, None, &mut encoder, |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::VideoTooLarge);
        assert_eq!(pipeline.error_state(), ErrorState::Error);

        assert_eq!(pipeline.attempt_recovery().unwrap(), RecoveryStrategy::ChunkProcessing);
        assert_eq!(pipeline.error_state(), ErrorState::None);
        assert_eq!(pipeline.state(), PipelineState::Ready);

        let bytes = pipeline
            .enhance_video(&mut source, None, &mut encoder, |_| {})
            .await
            .unwrap();
        assert_eq!(bytes[0], 4);
        assert!(pipeline.memory().high_water() <= 300);
    }

    #[tokio::test]
    async fn frame_over_budget_is_not_recoverable() {
        let mut pipeline = EnhancementPipeline::with_options(PipelineOptions {
            memory_budget_bytes: 200,
            enable_audio: false,
            ..fast_options()
        });
        pipeline.initialize().await.unwrap();
        let mut source = StillSource::gray(&[10, 20]);
        let mut encoder = CountingEncoder::default();

        // One 256-byte frame already exceeds 200
        let err = pipeline
            .enhance_video(&mut source, None, &mut encoder, |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::VideoTooLarge);
        assert_eq!(err.recovery_strategy, RecoveryStrategy::UserIntervention);
        assert!(!err.recoverable);
        assert!(pipeline.attempt_recovery().is_err());
        assert!(!pipeline.memory().allow_chunking());
    }

    #[tokio::test]
    async fn skip_recovery_disables_named_stage() {
        let mut pipeline = ready().await;
        pipeline.last_error = Some(
            EnhancementError::new(ErrorCode::AudioProcessingFailed)
                .with_context("stage", Enhancement::NoiseReduction.key()),
        );
        assert_eq!(pipeline.attempt_recovery().unwrap(), RecoveryStrategy::SkipEnhancement);
        assert!(!pipeline.effective_config().noise_reduction);
        assert!(pipeline.config().noise_reduction);

        pipeline
            .process_audio(&AudioChunk::silent(1, 48_000, 480))
            .unwrap();
        assert!(pipeline.skipped_enhancements().contains(&Enhancement::NoiseReduction));
        assert!(pipeline.applied_enhancements().contains(&Enhancement::VolumeNormalization));
    }

    #[tokio::test]
    async fn reduce_quality_scales_settings() {
        let mut pipeline = ready().await;
        pipeline
            .configure(
                EnhancementConfig::default(),
                EnhancementSettings {
                    brightness: 50.0,
                    ..Default::default()
                },
            )
            .unwrap();
        pipeline.last_error = Some(EnhancementError::new(ErrorCode::OutOfMemory));
        assert_eq!(pipeline.attempt_recovery().unwrap(), RecoveryStrategy::ReduceQuality);
        assert!((pipeline.settings().brightness - 40.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn audio_without_context_passes_through() {
        let mut pipeline = EnhancementPipeline::with_options(PipelineOptions {
            enable_audio: false,
            ..fast_options()
        });
        pipeline.initialize().await.unwrap();
        let chunk = AudioChunk::new(vec![vec![0.1, 0.2, -0.3]], 48_000).unwrap();
        assert_eq!(pipeline.process_audio(&chunk).unwrap(), chunk);
        assert!(pipeline.skipped_enhancements().contains(&Enhancement::NoiseReduction));
    }
}
