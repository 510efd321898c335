//! End-to-end pipeline tests.

use clipfix_core::{
    AudioChunk, Enhancement, EnhancementConfig, EnhancementSettings, ErrorCode, FrameData,
    MotionVector, RecoveryStrategy, Result,
};
use clipfix_pipeline::{
    Encoder, EnhancementPipeline, ErrorState, FrameSource, GpuState, JsonPresetStore,
    PipelineOptions, PresetStore,
};

/// A clip of one repeated frame with alternating horizontal shake.
struct ShakyClip {
    frame: FrameData,
    frames: u64,
    shake: f32,
}

impl ShakyClip {
    fn new(frames: u64, shake: f32) -> Self {
        Self {
            frame: FrameData::test_pattern(32, 16),
            frames,
            shake,
        }
    }
}

impl FrameSource for ShakyClip {
    fn duration(&self) -> f64 {
        self.frames as f64 / 25.0
    }

    fn frame_rate(&self) -> f64 {
        25.0
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }

    async fn seek(&mut self, _timestamp: f64) -> Result<()> {
        Ok(())
    }

    fn current_frame(&self) -> Result<FrameData> {
        Ok(self.frame.clone())
    }

    fn motion_at(&self, index: u64) -> Option<MotionVector> {
        let dx = if index % 2 == 0 { self.shake } else { -self.shake };
        Some(MotionVector::new(dx, 0.0))
    }
}

#[derive(Default)]
struct Collect {
    frames: Vec<FrameData>,
    audio: Vec<AudioChunk>,
}

impl Encoder for Collect {
    fn push_frame(&mut self, frame: &FrameData) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn push_audio(&mut self, chunk: &AudioChunk) -> Result<()> {
        self.audio.push(chunk.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        Ok(self.frames.iter().flat_map(|f| f.pixels.clone()).collect())
    }
}

fn options() -> PipelineOptions {
    PipelineOptions {
        seek_timeout_ms: 20,
        ..Default::default()
    }
}

#[tokio::test]
async fn every_embedded_preset_applies() {
    let store = JsonPresetStore::embedded().unwrap();
    let mut pipeline = EnhancementPipeline::with_options(options());
    pipeline.initialize().await.unwrap();

    for preset in store.all() {
        pipeline.apply_preset(preset).unwrap();
        assert_eq!(pipeline.config(), &preset.config);
        assert_eq!(pipeline.settings(), &preset.settings);
    }
    assert_eq!(store.by_category("lighting").len(), 2);
    assert!(store.get("outdoor").unwrap().config.stabilization);
}

#[tokio::test]
async fn shaky_clip_is_stabilized_end_to_end() {
    let store = JsonPresetStore::embedded().unwrap();
    let mut pipeline = EnhancementPipeline::with_options(options());
    pipeline.initialize().await.unwrap();
    pipeline.apply_preset(store.get("outdoor").unwrap()).unwrap();

    let mut clip = ShakyClip::new(12, 6.0);
    let audio = AudioChunk::silent(1, 48_000, 4_800);
    let mut encoder = Collect::default();
    let bytes = pipeline
        .enhance_video(&mut clip, Some(&audio), &mut encoder, |_| {})
        .await
        .unwrap();

    assert_eq!(encoder.frames.len(), 12);
    assert_eq!(encoder.audio.len(), 1);
    assert_eq!(bytes.len(), 12 * FrameData::byte_len(32, 16));
    assert!(encoder
        .frames
        .iter()
        .all(|f| (f.width, f.height) == (32, 16)));

    let metrics = pipeline.metrics();
    assert_eq!(metrics.frames_processed, 12);
    assert!(metrics.stabilized_frames > 0);
    assert!(pipeline.applied_enhancements().contains(&Enhancement::Stabilization));
    assert_eq!(pipeline.error_state(), ErrorState::None);
}

#[tokio::test]
async fn repeated_failures_need_the_user() {
    let mut pipeline = EnhancementPipeline::with_options(PipelineOptions {
        memory_budget_bytes: 5_000,
        enable_audio: false,
        ..options()
    });
    pipeline.initialize().await.unwrap();
    // One 2048-byte frame fits, ten do not
    let mut clip = ShakyClip::new(10, 0.0);
    let mut encoder = Collect::default();

    for _ in 0..3 {
        let err = pipeline
            .enhance_video(&mut clip, None, &mut encoder, |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.recovery_strategy, RecoveryStrategy::ChunkProcessing);
    }

    let err = pipeline
        .enhance_video(&mut clip, None, &mut encoder, |_| {})
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::VideoTooLarge);
    assert_eq!(err.recovery_strategy, RecoveryStrategy::UserIntervention);
    assert!(pipeline.attempt_recovery().is_err());
    assert_eq!(pipeline.error_state(), ErrorState::Error);
    assert_eq!(pipeline.error_handler().recent(ErrorCode::VideoTooLarge), 4);
}

#[tokio::test]
async fn gpu_and_cpu_pipelines_agree() {
    let mut gpu = EnhancementPipeline::with_options(PipelineOptions {
        use_gpu: true,
        enable_audio: false,
        ..options()
    });
    gpu.initialize().await.unwrap();
    if gpu.gpu_state() != Some(GpuState::GpuActive) {
        eprintln!("Skipping test: no GPU available");
        return;
    }

    let mut cpu = EnhancementPipeline::with_options(PipelineOptions {
        enable_audio: false,
        ..options()
    });
    cpu.initialize().await.unwrap();

    let settings = EnhancementSettings {
        brightness: 15.0,
        contrast: 20.0,
        saturation: -10.0,
        temperature: 12.0,
        ..Default::default()
    };
    let config = EnhancementConfig::default();
    gpu.configure(config, settings).unwrap();
    cpu.configure(config, settings).unwrap();

    let frame = FrameData::test_pattern(64, 8);
    let a = gpu.process_frame(&frame, None).unwrap();
    let b = cpu.process_frame(&frame, None).unwrap();
    assert_eq!(a.pixels.len(), b.pixels.len());
    let worst = a
        .pixels
        .iter()
        .zip(&b.pixels)
        .map(|(x, y)| x.abs_diff(*y))
        .max()
        .unwrap_or(0);
    assert!(worst <= 5, "GPU and CPU differ by {worst}");
}
