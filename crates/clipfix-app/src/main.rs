//! ClipFix - automatic enhancement for a still frame
//!
//! Usage: `clipfix <input-image> <output-image> [preset-id] [--gpu]`

use anyhow::{bail, Context, Result};
use clipfix_core::{FrameData, Result as CoreResult};
use clipfix_pipeline::{
    AnalyzeOptions, EnhancementPipeline, FrameSource, JsonPresetStore, PipelineOptions,
    PresetStore,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// A one-frame source backed by a decoded image.
struct StillImage {
    frame: FrameData,
}

impl FrameSource for StillImage {
    fn duration(&self) -> f64 {
        1.0
    }

    fn frame_rate(&self) -> f64 {
        1.0
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }

    async fn seek(&mut self, _timestamp: f64) -> CoreResult<()> {
        Ok(())
    }

    fn current_frame(&self) -> CoreResult<FrameData> {
        Ok(self.frame.clone())
    }
}

struct Args {
    input: PathBuf,
    output: PathBuf,
    preset: String,
    use_gpu: bool,
}

fn parse_args() -> Result<Args> {
    let mut use_gpu = false;
    let mut positional = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--gpu" => use_gpu = true,
            _ => positional.push(arg),
        }
    }
    let mut positional = positional.into_iter();
    let (Some(input), Some(output)) = (positional.next(), positional.next()) else {
        bail!("usage: clipfix <input-image> <output-image> [preset-id] [--gpu]");
    };
    Ok(Args {
        input: input.into(),
        output: output.into(),
        preset: positional.next().unwrap_or_else(|| "auto".to_string()),
        use_gpu,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = parse_args()?;
    info!("ClipFix starting...");

    let image = image::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    let frame = FrameData::new(image.into_raw(), width, height)?;

    let store = JsonPresetStore::embedded()?;
    let Some(preset) = store.get(&args.preset) else {
        let known: Vec<_> = store.all().iter().map(|p| p.id.as_str()).collect();
        bail!("unknown preset '{}' (available: {})", args.preset, known.join(", "));
    };

    let mut pipeline = EnhancementPipeline::with_options(PipelineOptions {
        use_gpu: args.use_gpu,
        enable_audio: false,
        ..Default::default()
    });
    pipeline.initialize().await?;
    pipeline.apply_preset(preset)?;

    let mut source = StillImage { frame };
    let analysis = pipeline
        .analyze_video(
            &mut source,
            &AnalyzeOptions {
                sample_frames: 1,
                sample_interval: None,
            },
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);

    // The auto preset takes its color knobs from the analysis
    if preset.id == "auto" {
        let mut settings = *pipeline.settings();
        settings.brightness = analysis.recommended_settings.brightness;
        settings.contrast = analysis.recommended_settings.contrast;
        settings.temperature = analysis.recommended_settings.temperature;
        let config = *pipeline.config();
        pipeline.configure(config, settings)?;
    }

    let enhanced = pipeline.process_frame(&source.frame, None)?;
    let out = image::RgbaImage::from_raw(enhanced.width, enhanced.height, enhanced.pixels)
        .context("enhanced frame has the wrong size")?;
    out.save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!("{}", serde_json::to_string_pretty(pipeline.metrics())?);
    info!(
        output = %args.output.display(),
        applied = ?pipeline.applied_enhancements(),
        "Enhanced image written"
    );
    pipeline.dispose();
    Ok(())
}
