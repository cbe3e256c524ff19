//! MotionSync Player
//!
//! Plays audio through the default output device and drives the mouth of a
//! headless model in sync with it, printing a live mouth meter.
//!
//! # Usage
//!
//! ```bash
//! motionsync-player hello.wav
//! motionsync-player intro.wav outro.wav --queue
//! motionsync-player https://cdn.example/voice.wav --settings models/hiyori/hiyori.model3.json
//! motionsync-player hello.wav --motion-sync hiyori.motionsync3.json
//! motionsync-player hello.wav --volume 0.5 --fps 30
//! ```

mod model;
mod output;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use motionsync_core::{
    AssetFetcher, AudioLoader, DefaultFetcher, EngineRuntime, FrameHooks, LevelEngineFactory,
    ModelSettings, MotionSync, SyncConfig,
};

use model::{HeadlessModel, meter};
use output::CpalBackend;

#[derive(Parser)]
#[command(name = "motionsync-player")]
#[command(author, version, about = "Lip-sync a headless avatar to audio")]
struct Args {
    /// Audio files or URLs (WAV), played in order
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Queue every input up front instead of starting each one after the previous finished
    #[arg(long)]
    queue: bool,

    /// Output volume (0.0 up to the configured maximum)
    #[arg(long)]
    volume: Option<f32>,

    /// Model settings (model3.json) naming the sync configuration
    #[arg(long, value_name = "FILE_OR_URL", conflicts_with = "motion_sync")]
    settings: Option<String>,

    /// Sync configuration (motionsync3.json) loaded directly
    #[arg(long, value_name = "FILE_OR_URL")]
    motion_sync: Option<String>,

    /// Frame rate of the model update loop
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Config file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Fixed-rate frame loop shared by both playback modes
struct FrameLoop {
    model: HeadlessModel,
    hooks: FrameHooks,
    frame_time: Duration,
    next_frame: Instant,
}

impl FrameLoop {
    fn new(fps: u32) -> Self {
        let frame_time = Duration::from_secs_f64(1.0 / fps as f64);
        Self {
            model: HeadlessModel::standard(),
            hooks: FrameHooks::new(),
            frame_time,
            next_frame: Instant::now(),
        }
    }

    /// Wait for the next frame, refill audio, update the model, run the hooks
    fn step(&mut self, sync: &MotionSync<CpalBackend>) {
        self.next_frame += self.frame_time;
        let now = Instant::now();
        if self.next_frame > now {
            std::thread::sleep(self.next_frame - now);
        } else {
            self.next_frame = now;
        }

        sync.lock().backend_mut().pump();
        self.model.update(self.frame_time.as_secs_f32());
        self.hooks.run(&mut self.model);

        let open = self.model.value("ParamMouthOpenY").unwrap_or(0.0);
        print!("\rmouth {} {:.2}", meter(open, 30), open);
        let _ = std::io::stdout().flush();
    }

    /// Keep updating for `duration`
    fn idle(&mut self, sync: &MotionSync<CpalBackend>, duration: Duration) {
        let until = Instant::now() + duration;
        while Instant::now() < until {
            self.step(sync);
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.fps == 0 || args.fps > 240 {
        anyhow::bail!("Frame rate must be between 1 and 240");
    }
    if args.volume.is_some_and(|v| !v.is_finite()) {
        anyhow::bail!("Volume must be a finite number");
    }

    let config = match &args.config {
        Some(path) => SyncConfig::load_from(path)?,
        None => motionsync_core::config::load(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let (_output, backend) = output::open()?;
    info!("Audio output at {} Hz", backend.sample_rate());

    let engine = Arc::new(EngineRuntime::new(LevelEngineFactory));
    let mut sync = MotionSync::new(backend, engine, config.clone());
    let mut frames = FrameLoop::new(args.fps);
    let fetcher = DefaultFetcher::new();
    let loader = AudioLoader::new(fetcher.clone());

    match (&args.settings, &args.motion_sync) {
        (Some(location), _) => {
            let bytes = runtime.block_on(fetcher.fetch(location))?;
            let settings = ModelSettings::from_slice(&bytes, location.as_str())?;
            let source = runtime.block_on(sync.load_motion_sync(
                &settings,
                &fetcher,
                &frames.model,
                &mut frames.hooks,
            ))?;
            info!("Sync configuration: {:?}", source);
        }
        (None, Some(url)) => {
            let source = runtime.block_on(sync.load_motion_sync_from_url(
                url,
                &fetcher,
                &frames.model,
                &mut frames.hooks,
            ))?;
            info!("Sync configuration: {:?}", source);
        }
        (None, None) => sync.load_default_motion_sync(&frames.model, &mut frames.hooks)?,
    }

    if let Some(volume) = args.volume {
        sync.set_volume(volume);
    }

    if args.queue {
        for input in &args.inputs {
            sync.append_play(loader.spawn_segment(runtime.handle(), input.as_str()));
        }
        loop {
            frames.step(&sync);
            let controller = sync.lock();
            if !controller.is_playing() && controller.queued() == 0 {
                break;
            }
        }
    } else {
        for input in &args.inputs {
            let play = sync.play(&loader, input.as_str(), true, &mut frames.model);
            let mut completion = match runtime.block_on(play) {
                Ok(completion) => completion,
                Err(e) => {
                    warn!("Skipping {}: {}", input, e);
                    continue;
                }
            };
            while completion.try_outcome().is_none() {
                frames.step(&sync);
            }
        }
    }

    // Let the delayed mouth reset land
    frames.idle(&sync, config.mouth_reset_delay() + frames.frame_time * 2);
    println!();

    sync.unload(&mut frames.hooks);
    Ok(())
}
