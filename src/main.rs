// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! MASA - Multi-object Annotation Store and Playback
//!
//! Command line front end: inspect a dataset's annotations, play its video
//! while reporting the annotations of every emitted frame, or export the
//! annotated frames as images.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use masa::io::media;
use masa::playback::BoundingBoxSession;
use masa::{AnnotationStore, Dataset, PlaybackEngine, PlaybackEvent, Settings};

#[derive(Parser, Debug)]
#[command(name = "masa", version)]
struct Cli {
    /// Settings file (YAML or JSON).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the tracked objects and per-frame instance counts.
    Inspect(InspectArgs),
    /// Play the dataset video and log the annotations of each frame.
    Play(PlayArgs),
    /// Write every annotated frame to `data/.extracted/<frame>.jpg`.
    Extract(ExtractArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Dataset root holding `data/` and `annotations/`.
    dataset: PathBuf,

    /// Also write a snapshot of the store (.json or .yaml).
    #[arg(long)]
    export: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Dataset root holding `data/` and `annotations/`.
    dataset: PathBuf,

    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<usize>,

    /// Play from the last frame towards the first.
    #[arg(long, default_value_t = false)]
    backward: bool,

    /// Read frames from this file or image directory instead of the
    /// dataset video.
    #[arg(long)]
    source: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Dataset roots; ones without a single video or table are skipped.
    #[arg(required = true)]
    datasets: Vec<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(args, &settings),
        Command::Play(args) => cmd_play(args, settings),
        Command::Extract(args) => cmd_extract(args, &settings),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("load settings '{}'", path.display())),
        None => Ok(Settings::default()),
    }
}

fn open_store(dataset: &Dataset, settings: &Settings) -> Result<AnnotationStore> {
    dataset
        .open_store(settings.store.clone())
        .with_context(|| format!("open annotations '{}'", dataset.annotations().display()))
}

fn cmd_inspect(args: InspectArgs, settings: &Settings) -> Result<()> {
    let dataset = Dataset::locate(&args.dataset)
        .with_context(|| format!("locate dataset '{}'", args.dataset.display()))?;
    let store = open_store(&dataset, settings)?;

    print!("{store}");
    println!(
        "{} tracked objects, {} instances",
        store.len(),
        store.instance_count()
    );
    for (class, tracks) in store.object_class_mapping() {
        println!("  {class}: {} tracks", tracks.len());
    }
    for frame in store.frames() {
        println!("  frame {frame}: {} instances", store.instances_at(frame).len());
    }

    if let Some(out) = args.export {
        store
            .export(&out)
            .with_context(|| format!("write snapshot '{}'", out.display()))?;
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}

fn cmd_play(args: PlayArgs, mut settings: Settings) -> Result<()> {
    let dataset = Dataset::locate(&args.dataset)
        .with_context(|| format!("locate dataset '{}'", args.dataset.display()))?;
    let store = open_store(&dataset, &settings)?;

    let source = match &args.source {
        Some(path) => media::open_source(path),
        None => dataset.open_video(),
    }
    .context("open frame source")?;

    settings.engine.backward |= args.backward;
    let mut engine = PlaybackEngine::new(source, &settings.engine)?;
    engine.add_session(Box::new(BoundingBoxSession::new()));
    let events = engine.subscribe();
    let limit = args.frames.unwrap_or(usize::MAX);

    engine.play();
    let mut shown = 0;
    while shown < limit {
        let Ok(event) = events.recv() else {
            break;
        };
        match event {
            PlaybackEvent::Frame { index, frame } => {
                let instances = store.instances_at(index);
                log::info!(
                    "frame {index} ({}x{}): {} instances",
                    frame.width(),
                    frame.height(),
                    instances.len()
                );
                for ins in instances {
                    log::debug!(
                        "  track {} {} ({}, {}, {}, {})",
                        ins.track_id,
                        ins.object_class,
                        ins.x1,
                        ins.y1,
                        ins.x2,
                        ins.y2
                    );
                }
                shown += 1;
            }
            PlaybackEvent::EndOfStream(index) => {
                log::info!("end of stream at frame {index}");
                break;
            }
            PlaybackEvent::DirectionChanged(direction) => {
                log::info!("direction changed to {direction}");
            }
            PlaybackEvent::Fault(reason) => {
                engine.shutdown();
                anyhow::bail!("playback failed: {reason}");
            }
        }
    }
    engine.shutdown();
    eprintln!("played {shown} frames");
    Ok(())
}

fn cmd_extract(args: ExtractArgs, settings: &Settings) -> Result<()> {
    for root in &args.datasets {
        let dataset = match Dataset::locate(root) {
            Ok(dataset) => dataset,
            Err(e) => {
                log::warn!("skipping {}: {e}", root.display());
                continue;
            }
        };
        let report = dataset
            .extract(settings.store.clone())
            .with_context(|| format!("extract frames of '{}'", root.display()))?;
        eprintln!(
            "{}: wrote {} frames to {}",
            root.display(),
            report.written.len(),
            dataset.extracted_dir().display()
        );
    }
    Ok(())
}
