//! Perch Console
//!
//! Interactive harness for the perch engine. Runs the full behavior loop
//! against a real catalog (or a generated demo one) and lets you fake every
//! host signal from the keyboard while frames stream to the log.
//!
//! # Usage
//!
//! ```bash
//! # Generated demo catalog, verbose frames
//! RUST_LOG=debug perch-console --demo
//!
//! # A real catalog
//! perch-console --catalog assets/anims.txt --assets assets
//!
//! # Deterministic idle variety
//! perch-console --demo --seed 7
//! ```
//!
//! # Keys
//!
//! - `p` toggle pointer hold
//! - `t` send one keystroke (tap it repeatedly to reach the typing state)
//! - `f` toggle file drag hover
//! - `d` drop the hovered file
//! - `m` toggle simulated media playback
//! - `s` request a screenshot
//! - `q` / `Esc` quit

use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use futures::StreamExt;
use parking_lot::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use perch_core::{
    load_catalog, Engine, EngineConfig, EngineHandle, Frame, HostEvent, MediaProbe,
    PresentationError, PresentationSink, ScreenshotCapture, Settings,
};

#[derive(Debug, Parser)]
#[command(
    name = "perch-console",
    about = "Interactive console harness for the perch engine"
)]
struct Args {
    /// Catalog descriptor file
    #[arg(long, default_value = "assets/anims.txt")]
    catalog: PathBuf,

    /// Directory holding the frame images
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, env = "PERCH_SETTINGS")]
    settings: Option<PathBuf>,

    /// Generate a throwaway demo catalog instead of loading one
    #[arg(long)]
    demo: bool,

    /// Seed for the idle variety rolls
    #[arg(long)]
    seed: Option<u64>,
}

/// Logs each frame instead of drawing it.
struct PrintingSink;

impl PresentationSink for PrintingSink {
    fn present(&mut self, frame: &Frame) -> Result<(), PresentationError> {
        info!(
            frame = %frame.image.display(),
            hold_ms = frame.duration.as_millis() as u64,
            "frame"
        );
        Ok(())
    }
}

struct LoggingCapture;

impl ScreenshotCapture for LoggingCapture {
    fn capture(&mut self) {
        info!("screenshot captured (simulated)");
    }
}

/// Media probe backed by a flag the key loop flips.
struct SimulatedMediaProbe {
    playing: Arc<Mutex<Option<String>>>,
}

#[async_trait::async_trait]
impl MediaProbe for SimulatedMediaProbe {
    async fn playing_app(&self) -> anyhow::Result<Option<String>> {
        Ok(self.playing.lock().clone())
    }
}

/// Write a small catalog (descriptor plus empty placeholder assets) under
/// the system temp directory and return the descriptor and assets paths.
fn write_demo_catalog() -> anyhow::Result<(PathBuf, PathBuf)> {
    let dir = std::env::temp_dir().join("perch-demo");
    std::fs::create_dir_all(&dir)?;

    let clips: &[(&str, usize, u64)] = &[
        ("AnimMainIdle", 4, 150),
        ("AnimScreenshot", 1, 800),
        ("AnimCharacterMoveStart", 2, 80),
        ("AnimCharacterMoving", 4, 80),
        ("AnimCharacterMoveFinish", 2, 80),
        ("AnimDragFileStart", 2, 100),
        ("AnimDragFileProcessing", 4, 100),
        ("AnimDragFileFinish", 2, 100),
        ("AnimTypingStart", 2, 90),
        ("AnimTyping", 4, 90),
        ("AnimTypingStop", 2, 90),
        ("AnimMusicStart", 2, 120),
        ("AnimMusicLoop", 6, 120),
        ("AnimMusicFinish", 2, 120),
        ("AnimAfkStart", 2, 200),
        ("AnimAfkLoop", 4, 200),
        ("AnimAfkFinish", 2, 200),
        ("AnimIdle1", 3, 150),
        ("AnimIdle2", 3, 150),
        ("AnimIdleStart1", 2, 120),
        ("AnimIdleLoop1", 4, 120),
        ("AnimIdleFinish1", 2, 120),
    ];

    let mut descriptor = String::new();
    for (section, frames, hold) in clips {
        descriptor.push_str(section);
        descriptor.push('\n');
        for index in 0..*frames {
            let file = format!("{}_{index}.png", section.trim_start_matches("Anim"));
            std::fs::write(dir.join(&file), [])?;
            descriptor.push_str(&format!("{file} {hold}\n"));
        }
        descriptor.push('\n');
    }

    let descriptor_path = dir.join("anims.txt");
    std::fs::write(&descriptor_path, descriptor)?;
    Ok((descriptor_path, dir))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let (descriptor, assets) = if args.demo {
        let (descriptor, assets) = write_demo_catalog()?;
        info!(dir = %assets.display(), "demo catalog generated");
        (descriptor, assets)
    } else {
        (args.catalog.clone(), args.assets.clone())
    };

    let catalog = load_catalog(&descriptor, &assets)?;
    let settings_path = args.settings.clone().or_else(Settings::default_path);
    let settings = Settings::load_or_default(settings_path)?;

    let playing = Arc::new(Mutex::new(None));
    let probe = SimulatedMediaProbe {
        playing: Arc::clone(&playing),
    };

    let mut engine = Engine::new(
        catalog,
        settings,
        EngineConfig::default(),
        Box::new(PrintingSink),
    )
    .with_screenshot_capture(Box::new(LoggingCapture))
    .with_media_probe(Arc::new(probe));
    if let Some(seed) = args.seed {
        engine = engine.with_rng_seed(seed);
    }
    let handle = engine.handle();

    // Restore the terminal if the key loop panics.
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        original_hook(panic_info);
    }));

    if !io::IsTerminal::is_terminal(&io::stdin()) {
        anyhow::bail!("perch-console needs a terminal for its key input");
    }

    enable_raw_mode()?;
    let mut engine_task = tokio::spawn(engine.run());

    let loop_result = tokio::select! {
        outcome = &mut engine_task => {
            disable_raw_mode()?;
            outcome??;
            anyhow::bail!("engine stopped before the console asked it to");
        }
        result = key_loop(&handle, &playing) => result,
    };

    handle.send(HostEvent::Shutdown);
    let engine_outcome = engine_task.await;
    disable_raw_mode()?;

    engine_outcome??;
    loop_result
}

/// Translate key presses into host events until the user quits.
async fn key_loop(
    handle: &EngineHandle,
    playing: &Mutex<Option<String>>,
) -> anyhow::Result<()> {
    let mut events = EventStream::new();
    let mut pointer_held = false;
    let mut hovering = false;

    info!("keys: [p]ointer [t]ype [f]ile hover [d]rop [m]usic [s]creenshot [q]uit");

    while let Some(event) = events.next().await {
        let Event::Key(key) = event? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char('p') => {
                pointer_held = !pointer_held;
                handle.send(if pointer_held {
                    HostEvent::PointerPressed
                } else {
                    HostEvent::PointerReleased
                });
                info!(held = pointer_held, "pointer");
            }
            KeyCode::Char('t') => handle.send(HostEvent::Keystroke),
            KeyCode::Char('f') => {
                hovering = !hovering;
                handle.send(if hovering {
                    HostEvent::FileHoverStarted
                } else {
                    HostEvent::FileHoverEnded
                });
                info!(hovering, "file hover");
            }
            KeyCode::Char('d') => {
                hovering = false;
                handle.send(HostEvent::FileDropped);
                info!("file dropped");
            }
            KeyCode::Char('m') => {
                let mut playing = playing.lock();
                *playing = match playing.take() {
                    Some(_) => None,
                    None => Some("Spotify".to_string()),
                };
                info!(playing = playing.is_some(), "media");
            }
            KeyCode::Char('s') => handle.send(HostEvent::ScreenshotRequested),
            _ => {}
        }
    }
    Ok(())
}
