//! Perch Core - Behavior Resolution and Playback for a Desktop Companion
//!
//! This crate decides which animation clip a desktop companion character
//! shows at every moment, and drives that clip frame by frame. It is
//! completely independent of any window system: hosts feed it input edges
//! and hand it a sink to draw through.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Host process                         │
//! │   pointer / keyboard / file drag / screenshot UI / media     │
//! └───────────────┬──────────────────────────────▲───────────────┘
//!                 │ HostEvent                    │ Frame
//! ┌───────────────▼──────────────────────────────┴───────────────┐
//! │                        Engine task                           │
//! │  ┌───────────┐  ┌──────────┐  ┌──────────┐  ┌─────────────┐  │
//! │  │  Signal   │  │ Behavior │  │ Playback │  │ Idle variety│  │
//! │  │ snapshot  │─▶│ resolver │─▶│  driver  │  │  scheduler  │  │
//! │  └───────────┘  └──────────┘  └──────────┘  └─────────────┘  │
//! │        ▲                                                     │
//! │        │ MediaApp events                                     │
//! │  ┌─────┴──────┐                                              │
//! │  │ Media poll │  (only other task)                           │
//! │  └────────────┘                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Engine`]: owns all state and runs the cooperative loop
//! - [`EngineHandle`]: cloneable sender for [`HostEvent`]s
//! - [`Catalog`]: named clips loaded from a descriptor file
//! - [`PresentationSink`]: where frames go
//! - [`Settings`]: the persistent user-facing knobs
//!
//! # Quick Start
//!
//! ```ignore
//! use perch_core::{load_catalog, Engine, EngineConfig, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalog = load_catalog("assets/anims.txt", "assets")?;
//!     let settings = Settings::load_or_default(Settings::default_path())?;
//!     let engine = Engine::new(catalog, settings, EngineConfig::default(), sink);
//!     let handle = engine.handle();
//!     // forward window-system events through `handle`...
//!     engine.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`catalog`]: clips, frames, clip families and name classification
//! - [`descriptor`]: the plain-text catalog format and its loader
//! - [`signals`]: snapshot of host inputs plus debouncing and filtering
//! - [`resolver`]: the state machine choosing what plays next
//! - [`playback`]: frame advancement for the active clip
//! - [`engine`]: the task tying all of it together
//! - [`media`]: polling task for the platform media probe
//! - [`hooks`]: traits the host implements
//! - [`settings`]: persistent configuration

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod descriptor;
pub mod engine;
pub mod hooks;
pub mod media;
pub mod playback;
pub mod resolver;
pub mod settings;
pub mod signals;

// Re-exports for convenience
pub use catalog::{Catalog, Clip, Frame, MAIN_IDLE, SCREENSHOT};
pub use descriptor::{load_catalog, CatalogError};
pub use engine::{Engine, EngineConfig, EngineError, EngineHandle, HostEvent};
pub use hooks::{
    MediaProbe, NoopCapture, PresentationError, PresentationSink, ScreenshotCapture,
};
pub use playback::{PlaybackError, TickOutcome};
pub use resolver::{Mode, VarietyConfig};
pub use settings::{Settings, SettingsError};
pub use signals::SignalSnapshot;
