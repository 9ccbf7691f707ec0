//! Engine task: one cooperative loop that owns every piece of mutable
//! state and multiplexes host events against its own timers.
//!
//! The loop has five wake sources, checked in priority order: host events,
//! the frame deadline, the idle-variety deadline, the typing poll and the
//! AFK poll. Everything runs on the engine's task; the only other task is
//! the media poller, which reports back through the same event channel.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};

use crate::catalog::{Catalog, MAIN_IDLE, SCREENSHOT};
use crate::hooks::{MediaProbe, NoopCapture, PresentationSink, ScreenshotCapture};
use crate::media::MediaPollTask;
use crate::playback::{PlaybackDriver, PlaybackError, TickOutcome};
use crate::resolver::{Mode, Resolver, VarietyConfig};
use crate::settings::Settings;
use crate::signals::{
    ActivityMonitor, MediaFilter, SignalSnapshot, TypingTracker, AFK_TIMEOUT, TYPING_ENTRY_DELAY,
    TYPING_WINDOW,
};

/// Raw input reported by the host process.
///
/// Events carry no timestamps; the engine stamps them on receipt. Hosts
/// should forward edges as they happen and leave debouncing to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    PointerPressed,
    PointerReleased,
    Keystroke,
    FileHoverStarted,
    FileHoverEnded,
    FileDropped,
    /// Latest media probe answer; `None` means silence.
    MediaApp(Option<String>),
    ScreenshotRequested,
    Shutdown,
}

/// Cloneable handle for feeding events into a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    events: UnboundedSender<HostEvent>,
}

impl EngineHandle {
    pub fn send(&self, event: HostEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("engine is gone; dropping event");
        }
    }
}

/// Timing knobs. Defaults match the production behavior; [`EngineConfig::for_testing`]
/// compresses everything so paused-clock tests stay fast.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub typing_window: Duration,
    pub typing_entry_delay: Duration,
    pub typing_poll_interval: Duration,
    pub afk_timeout: Duration,
    pub afk_poll_interval: Duration,
    pub media_poll_interval: Duration,
    pub variety: VarietyConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            typing_window: TYPING_WINDOW,
            typing_entry_delay: TYPING_ENTRY_DELAY,
            typing_poll_interval: Duration::from_millis(100),
            afk_timeout: AFK_TIMEOUT,
            afk_poll_interval: Duration::from_secs(1),
            media_poll_interval: Duration::from_millis(500),
            variety: VarietyConfig::default(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            typing_window: Duration::from_millis(200),
            typing_entry_delay: Duration::from_millis(200),
            typing_poll_interval: Duration::from_millis(10),
            afk_timeout: Duration::from_millis(500),
            afk_poll_interval: Duration::from_millis(50),
            media_poll_interval: Duration::from_millis(50),
            variety: VarietyConfig::default(),
        }
    }

    #[must_use]
    pub fn with_afk_timeout(mut self, timeout: Duration) -> Self {
        self.afk_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_variety(mut self, variety: VarietyConfig) -> Self {
        self.variety = variety;
        self
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The catalog has no MainIdle, so there is no clip the engine can
    /// always fall back to.
    #[error("catalog has no MainIdle clip to fall back to")]
    MissingMainIdle,
    /// The fallback itself failed to play; nothing sensible remains.
    #[error("presenting {clip:?}")]
    Presentation {
        clip: String,
        #[source]
        source: PlaybackError,
    },
}

/// Whether a requested clip went up, or MainIdle took its place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadOutcome {
    Loaded,
    Substituted,
}

pub struct Engine {
    catalog: Catalog,
    settings: Settings,
    config: EngineConfig,
    sink: Box<dyn PresentationSink>,
    capture: Box<dyn ScreenshotCapture>,
    media_probe: Option<Arc<dyn MediaProbe>>,
    events: UnboundedReceiver<HostEvent>,
    handle: EngineHandle,
    resolver: Resolver,
    driver: PlaybackDriver,
    signals: SignalSnapshot,
    typing: TypingTracker,
    activity: ActivityMonitor,
    media_filter: MediaFilter,
    rng: StdRng,
    /// When the current frame's hold expires.
    frame_deadline: Instant,
    /// Armed only while neutral; `None` keeps the select branch disabled.
    variety_deadline: Option<Instant>,
}

impl Engine {
    pub fn new(
        catalog: Catalog,
        settings: Settings,
        config: EngineConfig,
        sink: Box<dyn PresentationSink>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let now = Instant::now();
        Self {
            resolver: Resolver::new(config.variety),
            driver: PlaybackDriver::new(),
            signals: SignalSnapshot::default(),
            typing: TypingTracker::new(config.typing_window, config.typing_entry_delay),
            activity: ActivityMonitor::new(config.afk_timeout, now),
            media_filter: MediaFilter::new(&settings.media_app_whitelist),
            rng: StdRng::from_entropy(),
            capture: Box::new(NoopCapture),
            media_probe: None,
            events: rx,
            handle: EngineHandle { events: tx },
            frame_deadline: now,
            variety_deadline: None,
            catalog,
            settings,
            config,
            sink,
        }
    }

    #[must_use]
    pub fn with_screenshot_capture(mut self, capture: Box<dyn ScreenshotCapture>) -> Self {
        self.capture = capture;
        self
    }

    #[must_use]
    pub fn with_media_probe(mut self, probe: Arc<dyn MediaProbe>) -> Self {
        self.media_probe = Some(probe);
        self
    }

    /// Deterministic idle-variety rolls, for tests and demos.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Run until a [`HostEvent::Shutdown`] arrives. Consumes the engine;
    /// settings are persisted on the way out.
    pub async fn run(mut self) -> Result<(), EngineError> {
        if !self.catalog.contains(MAIN_IDLE) {
            return Err(EngineError::MissingMainIdle);
        }

        let media_task = self.spawn_media_task();

        let first = self.resolver.initial_clip(&mut self.signals, &self.catalog);
        self.apply_transition(&first)?;
        tracing::info!(clips = self.catalog.len(), first = %first, "engine running");

        let mut typing_poll = interval(self.config.typing_poll_interval);
        typing_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut afk_poll = interval(self.config.afk_poll_interval);
        afk_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let variety_at = self.variety_deadline.unwrap_or_else(far_future);
            tokio::select! {
                biased;

                event = self.events.recv() => {
                    match event {
                        Some(HostEvent::Shutdown) | None => break,
                        Some(event) => self.on_event(event)?,
                    }
                }
                () = sleep_until(self.frame_deadline) => {
                    self.on_frame_due()?;
                }
                () = sleep_until(variety_at), if self.variety_deadline.is_some() => {
                    self.on_variety_due()?;
                }
                _ = typing_poll.tick() => {
                    self.on_typing_poll()?;
                }
                _ = afk_poll.tick() => {
                    self.on_afk_poll()?;
                }
            }
        }

        if let Some(task) = media_task {
            task.abort();
        }
        if let Err(error) = self.settings.persist() {
            tracing::warn!(%error, "failed to persist settings on shutdown");
        }
        tracing::info!("engine stopped");
        Ok(())
    }

    fn spawn_media_task(&self) -> Option<tokio::task::JoinHandle<()>> {
        if !self.settings.media_listening_enabled {
            tracing::debug!("media listening disabled");
            return None;
        }
        let probe = self.media_probe.clone()?;
        let task = MediaPollTask::new(
            probe,
            self.handle.events.clone(),
            self.config.media_poll_interval,
        );
        Some(tokio::spawn(task.run()))
    }

    fn on_event(&mut self, event: HostEvent) -> Result<(), EngineError> {
        tracing::trace!(?event, "host event");
        match event {
            HostEvent::PointerPressed => {
                self.note_activity();
                self.signals.pointer_held = true;
                self.after_signal_change()?;
            }
            HostEvent::PointerReleased => {
                self.note_activity();
                self.signals.pointer_held = false;
                self.after_signal_change()?;
            }
            HostEvent::Keystroke => {
                self.note_activity();
                self.typing.record_keystroke(Instant::now());
                // Activation waits for the typing poll; the keystroke edge
                // itself only matters as AFK-clearing activity.
                self.after_signal_change()?;
            }
            HostEvent::FileHoverStarted => {
                self.note_activity();
                self.signals.file_hovering = true;
                self.after_signal_change()?;
            }
            HostEvent::FileHoverEnded => {
                self.note_activity();
                self.signals.file_hovering = false;
                self.after_signal_change()?;
            }
            HostEvent::FileDropped => {
                self.note_activity();
                self.signals.file_hovering = false;
                self.after_signal_change()?;
            }
            HostEvent::MediaApp(app) => {
                let playing = app.as_deref().is_some_and(|app| self.media_filter.matches(app));
                if playing != self.signals.media_playing {
                    tracing::debug!(app = ?app, playing, "media state flipped");
                    self.signals.media_playing = playing;
                    self.after_signal_change()?;
                }
            }
            HostEvent::ScreenshotRequested => {
                self.note_activity();
                if self.catalog.contains(SCREENSHOT) {
                    self.signals.screenshot_requested = true;
                    self.after_signal_change()?;
                } else {
                    // No pose clip to strike; capture right away.
                    self.capture.capture();
                }
            }
            // Consumed by the run loop before dispatch.
            HostEvent::Shutdown => {}
        }
        Ok(())
    }

    /// Any direct user interaction counts against the AFK clock.
    fn note_activity(&mut self) {
        self.activity.touch(Instant::now());
        self.signals.afk_elapsed = false;
    }

    fn on_frame_due(&mut self) -> Result<(), EngineError> {
        match self.driver.tick(
            &self.catalog,
            &mut self.resolver,
            &self.signals,
            self.sink.as_mut(),
        ) {
            Ok(TickOutcome::Advanced(hold)) => {
                self.frame_deadline = Instant::now() + hold;
                Ok(())
            }
            Ok(TickOutcome::Finished(finished)) => {
                if finished == SCREENSHOT {
                    // The pose ran to completion; its last frame is still up.
                    self.capture.capture();
                }
                let next =
                    self.resolver
                        .on_clip_finished(&finished, &mut self.signals, &self.catalog);
                self.apply_transition(&next)
            }
            Err(source) => {
                if self.driver.current_clip() == MAIN_IDLE {
                    return Err(EngineError::Presentation {
                        clip: MAIN_IDLE.to_string(),
                        source,
                    });
                }
                tracing::warn!(
                    clip = self.driver.current_clip(),
                    error = %source,
                    "frame advance failed; falling back to MainIdle"
                );
                self.fallback_to_main_idle()?;
                self.settle()?;
                self.sync_variety_timer();
                Ok(())
            }
        }
    }

    fn on_variety_due(&mut self) -> Result<(), EngineError> {
        self.variety_deadline = None;
        if let Some(clip) = self.resolver.on_variety_timer(&self.catalog, &mut self.rng) {
            self.apply_transition(&clip)
        } else {
            // Roll came up empty; stay on MainIdle and re-arm.
            self.sync_variety_timer();
            Ok(())
        }
    }

    fn on_typing_poll(&mut self) -> Result<(), EngineError> {
        let active = self.typing.poll(Instant::now());
        if active != self.signals.typing_active {
            tracing::debug!(active, "typing state flipped");
            self.signals.typing_active = active;
            self.after_signal_change()?;
        }
        Ok(())
    }

    fn on_afk_poll(&mut self) -> Result<(), EngineError> {
        let afk = self.activity.is_afk(Instant::now());
        if afk != self.signals.afk_elapsed {
            tracing::debug!(afk, "afk state flipped");
            self.signals.afk_elapsed = afk;
            self.after_signal_change()?;
        }
        Ok(())
    }

    /// Load `name` and let any further immediate transitions play out.
    fn apply_transition(&mut self, name: &str) -> Result<(), EngineError> {
        self.load_or_fallback(name)?;
        self.settle()?;
        self.sync_variety_timer();
        Ok(())
    }

    fn after_signal_change(&mut self) -> Result<(), EngineError> {
        self.settle()?;
        self.sync_variety_timer();
        Ok(())
    }

    /// Drain immediate transitions until the resolver has nothing more to
    /// say about the current snapshot. Converges because every immediate
    /// target is either uninterruptible or a governed clip that defers;
    /// a load that fell back to MainIdle ends the drain, since the resolver
    /// was reset and would re-request the clip that just failed.
    fn settle(&mut self) -> Result<(), EngineError> {
        while let Some(next) = self.resolver.on_signals_changed(
            self.driver.current_clip(),
            &mut self.signals,
            &self.catalog,
        ) {
            if self.load_or_fallback(&next)? == LoadOutcome::Substituted {
                break;
            }
        }
        Ok(())
    }

    fn load_or_fallback(&mut self, name: &str) -> Result<LoadOutcome, EngineError> {
        match self.driver.load(&self.catalog, name, self.sink.as_mut()) {
            Ok(hold) => {
                self.frame_deadline = Instant::now() + hold;
                Ok(LoadOutcome::Loaded)
            }
            Err(source) if name == MAIN_IDLE => Err(EngineError::Presentation {
                clip: name.to_string(),
                source,
            }),
            Err(error) => {
                tracing::warn!(clip = name, %error, "clip failed to load; falling back to MainIdle");
                self.fallback_to_main_idle()?;
                Ok(LoadOutcome::Substituted)
            }
        }
    }

    fn fallback_to_main_idle(&mut self) -> Result<(), EngineError> {
        self.resolver.reset_to_neutral();
        match self.driver.load(&self.catalog, MAIN_IDLE, self.sink.as_mut()) {
            Ok(hold) => {
                self.frame_deadline = Instant::now() + hold;
                Ok(())
            }
            Err(source) => Err(EngineError::Presentation {
                clip: MAIN_IDLE.to_string(),
                source,
            }),
        }
    }

    /// The variety timer is armed exactly while the engine sits on MainIdle,
    /// measured from the moment it settles there.
    fn sync_variety_timer(&mut self) {
        if self.resolver.mode() != Mode::None {
            self.variety_deadline = None;
        } else if self.variety_deadline.is_none() {
            self.variety_deadline = Some(Instant::now() + self.settings.idle_delay());
        }
    }
}

fn far_future() -> Instant {
    // Effectively never; tokio timers handle deadlines this far out fine.
    Instant::now() + Duration::from_secs(86_400 * 365 * 30)
}
