//! Signal Aggregation
//!
//! Raw host events (keystrokes, pointer edges, drag events, media poll
//! results) arrive asynchronously. This module turns them into the
//! debounced boolean snapshot the resolver consumes. Every tracker takes
//! the current time as a parameter, so tests drive the clock directly.

use std::time::Duration;

use tokio::time::Instant;

/// Per-keystroke recency window. A keystroke older than this no longer
/// counts as "recently typing".
pub const TYPING_WINDOW: Duration = Duration::from_millis(2000);

/// Continuous recency required before the typing mode may start.
pub const TYPING_ENTRY_DELAY: Duration = Duration::from_millis(2000);

/// Default away-from-keyboard timeout.
pub const AFK_TIMEOUT: Duration = Duration::from_secs(60);

/// Media application matched when the whitelist is empty.
pub const DEFAULT_MEDIA_APP: &str = "Spotify";

/// Boolean signal state, always sampled in full before each resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignalSnapshot {
    pub pointer_held: bool,
    pub file_hovering: bool,
    pub typing_active: bool,
    pub media_playing: bool,
    pub screenshot_requested: bool,
    pub afk_elapsed: bool,
}

/// Debounces raw keystrokes into the sustained `typing_active` signal.
///
/// A streak begins at the first keystroke after a lapse. The signal asserts
/// once the streak is `entry_delay` old with every gap inside `window`, and
/// drops on the first poll after the window lapses. A single stray
/// keystroke therefore never triggers the typing animation.
#[derive(Clone, Debug)]
pub struct TypingTracker {
    window: Duration,
    entry_delay: Duration,
    last_keystroke: Option<Instant>,
    streak_started: Option<Instant>,
    active: bool,
}

impl TypingTracker {
    pub fn new(window: Duration, entry_delay: Duration) -> Self {
        Self {
            window,
            entry_delay,
            last_keystroke: None,
            streak_started: None,
            active: false,
        }
    }

    pub fn record_keystroke(&mut self, now: Instant) {
        let lapsed = self
            .last_keystroke
            .map_or(true, |last| now.duration_since(last) > self.window);
        if lapsed {
            // New streak; entry must be earned again.
            self.streak_started = Some(now);
            self.active = false;
        }
        self.last_keystroke = Some(now);
    }

    /// Re-evaluate on the typing poll. Returns the current signal value.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.last_keystroke {
            Some(last) if now.duration_since(last) <= self.window => {
                if !self.active {
                    // Strictly longer than the entry delay: with the window
                    // and delay equal, a lone keystroke would otherwise
                    // activate on a poll landing exactly at the boundary.
                    let sustained = self
                        .streak_started
                        .is_some_and(|started| now.duration_since(started) > self.entry_delay);
                    if sustained {
                        self.active = true;
                    }
                }
            }
            _ => {
                self.active = false;
                self.streak_started = None;
            }
        }
        self.active
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new(TYPING_WINDOW, TYPING_ENTRY_DELAY)
    }
}

/// Tracks the most recent user-activity moment for AFK detection.
#[derive(Clone, Debug)]
pub struct ActivityMonitor {
    timeout: Duration,
    last_activity: Instant,
}

impl ActivityMonitor {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_activity: now,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    #[must_use]
    pub fn is_afk(&self, now: Instant) -> bool {
        self.idle_for(now) >= self.timeout
    }

    #[must_use]
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.duration_since(self.last_activity)
    }
}

/// Decides whether a playing-application identifier counts as media.
///
/// Case-insensitive substring match. An empty whitelist falls back to the
/// single built-in [`DEFAULT_MEDIA_APP`] match.
#[derive(Clone, Debug)]
pub struct MediaFilter {
    patterns: Vec<String>,
}

impl MediaFilter {
    pub fn new(whitelist: &[String]) -> Self {
        let mut patterns: Vec<String> = whitelist
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        if patterns.is_empty() {
            patterns.push(DEFAULT_MEDIA_APP.to_lowercase());
        }
        Self { patterns }
    }

    #[must_use]
    pub fn matches(&self, app_id: &str) -> bool {
        let app = app_id.to_lowercase();
        self.patterns.iter().any(|p| app.contains(p.as_str()))
    }
}
