//! Media polling task.
//!
//! Asking the platform who is playing audio can block on an out-of-process
//! query, so it never runs on the engine loop. This task polls the probe on
//! its own interval and reports every answer through the engine's event
//! channel; the engine dedupes and applies its whitelist there.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{interval, MissedTickBehavior};

use crate::engine::HostEvent;
use crate::hooks::MediaProbe;

pub struct MediaPollTask {
    probe: Arc<dyn MediaProbe>,
    events: UnboundedSender<HostEvent>,
    poll_interval: Duration,
}

impl MediaPollTask {
    pub fn new(
        probe: Arc<dyn MediaProbe>,
        events: UnboundedSender<HostEvent>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            probe,
            events,
            poll_interval,
        }
    }

    /// Poll until the engine side of the channel goes away.
    pub async fn run(self) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            // A failing probe reads as silence; the next poll retries.
            let app = match self.probe.playing_app().await {
                Ok(app) => app,
                Err(error) => {
                    tracing::debug!(%error, "media probe failed");
                    None
                }
            };

            if self.events.send(HostEvent::MediaApp(app)).is_err() {
                tracing::debug!("engine is gone; media poll stopping");
                break;
            }
        }
    }
}
