//! Playback driver: frame bookkeeping for the active clip.
//!
//! The driver owns exactly two pieces of state, the active clip name and a
//! frame index. It publishes frames to the [`PresentationSink`] and reports
//! how long each one should stay on screen; the engine turns that into its
//! frame deadline. All looping and transition policy lives in the resolver,
//! which the driver consults only at the end of a frame sequence.

use std::time::Duration;

use thiserror::Error;

use crate::catalog::Catalog;
use crate::hooks::{PresentationError, PresentationSink};
use crate::resolver::{LoopVerdict, Resolver};
use crate::signals::SignalSnapshot;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("clip {name:?} is not in the catalog")]
    MissingClip { name: String },
    #[error("presenting frame {index} of {clip:?}")]
    Presentation {
        clip: String,
        index: usize,
        #[source]
        source: PresentationError,
    },
}

/// What a frame tick produced.
#[derive(Debug)]
pub enum TickOutcome {
    /// A frame was published; hold it this long.
    Advanced(Duration),
    /// The named clip ran out of frames and its wrap was declined.
    Finished(String),
}

pub struct PlaybackDriver {
    clip: String,
    index: usize,
}

impl PlaybackDriver {
    pub fn new() -> Self {
        Self {
            clip: String::new(),
            index: 0,
        }
    }

    #[must_use]
    pub fn current_clip(&self) -> &str {
        &self.clip
    }

    #[must_use]
    pub fn frame_index(&self) -> usize {
        self.index
    }

    /// Switch to `name`, publish its first frame and return that frame's
    /// hold duration.
    pub fn load(
        &mut self,
        catalog: &Catalog,
        name: &str,
        sink: &mut dyn PresentationSink,
    ) -> Result<Duration, PlaybackError> {
        let clip = catalog.get(name).ok_or_else(|| PlaybackError::MissingClip {
            name: name.to_string(),
        })?;
        self.clip = name.to_string();
        self.index = 0;
        // Catalog clips are never empty.
        let frame = &clip.frames[0];
        sink.present(frame).map_err(|source| PlaybackError::Presentation {
            clip: name.to_string(),
            index: 0,
            source,
        })?;
        tracing::debug!(clip = name, frames = clip.len(), "clip loaded");
        Ok(frame.duration)
    }

    /// Advance one frame. At the end of the sequence the resolver decides
    /// between wrapping to frame 0 and finishing the clip.
    pub fn tick(
        &mut self,
        catalog: &Catalog,
        resolver: &mut Resolver,
        signals: &SignalSnapshot,
        sink: &mut dyn PresentationSink,
    ) -> Result<TickOutcome, PlaybackError> {
        let clip = catalog.get(&self.clip).ok_or_else(|| PlaybackError::MissingClip {
            name: self.clip.clone(),
        })?;

        self.index += 1;
        if self.index >= clip.len() {
            match resolver.wrap_decision(&self.clip, signals) {
                LoopVerdict::Wrap => self.index = 0,
                LoopVerdict::Finish => {
                    // Hold the last frame; the engine loads a successor next.
                    self.index = clip.len() - 1;
                    return Ok(TickOutcome::Finished(self.clip.clone()));
                }
            }
        }

        let frame = &clip.frames[self.index];
        sink.present(frame).map_err(|source| PlaybackError::Presentation {
            clip: self.clip.clone(),
            index: self.index,
            source,
        })?;
        Ok(TickOutcome::Advanced(frame.duration))
    }
}

impl Default for PlaybackDriver {
    fn default() -> Self {
        Self::new()
    }
}
