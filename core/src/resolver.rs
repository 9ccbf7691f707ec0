//! Behavior Resolver
//!
//! The decision component. Given the clip that just finished (or a signal
//! edge) and the current snapshot, it chooses the next clip and maintains
//! the bookkeeping: the active [`Mode`], the in-flight idle excursion and
//! its loop-repeat counter.
//!
//! # Design
//!
//! Transitions happen at three kinds of moments:
//! - **completion**: a clip reached its last frame and was not wrapped;
//!   triad traversal and priority re-evaluation run here
//! - **pass end**: a governed body asks whether it may wrap for another
//!   pass; declining converts the pass end into a completion
//! - **edge**: the snapshot changed; only a few edges act immediately
//!   (dispatch from neutral, AFK truncation, pointer-down cutting an idle
//!   loop short) and everything else waits for a cooperative boundary
//!
//! Priority, highest first: AFK → screenshot → file drag → typing → music →
//! pointer drag → idle variety → MainIdle. AFK additionally requires the
//! neutral state to enter at all.

use rand::rngs::StdRng;
use rand::Rng;

use crate::catalog::{
    classify, is_uninterruptible, Catalog, ClipKind, Family, Role, MAIN_IDLE, SCREENSHOT,
};
use crate::signals::SignalSnapshot;

/// Which signal currently owns the character.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    None,
    Afk,
    Screenshot,
    FileDrag,
    Typing,
    Music,
    PointerDrag,
    IdleExcursion,
}

/// Randomized idle-variety tuning. Percentages are integer chances out of
/// 100, matching the resolver's single `0..100` roll per branch.
#[derive(Clone, Copy, Debug)]
pub struct VarietyConfig {
    /// Chance of a one-off idle clip per scheduler firing.
    pub one_off_percent: u32,
    /// Chance of a Start/Loop/Finish excursion when the one-off roll
    /// misses. Drawn as an independent second roll.
    pub sequence_percent: u32,
    /// Loop passes an idle excursion plays before moving to its Finish.
    pub max_loop_repeats: u32,
}

impl Default for VarietyConfig {
    fn default() -> Self {
        Self {
            one_off_percent: 20,
            sequence_percent: 10,
            max_loop_repeats: 1,
        }
    }
}

/// In-flight randomized idle excursion.
#[derive(Clone, Copy, Debug)]
struct IdleSequence {
    family: u32,
    /// Pass number currently playing; 1-based once the Body is entered.
    repeats: u32,
}

/// Verdict for the active clip reaching the end of its frame sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopVerdict {
    /// Replay from frame 0.
    Wrap,
    /// Treat the pass end as completion and resolve the next clip.
    Finish,
}

pub struct Resolver {
    mode: Mode,
    idle_seq: Option<IdleSequence>,
    variety: VarietyConfig,
}

impl Resolver {
    pub fn new(variety: VarietyConfig) -> Self {
        Self {
            mode: Mode::None,
            idle_seq: None,
            variety,
        }
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Choose the very first clip from the initial snapshot.
    pub fn initial_clip(&mut self, signals: &mut SignalSnapshot, catalog: &Catalog) -> String {
        self.evaluate(signals, catalog)
    }

    /// Resolve the successor of a clip that ran to completion.
    pub fn on_clip_finished(
        &mut self,
        finished: &str,
        signals: &mut SignalSnapshot,
        catalog: &Catalog,
    ) -> String {
        match classify(finished) {
            ClipKind::Member(family, Role::Start) => self.after_start(family, signals, catalog),
            ClipKind::Member(family, Role::Body) => self.after_body(family, signals, catalog),
            // Finish members, one-shots and anything unknown fall through to
            // full re-evaluation. MainIdle never completes; defensive.
            _ => self.evaluate(signals, catalog),
        }
    }

    /// Pass-end verdict for the active clip. Wrapping an idle body counts
    /// one more repeat.
    pub fn wrap_decision(&mut self, current: &str, signals: &SignalSnapshot) -> LoopVerdict {
        match classify(current) {
            // Neutral loop: exits happen on edges or the variety timer.
            ClipKind::MainIdle => LoopVerdict::Wrap,
            ClipKind::Member(Family::Idle(n), Role::Body) => {
                if preempted(Family::Idle(n), signals) {
                    return LoopVerdict::Finish;
                }
                match self.idle_seq.as_mut() {
                    Some(seq)
                        if seq.family == n && seq.repeats < self.variety.max_loop_repeats =>
                    {
                        seq.repeats += 1;
                        LoopVerdict::Wrap
                    }
                    _ => LoopVerdict::Finish,
                }
            }
            ClipKind::Member(family, Role::Body) => {
                if self.family_signal(family, signals) && !preempted(family, signals) {
                    LoopVerdict::Wrap
                } else {
                    LoopVerdict::Finish
                }
            }
            _ => LoopVerdict::Finish,
        }
    }

    /// React to a snapshot change. Returns a clip to load right now, or
    /// `None` when the change must wait for a cooperative boundary.
    pub fn on_signals_changed(
        &mut self,
        current: &str,
        signals: &mut SignalSnapshot,
        catalog: &Catalog,
    ) -> Option<String> {
        // While away, user activity truncates the in-flight AFK clip
        // immediately; every other transition stays suppressed.
        if self.mode == Mode::Afk {
            if signals.afk_elapsed {
                return None;
            }
            let finish = Family::Afk.member(Role::Finish);
            if current == finish {
                return None;
            }
            if catalog.contains(&finish) {
                return Some(finish);
            }
            return Some(self.evaluate(signals, catalog));
        }

        // Committed one-shots run to completion; changes wait.
        if is_uninterruptible(current) {
            return None;
        }

        match self.mode {
            // Neutral: dispatch the highest-priority active signal now.
            Mode::None => self.best_entry(signals, catalog, true),
            Mode::IdleExcursion => {
                // Pointer-down may cut the idle loop short, mid-pass.
                let on_idle_body =
                    matches!(classify(current), ClipKind::Member(Family::Idle(_), Role::Body));
                if on_idle_body && signals.pointer_held {
                    if let Some(clip) = entry_clip(Family::PointerDrag, catalog) {
                        self.mode = Mode::PointerDrag;
                        self.idle_seq = None;
                        return Some(clip);
                    }
                }
                None
            }
            // Governed bodies exit cooperatively at pass boundaries.
            _ => None,
        }
    }

    /// Roll the randomized idle variety. `None` means stay on MainIdle and
    /// let the scheduler re-arm.
    pub fn on_variety_timer(&mut self, catalog: &Catalog, rng: &mut StdRng) -> Option<String> {
        if self.mode != Mode::None {
            return None;
        }

        let one_offs = catalog.one_off_idles();
        if rng.gen_range(0..100) < self.variety.one_off_percent && !one_offs.is_empty() {
            let clip = one_offs[rng.gen_range(0..one_offs.len())].clone();
            self.mode = Mode::IdleExcursion;
            tracing::debug!(clip = %clip, "idle variety: one-off");
            return Some(clip);
        }

        let families = catalog.idle_families();
        if rng.gen_range(0..100) < self.variety.sequence_percent && !families.is_empty() {
            let family = families[rng.gen_range(0..families.len())];
            self.mode = Mode::IdleExcursion;
            self.idle_seq = Some(IdleSequence { family, repeats: 0 });
            let start = Family::Idle(family).member(Role::Start);
            tracing::debug!(clip = %start, "idle variety: excursion");
            return Some(start);
        }

        None
    }

    /// Force neutral bookkeeping. Used when the engine substitutes MainIdle
    /// after a playback failure.
    pub fn reset_to_neutral(&mut self) {
        self.mode = Mode::None;
        self.idle_seq = None;
    }

    // ------------------------------------------------------------------

    fn after_start(
        &mut self,
        family: Family,
        signals: &mut SignalSnapshot,
        catalog: &Catalog,
    ) -> String {
        if preempted(family, signals) {
            return self.evaluate(signals, catalog);
        }
        if self.family_signal(family, signals) {
            let body = family.member(Role::Body);
            if catalog.contains(&body) {
                if matches!(family, Family::Idle(_)) {
                    if let Some(seq) = self.idle_seq.as_mut() {
                        seq.repeats = 1;
                    }
                }
                return body;
            }
        }
        // Signal gone, or no body at all: skip ahead rather than stall.
        let finish = family.member(Role::Finish);
        if catalog.contains(&finish) {
            return finish;
        }
        self.evaluate(signals, catalog)
    }

    fn after_body(
        &mut self,
        family: Family,
        signals: &mut SignalSnapshot,
        catalog: &Catalog,
    ) -> String {
        // A body only completes when its wrap was declined: the owning
        // signal dropped, idle repeats ran out, or a higher-priority signal
        // is pending. The preempted case goes straight to the winner and
        // skips this family's Finish.
        if preempted(family, signals) {
            return self.evaluate(signals, catalog);
        }
        let finish = family.member(Role::Finish);
        if catalog.contains(&finish) {
            return finish;
        }
        self.evaluate(signals, catalog)
    }

    /// Full priority evaluation. AFK is absent on purpose: it enters only
    /// from neutral, via [`Resolver::on_signals_changed`], once the engine
    /// has settled back onto MainIdle.
    fn evaluate(&mut self, signals: &mut SignalSnapshot, catalog: &Catalog) -> String {
        if let Some(clip) = self.best_entry(signals, catalog, false) {
            return clip;
        }
        self.mode = Mode::None;
        self.idle_seq = None;
        MAIN_IDLE.to_string()
    }

    /// Highest-priority active signal that can enter a clip, if any.
    /// Consumes the screenshot latch when it wins.
    fn best_entry(
        &mut self,
        signals: &mut SignalSnapshot,
        catalog: &Catalog,
        allow_afk: bool,
    ) -> Option<String> {
        if allow_afk && signals.afk_elapsed {
            if let Some(clip) = entry_clip(Family::Afk, catalog) {
                self.mode = Mode::Afk;
                self.idle_seq = None;
                return Some(clip);
            }
        }
        if signals.screenshot_requested && catalog.contains(SCREENSHOT) {
            signals.screenshot_requested = false;
            self.mode = Mode::Screenshot;
            self.idle_seq = None;
            return Some(SCREENSHOT.to_string());
        }
        let ranked = [
            (signals.file_hovering, Family::FileDrag, Mode::FileDrag),
            (signals.typing_active, Family::Typing, Mode::Typing),
            (signals.media_playing, Family::Music, Mode::Music),
            (signals.pointer_held, Family::PointerDrag, Mode::PointerDrag),
        ];
        for (active, family, mode) in ranked {
            if !active {
                continue;
            }
            if let Some(clip) = entry_clip(family, catalog) {
                self.mode = mode;
                self.idle_seq = None;
                return Some(clip);
            }
        }
        None
    }

    fn family_signal(&self, family: Family, signals: &SignalSnapshot) -> bool {
        match family {
            Family::PointerDrag => signals.pointer_held,
            Family::FileDrag => signals.file_hovering,
            Family::Typing => signals.typing_active,
            Family::Music => signals.media_playing,
            Family::Afk => signals.afk_elapsed,
            Family::Idle(n) => self.idle_seq.is_some_and(|seq| seq.family == n),
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(VarietyConfig::default())
    }
}

/// Entry point into a family: Start, else Body. Never a Finish member (a
/// Finish-only family would otherwise replay its exit clip while the signal
/// holds).
fn entry_clip(family: Family, catalog: &Catalog) -> Option<String> {
    let start = family.member(Role::Start);
    if catalog.contains(&start) {
        return Some(start);
    }
    let body = family.member(Role::Body);
    catalog.contains(&body).then_some(body)
}

/// Whether a strictly higher-priority signal is waiting to take over.
/// Pointer drag is never displaced while the user physically drags the
/// window, and AFK exits only through user activity.
fn preempted(family: Family, signals: &SignalSnapshot) -> bool {
    match family {
        Family::PointerDrag | Family::Afk => false,
        Family::FileDrag => signals.screenshot_requested,
        Family::Typing => signals.screenshot_requested || signals.file_hovering,
        Family::Music => {
            signals.screenshot_requested || signals.file_hovering || signals.typing_active
        }
        Family::Idle(_) => {
            signals.screenshot_requested
                || signals.file_hovering
                || signals.typing_active
                || signals.media_playing
                || signals.pointer_held
        }
    }
}
