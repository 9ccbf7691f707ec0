//! Animation Catalog
//!
//! Clip and frame data model plus the naming scheme that groups clips into
//! Start/Body/Finish families. The catalog is built once at startup and is
//! read-only afterwards. Selection indexes (one-off idle clips, idle triad
//! families) are precomputed and kept sorted so that random picks under a
//! seeded RNG are deterministic.
//!
//! # Naming
//!
//! Family member names are irregular (the typing body is `Typing`, the
//! pointer-drag body is `CharacterMoving`) and fixed by the descriptor
//! format, so they live in an explicit table here rather than being derived
//! from suffixes. Idle material is discovered from the catalog: `Idle<N>`
//! is a one-off variety clip, `IdleStart<N>` announces triad family `N`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Fallback display duration for frames declared with a non-positive value.
pub const DEFAULT_FRAME_MS: u64 = 100;

/// The permanent neutral loop. The engine refuses to start without it.
pub const MAIN_IDLE: &str = "MainIdle";

/// One-shot clip played for an explicit screenshot request.
pub const SCREENSHOT: &str = "Screenshot";

/// A single timed animation frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Image asset backing this frame.
    pub image: PathBuf,
    /// Display duration. Always positive.
    pub duration: Duration,
}

impl Frame {
    /// Create a frame. Zero means "no usable duration declared" and maps to
    /// [`DEFAULT_FRAME_MS`].
    pub fn new(image: impl Into<PathBuf>, duration_ms: u64) -> Self {
        let ms = if duration_ms == 0 {
            DEFAULT_FRAME_MS
        } else {
            duration_ms
        };
        Self {
            image: image.into(),
            duration: Duration::from_millis(ms),
        }
    }
}

/// A named, ordered, non-empty sequence of frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clip {
    pub name: String,
    pub frames: Vec<Frame>,
}

impl Clip {
    pub fn new(name: impl Into<String>, frames: Vec<Frame>) -> Self {
        Self {
            name: name.into(),
            frames,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Signal-owned clip families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    /// Pointer held down on the character window.
    PointerDrag,
    /// A file dragged over the character.
    FileDrag,
    /// Sustained keyboard typing.
    Typing,
    /// Whitelisted media playback.
    Music,
    /// Away-from-keyboard timeout.
    Afk,
    /// Randomized idle excursion family `N`.
    Idle(u32),
}

/// Position of a clip within its family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Start,
    Body,
    Finish,
}

impl Family {
    /// Clip name for the given role.
    pub fn member(&self, role: Role) -> String {
        let (start, body, finish) = match self {
            Family::PointerDrag => {
                ("CharacterMoveStart", "CharacterMoving", "CharacterMoveFinish")
            }
            Family::FileDrag => ("DragFileStart", "DragFileProcessing", "DragFileFinish"),
            Family::Typing => ("TypingStart", "Typing", "TypingStop"),
            Family::Music => ("MusicStart", "MusicLoop", "MusicFinish"),
            Family::Afk => ("AfkStart", "AfkLoop", "AfkFinish"),
            Family::Idle(n) => {
                return match role {
                    Role::Start => format!("IdleStart{n}"),
                    Role::Body => format!("IdleLoop{n}"),
                    Role::Finish => format!("IdleFinish{n}"),
                }
            }
        };
        match role {
            Role::Start => start.to_string(),
            Role::Body => body.to_string(),
            Role::Finish => finish.to_string(),
        }
    }
}

/// What a clip name means to the resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipKind {
    /// The permanent neutral loop.
    MainIdle,
    /// The screenshot-request one-shot.
    Screenshot,
    /// A standalone `Idle<N>` variety clip.
    OneOffIdle,
    /// A member of a Start/Body/Finish family.
    Member(Family, Role),
    /// Present in the catalog but never chosen by the resolver.
    Other,
}

/// Classify a clip name.
pub fn classify(name: &str) -> ClipKind {
    match name {
        MAIN_IDLE => return ClipKind::MainIdle,
        SCREENSHOT => return ClipKind::Screenshot,
        "CharacterMoveStart" => return ClipKind::Member(Family::PointerDrag, Role::Start),
        "CharacterMoving" => return ClipKind::Member(Family::PointerDrag, Role::Body),
        "CharacterMoveFinish" => return ClipKind::Member(Family::PointerDrag, Role::Finish),
        "DragFileStart" => return ClipKind::Member(Family::FileDrag, Role::Start),
        "DragFileProcessing" => return ClipKind::Member(Family::FileDrag, Role::Body),
        "DragFileFinish" => return ClipKind::Member(Family::FileDrag, Role::Finish),
        "TypingStart" => return ClipKind::Member(Family::Typing, Role::Start),
        "Typing" => return ClipKind::Member(Family::Typing, Role::Body),
        "TypingStop" => return ClipKind::Member(Family::Typing, Role::Finish),
        "MusicStart" => return ClipKind::Member(Family::Music, Role::Start),
        "MusicLoop" => return ClipKind::Member(Family::Music, Role::Body),
        "MusicFinish" => return ClipKind::Member(Family::Music, Role::Finish),
        "AfkStart" => return ClipKind::Member(Family::Afk, Role::Start),
        "AfkLoop" => return ClipKind::Member(Family::Afk, Role::Body),
        "AfkFinish" => return ClipKind::Member(Family::Afk, Role::Finish),
        _ => {}
    }

    if let Some(n) = numbered(name, "IdleStart") {
        return ClipKind::Member(Family::Idle(n), Role::Start);
    }
    if let Some(n) = numbered(name, "IdleLoop") {
        return ClipKind::Member(Family::Idle(n), Role::Body);
    }
    if let Some(n) = numbered(name, "IdleFinish") {
        return ClipKind::Member(Family::Idle(n), Role::Finish);
    }
    if numbered(name, "Idle").is_some() {
        return ClipKind::OneOffIdle;
    }

    ClipKind::Other
}

/// `<prefix><digits>` with at least one digit and nothing else.
fn numbered(name: &str, prefix: &str) -> Option<u32> {
    let rest = name.strip_prefix(prefix)?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// Whether a clip must run to completion regardless of new signals.
///
/// Transitional Start/Finish members, one-off idle clips and the screenshot
/// clip are committed once loaded; governed bodies and MainIdle are not.
pub fn is_uninterruptible(name: &str) -> bool {
    matches!(
        classify(name),
        ClipKind::Screenshot
            | ClipKind::OneOffIdle
            | ClipKind::Member(_, Role::Start)
            | ClipKind::Member(_, Role::Finish)
    )
}

/// Immutable clip registry plus derived selection indexes.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    clips: HashMap<String, Clip>,
    one_off_idles: Vec<String>,
    idle_families: Vec<u32>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clips(clips: impl IntoIterator<Item = Clip>) -> Self {
        let mut catalog = Self::new();
        for clip in clips {
            catalog.insert(clip);
        }
        catalog
    }

    /// Insert a clip, replacing any previous entry with the same name.
    /// Clips without frames are dropped (an empty clip is unplayable).
    pub fn insert(&mut self, clip: Clip) {
        if clip.is_empty() {
            tracing::debug!(clip = %clip.name, "dropping empty clip");
            return;
        }
        match classify(&clip.name) {
            ClipKind::OneOffIdle => {
                if let Err(at) = self.one_off_idles.binary_search(&clip.name) {
                    self.one_off_idles.insert(at, clip.name.clone());
                }
            }
            ClipKind::Member(Family::Idle(n), Role::Start) => {
                if let Err(at) = self.idle_families.binary_search(&n) {
                    self.idle_families.insert(at, n);
                }
            }
            _ => {}
        }
        self.clips.insert(clip.name.clone(), clip);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Clip> {
        self.clips.get(name)
    }

    /// A name is playable when present; empty clips are never stored.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Standalone `Idle<N>` clips, sorted by name.
    #[must_use]
    pub fn one_off_idles(&self) -> &[String] {
        &self.one_off_idles
    }

    /// Idle triad family numbers, sorted. A family is announced by its
    /// `IdleStart<N>` clip; Loop/Finish members are optional.
    #[must_use]
    pub fn idle_families(&self) -> &[u32] {
        &self.idle_families
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.clips.keys().map(String::as_str)
    }
}
