//! Catalog Descriptor Loader
//!
//! Parses the line-oriented animation descriptor into a [`Catalog`]. The
//! format is forgiving by design: comment lines, stray count markers and
//! malformed frame lines are skipped, and a missing frame asset drops that
//! frame without aborting the rest of the clip. Validation that the result
//! is usable (a playable `MainIdle`) happens at engine construction, not
//! here.
//!
//! Grammar, per line after trimming:
//! - empty, `//...` or `#...`: comment
//! - `Anim<Name>`: starts clip section `<Name>` (prefix stripped)
//! - digits only: frame-count marker, ignored
//! - `<frameFile> <durationMs>`: one frame, whitespace/tab separated

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::catalog::{Catalog, Clip, Frame};

/// Literal prefix announcing a clip section header.
pub const SECTION_PREFIX: &str = "Anim";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read descriptor at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read and parse a descriptor file, resolving frame assets against
/// `assets_dir`.
pub fn load_catalog(
    descriptor: impl AsRef<Path>,
    assets_dir: impl AsRef<Path>,
) -> Result<Catalog, CatalogError> {
    let descriptor = descriptor.as_ref();
    let text = std::fs::read_to_string(descriptor).map_err(|source| CatalogError::Read {
        path: descriptor.to_path_buf(),
        source,
    })?;
    let catalog = parse_descriptor(&text, assets_dir.as_ref());
    tracing::info!(
        descriptor = %descriptor.display(),
        clips = catalog.len(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// Parse descriptor text. Frame assets are checked for existence under
/// `assets_dir`; entries whose file is missing are skipped.
pub fn parse_descriptor(text: &str, assets_dir: &Path) -> Catalog {
    let mut catalog = Catalog::new();
    let mut section: Option<(String, Vec<Frame>)> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix(SECTION_PREFIX) {
            flush(&mut catalog, section.take());
            section = Some((name.to_string(), Vec::new()));
            continue;
        }

        if line.bytes().all(|b| b.is_ascii_digit()) {
            // Frame-count marker; the real count is what actually parses.
            continue;
        }

        let Some((_, frames)) = section.as_mut() else {
            tracing::debug!(line, "frame line outside any section, skipping");
            continue;
        };

        let mut parts = line.split_whitespace();
        let (Some(file), Some(duration)) = (parts.next(), parts.next()) else {
            tracing::debug!(line, "malformed frame line, skipping");
            continue;
        };
        let Ok(duration_ms) = duration.parse::<i64>() else {
            tracing::debug!(line, "unparseable frame duration, skipping");
            continue;
        };

        let path = assets_dir.join(file);
        if !path.is_file() {
            tracing::warn!(frame = %path.display(), "frame asset missing, skipping");
            continue;
        }

        // Non-positive durations fall back to the default inside Frame.
        let duration_ms = u64::try_from(duration_ms).unwrap_or(0);
        frames.push(Frame::new(path, duration_ms));
    }

    flush(&mut catalog, section.take());
    catalog
}

fn flush(catalog: &mut Catalog, section: Option<(String, Vec<Frame>)>) {
    if let Some((name, frames)) = section {
        if frames.is_empty() {
            tracing::warn!(clip = %name, "section loaded no frames, dropping");
            return;
        }
        catalog.insert(Clip::new(name, frames));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    /// Descriptor plus asset files in one temp dir.
    fn write_assets(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            std::fs::write(dir.path().join(file), b"").unwrap();
        }
        dir
    }

    // ========================================================================
    // Grammar
    // ========================================================================

    #[test]
    fn parses_sections_comments_and_markers() {
        let dir = write_assets(&["idle_0.png", "idle_1.png", "typing_0.png"]);
        let text = "\
// descriptor comment
# another comment

AnimMainIdle
2
idle_0.png 100
idle_1.png 150

AnimTyping
1
typing_0.png 80
";
        let catalog = parse_descriptor(text, dir.path());

        assert_eq!(catalog.len(), 2);
        let idle = catalog.get("MainIdle").unwrap();
        assert_eq!(idle.len(), 2);
        assert_eq!(idle.frames[1].duration, Duration::from_millis(150));
        assert_eq!(catalog.get("Typing").unwrap().len(), 1);
    }

    #[test]
    fn section_prefix_is_stripped() {
        let dir = write_assets(&["a.png"]);
        let catalog = parse_descriptor("AnimDragFileStart\na.png 100\n", dir.path());
        assert!(catalog.contains("DragFileStart"));
        assert!(!catalog.contains("AnimDragFileStart"));
    }

    #[test]
    fn tabs_and_crlf_are_accepted() {
        let dir = write_assets(&["a.png"]);
        let catalog = parse_descriptor("AnimMainIdle\r\na.png\t120\r\n", dir.path());
        assert_eq!(
            catalog.get("MainIdle").unwrap().frames[0].duration,
            Duration::from_millis(120)
        );
    }

    #[test]
    fn malformed_lines_are_skipped_without_aborting() {
        let dir = write_assets(&["a.png", "b.png"]);
        let text = "\
AnimMainIdle
a.png 100
just-one-token
b.png notanumber
b.png 90
";
        let catalog = parse_descriptor(text, dir.path());
        assert_eq!(catalog.get("MainIdle").unwrap().len(), 2);
    }

    #[test]
    fn non_positive_durations_default() {
        let dir = write_assets(&["a.png", "b.png"]);
        let text = "AnimMainIdle\na.png -50\nb.png 0\n";
        let catalog = parse_descriptor(text, dir.path());
        let clip = catalog.get("MainIdle").unwrap();
        assert_eq!(clip.frames[0].duration, Duration::from_millis(100));
        assert_eq!(clip.frames[1].duration, Duration::from_millis(100));
    }

    // ========================================================================
    // Missing assets
    // ========================================================================

    #[test]
    fn missing_frame_file_is_skipped_not_fatal() {
        let dir = write_assets(&["present.png"]);
        let text = "AnimMainIdle\nghost.png 100\npresent.png 100\n";
        let catalog = parse_descriptor(text, dir.path());
        let clip = catalog.get("MainIdle").unwrap();
        assert_eq!(clip.len(), 1);
        assert!(clip.frames[0].image.ends_with("present.png"));
    }

    #[test]
    fn section_with_no_loadable_frames_is_dropped() {
        let dir = write_assets(&["a.png"]);
        let text = "AnimIdle1\nghost.png 100\nAnimMainIdle\na.png 100\n";
        let catalog = parse_descriptor(text, dir.path());
        assert!(!catalog.contains("Idle1"));
        assert!(catalog.contains("MainIdle"));
    }

    #[test]
    fn frame_lines_before_any_section_are_ignored() {
        let dir = write_assets(&["a.png"]);
        let catalog = parse_descriptor("a.png 100\nAnimMainIdle\na.png 100\n", dir.path());
        assert_eq!(catalog.get("MainIdle").unwrap().len(), 1);
    }

    #[test]
    fn duplicate_sections_last_wins() {
        let dir = write_assets(&["a.png", "b.png"]);
        let text = "AnimMainIdle\na.png 100\nb.png 100\nAnimMainIdle\na.png 100\n";
        let catalog = parse_descriptor(text, dir.path());
        assert_eq!(catalog.get("MainIdle").unwrap().len(), 1);
    }

    // ========================================================================
    // File loading
    // ========================================================================

    #[test]
    fn load_catalog_reads_from_disk() {
        let dir = write_assets(&["a.png"]);
        let descriptor = dir.path().join("anims.txt");
        std::fs::write(&descriptor, "AnimMainIdle\na.png 100\n").unwrap();

        let catalog = load_catalog(&descriptor, dir.path()).unwrap();
        assert!(catalog.contains("MainIdle"));
    }

    #[test]
    fn load_catalog_reports_read_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.txt");
        let err = load_catalog(&missing, dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }
}
