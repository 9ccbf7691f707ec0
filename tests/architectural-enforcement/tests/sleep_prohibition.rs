//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the engine core and the console MUST NOT
//! sleep. The engine is a single cooperative task; a `thread::sleep` stalls
//! every timer it owns, and an ad-hoc async `sleep` hides a wait that should
//! be a deadline (`sleep_until`) or an interval.
//!
//! **Exceptions**: test code (everything under `#[cfg(test)]` or inside a
//! `#[test]`/`#[tokio::test]` function).

use std::fs;
use std::path::{Path, PathBuf};

#[test]
fn no_sleep_in_production_code() {
    let root = workspace_root();
    let mut violations = Vec::new();

    check_directory(&root.join("core/src"), &mut violations);
    check_directory(&root.join("console/src"), &mut violations);

    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code:");
        for violation in &violations {
            eprintln!("  {}", violation);
        }
        eprintln!("\nExpress waits as deadlines or intervals instead:");
        eprintln!("  - tokio::time::sleep_until(deadline)");
        eprintln!("  - tokio::time::interval(period) with MissedTickBehavior::Skip");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Resolve the workspace root from this crate's own location, so the scan
/// works no matter which directory cargo runs the test from.
fn workspace_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    let root = manifest
        .ancestors()
        .nth(2)
        .expect("enforcement crate sits two levels under the workspace root");
    assert!(
        root.join("Cargo.toml").exists(),
        "workspace root not found at {}",
        root.display()
    );
    root.to_path_buf()
}

fn check_directory(dir: &Path, violations: &mut Vec<String>) {
    assert!(
        dir.exists(),
        "scanned directory {} is missing; was a crate moved without updating this test?",
        dir.display()
    );

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
            check_file(entry.path(), violations);
        }
    }
}

fn check_file(path: &Path, violations: &mut Vec<String>) {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return,
    };

    let lines: Vec<&str> = content.lines().collect();
    let test_region = test_module_start(&lines);

    for (idx, line) in lines.iter().enumerate() {
        // Trailing unit-test modules are exempt wholesale.
        if test_region.is_some_and(|start| idx >= start) {
            continue;
        }

        // Skip comments
        let code_part = line.split("//").next().unwrap_or(line);

        let blocking = code_part.contains("thread::sleep");
        // `sleep_until` is the sanctioned deadline wait; only bare `sleep(`
        // counts.
        let async_adhoc =
            code_part.contains("::sleep(") || code_part.contains(".sleep(");
        if !blocking && !async_adhoc {
            continue;
        }

        if is_in_test_function(&lines, idx) {
            continue;
        }

        violations.push(format!("{}:{} - {}", path.display(), idx + 1, line.trim()));
    }
}

/// First line of a trailing `#[cfg(test)]` module, if the file has one.
fn test_module_start(lines: &[&str]) -> Option<usize> {
    lines
        .iter()
        .position(|line| line.trim_start().starts_with("#[cfg(test)]"))
}

/// Check if line is inside a `#[test]` / `#[tokio::test]` function.
fn is_in_test_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.starts_with("fn ")
            || line.starts_with("pub fn ")
            || line.starts_with("async fn ")
            || line.starts_with("pub async fn ")
        {
            // Attributes sit directly above the enclosing fn.
            return lines[..i]
                .iter()
                .rev()
                .map(|above| above.trim())
                .take_while(|above| {
                    above.starts_with('#') || above.starts_with("///") || above.is_empty()
                })
                .any(|above| {
                    above.starts_with("#[test]") || above.starts_with("#[tokio::test")
                });
        }
        if line.starts_with("mod ") || line.starts_with("impl ") {
            return false;
        }
    }
    false
}
