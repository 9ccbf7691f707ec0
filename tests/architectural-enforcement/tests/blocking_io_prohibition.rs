//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async functions in the engine core and the console MUST NOT
//! perform blocking I/O. A blocking call inside the engine loop freezes the
//! frame clock, the pollers and event intake all at once.
//!
//! **Acceptable**: synchronous `std::fs` in plain (non-async) functions.
//! Catalog loading and the settings store run before, or off, the engine
//! loop on purpose; forcing them through `tokio::fs` buys nothing.

use std::fs;
use std::path::{Path, PathBuf};

#[test]
fn no_blocking_io_in_async_functions() {
    let root = workspace_root();
    let mut violations = Vec::new();

    check_directory(&root.join("core/src"), &mut violations);
    check_directory(&root.join("console/src"), &mut violations);

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O found inside async functions:");
        for violation in &violations {
            eprintln!("  {}", violation);
        }
        eprintln!("\nMove the call into a plain function invoked outside the loop,");
        eprintln!("or use the tokio::fs / tokio::net equivalents.");

        panic!(
            "\nFound {} blocking I/O violation(s) in async code.\nFix these before merging!",
            violations.len()
        );
    }
}

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
    let test_region = lines
        .iter()
        .position(|line| line.trim_start().starts_with("#[cfg(test)]"));

    for (idx, line) in lines.iter().enumerate() {
        if test_region.is_some_and(|start| idx >= start) {
            continue;
        }

        // Skip comments
        let code_part = line.split("//").next().unwrap_or(line);

        let blocking = code_part.contains("std::fs::")
            || code_part.contains("std::net::")
            || code_part.contains("std::process::Command");
        if !blocking {
            continue;
        }

        if !is_in_async_function(&lines, idx) {
            continue;
        }

        violations.push(format!("{}:{} - {}", path.display(), idx + 1, line.trim()));
    }
}

/// Check whether the enclosing function of `current_idx` is async.
fn is_in_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.starts_with("fn ") || line.starts_with("pub fn ") {
            return false;
        }
        if line.starts_with("async fn ")
            || line.starts_with("pub async fn ")
            || line.contains("async fn ")
        {
            return true;
        }
        if line.starts_with("mod ") || line.starts_with("impl ") || line.starts_with("struct ") {
            return false;
        }
    }
    false
}
