//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async production code MUST NOT use blocking I/O.
//! **Required**: `tokio::fs`, `tokio::net`, `tokio::io`, async `reqwest`.
//! **Acceptable**: non-async functions (config loading before the pipeline
//! starts) and test code.

use architectural_enforcement::{production_files, SourceFile};

const BLOCKING_PATTERNS: [(&str, &str); 5] = [
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("reqwest::blocking", "Blocking HTTP client"),
    ("std::io::stdin()", "Blocking stdin"),
];

fn violations_in(file: &SourceFile) -> Vec<String> {
    let mut violations = Vec::new();

    for line in file.production_lines() {
        for (pattern, what) in BLOCKING_PATTERNS {
            if !line.code.contains(pattern) {
                continue;
            }
            // Imports count as violations; calls only inside async fns
            let is_import = line.code.trim_start().starts_with("use ");
            if is_import || file.enclosing_fn_is_async(line.number - 1) == Some(true) {
                violations.push(file.violation(&line, what));
            }
        }
    }

    violations
}

#[test]
fn test_no_blocking_io_in_async_code() {
    let violations: Vec<String> = production_files().iter().flat_map(violations_in).collect();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in async production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read().await, tokio::fs::write().await");
        eprintln!("  - tokio::io::stdin() with AsyncBufReadExt");
        eprintln!("  - reqwest::Client (async)");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.",
            violations.len()
        );
    }
}

#[test]
fn test_detector_flags_blocking_read_in_async_fn() {
    let file = SourceFile::from_source(
        std::path::Path::new("bad.rs"),
        "pub async fn load() {\n    let s = std::fs::read_to_string(\"x\");\n}\n",
    );
    assert_eq!(violations_in(&file).len(), 1);
}

#[test]
fn test_detector_allows_blocking_read_in_sync_fn() {
    let file = SourceFile::from_source(
        std::path::Path::new("ok.rs"),
        "pub fn load() {\n    let s = std::fs::read_to_string(\"x\");\n}\n",
    );
    assert!(violations_in(&file).is_empty());
}
