//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep methods. Periodic work
//! (typing frames, progress ticks, label spacing, queue polling) runs on
//! `tokio::time::interval`, which the timer registry can abort.
//! **Exceptions**: test code.

use architectural_enforcement::production_files;

#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();

    for file in production_files() {
        for line in file.production_lines() {
            if line.code.contains("::sleep(") || line.code.contains(".sleep(") {
                violations.push(file.violation(&line, "Sleep call"));
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Use tokio::time::interval() registered in the TimerRegistry");

        panic!(
            "\nFound {} sleep violation(s) in production code.",
            violations.len()
        );
    }
}

#[test]
fn test_scan_covers_timer_modules() {
    let files = production_files();
    for name in ["typing.rs", "progress.rs", "labels.rs", "timers.rs"] {
        assert!(
            files.iter().any(|f| f.path.ends_with(name)),
            "{name} not scanned"
        );
    }
}
