//! CLI output formatting for build and check.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Build: incremental
//! Posts: 12 published, 1 draft (12 parsed)
//! Changes: 1 added, 0 removed, 2 modified
//! Plan
//!     index       full
//!     posts       selective (3)
//!     categories  full
//!     …
//!     static      skip
//! Wrote 31 files, removed 1 stale page
//! Site generated in: dist
//! Elapsed: 0.42s
//! ```
//!
//! ## Skipped build
//!
//! ```text
//! No changes detected. Build skipped.
//! Elapsed: 0.01s
//! ```
//!
//! ## Check
//!
//! ```text
//! Posts: 12 published, 1 draft
//! Changes: 0 added, 0 removed, 1 modified
//! Next build: incremental
//! Slugs
//!     posts/hello.md → hello
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::builder::{BuildReport, CheckReport};
use crate::changes::BuildDecision;
use std::time::Duration;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

fn elapsed_line(elapsed: Duration) -> String {
    format!("Elapsed: {:.2}s", elapsed.as_secs_f64())
}

fn changes_line(added: usize, removed: usize, modified: usize, staleness: bool) -> String {
    let mut line = format!("Changes: {added} added, {removed} removed, {modified} modified");
    if staleness {
        line.push_str(", staleness threshold crossed");
    }
    line
}

fn decision_label(decision: &BuildDecision) -> &'static str {
    if decision.no_op {
        "skip"
    } else if decision.full_rebuild {
        "full rebuild"
    } else {
        "incremental"
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_report(report: &BuildReport, elapsed: Duration) -> Vec<String> {
    let mut lines = Vec::new();

    let mode = match (report.full_rebuild, report.cleaned) {
        (true, true) => "full rebuild (output cleaned)",
        (true, false) => "full rebuild",
        _ => "incremental",
    };
    lines.push(format!("Build: {mode}"));

    let mut posts = format!(
        "Posts: {} published, {}",
        report.published,
        plural(report.drafts, "draft")
    );
    if report.parsed > 0 {
        posts.push_str(&format!(" ({} parsed)", report.parsed));
    } else {
        posts.push_str(" (not parsed)");
    }
    lines.push(posts);
    lines.push(changes_line(
        report.added,
        report.removed,
        report.modified,
        report.staleness_changed,
    ));

    lines.push("Plan".to_string());
    for (family, action) in report.plan.families() {
        lines.push(format!("{}{family:<12}{action}", indent(1)));
    }

    let mut wrote = format!("Wrote {}", plural(report.files_written, "file"));
    if report.pages_removed > 0 {
        wrote.push_str(&format!(
            ", removed {}",
            plural(report.pages_removed, "stale page")
        ));
    }
    lines.push(wrote);
    lines.push(format!("Site generated in: {}", report.output.display()));
    lines.push(elapsed_line(elapsed));
    lines
}

pub fn print_build_report(report: &BuildReport, elapsed: Duration) {
    for line in format_build_report(report, elapsed) {
        println!("{}", line);
    }
}

pub fn format_skipped(elapsed: Duration) -> Vec<String> {
    vec![
        "No changes detected. Build skipped.".to_string(),
        elapsed_line(elapsed),
    ]
}

pub fn print_skipped(elapsed: Duration) {
    for line in format_skipped(elapsed) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check(report: &CheckReport) -> Vec<String> {
    let changes = &report.changes;
    let mut lines = vec![
        format!(
            "Posts: {} published, {}",
            report.published,
            plural(report.drafts, "draft")
        ),
        changes_line(
            changes.added.len(),
            changes.removed.len(),
            changes.modified.len(),
            changes.staleness_changed,
        ),
        format!("Next build: {}", decision_label(&report.decision)),
    ];
    if !report.slugs.is_empty() {
        lines.push("Slugs".to_string());
        for (source, slug) in &report.slugs {
            lines.push(format!("{}{source} → {slug}", indent(1)));
        }
    }
    lines
}

pub fn print_check(report: &CheckReport) {
    for line in format_check(report) {
        println!("{}", line);
    }
}
