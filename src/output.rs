//! CLI output formatting.
//!
//! # Display
//!
//! Each file leads with its positional index and source path; the outcome is
//! shown as indented context below it:
//!
//! ```text
//! Compressing 3 files
//! 001 photos/beach.png → beach.jpg
//!     1024x683 q40, 61.2 KiB (from 2.3 MiB), 2 attempts
//! 002 photos/avatar.tiff → avatar.jpg
//!     cached
//! 003 photos/broken.png
//!     failed: Failed to decode input: ...
//!
//! Done: 1 cached, 1 compressed (2 total), 1 failed
//! ```
//!
//! Files are printed as they finish, so indices may appear out of order when
//! several workers are running.
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure, no I/O.

use crate::batch::{BatchEvent, BatchReport, FileReport, FileStatus};
use crate::budget::Preset;
use crate::cache::CacheStats;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human-readable byte count: `512 B`, `61.2 KiB`, `2.3 MiB`.
pub fn human_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{} B", bytes)
    } else if b < MIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / MIB)
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

// ============================================================================
// Batch progress
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => vec![format!("Compressing {}", plural(*total, "file"))],
        BatchEvent::FileFinished { index, report } => format_file_report(*index, report),
    }
}

fn format_file_report(index: usize, report: &FileReport) -> Vec<String> {
    let header = match &report.output {
        Some(output) => format!("{} {} → {}", format_index(index), report.source, output),
        None => format!("{} {}", format_index(index), report.source),
    };

    let detail = match report.status {
        FileStatus::Compressed => encode_detail(report),
        FileStatus::Degraded => format!("{} (over budget)", encode_detail(report)),
        FileStatus::Cached => "cached".to_string(),
        FileStatus::Copied => "copied from cache".to_string(),
        FileStatus::Failed => format!(
            "failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        ),
    };

    vec![header, format!("    {}", detail)]
}

/// `1024x683 q40, 61.2 KiB (from 2.3 MiB), 2 attempts`
fn encode_detail(report: &FileReport) -> String {
    let mut detail = String::new();
    if let (Some(w), Some(h)) = (report.width, report.height) {
        detail.push_str(&format!("{}x{} ", w, h));
    }
    if let Some(q) = report.quality {
        detail.push_str(&format!("q{}", q));
    }
    if let Some(out) = report.output_bytes {
        detail.push_str(&format!(", {}", human_bytes(out)));
    }
    if let Some(input) = report.input_bytes {
        detail.push_str(&format!(" (from {})", human_bytes(input)));
    }
    detail.push_str(&format!(", {}", plural(report.attempts.len(), "attempt")));
    detail
}

/// Format the end-of-batch summary line.
pub fn format_summary(report: &BatchReport, cache_stats: &CacheStats) -> Vec<String> {
    let mut summary = format!("Done: {}", cache_stats);
    let degraded = report.count(FileStatus::Degraded);
    if degraded > 0 {
        summary.push_str(&format!(", {} over budget", degraded));
    }
    let failed = report.count(FileStatus::Failed);
    if failed > 0 {
        summary.push_str(&format!(", {} failed", failed));
    }
    vec![String::new(), summary]
}

/// Print the end-of-batch summary to stdout.
pub fn print_summary(report: &BatchReport, cache_stats: &CacheStats) {
    for line in format_summary(report, cache_stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Format the built-in presets as an aligned table.
///
/// ```text
/// generic          1.0 MiB  2048px  q80  General purpose uploads
/// ```
pub fn format_presets() -> Vec<String> {
    Preset::ALL
        .iter()
        .map(|preset| {
            let budget = preset.budget();
            format!(
                "{:<15} {:>9}  {:>4}px  q{:<3} {}",
                preset.name(),
                human_bytes(budget.max_output_bytes()),
                budget.max_dimension(),
                budget.initial_quality().value(),
                preset.description()
            )
        })
        .collect()
}

/// Print the built-in presets to stdout.
pub fn print_presets() {
    for line in format_presets() {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
