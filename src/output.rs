//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Info
//!
//! ```text
//! Platform: linux (linux-x86_64)
//! Architecture: x86_64
//! Crate: fast-image 0.3.0
//! Native Library: libfast_image-linux-x86_64.so
//! Initialized: true
//! ```
//!
//! ## Compress / Rotate
//!
//! ```text
//! dawn.jpg → dawn-small.jpg
//!     jpg, 48213 → 20114 bytes (41.7%)
//! ```
//!
//! ## Batch
//!
//! ```text
//! Processing 3 images
//! 001 dawn.jpg
//!     dawn/original.jpg
//!     dawn/dawn_compressed_standard.jpg
//!     dawn/dawn_rotated_90.jpg
//! 002 broken.png
//!     broken/original.png
//!     failed: compress: Native compression failed: ...
//!     failed: rotate 90: Native rotation failed: ...
//!
//! Processed 2 of 3 images (1 failed) → out/
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchReport};
use crate::format::ImageFormat;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn format_label(bytes: &[u8]) -> &'static str {
    ImageFormat::sniff(bytes)
        .map(ImageFormat::extension)
        .unwrap_or("unknown")
}

// ============================================================================
// info / self-test
// ============================================================================

pub fn format_info(info: &str) -> Vec<String> {
    info.lines().map(str::to_string).collect()
}

pub fn print_info(info: &str) {
    for line in format_info(info) {
        println!("{}", line);
    }
}

pub fn format_self_test(passed: bool, failure: Option<&str>) -> Vec<String> {
    let mut lines = vec![format!(
        "Self-test: {}",
        if passed { "passed" } else { "FAILED" }
    )];
    if let Some(reason) = failure {
        lines.push(format!("{}{}", indent(1), reason));
    }
    lines
}

pub fn print_self_test(passed: bool, failure: Option<&str>) {
    for line in format_self_test(passed, failure) {
        println!("{}", line);
    }
}

// ============================================================================
// compress / rotate
// ============================================================================

/// Summary of a single-file transform: paths, detected format, and size change.
pub fn format_transform(input: &Path, output: &Path, before: &[u8], after: &[u8]) -> Vec<String> {
    let ratio = if before.is_empty() {
        0.0
    } else {
        after.len() as f64 * 100.0 / before.len() as f64
    };
    vec![
        format!("{} \u{2192} {}", input.display(), output.display()),
        format!(
            "{}{}, {} \u{2192} {} bytes ({:.1}%)",
            indent(1),
            format_label(after),
            before.len(),
            after.len(),
            ratio
        ),
    ]
}

pub fn print_transform(input: &Path, output: &Path, before: &[u8], after: &[u8]) {
    for line in format_transform(input, output, before, after) {
        println!("{}", line);
    }
}

// ============================================================================
// batch
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => {
            vec![format!("Processing {} images", total)]
        }
        BatchEvent::ImageProcessed {
            index,
            source,
            outputs,
        } => {
            let mut lines = vec![format!("{} {}", format_index(*index), source)];
            lines.extend(outputs.iter().map(|o| format!("{}{}", indent(1), o)));
            lines
        }
        BatchEvent::ImageFailed {
            index,
            source,
            outputs,
            errors,
        } => {
            let mut lines = vec![format!("{} {}", format_index(*index), source)];
            lines.extend(outputs.iter().map(|o| format!("{}{}", indent(1), o)));
            lines.extend(errors.iter().map(|e| format!("{}failed: {}", indent(1), e)));
            lines
        }
    }
}

pub fn format_batch_summary(report: &BatchReport) -> Vec<String> {
    let total = report.items.len();
    let failed = report.failed();
    let mut summary = format!("Processed {} of {} images", report.processed(), total);
    if failed > 0 {
        summary.push_str(&format!(" ({} failed)", failed));
    }
    summary.push_str(&format!(" \u{2192} {}", report.output));
    vec![String::new(), summary]
}

pub fn print_batch_summary(report: &BatchReport) {
    for line in format_batch_summary(report) {
        println!("{}", line);
    }
}
