//! Directory batch processing.
//!
//! Walks an input directory for images and, for each one, writes the
//! original plus a compressed copy and one rotated copy per configured angle:
//!
//! ```text
//! out/
//! ├── report.json
//! ├── dawn/
//! │   ├── original.jpg
//! │   ├── dawn_compressed_standard.jpg
//! │   ├── dawn_rotated_90.jpg
//! │   ├── dawn_rotated_180.jpg
//! │   └── dawn_rotated_270.jpg
//! └── logo/
//!     └── ...
//! ```
//!
//! The output extension follows the sniffed format of the bytes written, so a
//! `.jpeg` source produces `.jpg` outputs. Unrecognized formats (BMP) keep the
//! source extension.
//!
//! Images run in parallel on the global rayon pool. A failing step is
//! recorded in the report and does not stop the batch, nor the image's other
//! steps. Images sharing a file stem get distinct directories (`logo`,
//! `logo-2`, ...) assigned in path order.

use crate::api::ImageApi;
use crate::config::BatchConfig;
use crate::format::ImageFormat;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extensions picked up from the input directory (compared lowercased).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

pub const REPORT_FILE: &str = "report.json";

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Input directory not found: {0}")]
    InputNotFound(PathBuf),
}

/// Failure of a single step of one image; recorded, never propagated.
#[derive(Error, Debug)]
enum ItemError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Image(#[from] crate::Error),
}

/// Progress events, sent as each stage completes.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started { total: usize },
    ImageProcessed {
        index: usize,
        source: String,
        outputs: Vec<String>,
    },
    /// At least one step failed; `outputs` still lists what was written.
    ImageFailed {
        index: usize,
        source: String,
        outputs: Vec<String>,
        errors: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub input: String,
    pub output: String,
    pub quality: i32,
    pub rotations: Vec<i32>,
    pub items: Vec<ItemReport>,
}

#[derive(Debug, Serialize)]
pub struct ItemReport {
    pub source: String,
    /// Directory under the output directory holding this image's files.
    pub dir: String,
    /// Paths written, relative to the output directory.
    pub outputs: Vec<String>,
    /// One entry per failed step, prefixed with the step name.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ItemReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.items.iter().filter(|i| i.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.processed()
    }
}

/// Image files under `input`, sorted by path.
pub fn find_images(input: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !input.is_dir() {
        return Err(BatchError::InputNotFound(input.to_path_buf()));
    }
    let mut images = Vec::new();
    for entry in WalkDir::new(input).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Extension for bytes about to be written: sniffed format first, then the
/// source file's own extension.
fn output_extension(bytes: &[u8], source: &Path) -> String {
    match ImageFormat::sniff(bytes) {
        Some(format) => format.extension().to_string(),
        None => source
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "bin".to_string()),
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

/// Output directory name for each image, in order.
///
/// The first image with a given stem gets the bare stem; later ones get
/// `<stem>-2`, `<stem>-3` and so on, skipping any name that is itself the
/// stem of another image. Names are compared case-insensitively so the
/// result holds on case-insensitive filesystems too.
fn output_dirs(images: &[PathBuf]) -> Vec<String> {
    let stems: Vec<String> = images.iter().map(|p| stem_of(p)).collect();
    let reserved: HashSet<String> = stems.iter().map(|s| s.to_lowercase()).collect();
    let mut taken = HashSet::new();

    stems
        .iter()
        .map(|stem| {
            let mut name = stem.clone();
            let mut n = 1;
            while taken.contains(&name.to_lowercase())
                || (n > 1 && reserved.contains(&name.to_lowercase()))
            {
                n += 1;
                name = format!("{stem}-{n}");
            }
            taken.insert(name.to_lowercase());
            name
        })
        .collect()
}

/// Process every image under `input` into `output` and write `report.json`.
pub fn process_dir(
    api: &ImageApi<'_>,
    input: &Path,
    output: &Path,
    config: &BatchConfig,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, BatchError> {
    let images = find_images(input)?;
    let dirs = output_dirs(&images);
    std::fs::create_dir_all(output)?;
    debug!(count = images.len(), input = %input.display(), "batch started");
    if let Some(tx) = &events {
        tx.send(BatchEvent::Started {
            total: images.len(),
        })
        .ok();
    }

    let items: Vec<ItemReport> = images
        .par_iter()
        .zip(dirs.par_iter())
        .enumerate()
        .map(|(index, (source, dir))| {
            let rel = source
                .strip_prefix(input)
                .unwrap_or(source)
                .display()
                .to_string();
            let outcome = process_image(api, source, output, dir, config);
            let event = if outcome.errors.is_empty() {
                BatchEvent::ImageProcessed {
                    index: index + 1,
                    source: rel.clone(),
                    outputs: outcome.outputs.clone(),
                }
            } else {
                warn!(source = %rel, errors = ?outcome.errors, "batch item failed");
                BatchEvent::ImageFailed {
                    index: index + 1,
                    source: rel.clone(),
                    outputs: outcome.outputs.clone(),
                    errors: outcome.errors.clone(),
                }
            };
            if let Some(tx) = &events {
                tx.send(event).ok();
            }
            ItemReport {
                source: rel,
                dir: dir.clone(),
                outputs: outcome.outputs,
                errors: outcome.errors,
            }
        })
        .collect();

    let report = BatchReport {
        input: input.display().to_string(),
        output: output.display().to_string(),
        quality: config.quality,
        rotations: config.rotations.clone(),
        items,
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(output.join(REPORT_FILE), json)?;
    Ok(report)
}

/// What one image left behind: every file written and every failed step.
#[derive(Debug, Default)]
struct ImageOutcome {
    outputs: Vec<String>,
    errors: Vec<String>,
}

impl ImageOutcome {
    /// Record a step's result; returns whether it succeeded.
    fn record(&mut self, step: &str, result: Result<String, ItemError>) -> bool {
        match result {
            Ok(path) => {
                self.outputs.push(path);
                true
            }
            Err(e) => {
                self.errors.push(format!("{step}: {e}"));
                false
            }
        }
    }
}

/// Write the original, then the compressed copy, then each rotation.
///
/// Compression and every rotation are independent steps: one failing does
/// not skip the others. Only a missing original stops the image early.
fn process_image(
    api: &ImageApi<'_>,
    source: &Path,
    output: &Path,
    dir_name: &str,
    config: &BatchConfig,
) -> ImageOutcome {
    let mut outcome = ImageOutcome::default();
    let original = match std::fs::read(source) {
        Ok(bytes) => bytes,
        Err(e) => {
            outcome.errors.push(format!("read: {e}"));
            return outcome;
        }
    };

    let stem = stem_of(source);
    let dir = output.join(dir_name);
    let write = |name: String, bytes: &[u8]| -> Result<String, ItemError> {
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(&name), bytes)?;
        Ok(format!("{dir_name}/{name}"))
    };

    let saved = write(
        format!("original.{}", output_extension(&original, source)),
        &original,
    );
    if !outcome.record("original", saved) {
        return outcome;
    }

    let compressed = api
        .compress(&original, config.quality)
        .map_err(ItemError::from)
        .and_then(|bytes| {
            write(
                format!("{stem}_compressed_standard.{}", output_extension(&bytes, source)),
                &bytes,
            )
        });
    outcome.record("compress", compressed);

    for &angle in &config.rotations {
        let rotated = api
            .rotate(&original, angle)
            .map_err(ItemError::from)
            .and_then(|bytes| {
                write(
                    format!("{stem}_rotated_{angle}.{}", output_extension(&bytes, source)),
                    &bytes,
                )
            });
        outcome.record(&format!("rotate {angle}"), rotated);
    }

    outcome
}
