//! Caption text files stored next to each image.
//!
//! Every image `name.ext` owns a caption `name.txt` in the same directory.
//! Scanning creates missing caption files empty and never truncates existing
//! ones; saving replaces the whole file.

use crate::error::{AppError, BatchReport, Result};
use crate::file_utils::{self, PathExt, caption_path_for, is_caption_file};
use crate::state::ImageSet;
use log::{debug, info};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;
use walkdir::WalkDir;

/// Creates the caption file for `image_path` if it is missing.
///
/// Uses `create_new` so a file written concurrently is never truncated.
fn ensure_caption_file(image_path: &Path) -> Result<()> {
    let caption_path = caption_path_for(image_path);
    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&caption_path)
    {
        Ok(_) => {
            debug!("Created empty caption {}", caption_path.format_for_log());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists && !caption_path.is_dir() => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(AppError::io(
            caption_path,
            std::io::Error::other("caption path is a directory"),
        )),
        Err(e) => Err(AppError::io(caption_path, e)),
    }
}

/// Scans `directory` for images and makes sure each has a caption file.
///
/// Images whose caption file cannot be created are left out of the set and
/// listed in the report.
pub fn scan(directory: &Path) -> Result<(ImageSet, BatchReport)> {
    let start = std::time::Instant::now();
    debug!("Scanning {}", directory.display());

    let mut report = BatchReport::default();
    let mut images = Vec::new();
    for entry in file_utils::scan_directory(directory)? {
        let image_path = match entry {
            Ok(image_path) => image_path,
            Err(e) => {
                report.record_failure(directory.to_path_buf(), e);
                continue;
            }
        };
        match ensure_caption_file(&image_path) {
            Ok(()) => {
                report.record_success();
                images.push(image_path);
            }
            Err(e) => report.record_failure(image_path, e),
        }
    }

    debug!(
        "Scanned {} images in {} in {:?}",
        images.len(),
        directory.display(),
        start.elapsed()
    );
    Ok((ImageSet::new(directory.to_path_buf(), images), report))
}

/// Returns the caption of `image_path`, or an empty string if none exists.
pub fn read_caption(image_path: &Path) -> Result<String> {
    let caption_path = caption_path_for(image_path);
    match fs::read_to_string(&caption_path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(AppError::io(caption_path, e)),
    }
}

/// Replaces the caption of `image_path` with exactly `text`.
pub fn write_caption(image_path: &Path, text: &str) -> Result<()> {
    let caption_path = caption_path_for(image_path);
    fs::write(&caption_path, text).map_err(|e| AppError::io(caption_path, e))
}

/// Wraps every line with `prefix` and `suffix`.
///
/// Lines are trimmed first and joined with `\n`, without a trailing newline.
pub fn wrap_lines(content: &str, prefix: &str, suffix: &str) -> String {
    content
        .lines()
        .map(|line| format!("{}{}{}", prefix, line.trim(), suffix))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rewrites every caption file under `directory` (recursively) with `transform`.
///
/// A failure on one file does not stop the others.
fn rewrite_caption_files<F>(directory: &Path, transform: F) -> Result<BatchReport>
where
    F: Fn(&str) -> String,
{
    if !directory.is_dir() {
        return Err(AppError::DirectoryNotFound(directory.to_path_buf()));
    }

    let mut report = BatchReport::default();
    for entry in WalkDir::new(directory) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(directory).to_path_buf();
                let io_error = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                report.record_failure(path.clone(), AppError::io(path, io_error));
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || !is_caption_file(path) {
            continue;
        }

        let result = fs::read_to_string(path)
            .and_then(|content| fs::write(path, transform(&content)))
            .map_err(|e| AppError::io(path, e));
        match result {
            Ok(()) => report.record_success(),
            Err(e) => report.record_failure(path.to_path_buf(), e),
        }
    }

    info!(
        "Rewrote {} caption files under {} ({} failed)",
        report.processed,
        directory.display(),
        report.failure_count()
    );
    Ok(report)
}

/// Adds `prefix` and `suffix` to each line of every caption file under `directory`.
pub fn add_prefix_suffix(directory: &Path, prefix: &str, suffix: &str) -> Result<BatchReport> {
    rewrite_caption_files(directory, |content| wrap_lines(content, prefix, suffix))
}

/// Replaces every occurrence of `find` with `replace` in every caption file under `directory`.
///
/// An empty `find` leaves files untouched.
pub fn find_replace(directory: &Path, find: &str, replace: &str) -> Result<BatchReport> {
    rewrite_caption_files(directory, |content| {
        if find.is_empty() {
            content.to_string()
        } else {
            content.replace(find, replace)
        }
    })
}
