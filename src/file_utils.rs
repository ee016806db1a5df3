use crate::config::{CAPTION_EXTENSION, SUPPORTED_IMAGE_EXTENSIONS};
use crate::error::{AppError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Formatting helpers for paths in log output.
pub trait PathExt {
    /// File name only, falling back to the full path.
    fn format_for_log(&self) -> String;
}

impl PathExt for Path {
    fn format_for_log(&self) -> String {
        self.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.display().to_string())
    }
}

fn has_extension_in(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext_str| extensions.contains(&ext_str.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Returns true if the path has one of the supported image extensions (any case).
pub fn is_supported_image(path: &Path) -> bool {
    has_extension_in(path, &SUPPORTED_IMAGE_EXTENSIONS)
}

/// Returns true if the path looks like a caption file.
pub fn is_caption_file(path: &Path) -> bool {
    has_extension_in(path, &[CAPTION_EXTENSION])
}

/// Sibling caption file of an image: same base name, `.txt` extension.
pub fn caption_path_for(image_path: &Path) -> PathBuf {
    image_path.with_extension(CAPTION_EXTENSION)
}

/// Keeps existing files with a supported image extension.
///
/// Entries that could not be read are kept as errors so the caller can report them.
fn filter_image_entries<I>(dir: &Path, entries: I) -> Vec<Result<PathBuf>>
where
    I: IntoIterator<Item = std::io::Result<PathBuf>>,
{
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() && is_supported_image(&path) => Some(Ok(path)),
            Ok(_) => None,
            Err(e) => Some(Err(AppError::io(dir, e))),
        })
        .collect()
}

/// Lists supported image files directly inside `dir`, in directory-listing order.
///
/// The outer error means `dir` itself is unusable; inner errors are unreadable entries.
pub fn scan_directory(dir: &Path) -> Result<Vec<Result<PathBuf>>> {
    if !dir.is_dir() {
        return Err(AppError::DirectoryNotFound(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir)
        .map_err(|e| AppError::io(dir, e))?
        .map(|entry| entry.map(|entry| entry.path()));
    Ok(filter_image_entries(dir, entries))
}
