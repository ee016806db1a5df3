//! Service for the open image directory.
//!
//! Coordinates the shared `ImageSet` with the caption files on disk.

use crate::caption_store;
use crate::error::{AppError, BatchReport, Result};
use crate::state::ImageSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Service for browsing a directory and editing its captions.
#[derive(Clone)]
pub struct LibraryService {
    images: Arc<Mutex<Option<ImageSet>>>,
}

impl LibraryService {
    /// Creates a new library service over shared state.
    pub fn new(images: Arc<Mutex<Option<ImageSet>>>) -> Self {
        Self { images }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ImageSet>> {
        self.images.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens `directory`, replacing any previously open image set.
    pub fn open_directory(&self, directory: &Path) -> Result<BatchReport> {
        let (images, report) = caption_store::scan(directory)?;
        *self.lock() = Some(images);
        Ok(report)
    }

    /// Rescans the open directory, keeping the selection where possible.
    pub fn rescan(&self) -> Result<BatchReport> {
        let directory = self
            .directory()
            .ok_or_else(|| AppError::DirectoryNotFound(PathBuf::new()))?;
        let (fresh, report) = caption_store::scan(&directory)?;

        let mut guard = self.lock();
        let same_directory = guard
            .as_ref()
            .is_some_and(|images| images.directory() == directory);
        if same_directory {
            if let Some(images) = guard.as_mut() {
                images.replace_files(fresh.paths().to_vec());
            }
        } else {
            *guard = Some(fresh);
        }
        Ok(report)
    }

    pub fn directory(&self) -> Option<PathBuf> {
        self.lock().as_ref().map(|images| images.directory().to_path_buf())
    }

    /// Snapshot of the image paths, in scan order.
    pub fn image_paths(&self) -> Vec<PathBuf> {
        self.lock()
            .as_ref()
            .map(|images| images.paths().to_vec())
            .unwrap_or_default()
    }

    pub fn current(&self) -> Option<PathBuf> {
        self.lock()
            .as_ref()
            .and_then(|images| images.current().map(Path::to_path_buf))
    }

    /// Navigates to the next image and returns its path.
    pub fn next(&self) -> Option<PathBuf> {
        self.lock()
            .as_mut()
            .and_then(|images| images.next().map(Path::to_path_buf))
    }

    /// Navigates to the previous image and returns its path.
    pub fn previous(&self) -> Option<PathBuf> {
        self.lock()
            .as_mut()
            .and_then(|images| images.previous().map(Path::to_path_buf))
    }

    pub fn select(&self, index: usize) -> Option<PathBuf> {
        self.lock()
            .as_mut()
            .and_then(|images| images.select(index).map(Path::to_path_buf))
    }

    /// Caption of the selected image, or `None` if nothing is selected.
    pub fn current_caption(&self) -> Result<Option<String>> {
        self.current()
            .map(|path| caption_store::read_caption(&path))
            .transpose()
    }

    /// Saves `text` as the selected image's caption. Returns the image path.
    pub fn save_current_caption(&self, text: &str) -> Result<Option<PathBuf>> {
        let Some(path) = self.current() else {
            log::warn!("No image selected, caption not saved");
            return Ok(None);
        };
        caption_store::write_caption(&path, text)?;
        Ok(Some(path))
    }
}
