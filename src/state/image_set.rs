//! Scanned image list for one directory, with a browsing cursor.

use crate::file_utils::PathExt;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Direction for navigation through images.
#[derive(Debug, Clone, Copy)]
enum Direction {
    Next,
    Previous,
}

/// Ordered image files discovered in one directory, plus the current selection.
///
/// Only a full rescan changes the file list; picking a new directory replaces
/// the whole set.
#[derive(Debug, Clone)]
pub struct ImageSet {
    directory: PathBuf,
    image_files: Vec<PathBuf>,
    current_index: Option<usize>,
}

impl ImageSet {
    /// Creates a set over `image_files`, selecting the first image if any.
    pub fn new(directory: PathBuf, image_files: Vec<PathBuf>) -> Self {
        let current_index = if image_files.is_empty() { None } else { Some(0) };
        Self {
            directory,
            image_files,
            current_index,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.image_files
    }

    pub fn len(&self) -> usize {
        self.image_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_files.is_empty()
    }

    /// Returns the currently selected image.
    pub fn current(&self) -> Option<&Path> {
        self.current_index
            .and_then(|index| self.image_files.get(index))
            .map(PathBuf::as_path)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Selects an image by index. Out-of-range indices leave the selection unchanged.
    pub fn select(&mut self, index: usize) -> Option<&Path> {
        if index >= self.image_files.len() {
            warn!(
                "Index {} out of range for {} images",
                index,
                self.image_files.len()
            );
            return None;
        }
        self.current_index = Some(index);
        self.current()
    }

    /// Selects an image by path.
    pub fn select_path(&mut self, path: &Path) -> Option<&Path> {
        let index = self.find_file_index(path)?;
        self.select(index)
    }

    fn step_index(&self, direction: Direction) -> Option<usize> {
        let current_index = self.current_index?;
        match direction {
            Direction::Next if current_index + 1 < self.image_files.len() => {
                Some(current_index + 1)
            }
            Direction::Previous if current_index > 0 => Some(current_index - 1),
            _ => None,
        }
    }

    /// Moves the cursor in the specified direction. Never wraps.
    fn navigate_to(&mut self, direction: Direction) -> Option<&Path> {
        if self.image_files.is_empty() {
            warn!("No images available for navigation");
            return None;
        }

        match self.step_index(direction) {
            Some(index) => {
                self.current_index = Some(index);
                self.current()
            }
            None => {
                warn!("No {:?} image available", direction);
                None
            }
        }
    }

    /// Advances to the next image, if available.
    pub fn next(&mut self) -> Option<&Path> {
        self.navigate_to(Direction::Next)
    }

    /// Steps back to the previous image, if available.
    pub fn previous(&mut self) -> Option<&Path> {
        self.navigate_to(Direction::Previous)
    }

    /// Returns the next image without moving the cursor.
    pub fn peek_next(&self) -> Option<&Path> {
        self.step_index(Direction::Next)
            .map(|index| self.image_files[index].as_path())
    }

    /// Returns the previous image without moving the cursor.
    pub fn peek_previous(&self) -> Option<&Path> {
        self.step_index(Direction::Previous)
            .map(|index| self.image_files[index].as_path())
    }

    /// Replaces the file list after a rescan.
    ///
    /// Keeps the selected image if it still exists, otherwise selects the first one.
    pub fn replace_files(&mut self, image_files: Vec<PathBuf>) {
        let selected = self.current().map(Path::to_path_buf);
        self.image_files = image_files;
        self.current_index = selected
            .and_then(|path| self.find_file_index(&path))
            .or(if self.image_files.is_empty() { None } else { Some(0) });

        debug!(
            "Rescanned {}: {} images, selection {:?}",
            self.directory.format_for_log(),
            self.image_files.len(),
            self.current_index
        );
    }

    fn find_file_index(&self, file_path: &Path) -> Option<usize> {
        self.image_files.iter().position(|p| p == file_path)
    }
}
