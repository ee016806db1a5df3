//! Unified error types for the captioning workbench.

use std::path::PathBuf;
use thiserror::Error;

/// Application-specific errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// Scan target is missing or is not a directory
    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Reading or writing a file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The captioning model failed for one image
    #[error("caption generation failed for {}: {source}", path.display())]
    CaptionGeneration {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Zero, negative or non-finite aspect ratio
    #[error("invalid aspect ratio: {0}")]
    InvalidAspectRatio(f64),

    /// Zero-sized, negative or non-finite dimensions
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: f64, height: f64 },

    /// Crop region was laid out over an image of a different size
    #[error(
        "crop region for {} expects {}x{}, image is {}x{}",
        path.display(), expected.0, expected.1, actual.0, actual.1
    )]
    RegionMismatch {
        path: PathBuf,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Decoding or encoding an image failed
    #[error("image processing failed for {}: {source}", path.display())]
    ImageProcessing {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// settings.json could not be parsed or serialised
    #[error("invalid settings in {}: {source}", path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A bulk caption run is already in flight on this model
    #[error("a caption task is already running")]
    CaptionTaskBusy,

    /// Model name not recognised
    #[error("unknown caption model: {0}")]
    UnknownModel(String),
}

impl AppError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps an image error with the path it happened on.
    pub fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        AppError::ImageProcessing {
            path: path.into(),
            source,
        }
    }
}

/// Type alias for Results in this application.
pub type Result<T> = std::result::Result<T, AppError>;

/// Outcome of a best-effort batch operation.
///
/// Per-item failures never stop the batch; they are collected here so the
/// caller can at least surface a count.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub failures: Vec<(PathBuf, AppError)>,
}

impl BatchReport {
    pub fn record_success(&mut self) {
        self.processed += 1;
    }

    pub fn record_failure(&mut self, path: PathBuf, error: AppError) {
        log::warn!("{}", error);
        self.failures.push((path, error));
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_message_names_the_path() {
        let err = AppError::io(
            "/tmp/cat.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("/tmp/cat.txt"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn caption_error_keeps_its_cause() {
        use std::error::Error as _;

        let err = AppError::CaptionGeneration {
            path: PathBuf::from("owl.png"),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                "gpu out of memory",
            )),
        };
        assert!(err.to_string().contains("gpu out of memory"));
        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), "gpu out of memory");
        assert!(cause.downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn batch_report_counts_failures() {
        let mut report = BatchReport::default();
        report.record_success();
        report.record_failure(
            PathBuf::from("a.png"),
            AppError::CaptionGeneration {
                path: PathBuf::from("a.png"),
                source: "oom".into(),
            },
        );
        assert_eq!(report.processed, 1);
        assert_eq!(report.failure_count(), 1);
        assert!(!report.is_success());
    }
}
