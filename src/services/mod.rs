//! Service layer for business logic.
//!
//! Separates business logic from any front-end for better testability and maintainability.

pub mod captioning_service;
pub mod crop_service;
pub mod library_service;

pub use captioning_service::{
    CaptionModel, CaptionObserver, CaptionService, CaptionSummary, CaptionTaskHandle, Captioner,
};
pub use crop_service::{CropEntry, CropSession, commit_crop, crop_and_resize};
pub use library_service::LibraryService;
