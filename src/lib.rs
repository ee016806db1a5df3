//! Caption files, crop geometry and background captioning for image datasets.
//!
//! A directory of images is paired with one `.txt` caption per image. The
//! crate keeps those caption files in sync, rewrites them in bulk, drives a
//! captioning model over the images one at a time, and crops images to a
//! fixed output size through an aspect-ratio constrained rectangle.

pub mod caption_store;
pub mod config;
pub mod error;
pub mod file_utils;
pub mod image_loader;
pub mod services;
pub mod state;

pub use error::{AppError, BatchReport, Result};
