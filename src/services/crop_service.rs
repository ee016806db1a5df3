//! Crop-then-resize of image files, singly or for a whole image set.
//!
//! Committing a crop overwrites the source image in place and keeps its
//! format. No backup is written; callers that need one must copy the file
//! first.

use crate::error::{AppError, BatchReport, Result};
use crate::file_utils::PathExt;
use crate::image_loader;
use crate::state::CropRegion;
use image::DynamicImage;
use image::imageops::FilterType;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

fn validate_output(output_width: u32, output_height: u32) -> Result<()> {
    if output_width == 0 || output_height == 0 {
        return Err(AppError::InvalidDimensions {
            width: output_width as f64,
            height: output_height as f64,
        });
    }
    Ok(())
}

/// Crops `image` to `region` and resizes the result to exactly the output size.
///
/// Uses Lanczos3; a crop already at the output size is returned unresampled.
pub fn crop_and_resize(
    image: &DynamicImage,
    region: &CropRegion,
    output_width: u32,
    output_height: u32,
) -> Result<DynamicImage> {
    validate_output(output_width, output_height)?;
    let crop = region.crop_box();
    let cropped = image.crop_imm(crop.x, crop.y, crop.width, crop.height);

    if (cropped.width(), cropped.height()) == (output_width, output_height) {
        return Ok(cropped);
    }
    Ok(cropped.resize_exact(output_width, output_height, FilterType::Lanczos3))
}

/// Crops and resizes the image at `image_path`, overwriting it in its original format.
pub fn commit_crop(
    image_path: &Path,
    region: &CropRegion,
    output_width: u32,
    output_height: u32,
) -> Result<DynamicImage> {
    validate_output(output_width, output_height)?;
    let (image, format) = image_loader::load_with_format(image_path)?;

    let actual = (image.width(), image.height());
    if actual != region.image_size() {
        return Err(AppError::RegionMismatch {
            path: image_path.to_path_buf(),
            expected: region.image_size(),
            actual,
        });
    }

    let output = crop_and_resize(&image, region, output_width, output_height)?;
    output
        .save_with_format(image_path, format)
        .map_err(|e| AppError::image(image_path, e))?;

    debug!(
        "Cropped {} to {:?}, saved {}x{} as {:?}",
        image_path.format_for_log(),
        region.crop_box(),
        output_width,
        output_height,
        format
    );
    Ok(output)
}

/// One image and its crop rectangle inside a session.
#[derive(Debug, Clone)]
pub struct CropEntry {
    pub path: PathBuf,
    pub region: CropRegion,
}

/// Crop rectangles for a set of images sharing one output size.
#[derive(Debug)]
pub struct CropSession {
    entries: Vec<CropEntry>,
    skipped: Vec<(PathBuf, AppError)>,
    output_width: u32,
    output_height: u32,
}

impl CropSession {
    /// Opens a region for every image, with the ratio of the output size.
    ///
    /// Images that cannot be read are skipped and listed in [`CropSession::skipped`].
    pub fn open(paths: &[PathBuf], output_width: u32, output_height: u32) -> Result<Self> {
        validate_output(output_width, output_height)?;

        let mut entries = Vec::with_capacity(paths.len());
        let mut skipped = Vec::new();
        for path in paths {
            let region = image_loader::read_dimensions(path).and_then(|(width, height)| {
                CropRegion::for_output(width, height, output_width, output_height)
            });
            match region {
                Ok(region) => entries.push(CropEntry {
                    path: path.clone(),
                    region,
                }),
                Err(e) => {
                    warn!("Skipping {}: {}", path.format_for_log(), e);
                    skipped.push((path.clone(), e));
                }
            }
        }

        Ok(Self {
            entries,
            skipped,
            output_width,
            output_height,
        })
    }

    pub fn entries(&self) -> &[CropEntry] {
        &self.entries
    }

    pub fn skipped(&self) -> &[(PathBuf, AppError)] {
        &self.skipped
    }

    pub fn output_size(&self) -> (u32, u32) {
        (self.output_width, self.output_height)
    }

    /// Mutable access to one region, for dragging and resizing.
    pub fn region_mut(&mut self, index: usize) -> Option<&mut CropRegion> {
        self.entries.get_mut(index).map(|entry| &mut entry.region)
    }

    /// Changes the output size and refits every region to its ratio.
    pub fn set_output_size(&mut self, output_width: u32, output_height: u32) -> Result<()> {
        validate_output(output_width, output_height)?;
        let ratio = output_width as f64 / output_height as f64;
        for entry in &mut self.entries {
            entry.region.set_aspect_ratio(ratio)?;
        }
        self.output_width = output_width;
        self.output_height = output_height;
        Ok(())
    }

    /// Crops every image. A failure aborts only that image.
    pub fn commit(self) -> BatchReport {
        let mut report = BatchReport::default();
        for entry in self.entries {
            match commit_crop(
                &entry.path,
                &entry.region,
                self.output_width,
                self.output_height,
            ) {
                Ok(_) => report.record_success(),
                Err(e) => report.record_failure(entry.path, e),
            }
        }

        info!(
            "Cropped {} images to {}x{} ({} failed)",
            report.processed,
            self.output_width,
            self.output_height,
            report.failure_count()
        );
        report
    }
}
