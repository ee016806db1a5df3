//! Aspect-ratio constrained crop rectangle.
//!
//! The rectangle lives in the pixel space of one image. After every mutation
//! it satisfies:
//!
//! - `0 <= x` and `x + width <= image_width`
//! - `0 <= y` and `y + height <= image_height`
//! - `width / height == aspect_ratio` (within floating-point tolerance)

use crate::error::{AppError, Result};

/// Top-left corner of a crop rectangle, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Integer crop box in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CropRegion {
    position: Position,
    width: f64,
    height: f64,
    aspect_ratio: f64,
    image_width: f64,
    image_height: f64,
}

fn validate_ratio(ratio: f64) -> Result<f64> {
    if ratio.is_finite() && ratio > 0.0 {
        Ok(ratio)
    } else {
        Err(AppError::InvalidAspectRatio(ratio))
    }
}

/// Largest `width x height` with `width / height == ratio` that fits in the bounds.
fn fit_size(ratio: f64, max_width: f64, max_height: f64) -> (f64, f64) {
    let width_at_full_height = max_height * ratio;
    if width_at_full_height <= max_width {
        (width_at_full_height, max_height)
    } else {
        (max_width, max_width / ratio)
    }
}

impl CropRegion {
    /// Creates a region at the origin, as large as the ratio allows inside the image.
    pub fn new(image_width: u32, image_height: u32, aspect_ratio: f64) -> Result<Self> {
        if image_width == 0 || image_height == 0 {
            return Err(AppError::InvalidDimensions {
                width: image_width as f64,
                height: image_height as f64,
            });
        }
        let aspect_ratio = validate_ratio(aspect_ratio)?;
        let image_width = image_width as f64;
        let image_height = image_height as f64;
        let (width, height) = fit_size(aspect_ratio, image_width, image_height);

        Ok(Self {
            position: Position::ORIGIN,
            width,
            height,
            aspect_ratio,
            image_width,
            image_height,
        })
    }

    /// Creates a region whose ratio comes from a target output size.
    pub fn for_output(
        image_width: u32,
        image_height: u32,
        output_width: u32,
        output_height: u32,
    ) -> Result<Self> {
        if output_width == 0 || output_height == 0 {
            return Err(AppError::InvalidDimensions {
                width: output_width as f64,
                height: output_height as f64,
            });
        }
        Self::new(
            image_width,
            image_height,
            output_width as f64 / output_height as f64,
        )
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    /// Pixel size of the image this region was laid out over.
    pub fn image_size(&self) -> (u32, u32) {
        (self.image_width as u32, self.image_height as u32)
    }

    /// Changes the ratio and refits the rectangle inside the image.
    ///
    /// The new size is the largest one with the given ratio that fits the
    /// image ("fit", never "fill"). The position is then clamped again because
    /// the resize may have pushed the rectangle past an edge.
    pub fn set_aspect_ratio(&mut self, ratio: f64) -> Result<()> {
        self.aspect_ratio = validate_ratio(ratio)?;
        let (width, height) = fit_size(self.aspect_ratio, self.image_width, self.image_height);
        self.width = width;
        self.height = height;
        self.position = self.clamp_position(self.position);
        Ok(())
    }

    /// Resizes to `height`, deriving the width from the ratio.
    ///
    /// A size that would not fit is scaled down to fit the image.
    pub fn resize_to_height(&mut self, height: f64) -> Result<()> {
        if !height.is_finite() || height <= 0.0 {
            return Err(AppError::InvalidDimensions {
                width: height * self.aspect_ratio,
                height,
            });
        }
        let width = height * self.aspect_ratio;
        if width <= self.image_width && height <= self.image_height {
            self.width = width;
            self.height = height;
        } else {
            let (width, height) =
                fit_size(self.aspect_ratio, self.image_width, self.image_height);
            self.width = width;
            self.height = height;
        }
        self.position = self.clamp_position(self.position);
        Ok(())
    }

    /// Moves the rectangle, clamped to the image. Returns the position actually taken.
    pub fn move_to(&mut self, requested: Position) -> Position {
        self.position = self.clamp_position(requested);
        self.position
    }

    /// Adjusts `position` so the rectangle stays inside the image.
    ///
    /// Each axis is clamped independently. Idempotent.
    pub fn clamp_position(&self, position: Position) -> Position {
        Position {
            x: clamp_axis(position.x, self.width, self.image_width),
            y: clamp_axis(position.y, self.height, self.image_height),
        }
    }

    /// Integer box for cropping: position floored, size rounded, intersected with the image.
    pub fn crop_box(&self) -> CropBox {
        let (image_width, image_height) = self.image_size();
        let x = (self.position.x.floor().max(0.0) as u32).min(image_width - 1);
        let y = (self.position.y.floor().max(0.0) as u32).min(image_height - 1);
        let width = (self.width.round() as u32).clamp(1, image_width - x);
        let height = (self.height.round() as u32).clamp(1, image_height - y);
        CropBox {
            x,
            y,
            width,
            height,
        }
    }
}

fn clamp_axis(start: f64, extent: f64, limit: f64) -> f64 {
    let max_start = (limit - extent).max(0.0);
    if start.is_nan() || start < 0.0 {
        0.0
    } else if start > max_start {
        max_start
    } else {
        start
    }
}
