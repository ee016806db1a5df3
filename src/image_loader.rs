use crate::error::{AppError, Result};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::Path;

/// Decodes an image and reports the format it was stored in.
///
/// The format is sniffed from the file content, falling back to the extension.
pub fn load_with_format(path: &Path) -> Result<(DynamicImage, ImageFormat)> {
    let reader = ImageReader::open(path)
        .map_err(|e| AppError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| AppError::io(path, e))?;

    let format = match reader.format() {
        Some(format) => format,
        None => ImageFormat::from_path(path).map_err(|e| AppError::image(path, e))?,
    };
    let image = reader.decode().map_err(|e| AppError::image(path, e))?;
    Ok((image, format))
}

/// Reads pixel dimensions without decoding the whole image.
///
/// Like [`load_with_format`], the decoder is chosen from the file content.
pub fn read_dimensions(path: &Path) -> Result<(u32, u32)> {
    ImageReader::open(path)
        .map_err(|e| AppError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| AppError::io(path, e))?
        .into_dimensions()
        .map_err(|e| AppError::image(path, e))
}
