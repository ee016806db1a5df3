//! Application configuration constants.

/// Supported image file extensions for scanning directories.
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

/// Extension of the caption file stored next to each image.
pub const CAPTION_EXTENSION: &str = "txt";

/// Persisted settings, relative to the working directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// Most recently chosen directory, relative to the working directory.
pub const LAST_DIRECTORY_FILE: &str = "last_directory.txt";

/// Output size preselected when a crop session opens.
pub const DEFAULT_CROP_WIDTH: u32 = 100;
pub const DEFAULT_CROP_HEIGHT: u32 = 100;
