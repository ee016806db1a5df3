//! State management for the captioning workbench.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::{LAST_DIRECTORY_FILE, SETTINGS_FILE};
use crate::error::Result;

pub mod crop_region;
pub mod image_set;
pub mod settings;

pub use crop_region::{CropBox, CropRegion, Position};
pub use image_set::ImageSet;
pub use settings::Settings;

/// Application-wide state container.
pub struct AppState {
    /// Images of the currently open directory, if any.
    pub images: Arc<Mutex<Option<ImageSet>>>,
    pub settings: Settings,
    /// Where `settings.json` and `last_directory.txt` live.
    pub config_dir: PathBuf,
}

impl AppState {
    /// Loads settings from `config_dir`, starting with no directory open.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let settings = Settings::load(&config_dir.join(SETTINGS_FILE))?;
        Ok(Self {
            images: Arc::new(Mutex::new(None)),
            settings,
            config_dir: config_dir.to_path_buf(),
        })
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    pub fn last_directory_path(&self) -> PathBuf {
        self.config_dir.join(LAST_DIRECTORY_FILE)
    }

    /// Directory to open on launch: the remembered one, else the configured default.
    pub fn startup_directory(&self) -> Option<PathBuf> {
        self.settings
            .load_last_directory(&self.last_directory_path())
            .or_else(|| self.settings.default_directory().filter(|dir| dir.is_dir()))
    }
}
