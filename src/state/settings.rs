//! Persisted user settings and the remembered last directory.

use crate::error::{AppError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Contents of `settings.json`. Missing keys fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dark_mode_on_launch: bool,
    pub default_directory: String,
    pub remember_last_directory: bool,
}

impl Settings {
    /// Loads settings, returning defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(AppError::io(path, e)),
        };

        serde_json::from_str(&contents).map_err(|source| AppError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes settings as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| AppError::Settings {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|e| AppError::io(path, e))
    }

    pub fn default_directory(&self) -> Option<PathBuf> {
        if self.default_directory.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.default_directory))
        }
    }

    /// Reads the remembered directory, if remembering is on and it still exists.
    pub fn load_last_directory(&self, path: &Path) -> Option<PathBuf> {
        if !self.remember_last_directory {
            return None;
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to read {}: {}", path.display(), e);
                }
                return None;
            }
        };

        let directory = PathBuf::from(contents.trim());
        if directory.as_os_str().is_empty() || !directory.exists() {
            debug!("Remembered directory {:?} no longer exists", directory);
            return None;
        }
        Some(directory)
    }

    /// Records `directory` as the last one chosen. No-op unless remembering is on.
    pub fn store_last_directory(&self, path: &Path, directory: &Path) -> Result<()> {
        if !self.remember_last_directory {
            return Ok(());
        }
        fs::write(path, directory.to_string_lossy().as_bytes())
            .map_err(|e| AppError::io(path, e))
    }

    /// Directory a directory picker should start in.
    ///
    /// Prefers the current directory when remembering is on, then the
    /// configured default.
    pub fn start_directory(&self, current: Option<&Path>) -> Option<PathBuf> {
        match current {
            Some(dir) if self.remember_last_directory => Some(dir.to_path_buf()),
            _ => self.default_directory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(!settings.remember_last_directory);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            dark_mode_on_launch: true,
            default_directory: "/data/images".into(),
            remember_last_directory: true,
        };
        settings.save(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  \"dark_mode_on_launch\": true"));
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn missing_keys_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"dark_mode_on_launch": true}"#).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert!(settings.dark_mode_on_launch);
        assert_eq!(settings.default_directory, "");
        assert_eq!(settings.default_directory(), None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(AppError::Settings { .. })
        ));
    }

    #[test]
    fn last_directory_requires_remembering() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("last_directory.txt");
        let target = dir.path().join("photos");
        fs::create_dir(&target).unwrap();

        let mut settings = Settings::default();
        settings.store_last_directory(&file, &target).unwrap();
        assert!(!file.exists());
        assert_eq!(settings.load_last_directory(&file), None);

        settings.remember_last_directory = true;
        settings.store_last_directory(&file, &target).unwrap();
        assert_eq!(settings.load_last_directory(&file), Some(target.clone()));

        fs::remove_dir(&target).unwrap();
        assert_eq!(settings.load_last_directory(&file), None);
    }

    #[test]
    fn last_directory_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("last_directory.txt");
        fs::write(&file, format!("{}\n", dir.path().display())).unwrap();
        let settings = Settings {
            remember_last_directory: true,
            ..Settings::default()
        };
        assert_eq!(
            settings.load_last_directory(&file),
            Some(dir.path().to_path_buf())
        );
    }

    #[test]
    fn start_directory_preference() {
        let mut settings = Settings {
            default_directory: "/defaults".into(),
            ..Settings::default()
        };
        let current = Path::new("/current");
        assert_eq!(
            settings.start_directory(Some(current)),
            Some(PathBuf::from("/defaults"))
        );
        settings.remember_last_directory = true;
        assert_eq!(
            settings.start_directory(Some(current)),
            Some(PathBuf::from("/current"))
        );
        assert_eq!(
            settings.start_directory(None),
            Some(PathBuf::from("/defaults"))
        );
    }
}
