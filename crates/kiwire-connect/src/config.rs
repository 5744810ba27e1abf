//! `kiwire.toml` editor settings.

use std::fs;
use std::path::{Path, PathBuf};

use kiwire_schematic::DEFAULT_GRID;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "kiwire.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("grid must be a positive number, got {0}")]
    InvalidGrid(f64),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Coincidence resolution in millimetres.
    pub grid: f64,
    /// Draw straight diagonal wires instead of two-segment orthogonal paths.
    pub allow_diagonal: bool,
    /// Copy the previous file to `<stem>.bak<N>.<ext>` before each save.
    pub backup: bool,
    /// Searched for `<Nickname>.kicad_sym` before the KiCad install.
    pub library_dirs: Vec<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            grid: DEFAULT_GRID,
            allow_diagonal: false,
            backup: true,
            library_dirs: Vec::new(),
        }
    }
}

impl EditorConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: EditorConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        // Relative library directories are relative to the config file
        if let Some(base) = path.parent() {
            for dir in &mut config.library_dirs {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }

        config.validate()?;
        log::debug!("Loaded editor config from {}", path.display());
        Ok(config)
    }

    /// Settings for a schematic: the nearest `kiwire.toml` at or above its
    /// directory, or the defaults when there is none.
    pub fn discover(schematic: &Path) -> Result<Self, ConfigError> {
        match find_config_file(schematic) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid.is_finite() && self.grid > 0.0) {
            return Err(ConfigError::InvalidGrid(self.grid));
        }
        Ok(())
    }
}

/// Walk up from `start` (or its parent, for a file) looking for `kiwire.toml`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = if start.is_dir() {
        Some(start.to_path_buf())
    } else {
        start.parent().map(Path::to_path_buf)
    };

    while let Some(dir) = current {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = dir.parent().map(Path::to_path_buf);
    }
    None
}
