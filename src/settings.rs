use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};

use crate::atlas::LayoutPolicy;
use crate::config::{
    DEFAULT_ATLAS_SIZE, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_FILE,
    DEFAULT_SPRITE_SIZE,
};
use crate::error::SettingsError;

/// User settings loaded from `settings.yaml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSettings {
    /// Directory containing the tiles
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Where the spritesheet is written
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Edge length of every tile in pixels
    #[serde(default = "default_sprite_size")]
    pub sprite_size: u32,

    /// Maximum number of tiles decoded at once
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// "power-of-two" or "square"
    #[serde(default)]
    pub layout: LayoutPolicy,

    /// Columns for the power-of-two layout; derived from atlas_size when absent
    #[serde(default)]
    pub max_columns: Option<u32>,

    /// Target texture width used to derive max_columns
    #[serde(default = "default_atlas_size")]
    pub atlas_size: u32,

    /// File extensions treated as tiles
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT_DIR)
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILE)
}

fn default_sprite_size() -> u32 {
    DEFAULT_SPRITE_SIZE
}

fn default_concurrency_limit() -> usize {
    DEFAULT_CONCURRENCY_LIMIT
}

fn default_atlas_size() -> u32 {
    DEFAULT_ATLAS_SIZE
}

fn default_extensions() -> Vec<String> {
    vec!["png".to_string()]
}

impl Default for SheetSettings {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output: default_output(),
            sprite_size: DEFAULT_SPRITE_SIZE,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            layout: LayoutPolicy::default(),
            max_columns: None,
            atlas_size: DEFAULT_ATLAS_SIZE,
            extensions: default_extensions(),
        }
    }
}

impl SheetSettings {
    /// On Linux: ~/.config/tilesheet/settings.yaml
    /// On macOS: ~/Library/Application Support/tilesheet/settings.yaml
    pub fn settings_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tilesheet")
            .join("settings.yaml")
    }

    /// Loads an explicitly requested settings file. Any failure is an error.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_yaml::from_str::<SheetSettings>(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded settings from {:?}", path);
        debug!("Settings: {:?}", settings);
        Ok(settings)
    }

    /// Loads `custom_path` if given, otherwise the default settings file.
    /// A missing or broken default file falls back to built-in defaults.
    pub fn load(custom_path: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = custom_path {
            info!("Using custom settings path: {:?}", path);
            return Self::load_from(path);
        }

        let path = Self::settings_path();
        if !path.exists() {
            debug!("Settings file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        match Self::load_from(&path) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!("{}; using default settings", e);
                Ok(Self::default())
            }
        }
    }

    /// Writes the settings as commented YAML, creating the parent directory.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let to_write_error = |source: std::io::Error| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(to_write_error)?;
            }
        }

        let contents = self.to_yaml_with_comments().map_err(|source| SettingsError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, contents).map_err(to_write_error)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Generate YAML content with comments for new files.
    /// Every value goes through serde_yaml so quoting and escaping match what `load` reads back.
    fn to_yaml_with_comments(&self) -> Result<String, serde_yaml::Error> {
        let extensions = yaml_value(&self.extensions)?;
        // A non-empty list is written as a block sequence on the following lines
        let extensions = if self.extensions.is_empty() {
            format!(" {}", extensions)
        } else {
            format!("\n{}", extensions)
        };

        Ok(format!(
            r#"# tilesheet settings
# Command line flags override the values here.

# Directory containing the tiles
input_dir: {}

# Output spritesheet path
output: {}

# Edge length of each tile in pixels. Tiles of any other size are skipped.
sprite_size: {}

# Maximum number of tiles decoded at the same time
concurrency_limit: {}

# Layout policy: "power-of-two" or "square"
# - "power-of-two": fixed column count, height rounded up to a power of two
# - "square": roughly square grid sized exactly to the tiles
layout: {}

# Column count for the power-of-two layout (null = atlas_size / sprite_size)
max_columns: {}

# Texture width used to derive max_columns
atlas_size: {}

# File extensions treated as tiles
extensions:{}
"#,
            yaml_value(&self.input_dir)?,
            yaml_value(&self.output)?,
            self.sprite_size,
            self.concurrency_limit,
            yaml_value(&self.layout)?,
            yaml_value(&self.max_columns)?,
            self.atlas_size,
            extensions,
        ))
    }
}

fn yaml_value<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_yaml::Error> {
    Ok(serde_yaml::to_string(value)?.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: SheetSettings = serde_yaml::from_str("sprite_size: 16\nlayout: square\n").unwrap();
        assert_eq!(settings.sprite_size, 16);
        assert_eq!(settings.layout, LayoutPolicy::Square);
        assert_eq!(settings.concurrency_limit, DEFAULT_CONCURRENCY_LIMIT);
        assert_eq!(settings.extensions, vec!["png".to_string()]);
        assert_eq!(settings.max_columns, None);
    }

    #[test]
    fn test_commented_template_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf/settings.yaml");
        let mut settings = SheetSettings::default();
        settings.max_columns = Some(12);
        settings.layout = LayoutPolicy::Square;
        settings.extensions = vec!["png".to_string(), "bmp".to_string()];

        settings.save_to(&path).unwrap();
        let loaded = SheetSettings::load(Some(&path)).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_paths_with_backslashes_and_quotes_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        let settings = SheetSettings {
            input_dir: PathBuf::from(r"C:\tiles\new"),
            output: PathBuf::from(r#"out "final"\sheet: v2.png"#),
            extensions: vec!["png".to_string(), "#bmp".to_string()],
            ..Default::default()
        };

        settings.save_to(&path).unwrap();
        let loaded = SheetSettings::load_from(&path).unwrap();
        assert_eq!(loaded.input_dir, PathBuf::from(r"C:\tiles\new"));
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_empty_extension_list_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        let settings = SheetSettings { extensions: Vec::new(), ..Default::default() };

        settings.save_to(&path).unwrap();
        assert_eq!(SheetSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let err = SheetSettings::load(Some(&dir.path().join("missing.yaml"))).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    #[test]
    fn test_explicit_broken_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "sprite_size: [not, a, number]\n").unwrap();
        let err = SheetSettings::load(Some(&path)).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }
}
