use std::path::PathBuf;

use crate::atlas::LayoutPolicy;
use crate::error::ConfigError;
use crate::settings::SheetSettings;

// Default values for configuration
pub const DEFAULT_INPUT_DIR: &str = "./out/";
pub const DEFAULT_OUTPUT_FILE: &str = "spritesheet.png";
pub const DEFAULT_SPRITE_SIZE: u32 = 32;
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 8;
pub const DEFAULT_ATLAS_SIZE: u32 = 2048;       // Texture width the power-of-two layout targets

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output: PathBuf,
    pub sprite_size: u32,
    pub concurrency_limit: usize,
    pub layout: LayoutPolicy,
    pub max_columns: u32,                       // Fixed column count for the power-of-two layout
    pub extensions: Vec<String>,
    pub dry_run: bool,                          // Build the atlas but skip encoding and writing
}

impl Config {
    pub fn from_settings(settings: &SheetSettings) -> Result<Self, ConfigError> {
        if settings.sprite_size == 0 {
            return Err(ConfigError::ZeroSpriteSize);
        }

        let max_columns = settings
            .max_columns
            .unwrap_or_else(|| (settings.atlas_size / settings.sprite_size).max(1));

        let config = Config {
            input_dir: settings.input_dir.clone(),
            output: settings.output.clone(),
            sprite_size: settings.sprite_size,
            concurrency_limit: settings.concurrency_limit,
            layout: settings.layout,
            max_columns,
            extensions: settings.extensions.clone(),
            dry_run: false,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sprite_size == 0 {
            return Err(ConfigError::ZeroSpriteSize);
        }
        if self.concurrency_limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.max_columns == 0 {
            return Err(ConfigError::ZeroColumns);
        }
        if self.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            return Err(ConfigError::NoExtensions);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            sprite_size: DEFAULT_SPRITE_SIZE,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            layout: LayoutPolicy::default(),
            max_columns: DEFAULT_ATLAS_SIZE / DEFAULT_SPRITE_SIZE,
            extensions: vec!["png".to_string()],
            dry_run: false,
        }
    }
}
