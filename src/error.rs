use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn one input file into a usable tile.
/// These are always recovered by dropping the tile.
#[derive(Debug, Error)]
pub enum TileError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{path:?} is {width}x{height}, expected {expected}x{expected}")]
    SizeMismatch {
        path: PathBuf,
        expected: u32,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("cannot lay out an atlas with zero tiles")]
    EmptyInput,

    #[error("invalid layout parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("atlas of {columns} columns x {rows} rows with {sprite_size}px sprites exceeds u32 dimensions")]
    TooLarge {
        columns: u32,
        rows: u32,
        sprite_size: u32,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("{count} tiles do not fit in a {capacity}-slot atlas")]
    CapacityExceeded { count: usize, capacity: usize },

    #[error("tile {name} is {width}x{height}, expected {expected}x{expected}")]
    TileSizeMismatch {
        name: String,
        expected: u32,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("concurrency limit must be at least 1")]
    ZeroLimit,

    #[error("failed to start decode workers: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize settings for {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write settings file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sprite size must be at least 1")]
    ZeroSpriteSize,

    #[error("concurrency limit must be at least 1")]
    ZeroConcurrency,

    #[error("max columns must be at least 1")]
    ZeroColumns,

    #[error("at least one input extension is required")]
    NoExtensions,
}

/// Run-level failures. Any of these aborts the run without producing an atlas.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("cannot read input directory {path:?}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no usable tiles in {path:?}")]
    EmptyInput { path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Layout(LayoutError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("failed to encode atlas: {0}")]
    Encode(#[source] image::ImageError),

    #[error("failed to write atlas to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SheetError {
    pub fn is_empty_input(&self) -> bool {
        matches!(self, SheetError::EmptyInput { .. })
    }
}
