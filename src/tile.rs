use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::error::TileError;

#[allow(unused_imports)]
use log::{debug, trace};

/// One input file selected for packing, before it is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSource {
    /// Position in the sorted input list
    pub source_index: usize,
    /// Number extracted from the file name, used for sorting
    pub sort_key: u64,
    pub path: PathBuf,
}

impl TileSource {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// A decoded sprite whose dimensions have been checked against the sprite size.
#[derive(Debug, Clone)]
pub struct Tile {
    pub source_index: usize,
    pub sort_key: u64,
    pub name: String,
    image: RgbaImage,
}

impl Tile {
    pub fn new(source_index: usize, sort_key: u64, name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            source_index,
            sort_key,
            name: name.into(),
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Row-major RGBA bytes
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    #[allow(dead_code)]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Decodes any format the `image` crate was built with into RGBA8.
pub fn decode_rgba(bytes: &[u8], path: &Path) -> Result<RgbaImage, TileError> {
    let img = image::load_from_memory(bytes).map_err(|source| TileError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.into_rgba8())
}

/// Reads, decodes and size-checks one tile. Runs on the decode pool.
pub fn load_tile(source: &TileSource, sprite_size: u32) -> Result<Tile, TileError> {
    let bytes = std::fs::read(&source.path).map_err(|e| TileError::Read {
        path: source.path.clone(),
        source: e,
    })?;

    let image = decode_rgba(&bytes, &source.path)?;
    let (width, height) = image.dimensions();
    if width != sprite_size || height != sprite_size {
        return Err(TileError::SizeMismatch {
            path: source.path.clone(),
            expected: sprite_size,
            width,
            height,
        });
    }

    trace!("Decoded {} ({}x{})", source.name(), width, height);
    Ok(Tile::new(source.source_index, source.sort_key, source.name(), image))
}
