// Blits unique tiles into the spritesheet buffer

use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{ImageEncoder, Rgba, RgbaImage};

use crate::atlas::layout::AtlasGeometry;
use crate::error::ComposeError;
use crate::tile::Tile;

#[allow(unused_imports)]
use log::trace;

/// Where one tile landed in the atlas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub source_index: usize,
    pub name: String,
    pub x: u32,
    pub y: u32,
}

/// A finished spritesheet. Read-only once returned by [`compose`].
#[derive(Debug, Clone)]
pub struct Atlas {
    image: RgbaImage,
    geometry: AtlasGeometry,
    placements: Vec<Placement>,
}

impl Atlas {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn geometry(&self) -> &AtlasGeometry {
        &self.geometry
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    #[allow(dead_code)]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }

    #[allow(dead_code)]
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut bytes = Vec::new();
        PngEncoder::new(Cursor::new(&mut bytes)).write_image(
            self.image.as_raw(),
            self.image.width(),
            self.image.height(),
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(bytes)
    }
}

fn validate(geometry: &AtlasGeometry, tiles: &[Tile]) -> Result<(), ComposeError> {
    if tiles.len() > geometry.capacity() {
        return Err(ComposeError::CapacityExceeded {
            count: tiles.len(),
            capacity: geometry.capacity(),
        });
    }

    let expected = geometry.sprite_size;
    if let Some(bad) = tiles.iter().find(|t| t.width() != expected || t.height() != expected) {
        return Err(ComposeError::TileSizeMismatch {
            name: bad.name.clone(),
            expected,
            width: bad.width(),
            height: bad.height(),
        });
    }

    Ok(())
}

/// Copies every tile into its grid cell, in the given order. Nothing is written
/// unless all tiles fit and match the sprite size.
pub fn compose(geometry: &AtlasGeometry, tiles: &[Tile]) -> Result<Atlas, ComposeError> {
    validate(geometry, tiles)?;

    let mut image = RgbaImage::new(geometry.atlas_width, geometry.atlas_height);
    let atlas_stride = geometry.atlas_width as usize * 4;
    let row_bytes = geometry.sprite_size as usize * 4;
    let mut placements = Vec::with_capacity(tiles.len());

    {
        let buffer: &mut [u8] = &mut image;
        for (slot, tile) in tiles.iter().enumerate() {
            let (x_offset, y_offset) = geometry.cell_origin(slot);

            for (y, src_row) in tile.pixels().chunks_exact(row_bytes).enumerate() {
                let start = (y_offset as usize + y) * atlas_stride + x_offset as usize * 4;
                buffer[start..start + row_bytes].copy_from_slice(src_row);
            }

            placements.push(Placement {
                source_index: tile.source_index,
                name: tile.name.clone(),
                x: x_offset,
                y: y_offset,
            });
        }
    }

    trace!("Composed {} tiles into {}x{} atlas", tiles.len(), geometry.atlas_width, geometry.atlas_height);
    Ok(Atlas {
        image,
        geometry: *geometry,
        placements,
    })
}
