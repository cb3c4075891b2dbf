// Grid geometry for the spritesheet

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

#[allow(unused_imports)]
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutPolicy {
    /// Roughly square grid sized exactly to its rows and columns
    Square,
    /// Fixed column count with the height rounded up to a power of two
    PowerOfTwo,
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        LayoutPolicy::PowerOfTwo
    }
}

impl LayoutPolicy {
    /// Name as written in settings files and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            LayoutPolicy::Square => "square",
            LayoutPolicy::PowerOfTwo => "power-of-two",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasGeometry {
    pub columns: u32,
    pub rows: u32,
    pub atlas_width: u32,
    pub atlas_height: u32,
    pub sprite_size: u32,
    pub policy: LayoutPolicy,
}

impl AtlasGeometry {
    /// Number of grid slots
    pub fn capacity(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Top-left pixel of the `slot`-th cell, filled left to right, top to bottom.
    pub fn cell_origin(&self, slot: usize) -> (u32, u32) {
        let col = (slot % self.columns as usize) as u32;
        let row = (slot / self.columns as usize) as u32;
        (col * self.sprite_size, row * self.sprite_size)
    }
}

/// Smallest power of two that is >= `n`. Zero maps to 1, the smallest texture edge.
pub fn next_power_of_two(n: u32) -> Option<u32> {
    if n == 0 {
        return Some(1);
    }
    n.checked_next_power_of_two()
}

fn ceil_sqrt(n: u32) -> u32 {
    let n = n as u64;
    let mut root = (n as f64).sqrt() as u64;
    while root * root < n {
        root += 1;
    }
    while root > 1 && (root - 1) * (root - 1) >= n {
        root -= 1;
    }
    root as u32
}

pub fn plan(
    tile_count: usize,
    sprite_size: u32,
    max_columns: u32,
    policy: LayoutPolicy,
) -> Result<AtlasGeometry, LayoutError> {
    if tile_count == 0 {
        return Err(LayoutError::EmptyInput);
    }
    if sprite_size == 0 {
        return Err(LayoutError::InvalidParameter("sprite size is zero"));
    }
    if max_columns == 0 {
        return Err(LayoutError::InvalidParameter("max columns is zero"));
    }

    let count = u32::try_from(tile_count).map_err(|_| LayoutError::TooLarge {
        columns: max_columns,
        rows: u32::MAX,
        sprite_size,
    })?;

    let columns = match policy {
        LayoutPolicy::Square => ceil_sqrt(count),
        LayoutPolicy::PowerOfTwo => max_columns,
    };
    let rows = count.div_ceil(columns);

    let too_large = LayoutError::TooLarge { columns, rows, sprite_size };
    let atlas_width = columns.checked_mul(sprite_size).ok_or(too_large.clone())?;
    let grid_height = rows.checked_mul(sprite_size).ok_or(too_large.clone())?;
    let atlas_height = match policy {
        LayoutPolicy::Square => grid_height,
        LayoutPolicy::PowerOfTwo => next_power_of_two(grid_height).ok_or(too_large)?,
    };

    let geometry = AtlasGeometry {
        columns,
        rows,
        atlas_width,
        atlas_height,
        sprite_size,
        policy,
    };
    debug!("Planned {:?} layout for {} tiles: {:?}", policy, tile_count, geometry);
    Ok(geometry)
}
