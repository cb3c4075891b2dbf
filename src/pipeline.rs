// Spritesheet pipeline
//
// list -> decode (bounded pool) -> dedupe -> plan -> compose -> encode -> write
//
// Only decoding runs concurrently. Everything after it works on fully collected,
// index-sorted results on the calling thread.

use std::path::PathBuf;

use crate::atlas::{self, Atlas, AtlasGeometry};
use crate::config::Config;
use crate::dedupe::Deduplicator;
use crate::error::{LayoutError, SheetError, TileError};
use crate::file_io;
use crate::pool::BoundedPool;
use crate::tile::{self, Tile, TileSource};
use crate::utils::timing::{ScopedTimer, StageTimings};

#[allow(unused_imports)]
use log::{debug, info, warn, error};

#[derive(Debug)]
pub struct RunReport {
    /// Files that matched the extension filter
    pub candidates: usize,
    pub decoded: usize,
    pub failed: usize,
    pub duplicates: usize,
    pub unique: usize,
    pub geometry: AtlasGeometry,
    /// Where the atlas was written; `None` on a dry run
    pub output: Option<PathBuf>,
    pub timings: StageTimings,
}

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn empty_input(&self) -> SheetError {
        SheetError::EmptyInput {
            path: self.config.input_dir.clone(),
        }
    }

    /// Decodes every source on the bounded pool. Failed tiles leave a `None` in
    /// their slot so the result stays aligned with `source_index`.
    fn decode_all(&self, pool: &BoundedPool, sources: Vec<TileSource>) -> (Vec<Option<Tile>>, usize) {
        let sprite_size = self.config.sprite_size;
        let tasks: Vec<(usize, TileSource)> = sources.into_iter().map(|s| (s.source_index, s)).collect();

        let results = pool.run(tasks, |source: TileSource| tile::load_tile(&source, sprite_size));

        let mut failed = 0;
        let tiles: Vec<Option<Tile>> = results
            .into_iter()
            .map(|(_, result)| match result {
                Ok(tile) => Some(tile),
                Err(e) => {
                    failed += 1;
                    match e {
                        TileError::SizeMismatch { .. } => warn!("Skipping tile: {}", e),
                        _ => warn!("Error processing tile: {}", e),
                    }
                    None
                }
            })
            .collect();

        (tiles, failed)
    }

    /// Runs every stage up to composition and returns the finished atlas.
    pub fn build_atlas(&self) -> Result<(Atlas, RunReport), SheetError> {
        self.config.validate()?;
        let mut timings = StageTimings::new();

        let sources = {
            let _timer = ScopedTimer::new(&mut timings, "list");
            file_io::list_tiles(&self.config.input_dir, &self.config.extensions)?
        };
        if sources.is_empty() {
            info!("No {} images found in {:?}", self.config.extensions.join("/"), self.config.input_dir);
            return Err(self.empty_input());
        }
        let candidates = sources.len();
        info!("Found {} images.", candidates);

        let pool = BoundedPool::new(self.config.concurrency_limit)?;
        debug!("Decoding with at most {} tiles in flight", pool.limit());
        let (decoded_tiles, failed) = {
            let _timer = ScopedTimer::new(&mut timings, "decode");
            self.decode_all(&pool, sources)
        };
        let decoded = candidates - failed;
        if failed > 0 {
            warn!("{} of {} tiles could not be used", failed, candidates);
        }

        let outcome = {
            let _timer = ScopedTimer::new(&mut timings, "dedupe");
            Deduplicator::new().dedupe(decoded_tiles)
        };
        info!(
            "{} unique tiles, {} duplicates skipped",
            outcome.unique.len(),
            outcome.duplicates.len()
        );

        let geometry = atlas::plan(
            outcome.unique.len(),
            self.config.sprite_size,
            self.config.max_columns,
            self.config.layout,
        )
        .map_err(|e| match e {
            LayoutError::EmptyInput => self.empty_input(),
            other => SheetError::Layout(other),
        })?;
        info!(
            "Atlas layout ({:?}): {} columns x {} rows, {}x{} px",
            geometry.policy, geometry.columns, geometry.rows, geometry.atlas_width, geometry.atlas_height
        );

        let composed = {
            let _timer = ScopedTimer::new(&mut timings, "compose");
            atlas::compose(&geometry, &outcome.unique)?
        };
        for placement in composed.placements() {
            debug!("placing {} at ({}, {})", placement.name, placement.x, placement.y);
        }

        let report = RunReport {
            candidates,
            decoded,
            failed,
            duplicates: outcome.duplicates.len(),
            unique: outcome.unique.len(),
            geometry: *composed.geometry(),
            output: None,
            timings,
        };
        Ok((composed, report))
    }

    /// Builds the atlas, then encodes and writes it unless this is a dry run.
    pub fn run(&self) -> Result<RunReport, SheetError> {
        let (composed, mut report) = self.build_atlas()?;

        if self.config.dry_run {
            info!("Dry run, not writing {:?}", self.config.output);
            return Ok(report);
        }

        info!("All images processed. Saving spritesheet...");
        let bytes = {
            let _timer = ScopedTimer::new(&mut report.timings, "encode");
            composed.encode_png().map_err(SheetError::Encode)?
        };
        {
            let _timer = ScopedTimer::new(&mut report.timings, "write");
            file_io::write_output(&self.config.output, &bytes)?;
        }

        info!("Spritesheet saved successfully: {:?}", self.config.output);
        debug!(
            "Stage timings: {} (total {:.1}ms)",
            report.timings.summary(),
            report.timings.total().as_secs_f64() * 1000.0
        );
        report.output = Some(self.config.output.clone());
        Ok(report)
    }
}
