use std::collections::HashMap;

use crate::fingerprint::Fingerprint;
use crate::tile::Tile;

#[allow(unused_imports)]
use log::{debug, info};

/// A tile dropped because an earlier tile had the same pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub source_index: usize,
    pub name: String,
    pub original_index: usize,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub unique: Vec<Tile>,
    pub duplicates: Vec<Duplicate>,
}

/// Keeps the first occurrence of each distinct pixel buffer.
///
/// The seen-set lives in this value, so each run starts from an empty set.
/// Decisions are made in a single sequential scan; callers feed results in
/// `source_index` order so the lowest index always wins.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashMap<Fingerprint, usize>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Records the tile's fingerprint, or reports which earlier tile it repeats.
    pub fn admit(&mut self, tile: &Tile) -> Result<Fingerprint, Duplicate> {
        let fingerprint = Fingerprint::of(tile.pixels());
        if let Some(&original_index) = self.seen.get(&fingerprint) {
            return Err(Duplicate {
                source_index: tile.source_index,
                name: tile.name.clone(),
                original_index,
                fingerprint,
            });
        }
        self.seen.insert(fingerprint, tile.source_index);
        Ok(fingerprint)
    }

    pub fn dedupe<R>(&mut self, results: R) -> DedupOutcome
    where
        R: IntoIterator<Item = Option<Tile>>,
    {
        let mut outcome = DedupOutcome::default();

        for tile in results.into_iter().flatten() {
            match self.admit(&tile) {
                Ok(fingerprint) => {
                    debug!("Keeping {} (#{}, key {}) [{}]", tile.name, tile.source_index, tile.sort_key, fingerprint.short());
                    outcome.unique.push(tile);
                }
                Err(duplicate) => {
                    info!(
                        "Skipping duplicate {} (#{}, same pixels as #{}) [{}]",
                        duplicate.name, duplicate.source_index, duplicate.original_index, duplicate.fingerprint.short()
                    );
                    outcome.duplicates.push(duplicate);
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn tile(index: usize, color: u8) -> Tile {
        Tile::new(
            index,
            index as u64,
            format!("tile_{index}.png"),
            RgbaImage::from_pixel(4, 4, Rgba([color, color, color, 255])),
        )
    }

    #[test]
    fn test_first_occurrence_wins() {
        let input = vec![Some(tile(0, 1)), Some(tile(1, 2)), Some(tile(2, 3)), Some(tile(3, 4)), Some(tile(4, 3))];

        let outcome = Deduplicator::new().dedupe(input);
        let kept: Vec<usize> = outcome.unique.iter().map(|t| t.source_index).collect();
        assert_eq!(kept, vec![0, 1, 2, 3]);
        assert_eq!(outcome.duplicates.len(), 1);
        assert_eq!(outcome.duplicates[0].source_index, 4);
        assert_eq!(outcome.duplicates[0].original_index, 2);
    }

    #[test]
    fn test_absent_entries_are_skipped() {
        let input = vec![None, Some(tile(1, 9)), None, Some(tile(3, 9)), Some(tile(4, 8))];

        let outcome = Deduplicator::new().dedupe(input);
        let kept: Vec<usize> = outcome.unique.iter().map(|t| t.source_index).collect();
        assert_eq!(kept, vec![1, 4]);
        assert_eq!(outcome.duplicates[0].original_index, 1);
    }

    #[test]
    fn test_each_deduplicator_starts_empty() {
        let mut first = Deduplicator::new();
        first.dedupe(vec![Some(tile(0, 5))]);
        assert_eq!(first.seen_count(), 1);

        let outcome = Deduplicator::new().dedupe(vec![Some(tile(0, 5))]);
        assert_eq!(outcome.unique.len(), 1);
        assert!(outcome.duplicates.is_empty());
    }

    #[test]
    fn test_all_identical() {
        let input: Vec<Option<Tile>> = (0..6).map(|i| Some(tile(i, 42))).collect();
        let outcome = Deduplicator::new().dedupe(input);
        assert_eq!(outcome.unique.len(), 1);
        assert_eq!(outcome.unique[0].source_index, 0);
        assert_eq!(outcome.duplicates.len(), 5);
    }
}
