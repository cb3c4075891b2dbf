use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SheetError;
use crate::tile::TileSource;

#[allow(unused_imports)]
use log::{debug, info, warn, error};

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("digit pattern is valid"));

pub fn get_filename(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|os_str| os_str.to_str())
        .map(|s| s.to_string())
}

/// Sort key taken from the first run of ASCII digits in a file name.
/// Names without digits, or whose digits overflow u64, get 0.
pub fn sort_key(file_name: &str) -> u64 {
    match DIGITS.find(file_name) {
        Some(m) => match m.as_str().parse::<u64>() {
            Ok(n) => n,
            Err(_) => {
                warn!("Number in {} is out of range, sorting it as 0", file_name);
                0
            }
        },
        None => {
            warn!("No number in {}, sorting it as 0", file_name);
            0
        }
    }
}

fn has_allowed_extension(path: &Path, allowed_extensions: &[String]) -> bool {
    match path.extension().and_then(OsStr::to_str) {
        Some(extension) => allowed_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(extension)),
        None => false,
    }
}

/// Lists the tiles in `directory_path`, ordered by their numeric key with
/// natural file-name order breaking ties. Only regular files directly inside the
/// directory are considered.
pub fn list_tiles(directory_path: &Path, allowed_extensions: &[String]) -> Result<Vec<TileSource>, SheetError> {
    let entries = fs::read_dir(directory_path).map_err(|source| SheetError::DirectoryRead {
        path: directory_path.to_path_buf(),
        source,
    })?;

    let mut keyed: Vec<(u64, String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SheetError::DirectoryRead {
            path: directory_path.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if !has_allowed_extension(&path, allowed_extensions) {
            continue;
        }
        // Follows symlinks, same as opening the file later
        if !fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false) {
            debug!("Skipping non-file entry {:?}", path);
            continue;
        }
        let Some(name) = get_filename(&path) else {
            warn!("Skipping {:?}: file name is not valid UTF-8", path);
            continue;
        };

        keyed.push((sort_key(&name), name, path));
    }

    keyed.sort_by(|(key_a, name_a, _), (key_b, name_b, _)| match key_a.cmp(key_b) {
        Ordering::Equal => alphanumeric_sort::compare_str(name_a, name_b),
        other => other,
    });

    let sources: Vec<TileSource> = keyed
        .into_iter()
        .enumerate()
        .map(|(source_index, (sort_key, _, path))| TileSource { source_index, sort_key, path })
        .collect();

    debug!(
        "Tiles sorted: {}",
        sources.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
    );
    Ok(sources)
}

/// Writes the encoded atlas, creating missing parent directories.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<(), SheetError> {
    let to_write_error = |source: std::io::Error| SheetError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(to_write_error)?;
        }
    }
    fs::write(path, bytes).map_err(to_write_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn png() -> Vec<String> {
        vec!["png".to_string()]
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_sort_key() {
        assert_eq!(sort_key("tile_12.png"), 12);
        assert_eq!(sort_key("frame007_v2.png"), 7);
        assert_eq!(sort_key("grass.png"), 0);
        assert_eq!(sort_key("tile_99999999999999999999999.png"), 0);
    }

    #[test]
    fn test_sort_key_ignores_non_ascii_digits() {
        assert_eq!(sort_key("tile_\u{0663}_5.png"), 5);
        assert_eq!(sort_key("\u{0663}\u{0664}.png"), 0);
    }

    #[test]
    fn test_non_ascii_digit_name_sorted_by_ascii_number() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "tile_1.png");
        touch(dir.path(), "a\u{0663}_9.png");
        touch(dir.path(), "tile_2.png");

        let tiles = list_tiles(dir.path(), &png()).unwrap();
        let names: Vec<String> = tiles.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["tile_1.png", "tile_2.png", "a\u{0663}_9.png"]);
        assert_eq!(tiles[2].sort_key, 9);
    }

    #[test]
    fn test_numeric_not_lexical_order() {
        let dir = tempdir().unwrap();
        for name in ["tile_10.png", "tile_2.png", "tile_1.png", "tile_0.png"] {
            touch(dir.path(), name);
        }

        let tiles = list_tiles(dir.path(), &png()).unwrap();
        let names: Vec<String> = tiles.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["tile_0.png", "tile_1.png", "tile_2.png", "tile_10.png"]);
        let indices: Vec<usize> = tiles.iter().map(|t| t.source_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(tiles[3].sort_key, 10);
    }

    #[test]
    fn test_filters_extensions_case_insensitively() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a_1.PNG");
        touch(dir.path(), "b_2.png");
        touch(dir.path(), "notes_3.txt");
        touch(dir.path(), "noext");
        fs::create_dir(dir.path().join("sub_4.png")).unwrap();

        let tiles = list_tiles(dir.path(), &png()).unwrap();
        let names: Vec<String> = tiles.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["a_1.PNG", "b_2.png"]);
    }

    #[test]
    fn test_unnumbered_names_sort_first_in_natural_order() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "tile_1.png");
        touch(dir.path(), "water.png");
        touch(dir.path(), "grass.png");
        touch(dir.path(), "tile_0.png");

        let names: Vec<String> = list_tiles(dir.path(), &png()).unwrap().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["grass.png", "tile_0.png", "water.png", "tile_1.png"]);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempdir().unwrap();
        let err = list_tiles(&dir.path().join("nope"), &png()).unwrap_err();
        assert!(matches!(err, SheetError::DirectoryRead { .. }));
    }

    #[test]
    fn test_write_output_creates_parents() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested/deeper/sheet.png");
        write_output(&out, b"abc").unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"abc");
    }
}
