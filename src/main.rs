mod atlas;
mod build_info;
mod config;
mod dedupe;
mod error;
mod file_io;
mod fingerprint;
mod logging;
mod pipeline;
mod pool;
mod settings;
mod tile;
mod utils;

#[allow(unused_imports)]
use log::{Level, trace, debug, info, warn, error};

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use once_cell::sync::Lazy;

use crate::atlas::LayoutPolicy;
use crate::build_info::BuildInfo;
use crate::config::Config;
use crate::error::SheetError;
use crate::pipeline::Pipeline;
use crate::settings::SheetSettings;

const APP_NAME: &str = "tilesheet";

static LONG_VERSION: Lazy<String> = Lazy::new(BuildInfo::detailed_info);

/// Pack a directory of fixed-size tiles into one deduplicated spritesheet.
#[derive(Debug, Parser)]
#[command(name = "tilesheet", version, long_version = LONG_VERSION.as_str())]
struct Args {
    /// Directory containing the tiles [default: ./out/]
    input_dir: Option<PathBuf>,

    /// Output PNG path [default: spritesheet.png]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tile edge length in pixels [default: 32]
    #[arg(short, long)]
    sprite_size: Option<u32>,

    /// Maximum number of tiles decoded at once [default: 8]
    #[arg(short = 'j', long = "concurrency")]
    concurrency_limit: Option<usize>,

    /// Grid layout policy
    #[arg(long, value_enum)]
    layout: Option<LayoutPolicy>,

    /// Columns for the power-of-two layout [default: atlas size / sprite size]
    #[arg(long)]
    max_columns: Option<u32>,

    /// Texture width used to derive the column count [default: 2048]
    #[arg(long)]
    atlas_size: Option<u32>,

    /// File extension to treat as a tile; repeat for several
    #[arg(long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// Build the atlas without writing it
    #[arg(long)]
    dry_run: bool,

    /// Settings file [default: <config dir>/tilesheet/settings.yaml]
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Write the effective settings as a commented YAML file and exit
    #[arg(long)]
    write_settings: bool,

    /// Log debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn log_level(&self) -> Option<LevelFilter> {
        if self.verbose {
            Some(LevelFilter::Debug)
        } else if self.quiet {
            Some(LevelFilter::Warn)
        } else {
            None
        }
    }

    /// Command line values take precedence over the settings file
    fn apply(&self, settings: &mut SheetSettings) {
        if let Some(dir) = &self.input_dir {
            settings.input_dir = dir.clone();
        }
        if let Some(output) = &self.output {
            settings.output = output.clone();
        }
        if let Some(size) = self.sprite_size {
            settings.sprite_size = size;
        }
        if let Some(limit) = self.concurrency_limit {
            settings.concurrency_limit = limit;
        }
        if let Some(layout) = self.layout {
            settings.layout = layout;
        }
        if let Some(columns) = self.max_columns {
            settings.max_columns = Some(columns);
        }
        if let Some(atlas_size) = self.atlas_size {
            settings.atlas_size = atlas_size;
        }
        if !self.extensions.is_empty() {
            settings.extensions = self.extensions.clone();
        }
    }
}

fn run(args: &Args) -> Result<(), SheetError> {
    let mut settings = SheetSettings::load(args.settings.as_deref())?;
    args.apply(&mut settings);

    if args.write_settings {
        let path = args.settings.clone().unwrap_or_else(SheetSettings::settings_path);
        settings.save_to(&path)?;
        return Ok(());
    }

    let mut config = Config::from_settings(&settings)?;
    config.dry_run = args.dry_run;

    let pipeline = Pipeline::new(config);
    let config = pipeline.config();
    debug!(
        "Packing {:?} -> {:?}: {}px sprites, {:?} layout, {} columns max, {} decode workers",
        config.input_dir, config.output, config.sprite_size, config.layout, config.max_columns, config.concurrency_limit
    );

    let report = pipeline.run()?;
    info!(
        "Packed {} unique tiles from {} decoded of {} found ({} duplicates, {} failed) into {}x{}",
        report.unique,
        report.decoded,
        report.candidates,
        report.duplicates,
        report.failed,
        report.geometry.atlas_width,
        report.geometry.atlas_height
    );
    if let Some(output) = &report.output {
        debug!("Atlas written to {:?}", output);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_buffer = logging::setup_logger(args.log_level());
    logging::setup_panic_hook(APP_NAME, log_buffer);
    debug!("{} {}", APP_NAME, BuildInfo::display_version());

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_empty_input() => {
            error!("{}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_settings() {
        let args = Args::parse_from([
            "tilesheet", "tiles/", "-o", "sheet.png", "-s", "16", "-j", "2", "--layout", "square",
            "--extension", "png", "--extension", "bmp",
        ]);
        let mut settings = SheetSettings::default();
        args.apply(&mut settings);

        assert_eq!(settings.input_dir, PathBuf::from("tiles/"));
        assert_eq!(settings.output, PathBuf::from("sheet.png"));
        assert_eq!(settings.sprite_size, 16);
        assert_eq!(settings.concurrency_limit, 2);
        assert_eq!(settings.layout, LayoutPolicy::Square);
        assert_eq!(settings.extensions, vec!["png".to_string(), "bmp".to_string()]);
        assert_eq!(settings.max_columns, None);
    }

    #[test]
    fn test_no_flags_keep_settings() {
        let args = Args::parse_from(["tilesheet"]);
        let mut settings = SheetSettings { sprite_size: 24, max_columns: Some(7), ..Default::default() };
        args.apply(&mut settings);

        assert_eq!(settings.sprite_size, 24);
        assert_eq!(settings.max_columns, Some(7));
        assert_eq!(args.log_level(), None);
    }

    #[test]
    fn test_power_of_two_flag_value() {
        let args = Args::parse_from(["tilesheet", "--layout", "power-of-two", "-v"]);
        assert_eq!(args.layout, Some(LayoutPolicy::PowerOfTwo));
        assert_eq!(args.log_level(), Some(LevelFilter::Debug));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Args::try_parse_from(["tilesheet", "-v", "-q"]).is_err());
    }
}
