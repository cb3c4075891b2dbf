// Version details stamped in by build.rs, shown by `tilesheet --version`

use crate::atlas::LayoutPolicy;
use crate::config::{DEFAULT_CONCURRENCY_LIMIT, DEFAULT_SPRITE_SIZE};

pub struct BuildInfo;

impl BuildInfo {
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
    pub const COMMIT: &'static str = env!("TILESHEET_COMMIT");
    pub const BUILD_DATE: &'static str = env!("TILESHEET_BUILD_DATE");
    pub const TARGET: &'static str = env!("TILESHEET_TARGET");
    pub const PROFILE: &'static str = env!("TILESHEET_PROFILE");

    /// One-line version for the startup log, e.g. `0.1.0 (abc1234)`
    pub fn display_version() -> String {
        format!("{} ({})", Self::VERSION, Self::COMMIT)
    }

    /// `--version` body: build provenance plus the packing defaults compiled in
    pub fn detailed_info() -> String {
        let layouts = [LayoutPolicy::PowerOfTwo, LayoutPolicy::Square]
            .iter()
            .map(|policy| policy.name())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{version}\n\
             commit {commit}, built {date} ({profile}, {target})\n\
             tile decoder: png, fingerprint: sha256\n\
             layouts: {layouts} (default {default_layout})\n\
             defaults: {sprite}px sprites, {workers} decode workers",
            version = Self::VERSION,
            commit = Self::COMMIT,
            date = Self::BUILD_DATE,
            profile = Self::PROFILE,
            target = Self::TARGET,
            layouts = layouts,
            default_layout = LayoutPolicy::default().name(),
            sprite = DEFAULT_SPRITE_SIZE,
            workers = DEFAULT_CONCURRENCY_LIMIT,
        )
    }
}
