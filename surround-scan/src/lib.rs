/// Baked colour maps and surround scanning for Bevy worlds
pub mod checkpoint;
pub mod colour_map;
pub mod config;
pub mod coverage;
pub mod physics;
pub mod point_log;
pub mod scanner;
pub mod scene;
pub mod spin;

use bevy::prelude::*;

pub use checkpoint::{CheckpointPlugin, CombinedScansWritten, ScanCheckpoint, ScanProgress};
pub use colour_map::{
    BakeMapsRequest, BakedColourMaps, ClearColourMaps, ColourMapPlugin, ColourMapsBaked,
};
pub use config::{ConfigError, SurroundScanConfig};
pub use coverage::SegmentCoverageTracker;
pub use scanner::{
    ScanCoverageComplete, ScanSaved, ScanStarted, ScannerPlugin, StartScanRequest,
    StopScanRequest, SurroundScanner,
};
pub use spin::{SpinDriver, SpinPlugin};

/// Everything needed to bake colour maps and run scans. Insert a
/// [`SurroundScanConfig`] before adding the plugin to override defaults.
pub struct SurroundScanPlugin;

impl Plugin for SurroundScanPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SurroundScanConfig>().add_plugins((
            ColourMapPlugin,
            ScannerPlugin,
            CheckpointPlugin,
            SpinPlugin,
        ));
    }
}
