//! Environment scanner.
//!
//! A [`SurroundScanner`] sweeps fans of rays around its entity on a
//! background thread while the entity turns. Hits are coloured from the
//! baked colour maps and collected into a point log that is written once the
//! scan ends. The owning thread mirrors hit positions as [`ScanHitMarker`]
//! entities and tracks heading coverage; a scan finishes on its own once the
//! agent has turned through every heading bucket and the sweep has covered
//! its whole vertical range at least once.

mod component;
mod markers;
mod sweep;
mod systems;

pub use component::{ScanContext, SurroundScanner, heading_degrees};
pub use markers::{HiddenMarker, ScanHitMarker};
pub use sweep::{ScanOutput, fan_directions, hit_colour};
pub use systems::{drive_scanners, handle_scan_requests};

use crate::config::SurroundScanConfig;
use crate::scene::ScanRayCaster;
use bevy::prelude::*;
use std::path::PathBuf;

/// Start a scan on `scanner`. Ignored while its previous sweep is still
/// running. Stop requests of the same frame are applied first, so a start
/// sent alongside a stop is not cancelled by it.
#[derive(Event, Debug, Clone, Copy)]
pub struct StartScanRequest {
    pub scanner: Entity,
}

/// End the scan that was running on `scanner` before this frame.
#[derive(Event, Debug, Clone, Copy)]
pub struct StopScanRequest {
    pub scanner: Entity,
}

/// Written for every successful start, requested or called directly.
#[derive(Event, Debug, Clone, Copy)]
pub struct ScanStarted {
    pub scanner: Entity,
}

/// The scanner's heading has visited every coverage bucket.
#[derive(Event, Debug, Clone, Copy)]
pub struct ScanCoverageComplete {
    pub scanner: Entity,
}

/// A scan's point log is on disk.
#[derive(Event, Debug, Clone)]
pub struct ScanSaved {
    pub scanner: Entity,
    pub scan_index: u32,
    pub path: PathBuf,
    pub point_count: usize,
}

/// System sets run in order every frame.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScanSystems {
    Requests,
    Drive,
}

pub struct ScannerPlugin;

impl Plugin for ScannerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SurroundScanConfig>()
            .init_resource::<ScanRayCaster>();
        if !app.world().contains_resource::<ScanOutput>() {
            let layout = app.world().resource::<SurroundScanConfig>().layout();
            app.insert_resource(ScanOutput::new(layout));
        }

        app.add_event::<StartScanRequest>()
            .add_event::<StopScanRequest>()
            .add_event::<ScanStarted>()
            .add_event::<ScanCoverageComplete>()
            .add_event::<ScanSaved>()
            .configure_sets(Update, (ScanSystems::Requests, ScanSystems::Drive).chain())
            .add_systems(Update, handle_scan_requests.in_set(ScanSystems::Requests))
            .add_systems(Update, drive_scanners.in_set(ScanSystems::Drive));
    }
}
