/// Scan progress checkpoint and combined point log rebuilds
use crate::config::SurroundScanConfig;
use crate::point_log::{CombinedLog, combine_scan_files};
use crate::scanner::{ScanCoverageComplete, ScanStarted, ScanSystems, SurroundScanner};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScanProgress {
    #[default]
    NotStarted,
    Started,
    Completed,
}

/// Progress of the current map's scan. Set `finished_map` to rebuild the
/// combined point log from every scan written so far.
#[derive(Resource, Debug, Default)]
pub struct ScanCheckpoint {
    pub progress: ScanProgress,
    /// Highest heading coverage among running scanners, in [0, 1].
    pub coverage: f32,
    pub finished_map: bool,
    combine_task: Option<JoinHandle<io::Result<CombinedLog>>>,
}

impl ScanCheckpoint {
    pub fn is_combining(&self) -> bool {
        self.combine_task.is_some()
    }
}

/// `CombinedMapPoints.txt` has been rebuilt.
#[derive(Event, Debug, Clone)]
pub struct CombinedScansWritten {
    pub path: PathBuf,
    pub files: usize,
    pub lines: usize,
}

pub struct CheckpointPlugin;

impl Plugin for CheckpointPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SurroundScanConfig>()
            .init_resource::<ScanCheckpoint>()
            .add_event::<CombinedScansWritten>()
            .add_systems(
                Update,
                (track_scan_progress, start_combine, finish_combine)
                    .chain()
                    .after(ScanSystems::Drive),
            );
    }
}

pub fn track_scan_progress(
    mut checkpoint: ResMut<ScanCheckpoint>,
    mut started: EventReader<ScanStarted>,
    mut completed: EventReader<ScanCoverageComplete>,
    scanners: Query<&SurroundScanner>,
) {
    if started.read().count() > 0 {
        checkpoint.progress = ScanProgress::Started;
        checkpoint.coverage = 0.0;
    }
    if completed.read().count() > 0 {
        checkpoint.progress = ScanProgress::Completed;
    }

    if checkpoint.progress == ScanProgress::Started {
        let coverage = scanners
            .iter()
            .filter(|scanner| scanner.is_scanning())
            .map(SurroundScanner::coverage)
            .fold(checkpoint.coverage, f32::max);
        checkpoint.coverage = coverage;
    } else if checkpoint.progress == ScanProgress::Completed {
        checkpoint.coverage = 1.0;
    }
}

/// Consume the finished-map flag and rebuild the combined log off-thread.
pub fn start_combine(mut checkpoint: ResMut<ScanCheckpoint>, config: Res<SurroundScanConfig>) {
    if !checkpoint.finished_map {
        return;
    }
    checkpoint.finished_map = false;

    if checkpoint.combine_task.is_some() {
        info!("Combined point log rebuild already running");
        return;
    }

    let scan_dir = config.layout().scan_dir();
    match thread::Builder::new()
        .name("scan-combine".into())
        .spawn(move || combine_scan_files(&scan_dir))
    {
        Ok(handle) => checkpoint.combine_task = Some(handle),
        Err(err) => warn!("Could not start combined point log rebuild: {}", err),
    }
}

pub fn finish_combine(
    mut checkpoint: ResMut<ScanCheckpoint>,
    mut written: EventWriter<CombinedScansWritten>,
) {
    if !checkpoint
        .combine_task
        .as_ref()
        .is_some_and(JoinHandle::is_finished)
    {
        return;
    }
    let Some(handle) = checkpoint.combine_task.take() else {
        return;
    };

    match handle.join() {
        Ok(Ok(log)) => {
            info!(
                "Combined {} scan files ({} points) into {}",
                log.files,
                log.lines,
                log.path.display()
            );
            written.write(CombinedScansWritten {
                path: log.path,
                files: log.files,
                lines: log.lines,
            });
        }
        Ok(Err(err)) => warn!("Combined point log rebuild failed: {}", err),
        Err(_) => warn!("Combined point log rebuild panicked"),
    }
}
