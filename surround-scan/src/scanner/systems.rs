/// Owning-thread side of every scan: requests, pose updates and markers
use super::component::{ScanContext, SurroundScanner, heading_degrees};
use super::markers::{HiddenMarker, ScanHitMarker};
use super::sweep::{ScanOutput, SweepReport};
use super::{ScanCoverageComplete, ScanSaved, ScanStarted, StartScanRequest, StopScanRequest};
use crate::colour_map::BakedColourMaps;
use crate::scene::ScanRayCaster;
use bevy::prelude::*;
use constants::scan::MAX_DESTROYS_PER_TICK;

/// Apply every stop request of the frame, then every start request. A stop
/// therefore only ends a scan that was running before this frame.
pub fn handle_scan_requests(
    mut start_requests: EventReader<StartScanRequest>,
    mut stop_requests: EventReader<StopScanRequest>,
    mut scanners: Query<(&mut SurroundScanner, &Transform)>,
    caster: Res<ScanRayCaster>,
    colours: Option<Res<BakedColourMaps>>,
    output: Res<ScanOutput>,
) {
    for request in stop_requests.read() {
        if let Ok((scanner, _)) = scanners.get(request.scanner) {
            scanner.stop_scan();
        }
    }

    for request in start_requests.read() {
        let Ok((mut scanner, transform)) = scanners.get_mut(request.scanner) else {
            warn!("Scan requested for {} which has no scanner", request.scanner);
            continue;
        };

        let context = ScanContext::new(caster.0.clone(), colours.as_deref(), output.clone());
        if scanner.start_scan(transform, context) {
            info!("Scan started for {}", request.scanner);
        }
    }
}

/// Per-frame bridge between each scanner and its sweep worker.
pub fn drive_scanners(
    mut commands: Commands,
    mut scanners: Query<(Entity, &mut SurroundScanner, &Transform)>,
    markers: Query<(), With<ScanHitMarker>>,
    mut started: EventWriter<ScanStarted>,
    mut coverage_complete: EventWriter<ScanCoverageComplete>,
    mut saved: EventWriter<ScanSaved>,
) {
    for (entity, mut scanner, transform) in &mut scanners {
        let mut budget = MAX_DESTROYS_PER_TICK;
        while budget > 0 {
            let Some(marker) = scanner.markers.next_destroy() else {
                break;
            };
            if markers.contains(marker) {
                commands.entity(marker).despawn();
                budget -= 1;
            }
        }

        if scanner.is_scanning() {
            let heading = heading_degrees(transform);
            scanner.shared.publish_pose(transform.translation, heading);

            if scanner.tracker.advance(heading) {
                scanner.spin_complete = true;
                info!("Scanner {} completed a full turn", entity);
                coverage_complete.write(ScanCoverageComplete { scanner: entity });
            }
            if scanner.spin_complete && scanner.sweep_exhausted() {
                scanner.stop_scan();
            }
        }

        for (generation, position) in scanner.hits.drain() {
            if generation <= scanner.cleared_generation {
                continue;
            }
            if scanner.markers.claim(generation, position) {
                let marker = commands
                    .spawn((
                        ScanHitMarker { scanner: entity },
                        Transform::from_translation(position),
                    ))
                    .id();
                scanner.markers.record(generation, marker);
            }
        }

        for report in scanner.reports.drain() {
            match report {
                SweepReport::Started { generation } => {
                    debug!("Scanner {} began scan generation {}", entity, generation);
                    started.write(ScanStarted { scanner: entity });
                }
                SweepReport::ClearMarkers { generation } => {
                    // Hits of this generation still queued are dropped when drained.
                    scanner.cleared_generation = scanner.cleared_generation.max(generation);
                    for marker in scanner.markers.retire_through(generation) {
                        commands.entity(marker).try_insert(HiddenMarker);
                    }
                }
                SweepReport::Saving(save) => scanner.pending_saves.push(save),
            }
        }

        let pending = std::mem::take(&mut scanner.pending_saves);
        for save in pending {
            let (scan_index, point_count) = (save.scan_index, save.point_count);
            match save.poll() {
                Ok(Ok(path)) => {
                    info!("Saved {} points to {}", point_count, path.display());
                    saved.write(ScanSaved {
                        scanner: entity,
                        scan_index,
                        path,
                        point_count,
                    });
                }
                Ok(Err(err)) => warn!("Scan {} was not saved: {}", scan_index, err),
                Err(save) => scanner.pending_saves.push(save),
            }
        }
    }
}
