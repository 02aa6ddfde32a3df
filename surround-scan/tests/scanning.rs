mod common;

use bevy::prelude::*;
use common::{pump_until, read_lines, record_events, recorded, test_config};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use surround_scan::colour_map::{
    BakeMapsRequest, BakedColourMaps, ColourMap, Rgba8, save_colour_map,
};
use surround_scan::physics::{AabbRayCaster, ScanCollider};
use surround_scan::point_log::list_scan_files;
use surround_scan::scanner::{HiddenMarker, ScanContext, ScanHitMarker};
use surround_scan::scene::{MeshRenderable, ScanRayCaster, StaticMesh, SurfaceMaterial};
use surround_scan::{
    ScanCheckpoint, ScanCoverageComplete, ScanProgress, ScanSaved, ScanStarted, SpinDriver,
    StartScanRequest, StopScanRequest, SurroundScanConfig, SurroundScanPlugin, SurroundScanner,
};

const TIMEOUT: Duration = Duration::from_secs(20);

fn scan_app(config: SurroundScanConfig) -> App {
    let mut app = App::new();
    app.insert_resource(config).add_plugins(SurroundScanPlugin);
    record_events::<ScanStarted>(&mut app);
    record_events::<ScanCoverageComplete>(&mut app);
    record_events::<ScanSaved>(&mut app);
    app
}

fn spawn_scanner(app: &mut App, at: Vec3) -> Entity {
    let config = app.world().resource::<SurroundScanConfig>().clone();
    app.world_mut()
        .spawn((SurroundScanner::from_config(&config), Transform::from_translation(at)))
        .id()
}

fn scanner(app: &App, entity: Entity) -> &SurroundScanner {
    app.world().get::<SurroundScanner>(entity).unwrap()
}

fn marker_count(app: &mut App) -> usize {
    app.world_mut()
        .query::<&ScanHitMarker>()
        .iter(app.world())
        .count()
}

#[test]
fn duplicate_start_runs_a_single_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = scan_app(test_config(dir.path()));
    let agent = spawn_scanner(&mut app, Vec3::ZERO);

    app.world_mut().send_event(StartScanRequest { scanner: agent });
    app.world_mut().send_event(StartScanRequest { scanner: agent });
    app.update();
    assert_eq!(recorded::<ScanStarted>(&app).len(), 1);
    assert!(scanner(&app, agent).is_scanning());

    app.world_mut().send_event(StartScanRequest { scanner: agent });
    app.update();
    assert_eq!(recorded::<ScanStarted>(&app).len(), 1);

    app.world_mut().send_event(StopScanRequest { scanner: agent });
    assert!(pump_until(&mut app, TIMEOUT, |app| {
        !recorded::<ScanSaved>(app).is_empty()
    }));
    assert!(pump_until(&mut app, TIMEOUT, |app| {
        !scanner(app, agent).is_running()
    }));

    let files = list_scan_files(&dir.path().join("ScannedData")).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].0, 0);
    assert_eq!(recorded::<ScanSaved>(&app).len(), 1);
}

#[test]
fn empty_scene_writes_only_the_start_point() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = scan_app(test_config(dir.path()));
    let agent = spawn_scanner(&mut app, Vec3::new(1.0, 2.0, 3.0));

    app.world_mut().send_event(StartScanRequest { scanner: agent });
    for _ in 0..5 {
        app.update();
    }
    app.world_mut().send_event(StopScanRequest { scanner: agent });
    assert!(pump_until(&mut app, TIMEOUT, |app| {
        !recorded::<ScanSaved>(app).is_empty()
    }));

    let saved = recorded::<ScanSaved>(&app)[0].clone();
    assert_eq!(saved.scanner, agent);
    assert_eq!(saved.point_count, 1);
    assert_eq!(saved.path, dir.path().join("ScannedData/scan_points_0.txt"));
    assert_eq!(
        read_lines(&saved.path),
        vec!["1.000000 2.000000 3.000000 255 255 255".to_string()]
    );
    assert_eq!(marker_count(&mut app), 0);
}

#[test]
fn scan_indices_continue_after_existing_logs() {
    let dir = tempfile::tempdir().unwrap();
    let scans = dir.path().join("ScannedData");
    fs::create_dir_all(&scans).unwrap();
    fs::write(scans.join("scan_points_4.txt"), "0 0 0 1 1 1\n").unwrap();

    let mut app = scan_app(test_config(dir.path()));
    let agent = spawn_scanner(&mut app, Vec3::ZERO);
    app.world_mut().send_event(StartScanRequest { scanner: agent });
    app.update();
    app.world_mut().send_event(StopScanRequest { scanner: agent });
    assert!(pump_until(&mut app, TIMEOUT, |app| {
        !recorded::<ScanSaved>(app).is_empty()
    }));

    assert_eq!(recorded::<ScanSaved>(&app)[0].scan_index, 5);
}

#[test]
fn direct_start_announces_the_scan() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = scan_app(test_config(dir.path()));
    let agent = spawn_scanner(&mut app, Vec3::ZERO);
    app.update();

    let context = ScanContext::from_world(app.world());
    let transform = *app.world().get::<Transform>(agent).unwrap();
    assert!(app
        .world_mut()
        .get_mut::<SurroundScanner>(agent)
        .unwrap()
        .start_scan(&transform, context));
    app.update();

    let started = recorded::<ScanStarted>(&app);
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].scanner, agent);
    assert_eq!(
        app.world().resource::<ScanCheckpoint>().progress,
        ScanProgress::Started
    );

    app.world_mut().send_event(StopScanRequest { scanner: agent });
    assert!(pump_until(&mut app, TIMEOUT, |app| {
        !recorded::<ScanSaved>(app).is_empty()
    }));
}

#[test]
fn stop_sent_with_a_start_does_not_cancel_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = scan_app(test_config(dir.path()));
    let agent = spawn_scanner(&mut app, Vec3::ZERO);

    app.world_mut().send_event(StartScanRequest { scanner: agent });
    app.world_mut().send_event(StopScanRequest { scanner: agent });
    app.update();
    app.update();

    assert!(scanner(&app, agent).is_scanning());
    assert_eq!(recorded::<ScanStarted>(&app).len(), 1);
    assert!(recorded::<ScanSaved>(&app).is_empty());

    app.world_mut().send_event(StopScanRequest { scanner: agent });
    assert!(pump_until(&mut app, TIMEOUT, |app| {
        !recorded::<ScanSaved>(app).is_empty()
    }));
}

/// Four walls around the origin, all drawn with one baked material.
fn walled_courtyard(app: &mut App, root: &Path) {
    let mesh = Arc::new(StaticMesh::single_section("Wall", 12));
    let brick = Arc::new(SurfaceMaterial::named("Brick"));
    let record = root.join("BakedMatData/Courtyard/Wall_Brick.bin");
    save_colour_map(
        &record,
        &ColourMap::solid(4, Rgba8::new(200, 100, 50, 255)).unwrap(),
    )
    .unwrap();

    for (center, half_extents) in [
        (Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.5, 20.0, 20.0)),
        (Vec3::new(-10.0, 0.0, 0.0), Vec3::new(0.5, 20.0, 20.0)),
        (Vec3::new(0.0, 0.0, 10.0), Vec3::new(20.0, 20.0, 0.5)),
        (Vec3::new(0.0, 0.0, -10.0), Vec3::new(20.0, 20.0, 0.5)),
    ] {
        app.world_mut().spawn((
            ScanCollider { half_extents },
            Transform::from_translation(center),
            MeshRenderable::new(mesh.clone(), vec![brick.clone()]),
        ));
    }

    let caster = AabbRayCaster::from_world(app.world_mut());
    app.insert_resource(ScanRayCaster(Arc::new(caster)));

    app.world_mut().send_event(BakeMapsRequest::new("Courtyard"));
    app.update();
    assert_eq!(app.world().resource::<BakedColourMaps>().len(), 1);
}

#[test]
fn turning_agent_finishes_with_coloured_points() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = scan_app(test_config(dir.path()));
    walled_courtyard(&mut app, dir.path());
    let agent = spawn_scanner(&mut app, Vec3::ZERO);

    app.world_mut().send_event(StartScanRequest { scanner: agent });
    let mut yaw = 0.0f32;
    let mut most_markers = 0;
    let finished = pump_until(&mut app, TIMEOUT, |app| {
        yaw += 10.0;
        app.world_mut()
            .get_mut::<Transform>(agent)
            .unwrap()
            .rotation = Quat::from_rotation_y(yaw.to_radians());
        most_markers = most_markers.max(marker_count(app));
        !recorded::<ScanSaved>(app).is_empty()
    });
    assert!(finished, "scan never finished on its own");

    assert_eq!(recorded::<ScanCoverageComplete>(&app).len(), 1);
    assert!(scanner(&app, agent).spin_complete());
    assert!(scanner(&app, agent).sweep_exhausted());
    assert!(most_markers > 0, "no hit markers were spawned");
    assert_eq!(
        app.world().resource::<ScanCheckpoint>().progress,
        ScanProgress::Completed
    );

    let saved = recorded::<ScanSaved>(&app)[0].clone();
    let lines = read_lines(&saved.path);
    assert_eq!(lines.len(), saved.point_count);
    assert!(lines.len() > 1);
    assert!(lines[0].ends_with(" 255 255 255"));
    assert!(lines[1..].iter().all(|line| line.ends_with(" 200 100 50")));

    // Markers of the finished scan are hidden and then despawned.
    assert!(pump_until(&mut app, TIMEOUT, |app| marker_count(app) == 0));
    let hidden = app
        .world_mut()
        .query::<&HiddenMarker>()
        .iter(app.world())
        .count();
    assert_eq!(hidden, 0);
}

#[test]
fn spin_driver_turns_the_agent_through_a_scan() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = App::new();
    app.init_resource::<Time>()
        .insert_resource(test_config(dir.path()))
        .add_plugins(SurroundScanPlugin);
    record_events::<ScanSaved>(&mut app);
    record_events::<ScanCoverageComplete>(&mut app);

    let config = app.world().resource::<SurroundScanConfig>().clone();
    let agent = app
        .world_mut()
        .spawn((SurroundScanner::from_config(&config), SpinDriver::new(1.0)))
        .id();

    app.world_mut().send_event(StartScanRequest { scanner: agent });
    let finished = pump_until(&mut app, TIMEOUT, |app| {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(50));
        !recorded::<ScanSaved>(app).is_empty()
    });

    assert!(finished);
    assert_eq!(recorded::<ScanCoverageComplete>(&app).len(), 1);
    assert_eq!(recorded::<ScanSaved>(&app)[0].point_count, 1);
}
