#![allow(dead_code)]

use bevy::prelude::*;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use surround_scan::SurroundScanConfig;

/// Every event of type `E` seen since the app started.
#[derive(Resource)]
pub struct Recorded<E: Event + Clone>(pub Vec<E>);

impl<E: Event + Clone> Default for Recorded<E> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

fn record<E: Event + Clone>(mut reader: EventReader<E>, mut recorded: ResMut<Recorded<E>>) {
    recorded.0.extend(reader.read().cloned());
}

pub fn record_events<E: Event + Clone>(app: &mut App) {
    app.init_resource::<Recorded<E>>()
        .add_systems(Last, record::<E>);
}

pub fn recorded<E: Event + Clone>(app: &App) -> &[E] {
    &app.world().resource::<Recorded<E>>().0
}

/// Config writing under `root`, with small bakes and a fast sweep.
pub fn test_config(root: &Path) -> SurroundScanConfig {
    let mut config = SurroundScanConfig::with_output_root(root);
    config.bake.resolution = 4;
    config.bake.settle_before_capture_ms = 0;
    config.bake.settle_after_capture_ms = 0;
    config.sweep.iteration_pause_ms = 1;
    config
}

/// Run frames until `done` holds or `timeout` passes. Returns whether it held.
pub fn pump_until(app: &mut App, timeout: Duration, mut done: impl FnMut(&mut App) -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        app.update();
        if done(app) {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
