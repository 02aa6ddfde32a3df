/// Background ray sweep and point log hand-off
use super::component::{ScanContext, SweepShared};
use crate::colour_map::{ColourMapReader, Rgba8};
use crate::config::{OutputLayout, SweepSettings};
use crate::point_log::{LidarPoint, next_free_scan_index, write_point_log};
use crate::scene::RayHit;
use bevy::prelude::*;
use constants::scan::SCAN_ORIGIN_COLOUR;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

/// Where finished scans are written. Scan indices are shared by every
/// scanner in the world and start after the highest log already on disk.
#[derive(Resource, Clone)]
pub struct ScanOutput {
    layout: OutputLayout,
    next_index: Arc<AtomicU32>,
}

impl ScanOutput {
    pub fn new(layout: OutputLayout) -> Self {
        let first = next_free_scan_index(&layout.scan_dir()).unwrap_or_else(|err| {
            warn!("Could not list {}: {}", layout.scan_dir().display(), err);
            0
        });
        Self {
            layout,
            next_index: Arc::new(AtomicU32::new(first)),
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub(crate) fn claim_index(&self) -> u32 {
        self.next_index.fetch_add(1, Ordering::AcqRel)
    }
}

/// Point log write started by a finished sweep.
pub(crate) enum SaveTask {
    Writing(JoinHandle<io::Result<PathBuf>>),
    Done(io::Result<PathBuf>),
}

pub(crate) struct PendingSave {
    pub scan_index: u32,
    pub point_count: usize,
    pub task: SaveTask,
}

impl PendingSave {
    /// Result once the write has finished, otherwise the save itself back.
    pub(crate) fn poll(self) -> Result<io::Result<PathBuf>, Self> {
        match self.task {
            SaveTask::Done(result) => Ok(result),
            SaveTask::Writing(handle) if handle.is_finished() => Ok(handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("point log writer panicked")))),
            task => Err(Self { task, ..self }),
        }
    }
}

/// Hit position tagged with the generation of the scan that found it.
pub(crate) type ScanHit = (u32, Vec3);

/// Messages from a scan to its scanner, in the order they happened.
pub(crate) enum SweepReport {
    /// A scan of this generation has begun.
    Started { generation: u32 },
    /// The scan is over: retire every marker spawned for it.
    ClearMarkers { generation: u32 },
    Saving(PendingSave),
}

pub(crate) struct SweepWorker {
    pub shared: Arc<SweepShared>,
    pub settings: SweepSettings,
    pub context: ScanContext,
    pub start: Vec3,
    pub generation: u32,
    pub hits: Sender<ScanHit>,
    pub reports: Sender<SweepReport>,
}

impl SweepWorker {
    pub(crate) fn run(self) {
        let origin = Rgba8::from_array(SCAN_ORIGIN_COLOUR);
        let mut points = vec![LidarPoint::new(self.start, origin)];
        let pause = self.settings.iteration_pause();

        'sweep: while self.shared.is_scanning() {
            let pitch = self.shared.advance_pitch(&self.settings);
            let (position, heading) = self.shared.pose();

            for direction in fan_directions(heading, pitch, &self.settings) {
                if !self.shared.is_scanning() {
                    break 'sweep;
                }

                let end = position + direction * self.settings.range;
                if let Some(hit) = self.context.caster.cast_ray(position, end) {
                    if let Some(colour) = hit_colour(&hit, &self.context.colours) {
                        points.push(LidarPoint::new(hit.location, colour));
                    }
                    if self.hits.send((self.generation, hit.location)).is_err() {
                        // Scanner is gone; finish with what we have.
                        self.shared.stop();
                        break 'sweep;
                    }
                }
                thread::yield_now();
            }

            if !pause.is_zero() {
                thread::sleep(pause);
            }
        }

        self.finish(points);
    }

    fn finish(self, points: Vec<LidarPoint>) {
        let _ = self.reports.send(SweepReport::ClearMarkers {
            generation: self.generation,
        });

        let scan_index = self.context.output.claim_index();
        let path = self.context.output.layout().scan_file(scan_index);
        let point_count = points.len();

        let task = match thread::Builder::new()
            .name("scan-writer".into())
            .spawn({
                let path = path.clone();
                let points = points.clone();
                move || write_point_log(&path, &points).map(|_| path)
            }) {
            Ok(handle) => SaveTask::Writing(handle),
            Err(err) => {
                warn!("Writing scan {} inline: {}", scan_index, err);
                SaveTask::Done(write_point_log(&path, &points).map(|_| path))
            }
        };

        let _ = self.reports.send(SweepReport::Saving(PendingSave {
            scan_index,
            point_count,
            task,
        }));
        self.shared.finish();
    }
}

/// Unit ray directions of one fan: `fan_rays` yaws spread evenly across
/// `fan_width_degrees` around `heading`, all tilted by `pitch`.
pub fn fan_directions(heading: f32, pitch: f32, settings: &SweepSettings) -> Vec<Vec3> {
    let rays = settings.fan_rays.max(1);
    let tilt = Quat::from_rotation_x(pitch.to_radians());
    (0..rays)
        .map(|i| {
            let fraction = (i as f32 + 0.5) / rays as f32;
            let yaw = heading + settings.fan_width_degrees * (fraction - 0.5);
            Quat::from_rotation_y(yaw.to_radians()) * tilt * Vec3::NEG_Z
        })
        .collect()
}

/// Baked colour under a hit. None when the surface, UV, material or baked
/// map is missing; such hits produce no point.
pub fn hit_colour(hit: &RayHit, colours: &ColourMapReader) -> Option<Rgba8> {
    let surface = hit.surface.as_ref()?;
    let uv = hit.uv?;
    let material = surface.material_for_face(hit.face_index)?;
    let map = colours.lookup(Some(surface.mesh.as_ref()), Some(material.as_ref()))?;
    Some(map.sample(uv))
}
