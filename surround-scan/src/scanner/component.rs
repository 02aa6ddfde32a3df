/// Scanner component and the state it shares with its sweep worker
use super::markers::MarkerLedger;
use super::sweep::{PendingSave, ScanHit, ScanOutput, SweepReport, SweepWorker};
use crate::colour_map::{BakedColourMaps, ColourMapReader};
use crate::config::{SurroundScanConfig, SweepSettings};
use crate::coverage::SegmentCoverageTracker;
use crate::scene::{RayCaster, ScanRayCaster};
use bevy::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// Multi-producer hand-off drained by the owning thread.
pub(crate) struct WorkerInbox<T> {
    sender: Sender<T>,
    receiver: Mutex<Receiver<T>>,
}

impl<T> WorkerInbox<T> {
    fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    pub(crate) fn sender(&self) -> Sender<T> {
        self.sender.clone()
    }

    pub(crate) fn push(&self, item: T) {
        // The receiver lives alongside the sender, so this cannot fail.
        let _ = self.sender.send(item);
    }

    /// Everything queued so far, in send order.
    pub(crate) fn drain(&self) -> Vec<T> {
        self.receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_iter()
            .collect()
    }
}

/// Flags and pose read by the worker while the owner keeps updating them.
pub(crate) struct SweepShared {
    running: AtomicBool,
    scanning: AtomicBool,
    sweep_exhausted: AtomicBool,
    position: [AtomicU32; 3],
    heading: AtomicU32,
    pitch: AtomicU32,
}

impl SweepShared {
    fn new(start_pitch: f32) -> Self {
        Self {
            running: AtomicBool::new(false),
            scanning: AtomicBool::new(false),
            sweep_exhausted: AtomicBool::new(false),
            position: Default::default(),
            heading: AtomicU32::new(0),
            pitch: AtomicU32::new(start_pitch.to_bits()),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    pub(crate) fn stop(&self) {
        self.scanning.store(false, Ordering::Release);
    }

    pub(crate) fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub(crate) fn is_sweep_exhausted(&self) -> bool {
        self.sweep_exhausted.load(Ordering::Acquire)
    }

    pub(crate) fn publish_pose(&self, position: Vec3, heading_degrees: f32) {
        for (slot, value) in self.position.iter().zip(position.to_array()) {
            slot.store(value.to_bits(), Ordering::Relaxed);
        }
        self.heading
            .store(heading_degrees.to_bits(), Ordering::Release);
    }

    pub(crate) fn pose(&self) -> (Vec3, f32) {
        let heading = f32::from_bits(self.heading.load(Ordering::Acquire));
        let [x, y, z] = self
            .position
            .each_ref()
            .map(|slot| f32::from_bits(slot.load(Ordering::Relaxed)));
        (Vec3::new(x, y, z), heading)
    }

    /// Pitch for the next fan. The cursor steps upward through the vertical
    /// field of view and wraps to the bottom, which counts as one exhausted
    /// sweep. Only the worker moves the cursor.
    pub(crate) fn advance_pitch(&self, settings: &SweepSettings) -> f32 {
        let half = settings.vertical_fov_degrees * 0.5;
        let mut current = f32::from_bits(self.pitch.load(Ordering::Relaxed));
        if !(-half..half).contains(&current) {
            current = -half;
        }

        let mut next = current + settings.pitch_step_degrees;
        if next >= half {
            next = -half;
            self.sweep_exhausted.store(true, Ordering::Release);
        }
        self.pitch.store(next.to_bits(), Ordering::Relaxed);
        current
    }
}

/// Everything a sweep needs from the world, captured when it starts.
#[derive(Clone)]
pub struct ScanContext {
    pub caster: Arc<dyn RayCaster>,
    pub colours: ColourMapReader,
    pub output: ScanOutput,
}

impl ScanContext {
    /// Without baked colour maps every hit is skipped.
    pub fn new(
        caster: Arc<dyn RayCaster>,
        colours: Option<&BakedColourMaps>,
        output: ScanOutput,
    ) -> Self {
        let colours = colours
            .map(BakedColourMaps::reader)
            .unwrap_or_else(|| BakedColourMaps::new(1).reader());
        Self {
            caster,
            colours,
            output,
        }
    }

    /// Capture the ray caster, colour maps and scan output of `world`. A
    /// missing caster scans an empty scene and a missing output writes under
    /// the configured root.
    pub fn from_world(world: &World) -> Self {
        let caster = world
            .get_resource::<ScanRayCaster>()
            .map(|caster| caster.0.clone())
            .unwrap_or_else(|| ScanRayCaster::default().0);
        let output = world.get_resource::<ScanOutput>().cloned().unwrap_or_else(|| {
            let config = world
                .get_resource::<SurroundScanConfig>()
                .cloned()
                .unwrap_or_default();
            ScanOutput::new(config.layout())
        });
        Self::new(caster, world.get_resource::<BakedColourMaps>(), output)
    }
}

/// Yaw about +Y in degrees, zero when facing -Z.
pub fn heading_degrees(transform: &Transform) -> f32 {
    transform.rotation.to_euler(EulerRot::YXZ).0.to_degrees()
}

/// Agent that sweeps rays around itself while it turns, colours the hits
/// from baked colour maps and writes them out as a point log.
#[derive(Component)]
#[require(Transform)]
pub struct SurroundScanner {
    pub(crate) settings: SweepSettings,
    pub(crate) tracker: SegmentCoverageTracker,
    pub(crate) spin_complete: bool,
    pub(crate) shared: Arc<SweepShared>,
    /// Generation of the latest scan; zero before the first one.
    pub(crate) generation: u32,
    /// Highest generation whose markers have been cleared.
    pub(crate) cleared_generation: u32,
    pub(crate) hits: WorkerInbox<ScanHit>,
    pub(crate) reports: WorkerInbox<SweepReport>,
    pub(crate) markers: MarkerLedger,
    pub(crate) pending_saves: Vec<PendingSave>,
}

impl Default for SurroundScanner {
    fn default() -> Self {
        Self::from_config(&SurroundScanConfig::default())
    }
}

impl SurroundScanner {
    pub fn new(settings: SweepSettings, coverage_bucket_degrees: f32) -> Self {
        let start_pitch = -settings.vertical_fov_degrees * 0.5;
        Self {
            settings,
            tracker: SegmentCoverageTracker::new(coverage_bucket_degrees),
            spin_complete: false,
            shared: Arc::new(SweepShared::new(start_pitch)),
            generation: 0,
            cleared_generation: 0,
            hits: WorkerInbox::new(),
            reports: WorkerInbox::new(),
            markers: MarkerLedger::default(),
            pending_saves: Vec::new(),
        }
    }

    pub fn from_config(config: &SurroundScanConfig) -> Self {
        Self::new(config.sweep.clone(), config.coverage_bucket_degrees)
    }

    /// Begin a scan from the agent's current pose. Returns false, changing
    /// nothing, while a previous sweep is still running. On success
    /// `ScanStarted` is written by the next `drive_scanners` run.
    pub fn start_scan(&mut self, transform: &Transform, context: ScanContext) -> bool {
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let heading = heading_degrees(transform);
        self.tracker.reset(heading);
        self.spin_complete = false;
        self.shared.sweep_exhausted.store(false, Ordering::Release);
        self.shared.publish_pose(transform.translation, heading);
        self.shared.scanning.store(true, Ordering::Release);

        let worker = SweepWorker {
            shared: self.shared.clone(),
            settings: self.settings.clone(),
            context,
            start: transform.translation,
            generation,
            hits: self.hits.sender(),
            reports: self.reports.sender(),
        };

        match thread::Builder::new()
            .name("surround-sweep".into())
            .spawn(move || worker.run())
        {
            Ok(_) => {
                self.reports.push(SweepReport::Started { generation });
                true
            }
            Err(err) => {
                warn!("Failed to spawn sweep worker: {}", err);
                self.shared.stop();
                self.shared.finish();
                false
            }
        }
    }

    /// Ask the running sweep to finish. Points gathered so far are still
    /// written.
    pub fn stop_scan(&self) {
        self.shared.stop();
    }

    /// A sweep worker exists, scanning or still finalizing.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn is_scanning(&self) -> bool {
        self.shared.is_scanning()
    }

    pub fn spin_complete(&self) -> bool {
        self.spin_complete
    }

    pub fn sweep_exhausted(&self) -> bool {
        self.shared.is_sweep_exhausted()
    }

    pub fn coverage(&self) -> f32 {
        self.tracker.coverage()
    }

    pub fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    /// Markers spawned and not yet retired.
    pub fn marker_count(&self) -> usize {
        self.markers.live_count()
    }

    pub fn pending_destroys(&self) -> usize {
        self.markers.pending_destroys()
    }
}

impl Drop for SurroundScanner {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(fov: f32, step: f32) -> SweepSettings {
        SweepSettings {
            vertical_fov_degrees: fov,
            pitch_step_degrees: step,
            ..Default::default()
        }
    }

    #[test]
    fn pitch_wraps_and_marks_exhaustion() {
        let settings = settings(4.0, 1.0);
        let shared = SweepShared::new(-2.0);

        let pitches: Vec<f32> = (0..5).map(|_| shared.advance_pitch(&settings)).collect();

        assert_eq!(pitches, vec![-2.0, -1.0, 0.0, 1.0, -2.0]);
        assert!(shared.is_sweep_exhausted());
    }

    #[test]
    fn out_of_range_cursor_restarts_at_bottom() {
        let shared = SweepShared::new(40.0);
        assert_eq!(shared.advance_pitch(&settings(10.0, 1.0)), -5.0);
        assert!(!shared.is_sweep_exhausted());
    }

    #[test]
    fn pose_round_trips() {
        let shared = SweepShared::new(0.0);
        shared.publish_pose(Vec3::new(1.0, -2.0, 3.5), 42.0);
        assert_eq!(shared.pose(), (Vec3::new(1.0, -2.0, 3.5), 42.0));
    }

    #[test]
    fn heading_follows_yaw() {
        let transform = Transform::from_rotation(Quat::from_rotation_y(30f32.to_radians()));
        assert!((heading_degrees(&transform) - 30.0).abs() < 1e-3);
    }
}
