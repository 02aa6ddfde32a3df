/// Hit markers spawned for visualisation while a scan runs
use bevy::prelude::*;
use std::collections::{HashSet, VecDeque};

/// Entity standing at one scan hit position.
#[derive(Component, Debug, Clone, Copy)]
#[require(Transform)]
pub struct ScanHitMarker {
    pub scanner: Entity,
}

/// Marker of a finished scan, waiting to be despawned.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct HiddenMarker;

/// Markers a scanner owns, tagged with the scan generation that spawned
/// them. Positions are deduplicated per generation by exact bit pattern.
#[derive(Debug, Default)]
pub(crate) struct MarkerLedger {
    seen: HashSet<(u32, [u32; 3])>,
    spawned: Vec<(u32, Entity)>,
    destroy_queue: VecDeque<Entity>,
}

impl MarkerLedger {
    /// True the first time a position is offered for `generation`.
    pub(crate) fn claim(&mut self, generation: u32, position: Vec3) -> bool {
        self.seen
            .insert((generation, position.to_array().map(f32::to_bits)))
    }

    pub(crate) fn record(&mut self, generation: u32, marker: Entity) {
        self.spawned.push((generation, marker));
    }

    /// Queue every marker of `generation` or older for destruction and
    /// forget their positions. Newer markers stay live. Returns the retired
    /// markers in spawn order.
    pub(crate) fn retire_through(&mut self, generation: u32) -> Vec<Entity> {
        let (retired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.spawned)
            .into_iter()
            .partition(|(spawned_by, _)| *spawned_by <= generation);
        self.spawned = kept;
        self.seen.retain(|(seen_by, _)| *seen_by > generation);

        let retired: Vec<Entity> = retired.into_iter().map(|(_, marker)| marker).collect();
        self.destroy_queue.extend(retired.iter().copied());
        retired
    }

    pub(crate) fn next_destroy(&mut self) -> Option<Entity> {
        self.destroy_queue.pop_front()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.spawned.len()
    }

    pub(crate) fn pending_destroys(&self) -> usize {
        self.destroy_queue.len()
    }
}
