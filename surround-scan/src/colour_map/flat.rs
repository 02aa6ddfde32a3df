/// Headless render backend that shades every material with its flat base colour
use super::bake::{CaptureRigId, LightId, RenderBackend, RenderTargetId, RigObject, SurfaceId};
use super::texel::{ColourMap, Rgba8};
use crate::scene::SurfaceMaterial;
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters shared with whoever created the backend.
#[derive(Debug, Clone, Default)]
pub struct FlatBackendStats {
    captures: Arc<AtomicUsize>,
    created: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl FlatBackendStats {
    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::Acquire)
    }

    /// Rig objects created over the backend's lifetime.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Acquire)
    }

    /// Rig objects created and not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

struct FlatTarget {
    resolution: u32,
    clear: Rgba8,
    pixels: Vec<Rgba8>,
}

#[derive(Default)]
pub struct FlatColourBackend {
    next_id: u64,
    targets: HashMap<RenderTargetId, FlatTarget>,
    surfaces: HashMap<SurfaceId, Option<Rgba8>>,
    rigs: HashMap<CaptureRigId, RenderTargetId>,
    lights: HashSet<LightId>,
    stats: FlatBackendStats,
}

impl FlatColourBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> FlatBackendStats {
        self.stats.clone()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.stats.created.fetch_add(1, Ordering::AcqRel);
        self.stats.live.fetch_add(1, Ordering::AcqRel);
        self.next_id
    }
}

impl RenderBackend for FlatColourBackend {
    fn create_render_target(&mut self, resolution: u32, clear: Rgba8) -> Option<RenderTargetId> {
        if resolution == 0 {
            return None;
        }
        let id = RenderTargetId(self.allocate());
        self.targets.insert(
            id,
            FlatTarget {
                resolution,
                clear,
                pixels: vec![clear; ColourMap::texel_count(resolution)],
            },
        );
        Some(id)
    }

    fn spawn_bake_surface(&mut self, _transform: Transform) -> Option<SurfaceId> {
        let id = SurfaceId(self.allocate());
        self.surfaces.insert(id, None);
        Some(id)
    }

    fn spawn_capture_rig(
        &mut self,
        _transform: Transform,
        _ortho_width: f32,
        target: RenderTargetId,
    ) -> Option<CaptureRigId> {
        if !self.targets.contains_key(&target) {
            return None;
        }
        let id = CaptureRigId(self.allocate());
        self.rigs.insert(id, target);
        Some(id)
    }

    fn spawn_directional_light(
        &mut self,
        _transform: Transform,
        _illuminance: f32,
    ) -> Option<LightId> {
        let id = LightId(self.allocate());
        self.lights.insert(id);
        Some(id)
    }

    fn assign_material(&mut self, surface: SurfaceId, material: &SurfaceMaterial) -> bool {
        match self.surfaces.get_mut(&surface) {
            Some(slot) => {
                *slot = Some(Rgba8::from_array(material.base_colour()));
                true
            }
            None => false,
        }
    }

    fn flush_rendering(&mut self) {}

    fn capture(&mut self, rig: CaptureRigId) -> bool {
        let Some(target_id) = self.rigs.get(&rig) else {
            return false;
        };
        let Some(target) = self.targets.get_mut(target_id) else {
            return false;
        };

        // The surface fills the whole view, so one shaded colour covers every texel.
        let colour = self
            .surfaces
            .values()
            .flatten()
            .next()
            .copied()
            .unwrap_or(target.clear);
        target.pixels = vec![colour; ColourMap::texel_count(target.resolution)];
        self.stats.captures.fetch_add(1, Ordering::AcqRel);
        true
    }

    fn read_pixels(&mut self, target: RenderTargetId) -> Option<Vec<Rgba8>> {
        self.targets.get(&target).map(|target| target.pixels.clone())
    }

    fn release(&mut self, object: RigObject) {
        let removed = match object {
            RigObject::RenderTarget(id) => self.targets.remove(&id).is_some(),
            RigObject::Surface(id) => self.surfaces.remove(&id).is_some(),
            RigObject::CaptureRig(id) => self.rigs.remove(&id).is_some(),
            RigObject::Light(id) => self.lights.remove(&id),
        };
        if removed {
            self.stats.live.fetch_sub(1, Ordering::AcqRel);
        }
    }
}
