/// Material baking through a shared off-screen capture rig.
use super::texel::{ColourMap, ColourMapError, Rgba8};
use crate::scene::SurfaceMaterial;
use bevy::prelude::*;
use constants::bake_rig::{
    BAKE_CLEAR_COLOUR, BAKE_LIGHT_ILLUMINANCE, BAKE_LIGHT_PITCH_DEGREES, BAKE_LIGHT_TRANSLATION,
    BAKE_SURFACE_SCALE, BAKE_SURFACE_TRANSLATION, CAPTURE_ORTHO_WIDTH, CAPTURE_RIG_PITCH_DEGREES,
    CAPTURE_RIG_TRANSLATION,
};
use std::thread;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureRigId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightId(pub u64);

/// Anything the executor asked the backend to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RigObject {
    RenderTarget(RenderTargetId),
    Surface(SurfaceId),
    CaptureRig(CaptureRigId),
    Light(LightId),
}

/// Rendering host capability. Every call happens on the thread that owns
/// the rendering context, which is why the executor lives in a non-send
/// resource.
pub trait RenderBackend {
    /// Square RGBA8 target, cleared to `clear` before every capture.
    fn create_render_target(&mut self, resolution: u32, clear: Rgba8) -> Option<RenderTargetId>;
    /// Flat unit plane facing +Y.
    fn spawn_bake_surface(&mut self, transform: Transform) -> Option<SurfaceId>;
    /// Orthographic base-colour capture writing into `target`. Captures only
    /// happen on request.
    fn spawn_capture_rig(
        &mut self,
        transform: Transform,
        ortho_width: f32,
        target: RenderTargetId,
    ) -> Option<CaptureRigId>;
    fn spawn_directional_light(&mut self, transform: Transform, illuminance: f32)
    -> Option<LightId>;
    fn assign_material(&mut self, surface: SurfaceId, material: &SurfaceMaterial) -> bool;
    /// Block until queued render commands have been executed.
    fn flush_rendering(&mut self);
    fn capture(&mut self, rig: CaptureRigId) -> bool;
    fn read_pixels(&mut self, target: RenderTargetId) -> Option<Vec<Rgba8>>;
    fn release(&mut self, object: RigObject);
}

#[derive(Debug, Error)]
pub enum BakeError {
    #[error("render target of {0}x{0} texels could not be created")]
    RenderTargetUnavailable(u32),
    #[error("bake surface could not be spawned")]
    SurfaceUnavailable,
    #[error("capture rig could not be spawned")]
    CaptureRigUnavailable,
    #[error("material {0} was rejected by the bake surface")]
    MaterialRejected(String),
    #[error("scene capture failed")]
    CaptureFailed,
    #[error("render target read-back failed")]
    ReadBackFailed,
    #[error("read-back produced the wrong texel count: {0}")]
    PixelCount(#[from] ColourMapError),
}

/// Placement of the bake surface, capture rig and light.
#[derive(Debug, Clone)]
pub struct BakeRigLayout {
    pub surface: Transform,
    pub capture: Transform,
    pub ortho_width: f32,
    pub light: Transform,
    pub light_illuminance: f32,
    pub clear_colour: Rgba8,
}

impl Default for BakeRigLayout {
    fn default() -> Self {
        Self {
            surface: Transform::from_translation(BAKE_SURFACE_TRANSLATION)
                .with_scale(Vec3::splat(BAKE_SURFACE_SCALE)),
            capture: Transform::from_translation(CAPTURE_RIG_TRANSLATION).with_rotation(
                Quat::from_rotation_x(CAPTURE_RIG_PITCH_DEGREES.to_radians()),
            ),
            ortho_width: CAPTURE_ORTHO_WIDTH,
            light: Transform::from_translation(BAKE_LIGHT_TRANSLATION)
                .with_rotation(Quat::from_rotation_x(BAKE_LIGHT_PITCH_DEGREES.to_radians())),
            light_illuminance: BAKE_LIGHT_ILLUMINANCE,
            clear_colour: Rgba8::from_array(BAKE_CLEAR_COLOUR),
        }
    }
}

/// Waits inserted around the capture. Material assignment is not guaranteed
/// to be visible to the very next capture, so a bounded settle is required.
#[derive(Debug, Clone, Copy, Default)]
pub struct BakeSettle {
    pub before_capture: Duration,
    pub after_capture: Duration,
}

#[derive(Default)]
struct BakeRig {
    target: Option<(RenderTargetId, u32)>,
    surface: Option<SurfaceId>,
    capture: Option<CaptureRigId>,
    light: Option<LightId>,
}

/// Bakes materials one at a time on a lazily created rig that is shared
/// by every bake until released.
pub struct BakeExecutor {
    backend: Box<dyn RenderBackend>,
    layout: BakeRigLayout,
    settle: BakeSettle,
    rig: BakeRig,
}

impl BakeExecutor {
    pub fn new(backend: Box<dyn RenderBackend>) -> Self {
        Self {
            backend,
            layout: BakeRigLayout::default(),
            settle: BakeSettle::default(),
            rig: BakeRig::default(),
        }
    }

    pub fn with_settle(mut self, settle: BakeSettle) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_layout(mut self, layout: BakeRigLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Whether any rig object is currently alive.
    pub fn has_rig(&self) -> bool {
        self.rig.target.is_some()
            || self.rig.surface.is_some()
            || self.rig.capture.is_some()
            || self.rig.light.is_some()
    }

    /// Render `material` onto the bake surface and read back
    /// `resolution × resolution` texels.
    pub fn bake(
        &mut self,
        material: &SurfaceMaterial,
        resolution: u32,
    ) -> Result<ColourMap, BakeError> {
        let (target, surface, capture) = self.prepare_rig(resolution)?;

        if !self.backend.assign_material(surface, material) {
            return Err(BakeError::MaterialRejected(
                material.name().unwrap_or("<unnamed>").to_string(),
            ));
        }
        self.backend.flush_rendering();
        pause(self.settle.before_capture);

        if !self.backend.capture(capture) {
            return Err(BakeError::CaptureFailed);
        }
        self.backend.flush_rendering();
        pause(self.settle.after_capture);

        let pixels = self
            .backend
            .read_pixels(target)
            .ok_or(BakeError::ReadBackFailed)?;
        Ok(ColourMap::from_texels(resolution, pixels)?)
    }

    /// Destroy every rig object. The next bake recreates them.
    pub fn release(&mut self) {
        if let Some(light) = self.rig.light.take() {
            self.backend.release(RigObject::Light(light));
        }
        if let Some(capture) = self.rig.capture.take() {
            self.backend.release(RigObject::CaptureRig(capture));
        }
        if let Some(surface) = self.rig.surface.take() {
            self.backend.release(RigObject::Surface(surface));
        }
        if let Some((target, _)) = self.rig.target.take() {
            self.backend.release(RigObject::RenderTarget(target));
        }
    }

    fn prepare_rig(
        &mut self,
        resolution: u32,
    ) -> Result<(RenderTargetId, SurfaceId, CaptureRigId), BakeError> {
        // The capture writes into the target, so a new resolution needs a
        // fresh target and capture pair.
        if matches!(self.rig.target, Some((_, current)) if current != resolution) {
            self.release();
        }

        let target = match self.rig.target {
            Some((target, _)) => target,
            None => {
                let target = self
                    .backend
                    .create_render_target(resolution, self.layout.clear_colour)
                    .ok_or(BakeError::RenderTargetUnavailable(resolution))?;
                self.rig.target = Some((target, resolution));
                target
            }
        };

        let surface = match self.rig.surface {
            Some(surface) => surface,
            None => {
                let surface = self
                    .backend
                    .spawn_bake_surface(self.layout.surface)
                    .ok_or(BakeError::SurfaceUnavailable)?;
                self.rig.surface = Some(surface);
                surface
            }
        };

        let capture = match self.rig.capture {
            Some(capture) => capture,
            None => {
                let capture = self
                    .backend
                    .spawn_capture_rig(self.layout.capture, self.layout.ortho_width, target)
                    .ok_or(BakeError::CaptureRigUnavailable)?;
                self.rig.capture = Some(capture);
                capture
            }
        };

        if self.rig.light.is_none() {
            self.rig.light = self
                .backend
                .spawn_directional_light(self.layout.light, self.layout.light_illuminance);
            if self.rig.light.is_none() {
                warn!("Bake light unavailable, baking unlit");
            }
        }

        Ok((target, surface, capture))
    }
}

impl Drop for BakeExecutor {
    fn drop(&mut self) {
        self.release();
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
