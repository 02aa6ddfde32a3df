use bevy::prelude::*;

/// Uniform scale applied to the flat bake surface
pub const BAKE_SURFACE_SCALE: f32 = 5.0;

/// Bake surface sits at the origin, facing up
pub const BAKE_SURFACE_TRANSLATION: Vec3 = Vec3::ZERO;

/// Capture rig hovers above the surface and looks straight down
pub const CAPTURE_RIG_TRANSLATION: Vec3 = Vec3::new(0.0, 20.0, 0.0);
pub const CAPTURE_RIG_PITCH_DEGREES: f32 = -90.0;

/// Orthographic width covered by the capture, in world units
pub const CAPTURE_ORTHO_WIDTH: f32 = 400.0;

pub const BAKE_LIGHT_TRANSLATION: Vec3 = Vec3::new(0.0, 300.0, 0.0);
pub const BAKE_LIGHT_PITCH_DEGREES: f32 = -45.0;
pub const BAKE_LIGHT_ILLUMINANCE: f32 = 20_000.0;

/// Colour the render target is cleared to before each capture
pub const BAKE_CLEAR_COLOUR: [u8; 4] = [0, 0, 0, 255];
