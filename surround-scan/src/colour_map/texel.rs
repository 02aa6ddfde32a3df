/// Fixed-size RGBA texel buffers produced by material bakes.
use bevy::prelude::*;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One 8-bit RGBA texel. Layout matches the on-disk record byte for byte.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_array(rgba: [u8; 4]) -> Self {
        Self::new(rgba[0], rgba[1], rgba[2], rgba[3])
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColourMapError {
    #[error("bake resolution must be non-zero")]
    ZeroResolution,
    #[error("expected {expected} texels for the bake resolution, got {actual}")]
    TexelCount { expected: usize, actual: usize },
}

/// Square bake of a material, stored row-major.
/// Always holds exactly `resolution * resolution` texels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColourMap {
    resolution: u32,
    texels: Vec<Rgba8>,
}

impl ColourMap {
    /// Number of texels a map of the given resolution holds.
    pub fn texel_count(resolution: u32) -> usize {
        resolution as usize * resolution as usize
    }

    /// Wrap a pixel read-back, rejecting buffers of the wrong length.
    pub fn from_texels(resolution: u32, texels: Vec<Rgba8>) -> Result<Self, ColourMapError> {
        if resolution == 0 {
            return Err(ColourMapError::ZeroResolution);
        }

        let expected = Self::texel_count(resolution);
        if texels.len() != expected {
            return Err(ColourMapError::TexelCount {
                expected,
                actual: texels.len(),
            });
        }

        Ok(Self { resolution, texels })
    }

    pub fn solid(resolution: u32, colour: Rgba8) -> Result<Self, ColourMapError> {
        Self::from_texels(resolution, vec![colour; Self::texel_count(resolution)])
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn texels(&self) -> &[Rgba8] {
        &self.texels
    }

    pub fn len(&self) -> usize {
        self.texels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    /// Raw RGBA bytes, four per texel.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    pub fn texel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.resolution || y >= self.resolution {
            return None;
        }
        self.texels
            .get(y as usize * self.resolution as usize + x as usize)
            .copied()
    }

    /// Sample with tiling UVs: coordinates wrap into [0, 1) and snap to the
    /// texel containing them.
    pub fn sample(&self, uv: Vec2) -> Rgba8 {
        let x = self.texel_index(uv.x);
        let y = self.texel_index(uv.y);
        self.texels[y as usize * self.resolution as usize + x as usize]
    }

    fn texel_index(&self, coordinate: f32) -> u32 {
        let wrapped = coordinate.rem_euclid(1.0);
        let max = (self.resolution - 1) as f32;
        // rem_euclid may round up to exactly 1.0 for tiny negative inputs.
        (wrapped * self.resolution as f32).floor().clamp(0.0, max) as u32
    }
}
