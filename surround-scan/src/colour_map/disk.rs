/// Headerless on-disk records for baked colour maps.
use super::texel::{ColourMap, ColourMapError, Rgba8};
use constants::bake::BYTES_PER_TEXEL;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ColourMapIoError {
    #[error("colour map io error: {0}")]
    Io(#[from] io::Error),
    #[error("record is {actual} bytes, resolution {resolution} needs {expected}")]
    SizeMismatch {
        resolution: u32,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Invalid(#[from] ColourMapError),
}

/// Write the raw texel bytes, creating parent directories as needed.
pub fn save_colour_map(path: &Path, map: &ColourMap) -> Result<(), ColourMapIoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, map.as_bytes())?;
    Ok(())
}

/// Read a record back. The byte length must match `resolution² × 4` exactly;
/// anything else means the record was written for another resolution or is
/// damaged and must be baked again.
pub fn load_colour_map(path: &Path, resolution: u32) -> Result<ColourMap, ColourMapIoError> {
    let bytes = fs::read(path)?;
    let expected = ColourMap::texel_count(resolution) * BYTES_PER_TEXEL;

    if bytes.len() != expected {
        return Err(ColourMapIoError::SizeMismatch {
            resolution,
            expected,
            actual: bytes.len(),
        });
    }

    let texels = bytemuck::cast_slice::<u8, Rgba8>(&bytes).to_vec();
    Ok(ColourMap::from_texels(resolution, texels)?)
}
