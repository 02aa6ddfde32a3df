/// Settings for offline scan aggregation

/// Points handled per parallel bounds chunk
pub const BOUNDS_CHUNK_SIZE: usize = 25_000;

/// Scale applied to PLY coordinates when none is given
pub const DEFAULT_PLY_SCALE: f64 = 1.0;

/// Scale converting centimetre scans to feet for survey tooling
pub const CENTIMETRES_TO_FEET: f64 = 0.0328084;

pub const PROGRESS_CHARS: &str = "▉▊▋▌▍▎▏ ";
