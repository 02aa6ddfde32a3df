/// Texel resolution shared by every material bake in a process
pub const BAKE_RESOLUTION: u32 = 256;

/// Bytes per stored texel (RGBA8)
pub const BYTES_PER_TEXEL: usize = 4;

/// Wait after assigning a material before capturing (milliseconds)
pub const BAKE_SETTLE_BEFORE_CAPTURE_MS: u64 = 50;

/// Wait after capturing before reading pixels back (milliseconds)
pub const BAKE_SETTLE_AFTER_CAPTURE_MS: u64 = 100;

/// Map identifier prefix added by editor play sessions, stripped from paths
pub const EDITOR_SESSION_PREFIX: &str = "UEDPIE_0_";

/// File name placeholder for a mesh without a name
pub const UNNAMED_MESH: &str = "NoneMesh";

/// File name placeholder for a material without a name
pub const UNNAMED_MATERIAL: &str = "NoneMat";

/// Extension of baked colour map records
pub const BAKED_RECORD_EXTENSION: &str = "bin";
