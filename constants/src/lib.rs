/// Shared configuration for baking and scanning
pub mod bake;
pub mod bake_rig;
pub mod paths;
pub mod scan;
