//! Baked colour maps: flat per-texel colours of each (mesh, material) pair,
//! rendered once through an off-screen rig and persisted under the output
//! root so later runs load them instead of rendering again.

pub mod bake;
pub mod cache;
pub mod disk;
pub mod flat;
pub mod plugin;
pub mod texel;

pub use bake::{BakeError, BakeExecutor, BakeRigLayout, BakeSettle, RenderBackend, RigObject};
pub use cache::{
    BakeCombination, BakeReport, BakedColourMaps, ColourMapReader, MeshMaterialKey,
    gather_mesh_material_combos,
};
pub use disk::{ColourMapIoError, load_colour_map, save_colour_map};
pub use flat::{FlatBackendStats, FlatColourBackend};
pub use plugin::{
    BakeCallback, BakeMapsRequest, ClearColourMaps, ColourMapPlugin, ColourMapsBaked,
    insert_bake_backend, process_colour_map_requests, teardown_colour_maps,
};
pub use texel::{ColourMap, ColourMapError, Rgba8};
