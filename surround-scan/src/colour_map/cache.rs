/// In-memory table of baked colour maps backed by on-disk records
use super::bake::BakeExecutor;
use super::disk::{ColourMapIoError, load_colour_map, save_colour_map};
use super::texel::ColourMap;
use crate::config::OutputLayout;
use crate::scene::{MaterialId, MeshId, MeshRenderable, StaticMesh, SurfaceMaterial};
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, PoisonError, RwLock};

/// Cache key. Compares identities, never mesh or material content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshMaterialKey {
    pub mesh: MeshId,
    pub material: MaterialId,
}

impl MeshMaterialKey {
    pub fn new(mesh: &StaticMesh, material: &SurfaceMaterial) -> Self {
        Self {
            mesh: mesh.id(),
            material: material.id(),
        }
    }
}

/// One unit of bake work.
#[derive(Debug, Clone)]
pub struct BakeCombination {
    pub mesh: Arc<StaticMesh>,
    pub material: Arc<SurfaceMaterial>,
}

impl BakeCombination {
    pub fn key(&self) -> MeshMaterialKey {
        MeshMaterialKey::new(&self.mesh, &self.material)
    }
}

/// Outcome counts of one `ensure_baked` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BakeReport {
    /// Already in memory before the pass.
    pub cached: usize,
    /// Read from a valid on-disk record.
    pub loaded: usize,
    /// Rendered during the pass.
    pub baked: usize,
    /// Left without a colour map.
    pub failed: usize,
}

type ColourTable = HashMap<MeshMaterialKey, Arc<ColourMap>>;

fn lookup_in(
    table: &RwLock<ColourTable>,
    mesh: Option<&StaticMesh>,
    material: Option<&SurfaceMaterial>,
) -> Option<Arc<ColourMap>> {
    let key = MeshMaterialKey::new(mesh?, material?);
    table
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned()
}

/// Read-only view of the table for threads that cannot reach the world.
#[derive(Clone)]
pub struct ColourMapReader {
    table: Arc<RwLock<ColourTable>>,
}

impl ColourMapReader {
    pub fn lookup(
        &self,
        mesh: Option<&StaticMesh>,
        material: Option<&SurfaceMaterial>,
    ) -> Option<Arc<ColourMap>> {
        lookup_in(&self.table, mesh, material)
    }
}

/// Baked colour maps of one world. Every entry has the same resolution.
#[derive(Resource, Clone)]
pub struct BakedColourMaps {
    resolution: u32,
    table: Arc<RwLock<ColourTable>>,
}

impl BakedColourMaps {
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution,
            table: Arc::default(),
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Point-in-time lookup. Never bakes; a missing mesh or material is a miss.
    pub fn lookup(
        &self,
        mesh: Option<&StaticMesh>,
        material: Option<&SurfaceMaterial>,
    ) -> Option<Arc<ColourMap>> {
        lookup_in(&self.table, mesh, material)
    }

    pub fn contains(&self, key: &MeshMaterialKey) -> bool {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.table.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reader(&self) -> ColourMapReader {
        ColourMapReader {
            table: self.table.clone(),
        }
    }

    /// Drop every in-memory entry. Records on disk are kept.
    pub fn clear(&self) {
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Make sure every combination has a colour map, preferring on-disk
    /// records over new bakes. New bakes are persisted on a best-effort basis.
    pub fn ensure_baked(
        &self,
        layout: &OutputLayout,
        map_name: &str,
        combinations: &[BakeCombination],
        mut executor: Option<&mut BakeExecutor>,
    ) -> BakeReport {
        let mut report = BakeReport::default();

        for combination in combinations {
            let key = combination.key();
            if self.contains(&key) {
                report.cached += 1;
                continue;
            }

            let path = layout.baked_record(
                map_name,
                combination.mesh.name(),
                combination.material.name(),
            );

            match load_colour_map(&path, self.resolution) {
                Ok(map) => {
                    self.insert(key, map);
                    report.loaded += 1;
                    continue;
                }
                Err(ColourMapIoError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => warn!("Discarding baked record {}: {}", path.display(), err),
            }

            let Some(executor) = executor.as_deref_mut() else {
                warn!(
                    "No bake executor available for {}",
                    path.file_name().unwrap_or_default().to_string_lossy()
                );
                report.failed += 1;
                continue;
            };

            match executor.bake(&combination.material, self.resolution) {
                Ok(map) => {
                    if let Err(err) = save_colour_map(&path, &map) {
                        warn!("Could not persist {}: {}", path.display(), err);
                    }
                    self.insert(key, map);
                    report.baked += 1;
                }
                Err(err) => {
                    warn!(
                        "Bake of {:?} on {:?} failed: {}",
                        combination.material.name(),
                        combination.mesh.name(),
                        err
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    fn insert(&self, key: MeshMaterialKey, map: ColourMap) {
        if map.is_empty() {
            return;
        }
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(map));
    }
}

/// Every distinct (mesh, material) pair drawn in the world, in first-seen
/// order. Empty mesh or material slots are skipped.
pub fn gather_mesh_material_combos(world: &mut World) -> Vec<BakeCombination> {
    let mut seen = HashSet::new();
    let mut combinations = Vec::new();

    let mut renderables = world.query::<&MeshRenderable>();
    for renderable in renderables.iter(world) {
        let Some(mesh) = &renderable.mesh else {
            continue;
        };
        for material in renderable.materials.iter().flatten() {
            let combination = BakeCombination {
                mesh: mesh.clone(),
                material: material.clone(),
            };
            if seen.insert(combination.key()) {
                combinations.push(combination);
            }
        }
    }

    combinations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour_map::flat::FlatColourBackend;
    use crate::colour_map::texel::Rgba8;
    use crate::config::SurroundScanConfig;
    use std::fs;

    fn combo(mesh: &str, material: &str, colour: [u8; 4]) -> BakeCombination {
        BakeCombination {
            mesh: Arc::new(StaticMesh::single_section(mesh, 2)),
            material: Arc::new(SurfaceMaterial::new(Some(material), colour)),
        }
    }

    #[test]
    fn null_inputs_miss() {
        let cache = BakedColourMaps::new(4);
        let mesh = StaticMesh::single_section("Bench", 2);
        assert!(cache.lookup(None, None).is_none());
        assert!(cache.lookup(Some(&mesh), None).is_none());
    }

    #[test]
    fn bakes_persist_and_fill_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SurroundScanConfig::with_output_root(dir.path()).layout();
        let cache = BakedColourMaps::new(4);
        let mut executor = BakeExecutor::new(Box::new(FlatColourBackend::new()));
        let work = vec![combo("Kerb", "Stone", [90, 90, 90, 255])];

        let report = cache.ensure_baked(&layout, "Street", &work, Some(&mut executor));
        assert_eq!(report.baked, 1);

        let map = cache
            .lookup(Some(&*work[0].mesh), Some(&*work[0].material))
            .unwrap();
        assert_eq!(map.len(), 16);
        let record = layout.baked_record("Street", Some("Kerb"), Some("Stone"));
        assert_eq!(fs::read(record).unwrap().len(), 64);

        let again = cache.ensure_baked(&layout, "Street", &work, Some(&mut executor));
        assert_eq!(again.cached, 1);
    }

    #[test]
    fn disk_records_load_without_an_executor() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SurroundScanConfig::with_output_root(dir.path()).layout();
        let work = vec![combo("Pole", "Paint", [0, 0, 0, 255])];
        let record = layout.baked_record("Street", Some("Pole"), Some("Paint"));
        save_colour_map(&record, &ColourMap::solid(4, Rgba8::new(7, 8, 9, 255)).unwrap())
            .unwrap();

        let cache = BakedColourMaps::new(4);
        let report = cache.ensure_baked(&layout, "UEDPIE_0_Street", &work, None);

        assert_eq!(report.loaded, 1);
        let map = cache
            .lookup(Some(&*work[0].mesh), Some(&*work[0].material))
            .unwrap();
        assert_eq!(map.texel(3, 3), Some(Rgba8::new(7, 8, 9, 255)));
    }

    #[test]
    fn wrong_sized_record_is_rebaked() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SurroundScanConfig::with_output_root(dir.path()).layout();
        let work = vec![combo("Sign", "Metal", [200, 10, 10, 255])];
        let record = layout.baked_record("Street", Some("Sign"), Some("Metal"));
        save_colour_map(&record, &ColourMap::solid(2, Rgba8::default()).unwrap()).unwrap();

        let cache = BakedColourMaps::new(4);
        let mut executor = BakeExecutor::new(Box::new(FlatColourBackend::new()));
        let report = cache.ensure_baked(&layout, "Street", &work, Some(&mut executor));

        assert_eq!(report.baked, 1);
        assert_eq!(fs::read(record).unwrap().len(), 64);
    }

    #[test]
    fn misses_without_executor_are_failures() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SurroundScanConfig::with_output_root(dir.path()).layout();
        let cache = BakedColourMaps::new(4);
        let report = cache.ensure_baked(&layout, "Street", &[combo("A", "B", [1; 4])], None);
        assert_eq!(report.failed, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn gathering_collapses_shared_pairs() {
        let mut world = World::new();
        let mesh = Arc::new(StaticMesh::single_section("Tile", 2));
        let grout = Arc::new(SurfaceMaterial::named("Grout"));
        let glaze = Arc::new(SurfaceMaterial::named("Glaze"));

        world.spawn(MeshRenderable::new(mesh.clone(), vec![grout.clone(), glaze.clone()]));
        world.spawn(MeshRenderable::new(mesh.clone(), vec![grout.clone()]));
        world.spawn(MeshRenderable {
            mesh: Some(mesh.clone()),
            materials: vec![None],
        });
        world.spawn(MeshRenderable {
            mesh: None,
            materials: vec![Some(glaze.clone())],
        });

        let combos = gather_mesh_material_combos(&mut world);
        assert_eq!(combos.len(), 2);
        let keys: HashSet<_> = combos.iter().map(BakeCombination::key).collect();
        assert!(keys.contains(&MeshMaterialKey::new(&mesh, &grout)));
        assert!(keys.contains(&MeshMaterialKey::new(&mesh, &glaze)));
    }
}
