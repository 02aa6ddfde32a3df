//! Scene content the baker and scanner see: meshes, materials and the
//! components that pair them, plus the ray casting seam to the physics host.

use bevy::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a mesh. Two meshes with identical content are still distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

/// Identity of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u64);

/// Contiguous triangle range drawn with one material slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshSection {
    pub first_triangle: u32,
    pub triangle_count: u32,
}

impl MeshSection {
    pub fn new(first_triangle: u32, triangle_count: u32) -> Self {
        Self {
            first_triangle,
            triangle_count,
        }
    }

    pub fn contains(&self, triangle: u32) -> bool {
        triangle >= self.first_triangle
            && triangle - self.first_triangle < self.triangle_count
    }
}

/// Static mesh as seen by the baker: a name and the sections of its first
/// level of detail.
#[derive(Debug)]
pub struct StaticMesh {
    id: MeshId,
    name: Option<String>,
    sections: Vec<MeshSection>,
}

impl StaticMesh {
    pub fn new(name: Option<&str>, sections: Vec<MeshSection>) -> Self {
        Self {
            id: MeshId(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.map(str::to_string),
            sections,
        }
    }

    /// Mesh with a single section covering `triangle_count` triangles.
    pub fn single_section(name: &str, triangle_count: u32) -> Self {
        Self::new(Some(name), vec![MeshSection::new(0, triangle_count)])
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn sections(&self) -> &[MeshSection] {
        &self.sections
    }

    /// Section whose triangle range holds `triangle`, if any.
    pub fn section_for_triangle(&self, triangle: u32) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| section.contains(triangle))
    }
}

/// Material reference handed to the render backend when baking.
#[derive(Debug)]
pub struct SurfaceMaterial {
    id: MaterialId,
    name: Option<String>,
    base_colour: [u8; 4],
}

impl SurfaceMaterial {
    pub fn new(name: Option<&str>, base_colour: [u8; 4]) -> Self {
        Self {
            id: MaterialId(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.map(str::to_string),
            base_colour,
        }
    }

    pub fn named(name: &str) -> Self {
        Self::new(Some(name), [255, 255, 255, 255])
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Flat albedo parameter, useful to backends without a shading pipeline.
    pub fn base_colour(&self) -> [u8; 4] {
        self.base_colour
    }
}

/// A mesh drawn with one material per section slot. Empty slots are allowed
/// and are skipped when gathering bake work.
#[derive(Component, Clone, Debug)]
pub struct MeshRenderable {
    pub mesh: Option<Arc<StaticMesh>>,
    pub materials: Vec<Option<Arc<SurfaceMaterial>>>,
}

impl MeshRenderable {
    pub fn new(mesh: Arc<StaticMesh>, materials: Vec<Arc<SurfaceMaterial>>) -> Self {
        Self {
            mesh: Some(mesh),
            materials: materials.into_iter().map(Some).collect(),
        }
    }

    pub fn surface(&self) -> Option<HitSurface> {
        Some(HitSurface {
            mesh: self.mesh.clone()?,
            materials: self.materials.clone(),
        })
    }
}

/// Mesh and material slots of whatever a ray struck.
#[derive(Clone, Debug)]
pub struct HitSurface {
    pub mesh: Arc<StaticMesh>,
    pub materials: Vec<Option<Arc<SurfaceMaterial>>>,
}

impl HitSurface {
    pub fn material(&self, slot: usize) -> Option<&Arc<SurfaceMaterial>> {
        self.materials.get(slot)?.as_ref()
    }

    /// Material drawn on the triangle that was hit. Falls back to slot 0
    /// when the face is unknown or outside every section.
    pub fn material_for_face(&self, face_index: Option<u32>) -> Option<&Arc<SurfaceMaterial>> {
        let slot = face_index
            .and_then(|face| self.mesh.section_for_triangle(face))
            .unwrap_or(0);
        self.material(slot)
    }
}

/// First blocking hit along a ray.
#[derive(Clone, Debug)]
pub struct RayHit {
    pub location: Vec3,
    pub uv: Option<Vec2>,
    pub face_index: Option<u32>,
    pub surface: Option<HitSurface>,
}

/// Physics seam used by the sweep worker. Implementations are queried from a
/// background thread and must not touch the ECS world.
pub trait RayCaster: Send + Sync + 'static {
    fn cast_ray(&self, start: Vec3, end: Vec3) -> Option<RayHit>;
}

/// Scene with nothing to hit.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyScene;

impl RayCaster for EmptyScene {
    fn cast_ray(&self, _start: Vec3, _end: Vec3) -> Option<RayHit> {
        None
    }
}

/// Ray caster shared with every scan started in this world.
#[derive(Resource, Clone)]
pub struct ScanRayCaster(pub Arc<dyn RayCaster>);

impl Default for ScanRayCaster {
    fn default() -> Self {
        Self(Arc::new(EmptyScene))
    }
}
