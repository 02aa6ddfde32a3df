/// Axis-aligned box ray casting for headless scans
use crate::scene::{HitSurface, MeshRenderable, RayCaster, RayHit};
use bevy::prelude::*;

/// Box volume blocking scan rays, centred on the entity's translation.
/// Rotation is ignored.
#[derive(Component, Debug, Clone, Copy)]
pub struct ScanCollider {
    pub half_extents: Vec3,
}

#[derive(Debug, Clone)]
pub struct BoxCollider {
    pub min: Vec3,
    pub max: Vec3,
    pub surface: Option<HitSurface>,
}

impl BoxCollider {
    pub fn new(center: Vec3, half_extents: Vec3, surface: Option<HitSurface>) -> Self {
        let half_extents = half_extents.abs();
        Self {
            min: center - half_extents,
            max: center + half_extents,
            surface,
        }
    }
}

/// Ray caster over a fixed set of boxes. Each box face is a quad of two
/// triangles numbered `2 * face` and `2 * face + 1`, faces ordered
/// -X, +X, -Y, +Y, -Z, +Z.
#[derive(Debug, Clone, Default)]
pub struct AabbRayCaster {
    colliders: Vec<BoxCollider>,
}

impl AabbRayCaster {
    pub fn new(colliders: Vec<BoxCollider>) -> Self {
        Self { colliders }
    }

    /// Snapshot every `ScanCollider` in the world, taking surfaces from
    /// `MeshRenderable` on the same entity.
    pub fn from_world(world: &mut World) -> Self {
        let mut query = world.query::<(&ScanCollider, &Transform, Option<&MeshRenderable>)>();
        let colliders = query
            .iter(world)
            .map(|(collider, transform, renderable)| {
                BoxCollider::new(
                    transform.translation,
                    collider.half_extents * transform.scale,
                    renderable.and_then(MeshRenderable::surface),
                )
            })
            .collect();
        Self { colliders }
    }

    pub fn push(&mut self, collider: BoxCollider) {
        self.colliders.push(collider);
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}

impl RayCaster for AabbRayCaster {
    fn cast_ray(&self, start: Vec3, end: Vec3) -> Option<RayHit> {
        let direction = end - start;
        let (collider, entry) = self
            .colliders
            .iter()
            .filter_map(|collider| {
                let entry = ray_box_entry(start, direction, collider.min, collider.max)?;
                (entry.t <= 1.0).then_some((collider, entry))
            })
            .min_by(|a, b| a.1.t.total_cmp(&b.1.t))?;

        let location = start + direction * entry.t;
        Some(RayHit {
            location,
            uv: Some(face_uv(location, entry.face, collider.min, collider.max)),
            face_index: Some(entry.face as u32 * 2),
            surface: collider.surface.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct BoxEntry {
    t: f32,
    face: usize,
}

// Slab intersection that also reports which face the ray entered through.
// Rays starting inside a box do not hit it.
fn ray_box_entry(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<BoxEntry> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut face = 0;

    for axis in 0..3 {
        let (o, d, lo, hi) = (origin[axis], direction[axis], min[axis], max[axis]);
        if d == 0.0 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let (mut near, mut far) = ((lo - o) * inv, (hi - o) * inv);
        // Travelling in +axis enters through the min face.
        let mut near_face = axis * 2;
        if near > far {
            std::mem::swap(&mut near, &mut far);
            near_face = axis * 2 + 1;
        }

        if near > t_enter {
            t_enter = near;
            face = near_face;
        }
        t_exit = t_exit.min(far);
        if t_enter > t_exit {
            return None;
        }
    }

    (t_enter >= 0.0).then_some(BoxEntry { t: t_enter, face })
}

fn face_uv(point: Vec3, face: usize, min: Vec3, max: Vec3) -> Vec2 {
    let extent = (max - min).max(Vec3::splat(f32::EPSILON));
    let local = (point - min) / extent;
    match face / 2 {
        0 => Vec2::new(local.z, 1.0 - local.y),
        1 => Vec2::new(local.x, local.z),
        _ => Vec2::new(local.x, 1.0 - local.y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{StaticMesh, SurfaceMaterial};
    use std::sync::Arc;

    fn wall() -> BoxCollider {
        BoxCollider::new(Vec3::new(0.0, 0.0, -10.0), Vec3::new(5.0, 5.0, 1.0), None)
    }

    #[test]
    fn hits_nearest_face_within_range() {
        let caster = AabbRayCaster::new(vec![wall()]);
        let hit = caster.cast_ray(Vec3::ZERO, Vec3::new(0.0, 0.0, -50.0)).unwrap();

        assert!((hit.location.z + 9.0).abs() < 1e-4);
        // Entered through +Z.
        assert_eq!(hit.face_index, Some(10));
        let uv = hit.uv.unwrap();
        assert!((uv.x - 0.5).abs() < 1e-4 && (uv.y - 0.5).abs() < 1e-4);
    }

    #[test]
    fn short_rays_and_misses_return_nothing() {
        let caster = AabbRayCaster::new(vec![wall()]);
        assert!(caster.cast_ray(Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0)).is_none());
        assert!(caster.cast_ray(Vec3::ZERO, Vec3::new(0.0, 50.0, 0.0)).is_none());
        assert!(caster
            .cast_ray(Vec3::new(0.0, 0.0, -10.0), Vec3::new(0.0, 0.0, -50.0))
            .is_none());
    }

    #[test]
    fn closer_box_wins() {
        let near = BoxCollider::new(Vec3::new(0.0, 0.0, -4.0), Vec3::splat(1.0), None);
        let caster = AabbRayCaster::new(vec![wall(), near]);
        let hit = caster.cast_ray(Vec3::ZERO, Vec3::new(0.0, 0.0, -50.0)).unwrap();
        assert!((hit.location.z + 3.0).abs() < 1e-4);
    }

    #[test]
    fn world_snapshot_carries_surfaces() {
        let mut world = World::new();
        let mesh = Arc::new(StaticMesh::single_section("Hedge", 12));
        let leaves = Arc::new(SurfaceMaterial::named("Leaves"));
        world.spawn((
            ScanCollider {
                half_extents: Vec3::splat(1.0),
            },
            Transform::from_xyz(3.0, 0.0, 0.0),
            MeshRenderable::new(mesh.clone(), vec![leaves.clone()]),
        ));

        let caster = AabbRayCaster::from_world(&mut world);
        let hit = caster.cast_ray(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)).unwrap();

        assert_eq!(hit.face_index, Some(0));
        let surface = hit.surface.unwrap();
        assert_eq!(surface.mesh.id(), mesh.id());
        assert_eq!(surface.material_for_face(hit.face_index).unwrap().id(), leaves.id());
    }
}
