//! The scene: entity registration, light list, and the hit/visibility
//! queries integrators drive everything else from.

use std::sync::Arc;

use crate::accelerators::bvh::Bvh;
use crate::core::geometry::{vec3_dot_nrmf, Normal3f, Point2f, Point3f, Vector3f};
use crate::core::interaction::SurfacePoint;
use crate::core::light::DiffuseAreaLight;
use crate::core::material::Material;
use crate::core::pbrt::Float;
use crate::core::spectrum::Spectrum;
use crate::shapes::mesh::TriangleMesh;
use crate::shapes::plane::Plane;
use crate::shapes::sphere::Sphere;
use crate::shapes::Shape;

/// A scene-file `medium` reference. Participating-medium transport
/// itself is out of scope (non-goals exclude volumetric/spectral
/// transport); kept as parsed scene-file metadata only.
#[derive(Debug, Clone, Copy)]
pub struct Medium {
    pub extinction: Spectrum,
}

#[derive(Debug, Clone, Copy)]
pub struct Emission {
    pub color: Spectrum,
    pub strength: Float,
}

/// The shape kinds an [`Entity`] can register, distinct from
/// [`crate::shapes::Shape`] (the BVH primitive unit) because a mesh
/// entity expands into many triangle primitives that all share one
/// `Entity`.
#[derive(Clone)]
pub enum EntityShape {
    Sphere(Sphere),
    Plane(Plane),
    Mesh {
        mesh: Arc<TriangleMesh>,
        /// Cumulative normalized triangle-area table, used to pick a
        /// triangle proportional to its area when area-sampling an
        /// emissive mesh.
        area_cdf: Vec<Float>,
    },
}

impl EntityShape {
    pub fn mesh(mesh: Arc<TriangleMesh>) -> Self {
        let n = mesh.triangle_count();
        let mut areas = Vec::with_capacity(n);
        let mut total = 0.0;
        for t in 0..n {
            total += mesh.triangle_area(t);
            areas.push(total);
        }
        let area_cdf = if total > 0.0 {
            areas.iter().map(|a| a / total).collect()
        } else {
            areas
        };
        EntityShape::Mesh { mesh, area_cdf }
    }

    pub fn area(&self) -> Float {
        match self {
            EntityShape::Sphere(s) => s.area(),
            EntityShape::Plane(p) => p.area(),
            EntityShape::Mesh { mesh, .. } => {
                (0..mesh.triangle_count()).map(|t| mesh.triangle_area(t)).sum()
            }
        }
    }

    /// Area-uniform point on the whole entity. For a mesh this first
    /// picks a triangle proportional to its area (remapping `u.x`
    /// against the cumulative table), then samples uniformly inside
    /// it, so the combined pdf is `1/total_area` regardless of how
    /// unevenly area is distributed across triangles.
    pub fn sample_point(&self, u: Point2f) -> (SurfacePoint, Float) {
        match self {
            EntityShape::Sphere(s) => s.sample_point(u),
            EntityShape::Plane(p) => p.sample_point(u),
            EntityShape::Mesh { mesh, area_cdf } => {
                if area_cdf.is_empty() {
                    return (SurfacePoint::default(), 0.0);
                }
                let tri = match area_cdf.binary_search_by(|p| p.partial_cmp(&u.x).unwrap()) {
                    Ok(i) => i,
                    Err(i) => i.min(area_cdf.len() - 1),
                };
                let prev = if tri == 0 { 0.0 } else { area_cdf[tri - 1] };
                let span = (area_cdf[tri] - prev).max(1e-12);
                let remapped = Point2f::new(((u.x - prev) / span).clamp(0.0, 1.0), u.y);
                let (sp, _pdf_tri) = mesh.sample_triangle(tri, remapped);
                let total_area: Float =
                    (0..mesh.triangle_count()).map(|t| mesh.triangle_area(t)).sum();
                (sp, 1.0 / total_area.max(1e-12))
            }
        }
    }
}

/// Scene registration record: shape, material, optional emission and
/// medium, and a priority/ior pair carried through as scene-file
/// metadata (see [`SurfacePoint::priority`]/[`SurfacePoint::ior`]).
/// Overlapping dielectric interiors are not resolved automatically —
/// scene files are expected not to nest transparent volumes of
/// differing IOR inside one another.
#[derive(Clone)]
pub struct Entity {
    pub shape: EntityShape,
    pub material: Material,
    pub emission: Option<Emission>,
    pub medium: Option<Medium>,
    pub priority: i32,
    pub ior: Float,
}

/// One BVH leaf element: an entity index plus the concrete shape
/// (single-shape entities contribute one primitive, meshes contribute
/// one primitive per triangle, all tagged with the same entity index).
#[derive(Clone)]
pub struct Primitive {
    pub entity: usize,
    pub shape: Shape,
}

impl Primitive {
    pub fn world_bounds(&self) -> crate::core::geometry::Bounds3 {
        self.shape.world_bounds()
    }

    pub fn intersect(&self, ray: &crate::core::geometry::Ray) -> Option<(Float, SurfacePoint)> {
        self.shape.intersect(ray)
    }
}

/// Geometric self-intersection offset: origin is nudged by this much
/// along the originating normal, in the direction that opens away from
/// the surface relative to the outgoing ray.
const RAY_EPSILON: Float = 1e-6;

fn offset_origin(p: Point3f, n: Normal3f, dir: &Vector3f) -> Point3f {
    let sign = if vec3_dot_nrmf(dir, &n) > 0.0 { 1.0 } else { -1.0 };
    let scale = RAY_EPSILON * (1.0 + p.x.abs().max(p.y.abs()).max(p.z.abs()));
    p + Vector3f::from(n) * (sign * scale)
}

pub struct Scene {
    pub entities: Vec<Entity>,
    pub lights: Vec<DiffuseAreaLight>,
    bvh: Bvh,
}

impl Scene {
    pub fn build(entities: Vec<Entity>) -> Self {
        let mut primitives = Vec::new();
        for (i, e) in entities.iter().enumerate() {
            match &e.shape {
                EntityShape::Sphere(s) => primitives.push(Primitive {
                    entity: i,
                    shape: Shape::Sphere(*s),
                }),
                EntityShape::Plane(p) => primitives.push(Primitive {
                    entity: i,
                    shape: Shape::Plane(*p),
                }),
                EntityShape::Mesh { mesh, .. } => {
                    for tri in 0..mesh.triangle_count() {
                        primitives.push(Primitive {
                            entity: i,
                            shape: Shape::MeshTriangle {
                                mesh: mesh.clone(),
                                tri,
                            },
                        });
                    }
                }
            }
        }

        let mut lights = Vec::new();
        for (i, e) in entities.iter().enumerate() {
            if let Some(em) = &e.emission {
                lights.push(DiffuseAreaLight {
                    entity: i,
                    color: em.color,
                    strength: em.strength,
                });
            }
        }

        let bvh = Bvh::build(primitives);
        Scene {
            entities,
            lights,
            bvh,
        }
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn light(&self, i: usize) -> &DiffuseAreaLight {
        &self.lights[i]
    }

    /// Index into `lights` of the `DiffuseAreaLight` attached to `entity`,
    /// if any. Shared by every integrator that needs to evaluate emission
    /// after landing on a light by BSDF sampling rather than by explicit
    /// light selection.
    pub fn light_for_entity(&self, entity: usize) -> Option<usize> {
        self.lights.iter().position(|l| l.entity == entity)
    }

    /// Area-uniform point on the entity a light is attached to; the
    /// scene owns entity shape data so lights defer sampling here.
    pub fn sample_entity_point(&self, entity: usize, u: Point2f) -> (SurfacePoint, Float) {
        self.entities[entity].shape.sample_point(u)
    }

    fn annotate(&self, mut sp: SurfacePoint, entity: usize) -> SurfacePoint {
        let e = &self.entities[entity];
        sp.entity = Some(entity);
        sp.on_light = e.emission.is_some();
        sp.priority = e.priority;
        sp.ior = e.ior;
        sp
    }

    /// Closest-hit query. `origin`/`origin_n` describe the point the
    /// ray leaves from (used only to offset against self-intersection);
    /// pass a zero normal if the ray starts in free space (e.g. from a
    /// camera lens point with its own outward-facing convention).
    pub fn raycast(
        &self,
        origin: Point3f,
        origin_n: Normal3f,
        dir: Vector3f,
        t_max: Float,
    ) -> Option<SurfacePoint> {
        let o = offset_origin(origin, origin_n, &dir);
        let ray = crate::core::geometry::Ray::new(o, dir, t_max);
        let (_, sp, prim_index) = self.bvh.intersect(&ray)?;
        let entity = self.bvh.entity_at(prim_index);
        Some(self.annotate(sp, entity))
    }

    /// Shadow query: true iff no occluder lies strictly between `p0`
    /// and `p1` (both nudged outward along their normals first).
    pub fn visibility(
        &self,
        p0: Point3f,
        n0: Normal3f,
        p1: Point3f,
        n1: Normal3f,
    ) -> bool {
        let dir_01 = p1 - p0;
        let dir = Vector3f::from(dir_01);
        let full_length = dir.length();
        if full_length < 1e-12 {
            return true;
        }
        let dir_n = dir.normalize();
        let o = offset_origin(p0, n0, &dir_n);
        let end = offset_origin(p1, n1, &(-dir_n));
        let seg = Vector3f::from(end - o);
        let length = seg.length();
        if length <= 0.0 {
            return true;
        }
        let ray = crate::core::geometry::Ray::new(o, seg * (1.0 / length), length - RAY_EPSILON);
        !self.bvh.intersect_p(&ray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::texture::Texture;
    use crate::core::transform::Transform;

    fn diffuse_sphere(x: Float, priority: i32) -> Entity {
        Entity {
            shape: EntityShape::Sphere(Sphere::new(1.0, Transform::translation(Vector3f::new(x, 0.0, 0.0)))),
            material: Material::Diffuse {
                reflectance: Texture::Constant(Spectrum::new(0.5)),
            },
            emission: None,
            medium: None,
            priority,
            ior: 1.0,
        }
    }

    #[test]
    fn raycast_annotates_entity_and_priority() {
        let scene = Scene::build(vec![diffuse_sphere(0.0, 3)]);
        let sp = scene
            .raycast(
                Point3f::new(0.0, 0.0, -10.0),
                Normal3f::new(0.0, 0.0, -1.0),
                Vector3f::new(0.0, 0.0, 1.0),
                Float::INFINITY,
            )
            .expect("ray should hit the sphere");
        assert_eq!(sp.entity, Some(0));
        assert_eq!(sp.priority, 3);
    }

    #[test]
    fn visibility_is_false_when_occluded() {
        let scene = Scene::build(vec![diffuse_sphere(0.0, 0)]);
        let visible = scene.visibility(
            Point3f::new(0.0, 0.0, -10.0),
            Normal3f::new(0.0, 0.0, -1.0),
            Point3f::new(0.0, 0.0, 10.0),
            Normal3f::new(0.0, 0.0, 1.0),
        );
        assert!(!visible);
    }

    #[test]
    fn visibility_is_true_with_nothing_between() {
        let scene = Scene::build(vec![diffuse_sphere(100.0, 0)]);
        let visible = scene.visibility(
            Point3f::new(0.0, 0.0, -10.0),
            Normal3f::new(0.0, 0.0, -1.0),
            Point3f::new(0.0, 0.0, 10.0),
            Normal3f::new(0.0, 0.0, 1.0),
        );
        assert!(visible);
    }
}
