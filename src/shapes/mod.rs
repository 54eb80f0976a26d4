//! Surface primitives: a closed, scene-file-driven set of shape kinds
//! dispatched through an enum, matching the same closed-set rationale
//! used for the BxDF catalog.

pub mod mesh;
pub mod plane;
pub mod sphere;

use crate::core::geometry::{Bounds3, Point2f, Ray};
use crate::core::interaction::SurfacePoint;
use crate::core::pbrt::Float;

use mesh::TriangleMesh;
use plane::Plane;
use sphere::Sphere;

#[derive(Debug, Clone)]
pub enum Shape {
    Sphere(Sphere),
    Plane(Plane),
    /// One mesh shared by all of its constituent triangles; `tri` picks
    /// which triangle this particular `Shape` value refers to, so each
    /// mesh triangle is a distinct primitive in the acceleration
    /// structure's eyes without duplicating the vertex buffer.
    MeshTriangle { mesh: std::sync::Arc<TriangleMesh>, tri: usize },
}

impl Shape {
    pub fn world_bounds(&self) -> Bounds3 {
        match self {
            Shape::Sphere(s) => {
                let r = s.radius;
                let c = s.object_to_world.transform_point(crate::core::geometry::Point3f::new(0.0, 0.0, 0.0));
                Bounds3::new(
                    crate::core::geometry::Point3f::new(c.x - r, c.y - r, c.z - r),
                    crate::core::geometry::Point3f::new(c.x + r, c.y + r, c.z + r),
                )
            }
            Shape::Plane(_) => {
                // Sampled by transforming all four object-space corners;
                // cheap enough at build time and exact for any rotation.
                let hx_hz = [(-0.5, -0.5), (0.5, -0.5), (-0.5, 0.5), (0.5, 0.5)];
                let plane = match self {
                    Shape::Plane(p) => p,
                    _ => unreachable!(),
                };
                let mut b = Bounds3::default();
                for (fx, fz) in hx_hz {
                    let corner = plane.object_to_world.transform_point(
                        crate::core::geometry::Point3f::new(fx * plane.size.0, 0.0, fz * plane.size.1),
                    );
                    b = b.union_point(corner);
                }
                b
            }
            Shape::MeshTriangle { mesh, tri } => mesh.triangle_bounds(*tri),
        }
    }

    pub fn area(&self) -> Float {
        match self {
            Shape::Sphere(s) => s.area(),
            Shape::Plane(p) => p.area(),
            Shape::MeshTriangle { mesh, tri } => mesh.triangle_area(*tri),
        }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<(Float, SurfacePoint)> {
        match self {
            Shape::Sphere(s) => s.intersect(ray),
            Shape::Plane(p) => p.intersect(ray),
            Shape::MeshTriangle { mesh, tri } => mesh.intersect_triangle(*tri, ray),
        }
    }

    pub fn sample_point(&self, u: Point2f) -> (SurfacePoint, Float) {
        match self {
            Shape::Sphere(s) => s.sample_point(u),
            Shape::Plane(p) => p.sample_point(u),
            Shape::MeshTriangle { mesh, tri } => mesh.sample_triangle(*tri, u),
        }
    }
}
