//! Triangle mesh: world-space-baked vertex buffer loaded from the
//! renderer's little-endian binary mesh format, intersected triangle by
//! triangle (the acceleration structure operates above this, over the
//! mesh's constituent triangles as individual primitives).

use std::fs::File;
use std::io::{BufReader, Read as _};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::error::{RenderError, Result};
use crate::core::geometry::{vec3_cross_vec3f, vec3_dot_vec3f, Bounds3, Normal3f, Point2f, Point3f, Vector3f};
use crate::core::interaction::SurfacePoint;
use crate::core::pbrt::Float;
use crate::core::transform::Transform;

const FLAG_POSITIONS: u32 = 1 << 0;
const FLAG_NORMALS: u32 = 1 << 1;
const FLAG_TANGENTS: u32 = 1 << 2;
const FLAG_UVS: u32 = 1 << 3;

#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub positions: Vec<Point3f>,
    pub normals: Vec<Normal3f>,
    pub tangents: Vec<Vector3f>,
    pub uvs: Vec<Point2f>,
    pub indices: Vec<u32>,
    pub bounds: Bounds3,
}

impl TriangleMesh {
    /// Reads the packed binary mesh format: vertex/index counts, a
    /// presence-bitmask, then each attribute array in turn (all world
    /// space already, pre-transformed at load time since this renderer
    /// does not revisit per-triangle transforms on every intersection).
    pub fn load(path: &Path, object_to_world: &Transform) -> Result<Self> {
        let file = File::open(path).map_err(|_| RenderError::MeshFileNotFound(path.to_path_buf()))?;
        let mut r = BufReader::new(file);

        let vertex_count = read_u32(&mut r, path)?;
        let index_count = read_u32(&mut r, path)?;
        let flags = read_u32(&mut r, path)?;

        if vertex_count == 0 || index_count == 0 {
            return Err(RenderError::MeshFileMalformed {
                path: path.to_path_buf(),
                reason: "vertexCount and indexCount must both be non-zero".to_string(),
            });
        }
        if flags & FLAG_POSITIONS == 0 {
            return Err(RenderError::MeshFileMalformed {
                path: path.to_path_buf(),
                reason: "mesh has no position data".to_string(),
            });
        }

        let mut positions = Vec::with_capacity(vertex_count as usize);
        for _ in 0..vertex_count {
            let p = read_vec3f(&mut r, path)?;
            positions.push(object_to_world.transform_point(Point3f::new(p.0, p.1, p.2)));
        }

        let mut normals = Vec::new();
        if flags & FLAG_NORMALS != 0 {
            for _ in 0..vertex_count {
                let n = read_vec3f(&mut r, path)?;
                normals.push(
                    object_to_world.transform_normal(Normal3f::new(n.0, n.1, n.2)),
                );
            }
        }

        let mut tangents = Vec::new();
        if flags & FLAG_TANGENTS != 0 {
            for _ in 0..vertex_count {
                let t = read_vec3f(&mut r, path)?;
                tangents.push(
                    object_to_world.transform_vector(Vector3f::new(t.0, t.1, t.2)),
                );
            }
        }

        let mut uvs = Vec::new();
        if flags & FLAG_UVS != 0 {
            for _ in 0..vertex_count {
                let x = r
                    .read_f32::<LittleEndian>()
                    .map_err(|source| RenderError::MeshFileParse {
                        path: path.to_path_buf(),
                        source,
                    })?;
                let y = r
                    .read_f32::<LittleEndian>()
                    .map_err(|source| RenderError::MeshFileParse {
                        path: path.to_path_buf(),
                        source,
                    })?;
                uvs.push(Point2f::new(x as Float, y as Float));
            }
        }

        let mut indices = Vec::with_capacity(index_count as usize);
        for _ in 0..index_count {
            indices.push(read_u32(&mut r, path)?);
        }

        let mut bounds = Bounds3::default();
        for p in &positions {
            bounds = bounds.union_point(*p);
        }

        Ok(TriangleMesh {
            positions,
            normals,
            tangents,
            uvs,
            indices,
            bounds,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangle_bounds(&self, tri: usize) -> Bounds3 {
        let (a, b, c) = self.triangle_positions(tri);
        Bounds3::from_point(a).union_point(b).union_point(c)
    }

    pub fn triangle_area(&self, tri: usize) -> Float {
        let (a, b, c) = self.triangle_positions(tri);
        0.5 * vec3_cross_vec3f(&Vector3f::from(b - a), &Vector3f::from(c - a)).length()
    }

    fn triangle_positions(&self, tri: usize) -> (Point3f, Point3f, Point3f) {
        let i0 = self.indices[tri * 3] as usize;
        let i1 = self.indices[tri * 3 + 1] as usize;
        let i2 = self.indices[tri * 3 + 2] as usize;
        (self.positions[i0], self.positions[i1], self.positions[i2])
    }

    /// Moller-Trumbore ray/triangle intersection, returning a
    /// partially-filled `SurfacePoint` with interpolated shading normal
    /// and UV when present, falling back to the geometric normal/UV.
    pub fn intersect_triangle(
        &self,
        tri: usize,
        ray: &crate::core::geometry::Ray,
    ) -> Option<(Float, SurfacePoint)> {
        let i0 = self.indices[tri * 3] as usize;
        let i1 = self.indices[tri * 3 + 1] as usize;
        let i2 = self.indices[tri * 3 + 2] as usize;
        let (p0, p1, p2) = (self.positions[i0], self.positions[i1], self.positions[i2]);

        let e1 = Vector3f::from(p1 - p0);
        let e2 = Vector3f::from(p2 - p0);
        let pvec = vec3_cross_vec3f(&ray.d, &e2);
        let det = vec3_dot_vec3f(&e1, &pvec);
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let tvec = Vector3f::from(ray.o - p0);
        let u = vec3_dot_vec3f(&tvec, &pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let qvec = vec3_cross_vec3f(&tvec, &e1);
        let v = vec3_dot_vec3f(&ray.d, &qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = vec3_dot_vec3f(&e2, &qvec) * inv_det;
        if t <= 1e-7 || t > ray.t_max {
            return None;
        }

        let w = 1.0 - u - v;
        let geo_n = Normal3f::from(vec3_cross_vec3f(&e1, &e2).normalize());
        let ns = if !self.normals.is_empty() {
            let n0 = self.normals[i0];
            let n1 = self.normals[i1];
            let n2 = self.normals[i2];
            Normal3f::new(
                w * n0.x + u * n1.x + v * n2.x,
                w * n0.y + u * n1.y + v * n2.y,
                w * n0.z + u * n1.z + v * n2.z,
            )
        } else {
            geo_n
        };
        let uv = if !self.uvs.is_empty() {
            let uv0 = self.uvs[i0];
            let uv1 = self.uvs[i1];
            let uv2 = self.uvs[i2];
            Point2f::new(
                w * uv0.x + u * uv1.x + v * uv2.x,
                w * uv0.y + u * uv1.y + v * uv2.y,
            )
        } else {
            Point2f::new(u, v)
        };
        let tangent_interp = if !self.tangents.is_empty() {
            let t0 = self.tangents[i0];
            let t1 = self.tangents[i1];
            let t2 = self.tangents[i2];
            Vector3f::new(
                w * t0.x + u * t1.x + v * t2.x,
                w * t0.y + u * t1.y + v * t2.y,
                w * t0.z + u * t1.z + v * t2.z,
            )
        } else {
            e1
        };
        // Interpolated per-vertex normals and tangents aren't generally
        // orthogonal once blended; Gram-Schmidt the tangent against the
        // interpolated shading normal so the shading frame stays orthonormal.
        let ns_vec = Vector3f::from(ns);
        let tangent_ortho = tangent_interp - ns_vec * vec3_dot_vec3f(&tangent_interp, &ns_vec);
        let tangent = if tangent_ortho.length_squared() > 1e-16 {
            tangent_ortho.normalize()
        } else {
            e1.normalize()
        };

        let p = Point3f::new(
            w * p0.x + u * p1.x + v * p2.x,
            w * p0.y + u * p1.y + v * p2.y,
            w * p0.z + u * p1.z + v * p2.z,
        );

        let sp = SurfacePoint {
            p,
            n: geo_n,
            ns,
            dpdu: tangent,
            ns_tangent: tangent,
            uv,
            ..SurfacePoint::default()
        };
        Some((t, sp))
    }

    pub fn sample_triangle(&self, tri: usize, u: Point2f) -> (SurfacePoint, Float) {
        let su0 = u.x.sqrt();
        let b0 = 1.0 - su0;
        let b1 = u.y * su0;
        let (p0, p1, p2) = self.triangle_positions(tri);
        let p = Point3f::new(
            b0 * p0.x + b1 * p1.x + (1.0 - b0 - b1) * p2.x,
            b0 * p0.y + b1 * p1.y + (1.0 - b0 - b1) * p2.y,
            b0 * p0.z + b1 * p1.z + (1.0 - b0 - b1) * p2.z,
        );
        let n = Normal3f::from(
            vec3_cross_vec3f(&Vector3f::from(p1 - p0), &Vector3f::from(p2 - p0)).normalize(),
        );
        let area = self.triangle_area(tri).max(1e-12);
        let sp = SurfacePoint {
            p,
            n,
            ns: n,
            ..SurfacePoint::default()
        };
        (sp, 1.0 / area)
    }
}

fn read_u32(r: &mut impl std::io::Read, path: &Path) -> Result<u32> {
    r.read_u32::<LittleEndian>()
        .map_err(|source| RenderError::MeshFileParse {
            path: path.to_path_buf(),
            source,
        })
}

fn read_vec3f(r: &mut impl std::io::Read, path: &Path) -> Result<(Float, Float, Float)> {
    let x = r
        .read_f32::<LittleEndian>()
        .map_err(|source| RenderError::MeshFileParse {
            path: path.to_path_buf(),
            source,
        })?;
    let y = r
        .read_f32::<LittleEndian>()
        .map_err(|source| RenderError::MeshFileParse {
            path: path.to_path_buf(),
            source,
        })?;
    let z = r
        .read_f32::<LittleEndian>()
        .map_err(|source| RenderError::MeshFileParse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok((x as Float, y as Float, z as Float))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> TriangleMesh {
        TriangleMesh {
            positions: vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            normals: Vec::new(),
            tangents: Vec::new(),
            uvs: Vec::new(),
            indices: vec![0, 1, 2],
            bounds: Bounds3::default(),
        }
    }

    #[test]
    fn ray_through_triangle_interior_hits() {
        let mesh = single_triangle();
        let ray = crate::core::geometry::Ray {
            o: Point3f::new(0.2, 0.2, 1.0),
            d: Vector3f::new(0.0, 0.0, -1.0),
            t_max: Float::INFINITY,
        };
        assert!(mesh.intersect_triangle(0, &ray).is_some());
    }

    #[test]
    fn ray_outside_triangle_misses() {
        let mesh = single_triangle();
        let ray = crate::core::geometry::Ray {
            o: Point3f::new(5.0, 5.0, 1.0),
            d: Vector3f::new(0.0, 0.0, -1.0),
            t_max: Float::INFINITY,
        };
        assert!(mesh.intersect_triangle(0, &ray).is_none());
    }
}
