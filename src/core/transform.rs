//! Affine transforms: a forward/inverse matrix pair, with point,
//! direction, normal, and bounds transform methods.

use serde::{Deserialize, Serialize};

use crate::core::geometry::{Bounds3, Normal3f, Point3f, Vector3f};
use crate::core::pbrt::{radians, Float};

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Matrix4x4 {
    pub m: [[Float; 4]; 4],
}

impl Default for Matrix4x4 {
    fn default() -> Self {
        Matrix4x4::identity()
    }
}

impl Matrix4x4 {
    pub fn identity() -> Self {
        let mut m = [[0.0; 4]; 4];
        for i in 0..4 {
            m[i][i] = 1.0;
        }
        Matrix4x4 { m }
    }

    pub fn translate(v: Vector3f) -> Self {
        let mut m = Matrix4x4::identity();
        m.m[0][3] = v.x;
        m.m[1][3] = v.y;
        m.m[2][3] = v.z;
        m
    }

    pub fn scale(v: Vector3f) -> Self {
        let mut m = Matrix4x4::identity();
        m.m[0][0] = v.x;
        m.m[1][1] = v.y;
        m.m[2][2] = v.z;
        m
    }

    pub fn rotate_x(deg: Float) -> Self {
        let (s, c) = radians(deg).sin_cos();
        let mut m = Matrix4x4::identity();
        m.m[1][1] = c;
        m.m[1][2] = -s;
        m.m[2][1] = s;
        m.m[2][2] = c;
        m
    }

    pub fn rotate_y(deg: Float) -> Self {
        let (s, c) = radians(deg).sin_cos();
        let mut m = Matrix4x4::identity();
        m.m[0][0] = c;
        m.m[0][2] = s;
        m.m[2][0] = -s;
        m.m[2][2] = c;
        m
    }

    pub fn rotate_z(deg: Float) -> Self {
        let (s, c) = radians(deg).sin_cos();
        let mut m = Matrix4x4::identity();
        m.m[0][0] = c;
        m.m[0][1] = -s;
        m.m[1][0] = s;
        m.m[1][1] = c;
        m
    }

    pub fn mul(&self, rhs: &Matrix4x4) -> Matrix4x4 {
        let mut r = [[0.0; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                r[i][j] = self.m[i][0] * rhs.m[0][j]
                    + self.m[i][1] * rhs.m[1][j]
                    + self.m[i][2] * rhs.m[2][j]
                    + self.m[i][3] * rhs.m[3][j];
            }
        }
        Matrix4x4 { m: r }
    }

    pub fn inverse(&self) -> Matrix4x4 {
        // Gauss-Jordan elimination with partial pivoting, matching the
        // standard textbook 4x4 inverse used across this family of
        // renderers.
        let mut indxc = [0usize; 4];
        let mut indxr = [0usize; 4];
        let mut ipiv = [0usize; 4];
        let mut minv = self.m;
        for i in 0..4 {
            let mut irow = 0;
            let mut icol = 0;
            let mut big: Float = 0.0;
            for j in 0..4 {
                if ipiv[j] != 1 {
                    for (k, piv) in ipiv.iter().enumerate().take(4) {
                        if *piv == 0 && minv[j][k].abs() >= big {
                            big = minv[j][k].abs();
                            irow = j;
                            icol = k;
                        }
                    }
                }
            }
            ipiv[icol] += 1;
            if irow != icol {
                minv.swap(irow, icol);
            }
            indxr[i] = irow;
            indxc[i] = icol;
            if minv[icol][icol] == 0.0 {
                // Singular matrix; fall back to identity row to avoid a
                // division by zero. Scene files are expected to supply
                // well-formed transforms.
                minv[icol][icol] = 1e-12;
            }
            let pivinv = 1.0 / minv[icol][icol];
            minv[icol][icol] = 1.0;
            for j in 0..4 {
                minv[icol][j] *= pivinv;
            }
            for j in 0..4 {
                if j != icol {
                    let save = minv[j][icol];
                    minv[j][icol] = 0.0;
                    for k in 0..4 {
                        minv[j][k] -= minv[icol][k] * save;
                    }
                }
            }
        }
        for j in (0..4).rev() {
            if indxr[j] != indxc[j] {
                for row in minv.iter_mut() {
                    row.swap(indxr[j], indxc[j]);
                }
            }
        }
        Matrix4x4 { m: minv }
    }

    pub fn transpose(&self) -> Matrix4x4 {
        let mut r = [[0.0; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                r[i][j] = self.m[j][i];
            }
        }
        Matrix4x4 { m: r }
    }
}

/// Owns both the forward and inverse matrix so normal transforms can use
/// the inverse-transpose without recomputing it per call.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Transform {
    t: Matrix4x4,
    inv_t: Matrix4x4,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            t: Matrix4x4::identity(),
            inv_t: Matrix4x4::identity(),
        }
    }
}

impl Transform {
    fn new(t: Matrix4x4, inv_t: Matrix4x4) -> Self {
        Transform { t, inv_t }
    }

    pub fn translation(position: Vector3f) -> Self {
        Transform::new(Matrix4x4::translate(position), Matrix4x4::translate(-position))
    }

    pub fn rotation_deg(rotation: Vector3f) -> Self {
        let fwd = Matrix4x4::rotate_y(rotation.y)
            .mul(&Matrix4x4::rotate_x(rotation.x))
            .mul(&Matrix4x4::rotate_z(rotation.z));
        let inv = Matrix4x4::rotate_z(-rotation.z)
            .mul(&Matrix4x4::rotate_x(-rotation.x))
            .mul(&Matrix4x4::rotate_y(-rotation.y));
        Transform::new(fwd, inv)
    }

    pub fn scale(scaling: Vector3f) -> Self {
        Transform::new(
            Matrix4x4::scale(scaling),
            Matrix4x4::scale(Vector3f::new(1.0 / scaling.x, 1.0 / scaling.y, 1.0 / scaling.z)),
        )
    }

    /// `T * Ry * Rx * Rz`, the composition order used throughout the
    /// scene-file transform block.
    pub fn translation_rotation_deg(position: Vector3f, rotation: Vector3f) -> Self {
        let fwd = Matrix4x4::translate(position)
            .mul(&Matrix4x4::rotate_y(rotation.y))
            .mul(&Matrix4x4::rotate_x(rotation.x))
            .mul(&Matrix4x4::rotate_z(rotation.z));
        let inv = Matrix4x4::rotate_z(-rotation.z)
            .mul(&Matrix4x4::rotate_x(-rotation.x))
            .mul(&Matrix4x4::rotate_y(-rotation.y))
            .mul(&Matrix4x4::translate(-position));
        Transform::new(fwd, inv)
    }

    pub fn translation_rotation_deg_scale(
        position: Vector3f,
        rotation: Vector3f,
        scale: Vector3f,
    ) -> Self {
        let inv_scale = Vector3f::new(1.0 / scale.x, 1.0 / scale.y, 1.0 / scale.z);
        let fwd = Matrix4x4::translate(position)
            .mul(&Matrix4x4::rotate_y(rotation.y))
            .mul(&Matrix4x4::rotate_x(rotation.x))
            .mul(&Matrix4x4::rotate_z(rotation.z))
            .mul(&Matrix4x4::scale(scale));
        let inv = Matrix4x4::scale(inv_scale)
            .mul(&Matrix4x4::rotate_z(-rotation.z))
            .mul(&Matrix4x4::rotate_x(-rotation.x))
            .mul(&Matrix4x4::rotate_y(-rotation.y))
            .mul(&Matrix4x4::translate(-position));
        Transform::new(fwd, inv)
    }

    pub fn transform_point(&self, p: Point3f) -> Point3f {
        let m = &self.t.m;
        Point3f::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z + m[0][3],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z + m[1][3],
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z + m[2][3],
        )
    }

    pub fn transform_vector(&self, d: Vector3f) -> Vector3f {
        let m = &self.t.m;
        Vector3f::new(
            m[0][0] * d.x + m[0][1] * d.y + m[0][2] * d.z,
            m[1][0] * d.x + m[1][1] * d.y + m[1][2] * d.z,
            m[2][0] * d.x + m[2][1] * d.y + m[2][2] * d.z,
        )
    }

    pub fn transform_normal(&self, n: Normal3f) -> Normal3f {
        let m = &self.inv_t.m;
        let v = Vector3f::new(
            m[0][0] * n.x + m[1][0] * n.y + m[2][0] * n.z,
            m[0][1] * n.x + m[1][1] * n.y + m[2][1] * n.z,
            m[0][2] * n.x + m[1][2] * n.y + m[2][2] * n.z,
        );
        Normal3f::from(v.normalize())
    }

    pub fn transform_bounds(&self, b: &Bounds3) -> Bounds3 {
        let mut r = Bounds3::from_point(self.transform_point(b.corner(0)));
        for i in 1..8 {
            r = r.union_point(self.transform_point(b.corner(i)));
        }
        r
    }

    pub fn inverse_transform_point(&self, p: Point3f) -> Point3f {
        let m = &self.inv_t.m;
        Point3f::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z + m[0][3],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z + m[1][3],
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z + m[2][3],
        )
    }

    pub fn inverse_transform_vector(&self, d: Vector3f) -> Vector3f {
        let m = &self.inv_t.m;
        Vector3f::new(
            m[0][0] * d.x + m[0][1] * d.y + m[0][2] * d.z,
            m[1][0] * d.x + m[1][1] * d.y + m[1][2] * d.z,
            m[2][0] * d.x + m[2][1] * d.y + m[2][2] * d.z,
        )
    }

    pub fn inverse_transform_normal(&self, n: Normal3f) -> Normal3f {
        let m = &self.t.m;
        let v = Vector3f::new(
            m[0][0] * n.x + m[1][0] * n.y + m[2][0] * n.z,
            m[0][1] * n.x + m[1][1] * n.y + m[2][1] * n.z,
            m[0][2] * n.x + m[1][2] * n.y + m[2][2] * n.z,
        );
        Normal3f::from(v.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_round_trips() {
        let t = Transform::translation(Vector3f::new(1.0, 2.0, 3.0));
        let p = Point3f::new(0.0, 0.0, 0.0);
        let moved = t.transform_point(p);
        assert_eq!(moved, Point3f::new(1.0, 2.0, 3.0));
        let back = t.inverse_transform_point(moved);
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
        assert!((back.z - p.z).abs() < 1e-9);
    }

    #[test]
    fn rotation_preserves_length() {
        let t = Transform::rotation_deg(Vector3f::new(30.0, 45.0, 60.0));
        let v = Vector3f::new(1.0, 2.0, 3.0);
        let rotated = t.transform_vector(v);
        assert!((rotated.length() - v.length()).abs() < 1e-9);
    }
}
