//! Vector, point, normal, bounds and ray primitives.
//!
//! Scene-space geometry is carried in `Float` (`f64`); compact storage
//! used by the BVH's linear node array is carried separately in `f32`
//! (see [`Bounds3f32`]).

use std::ops::{Add, AddAssign, Div, Index, Mul, Neg, Sub};

use crate::core::pbrt::Float;

/// Index into the X/Y components of a 2-D quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum XYEnum {
    X,
    Y,
}

/// Index into the X/Y/Z components of a 3-D quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum XYZEnum {
    X,
    Y,
    Z,
}

macro_rules! vec2_type {
    ($name:ident, $scalar:ty) => {
        #[derive(Debug, Default, Copy, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            pub x: $scalar,
            pub y: $scalar,
        }

        impl $name {
            pub fn new(x: $scalar, y: $scalar) -> Self {
                $name { x, y }
            }
        }

        impl Index<XYEnum> for $name {
            type Output = $scalar;
            fn index(&self, i: XYEnum) -> &$scalar {
                match i {
                    XYEnum::X => &self.x,
                    XYEnum::Y => &self.y,
                }
            }
        }

        impl Add for $name {
            type Output = $name;
            fn add(self, rhs: $name) -> $name {
                $name::new(self.x + rhs.x, self.y + rhs.y)
            }
        }

        impl Sub for $name {
            type Output = $name;
            fn sub(self, rhs: $name) -> $name {
                $name::new(self.x - rhs.x, self.y - rhs.y)
            }
        }

        impl Mul<$scalar> for $name {
            type Output = $name;
            fn mul(self, s: $scalar) -> $name {
                $name::new(self.x * s, self.y * s)
            }
        }
    };
}

vec2_type!(Vector2f, Float);
vec2_type!(Point2f, Float);
vec2_type!(Vector2i, i32);

impl Point2f {
    pub fn to_vector(self) -> Vector2f {
        Vector2f::new(self.x, self.y)
    }
}

macro_rules! vec3_type {
    ($name:ident, $scalar:ty) => {
        #[derive(Debug, Default, Copy, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            pub x: $scalar,
            pub y: $scalar,
            pub z: $scalar,
        }

        impl $name {
            pub const fn new(x: $scalar, y: $scalar, z: $scalar) -> Self {
                $name { x, y, z }
            }

            pub fn splat(v: $scalar) -> Self {
                $name::new(v, v, v)
            }
        }

        impl Index<XYZEnum> for $name {
            type Output = $scalar;
            fn index(&self, i: XYZEnum) -> &$scalar {
                match i {
                    XYZEnum::X => &self.x,
                    XYZEnum::Y => &self.y,
                    XYZEnum::Z => &self.z,
                }
            }
        }

        impl Add for $name {
            type Output = $name;
            fn add(self, rhs: $name) -> $name {
                $name::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: $name) {
                self.x += rhs.x;
                self.y += rhs.y;
                self.z += rhs.z;
            }
        }

        impl Sub for $name {
            type Output = $name;
            fn sub(self, rhs: $name) -> $name {
                $name::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
            }
        }

        impl Mul<$scalar> for $name {
            type Output = $name;
            fn mul(self, s: $scalar) -> $name {
                $name::new(self.x * s, self.y * s, self.z * s)
            }
        }

        impl Neg for $name {
            type Output = $name;
            fn neg(self) -> $name {
                $name::new(-self.x, -self.y, -self.z)
            }
        }
    };
}

vec3_type!(Vector3f, Float);
vec3_type!(Point3f, Float);
vec3_type!(Normal3f, Float);
vec3_type!(Vector3f32, f32);

impl Div<Float> for Vector3f {
    type Output = Vector3f;
    fn div(self, s: Float) -> Vector3f {
        let inv = 1.0 / s;
        self * inv
    }
}

impl From<Normal3f> for Vector3f {
    fn from(n: Normal3f) -> Self {
        Vector3f::new(n.x, n.y, n.z)
    }
}

impl From<Vector3f> for Normal3f {
    fn from(v: Vector3f) -> Self {
        Normal3f::new(v.x, v.y, v.z)
    }
}

impl From<Point3f> for Vector3f {
    fn from(p: Point3f) -> Self {
        Vector3f::new(p.x, p.y, p.z)
    }
}

impl From<Vector3f> for Point3f {
    fn from(v: Vector3f) -> Self {
        Point3f::new(v.x, v.y, v.z)
    }
}

impl Vector3f {
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }

    pub fn normalize(&self) -> Vector3f {
        *self / self.length()
    }

    pub fn abs(&self) -> Vector3f {
        Vector3f::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    pub fn max_dimension(&self) -> XYZEnum {
        if self.x > self.y && self.x > self.z {
            XYZEnum::X
        } else if self.y > self.z {
            XYZEnum::Y
        } else {
            XYZEnum::Z
        }
    }

    pub fn permute(&self, kx: XYZEnum, ky: XYZEnum, kz: XYZEnum) -> Vector3f {
        Vector3f::new(self[kx], self[ky], self[kz])
    }
}

pub fn vec3_dot_vec3f(v1: &Vector3f, v2: &Vector3f) -> Float {
    v1.x * v2.x + v1.y * v2.y + v1.z * v2.z
}

pub fn vec3_dot_nrmf(v: &Vector3f, n: &Normal3f) -> Float {
    v.x * n.x + v.y * n.y + v.z * n.z
}

pub fn nrm_dot_vec3f(n: &Normal3f, v: &Vector3f) -> Float {
    vec3_dot_nrmf(v, n)
}

pub fn nrm_dot_nrmf(n1: &Normal3f, n2: &Normal3f) -> Float {
    n1.x * n2.x + n1.y * n2.y + n1.z * n2.z
}

pub fn vec3_abs_dot_vec3f(v1: &Vector3f, v2: &Vector3f) -> Float {
    vec3_dot_vec3f(v1, v2).abs()
}

pub fn vec3_cross_vec3f(v1: &Vector3f, v2: &Vector3f) -> Vector3f {
    Vector3f::new(
        v1.y * v2.z - v1.z * v2.y,
        v1.z * v2.x - v1.x * v2.z,
        v1.x * v2.y - v1.y * v2.x,
    )
}

pub fn nrm_cross_vec3(n: &Normal3f, v: &Vector3f) -> Vector3f {
    vec3_cross_vec3f(&Vector3f::from(*n), v)
}

pub fn nrm_faceforward_vec3(n: &Normal3f, v: &Vector3f) -> Normal3f {
    if nrm_dot_vec3f(n, v) < 0.0 {
        -*n
    } else {
        *n
    }
}

/// Builds an arbitrary orthonormal basis `(t, b)` around `n`, following
/// Duff et al.'s branchless construction.
pub fn coordinate_system(n: &Vector3f) -> (Vector3f, Vector3f) {
    let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    let t = Vector3f::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bt = Vector3f::new(b, sign + n.y * n.y * a, -n.y);
    (t, bt)
}

#[derive(Debug, Default, Copy, Clone)]
pub struct Ray {
    pub o: Point3f,
    pub d: Vector3f,
    pub t_max: Float,
}

impl Ray {
    pub fn new(o: Point3f, d: Vector3f, t_max: Float) -> Self {
        Ray { o, d, t_max }
    }

    pub fn at(&self, t: Float) -> Point3f {
        self.o + Vector3f::from(self.d) * t
    }
}

/// World-space, `f64` axis-aligned bounding box used for scene-level
/// bounds arithmetic (shape/entity bounds, SAH-less split decisions).
#[derive(Debug, Copy, Clone, serde::Serialize, serde::Deserialize)]
pub struct Bounds3 {
    pub p_min: Point3f,
    pub p_max: Point3f,
}

impl Default for Bounds3 {
    fn default() -> Self {
        let min_num = Float::MIN;
        let max_num = Float::MAX;
        Bounds3 {
            p_min: Point3f::new(max_num, max_num, max_num),
            p_max: Point3f::new(min_num, min_num, min_num),
        }
    }
}

impl Bounds3 {
    pub fn new(p1: Point3f, p2: Point3f) -> Self {
        Bounds3 {
            p_min: Point3f::new(p1.x.min(p2.x), p1.y.min(p2.y), p1.z.min(p2.z)),
            p_max: Point3f::new(p1.x.max(p2.x), p1.y.max(p2.y), p1.z.max(p2.z)),
        }
    }

    pub fn from_point(p: Point3f) -> Self {
        Bounds3 { p_min: p, p_max: p }
    }

    pub fn union_point(&self, p: Point3f) -> Bounds3 {
        Bounds3 {
            p_min: Point3f::new(
                self.p_min.x.min(p.x),
                self.p_min.y.min(p.y),
                self.p_min.z.min(p.z),
            ),
            p_max: Point3f::new(
                self.p_max.x.max(p.x),
                self.p_max.y.max(p.y),
                self.p_max.z.max(p.z),
            ),
        }
    }

    pub fn union(&self, other: &Bounds3) -> Bounds3 {
        self.union_point(other.p_min).union_point(other.p_max)
    }

    pub fn diagonal(&self) -> Vector3f {
        self.p_max - self.p_min
    }

    pub fn centroid(&self) -> Point3f {
        self.p_min + Vector3f::from(self.p_max) * 0.5
    }

    pub fn surface_area(&self) -> Float {
        let d = self.diagonal();
        if d.x < 0.0 || d.y < 0.0 || d.z < 0.0 {
            return 0.0;
        }
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    pub fn maximum_extent(&self) -> XYZEnum {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z {
            XYZEnum::X
        } else if d.y > d.z {
            XYZEnum::Y
        } else {
            XYZEnum::Z
        }
    }

    /// Enumerates one of the box's 8 corners (0..=7), used when
    /// transforming bounds through an affine transform.
    pub fn corner(&self, i: u8) -> Point3f {
        Point3f::new(
            if i & 1 == 0 { self.p_min.x } else { self.p_max.x },
            if i & 2 == 0 { self.p_min.y } else { self.p_max.y },
            if i & 4 == 0 { self.p_min.z } else { self.p_max.z },
        )
    }

    /// Slab-test raycast using precomputed inverse direction and sign
    /// flags, matching the BVH's traversal contract.
    pub fn intersect_p(&self, ray: &Ray, inv_dir: &Vector3f, dir_is_neg: [bool; 3]) -> bool {
        let bounds = [self.p_min, self.p_max];
        let mut t_min = (bounds[dir_is_neg[0] as usize].x - ray.o.x) * inv_dir.x;
        let mut t_max = (bounds[1 - dir_is_neg[0] as usize].x - ray.o.x) * inv_dir.x;
        let ty_min = (bounds[dir_is_neg[1] as usize].y - ray.o.y) * inv_dir.y;
        let ty_max = (bounds[1 - dir_is_neg[1] as usize].y - ray.o.y) * inv_dir.y;
        if t_min > ty_max || ty_min > t_max {
            return false;
        }
        if ty_min > t_min {
            t_min = ty_min;
        }
        if ty_max < t_max {
            t_max = ty_max;
        }
        let tz_min = (bounds[dir_is_neg[2] as usize].z - ray.o.z) * inv_dir.z;
        let tz_max = (bounds[1 - dir_is_neg[2] as usize].z - ray.o.z) * inv_dir.z;
        if t_min > tz_max || tz_min > t_max {
            return false;
        }
        if tz_min > t_min {
            t_min = tz_min;
        }
        if tz_max < t_max {
            t_max = tz_max;
        }
        t_min < ray.t_max && t_max > 0.0
    }
}

/// 6×`f32` bounds used only inside the compact BVH node record, kept
/// distinct from the `f64` scene-space [`Bounds3`] used everywhere else.
#[derive(Debug, Default, Copy, Clone, serde::Serialize, serde::Deserialize)]
pub struct Bounds3f32 {
    pub p_min: Vector3f32,
    pub p_max: Vector3f32,
}

impl From<Bounds3> for Bounds3f32 {
    fn from(b: Bounds3) -> Self {
        Bounds3f32 {
            p_min: Vector3f32::new(b.p_min.x as f32, b.p_min.y as f32, b.p_min.z as f32),
            p_max: Vector3f32::new(b.p_max.x as f32, b.p_max.y as f32, b.p_max.z as f32),
        }
    }
}

impl Bounds3f32 {
    pub fn intersect_p(&self, ray: &Ray, inv_dir: &Vector3f, dir_is_neg: [bool; 3]) -> bool {
        let full = Bounds3 {
            p_min: Point3f::new(self.p_min.x as Float, self.p_min.y as Float, self.p_min.z as Float),
            p_max: Point3f::new(self.p_max.x as Float, self.p_max.y as Float, self.p_max.z as Float),
        };
        full.intersect_p(ray, inv_dir, dir_is_neg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_system_is_orthonormal() {
        let n = Vector3f::new(0.3, 0.5, 0.8).normalize();
        let (t, b) = coordinate_system(&n);
        assert!((vec3_dot_vec3f(&t, &n)).abs() < 1e-9);
        assert!((vec3_dot_vec3f(&b, &n)).abs() < 1e-9);
        assert!((vec3_dot_vec3f(&t, &b)).abs() < 1e-9);
        assert!((t.length() - 1.0).abs() < 1e-9);
        assert!((b.length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bounds_union_grows_to_contain_points() {
        let b = Bounds3::from_point(Point3f::new(0.0, 0.0, 0.0))
            .union_point(Point3f::new(1.0, 2.0, 3.0));
        assert_eq!(b.p_min, Point3f::new(0.0, 0.0, 0.0));
        assert_eq!(b.p_max, Point3f::new(1.0, 2.0, 3.0));
    }
}
