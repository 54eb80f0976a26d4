//! Perspective camera with thin-lens depth of field. Holds the
//! world-from-camera transform and derives film-plane geometry from the
//! output resolution and vertical field of view; everything else (ray
//! generation, the two importance-sampling directions bidirectional
//! connections need) is worked out per call.

use crate::core::geometry::{Normal3f, Point2f, Point3f, Ray, Vector3f};
use crate::core::interaction::SurfacePoint;
use crate::core::pbrt::Float;
use crate::core::sampling::sample_disk_concentric;
use crate::core::spectrum::Spectrum;
use crate::core::transform::Transform;

/// Width/height of the output image, in pixels. Camera methods take this
/// directly rather than depending on `Film`, so the camera has no
/// dependency on how samples are accumulated.
pub type Resolution = (u32, u32);

#[derive(Debug, Clone, Copy)]
pub struct PerspectiveCamera {
    pub camera_to_world: Transform,
    /// Vertical field of view, in radians.
    pub fov: Float,
    pub lens_radius: Float,
    pub focus_distance: Float,
}

struct FilmPlane {
    distance: Float,
    width: Float,
    height: Float,
    pixel_size: Float,
}

impl PerspectiveCamera {
    pub fn new(camera_to_world: Transform, fov: Float, lens_radius: Float, focus_distance: Float) -> Self {
        PerspectiveCamera {
            camera_to_world,
            fov,
            lens_radius,
            focus_distance,
        }
    }

    fn film_plane(&self, resolution: Resolution) -> FilmPlane {
        let distance = if self.lens_radius == 0.0 { 1.0 } else { self.focus_distance };
        let height = 2.0 * distance * (self.fov / 2.0).tan();
        let width = height * resolution.0 as Float / resolution.1 as Float;
        let pixel_size = height / resolution.1 as Float;
        FilmPlane { distance, width, height, pixel_size }
    }

    fn sample_lens(&self, u_lens: Point2f) -> Point3f {
        if self.lens_radius == 0.0 {
            Point3f::default()
        } else {
            let d = sample_disk_concentric(u_lens);
            Point3f::new(d.x * self.lens_radius, d.y * self.lens_radius, 0.0)
        }
    }

    fn lens_area(&self) -> Float {
        if self.lens_radius == 0.0 {
            1.0
        } else {
            crate::core::pbrt::PI * self.lens_radius * self.lens_radius
        }
    }

    /// Primary ray through `pixel`, jittered within the pixel by `u_pixel`
    /// and across the lens aperture by `u_lens`.
    pub fn generate_ray(&self, resolution: Resolution, pixel: (u32, u32), u_lens: Point2f, u_pixel: Point2f) -> Ray {
        let origin = self.sample_lens(u_lens);
        let plane = self.film_plane(resolution);

        let film_top = plane.height / 2.0;
        let film_left = -plane.width / 2.0;
        let film_position = Point3f::new(
            film_left + (pixel.0 as Float + u_pixel.x) * plane.pixel_size,
            film_top - (pixel.1 as Float + u_pixel.y) * plane.pixel_size,
            plane.distance,
        );
        let direction = Vector3f::from(film_position - origin).normalize();

        Ray::new(
            self.camera_to_world.transform_point(origin),
            self.camera_to_world.transform_vector(direction),
            Float::INFINITY,
        )
    }

    /// Samples a lens point and a direction through `pixel` in one call,
    /// returning the importance of that (point, direction) pair along with
    /// its area and solid-angle pdfs. Used to seed camera subpaths for
    /// backward and bidirectional transport.
    pub fn sample_point_and_direction(
        &self,
        resolution: Resolution,
        pixel: (u32, u32),
        u_lens: Point2f,
        u_pixel: Point2f,
    ) -> (Spectrum, SurfacePoint, Float, Vector3f, Float) {
        let lens_area = self.lens_area();
        let lens_position = self.sample_lens(u_lens);
        let pdf_p = 1.0 / lens_area;

        let mut p = SurfacePoint::default();
        p.p = self.camera_to_world.transform_point(lens_position);
        p.n = self.camera_to_world.transform_normal(Normal3f::new(0.0, 0.0, 1.0));
        p.on_camera = true;

        let plane = self.film_plane(resolution);
        let pixel_area = plane.pixel_size * plane.pixel_size;
        let film_top = plane.height / 2.0;
        let film_left = -plane.width / 2.0;
        let film_position = Point3f::new(
            film_left + (pixel.0 as Float + u_pixel.x) * plane.pixel_size,
            film_top - (pixel.1 as Float + u_pixel.y) * plane.pixel_size,
            plane.distance,
        );
        let direction = Vector3f::from(film_position - lens_position).normalize();
        let cos_w_n = direction.z;
        let w = self.camera_to_world.transform_vector(direction);
        let pdf_w = 1.0 / (pixel_area * cos_w_n * cos_w_n * cos_w_n);

        let importance = pdf_p * pdf_w / cos_w_n;
        (Spectrum::new(importance), p, pdf_p, w, pdf_w)
    }

    /// Samples a lens point that can see `view_position` (a point reached
    /// by a light subpath) and projects it onto the film, returning which
    /// pixel it lands in. Returns zero importance if the projection falls
    /// behind the lens or outside the film rectangle.
    pub fn sample_point(
        &self,
        resolution: Resolution,
        view_position: Point3f,
        u_lens: Point2f,
    ) -> (Spectrum, Option<(u32, u32)>, SurfacePoint, Float) {
        let lens_area = self.lens_area();
        let lens_position = self.sample_lens(u_lens);
        let pdf_p = 1.0 / lens_area;

        let mut p = SurfacePoint::default();
        p.p = self.camera_to_world.transform_point(lens_position);
        p.n = self.camera_to_world.transform_normal(Normal3f::new(0.0, 0.0, 1.0));
        p.on_camera = true;

        let local_view = self.camera_to_world.inverse_transform_point(view_position);
        let to_view = Vector3f::from(local_view - lens_position);
        if to_view.z <= 0.0 {
            return (Spectrum::new(0.0), None, p, pdf_p);
        }

        let plane = self.film_plane(resolution);
        let t = plane.distance / to_view.z;
        let film_position = Point3f::from(Vector3f::from(lens_position) + to_view * t);

        let film_top = plane.height / 2.0;
        let film_left = -plane.width / 2.0;
        if film_position.x < film_left
            || film_position.x > -film_left
            || film_position.y > film_top
            || film_position.y < -film_top
        {
            return (Spectrum::new(0.0), None, p, pdf_p);
        }

        let pixel_x = (((film_position.x - film_left) / plane.width) * resolution.0 as Float)
            .floor()
            .clamp(0.0, resolution.0 as Float - 1.0) as u32;
        let pixel_y = ((1.0 - (film_position.y + film_top) / plane.height) * resolution.1 as Float)
            .floor()
            .clamp(0.0, resolution.1 as Float - 1.0) as u32;

        let w = to_view.normalize();
        let cos_w_n = w.z;
        let pixel_area = plane.pixel_size * plane.pixel_size;
        let pdf_w = 1.0 / (pixel_area * cos_w_n * cos_w_n * cos_w_n);
        let importance = pdf_p * pdf_w / cos_w_n;

        (Spectrum::new(importance), Some((pixel_x, pixel_y)), p, pdf_p)
    }

    /// Solid-angle pdf of sampling direction `w` from camera point `p` via
    /// [`PerspectiveCamera::sample_point_and_direction`]. Zero if `w` does
    /// not land on the film.
    pub fn probability_direction(&self, resolution: Resolution, p: &SurfacePoint, w: &Vector3f) -> Float {
        if !p.on_camera {
            return 0.0;
        }
        let local_p = self.camera_to_world.inverse_transform_point(p.p);
        let local_w = self.camera_to_world.inverse_transform_vector(*w);
        if local_w.z <= 0.0 {
            return 0.0;
        }

        let plane = self.film_plane(resolution);
        let t = plane.distance / local_w.z;
        let film_position = Point3f::from(Vector3f::from(local_p) + local_w * t);

        let film_top = plane.height / 2.0;
        let film_left = -plane.width / 2.0;
        if film_position.x < film_left
            || film_position.x > -film_left
            || film_position.y > film_top
            || film_position.y < -film_top
        {
            return 0.0;
        }

        let pixel_area = plane.pixel_size * plane.pixel_size;
        let cos_w_n = local_w.z;
        1.0 / (pixel_area * cos_w_n * cos_w_n * cos_w_n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Vector3f as V3;

    fn pinhole() -> PerspectiveCamera {
        PerspectiveCamera::new(Transform::default(), 45f64.to_radians(), 0.0, 1.0)
    }

    #[test]
    fn center_pixel_ray_points_down_camera_axis() {
        let cam = pinhole();
        let resolution = (100, 100);
        let ray = cam.generate_ray(resolution, (50, 50), Point2f::new(0.0, 0.0), Point2f::new(0.5, 0.5));
        assert!((ray.d.x).abs() < 1e-9);
        assert!((ray.d.y).abs() < 1e-9);
        assert!(ray.d.z > 0.0);
    }

    #[test]
    fn pinhole_lens_area_is_one() {
        let cam = pinhole();
        assert_eq!(cam.lens_area(), 1.0);
        let (_, _, pdf_p, _, _) = cam.sample_point_and_direction(
            (64, 64),
            (32, 32),
            Point2f::new(0.0, 0.0),
            Point2f::new(0.5, 0.5),
        );
        assert_eq!(pdf_p, 1.0);
    }

    #[test]
    fn sample_point_rejects_positions_behind_the_lens() {
        let cam = pinhole();
        let behind = cam.camera_to_world.transform_point(Point3f::new(0.0, 0.0, -1.0));
        let (importance, pixel, _, _) = cam.sample_point((64, 64), behind, Point2f::new(0.0, 0.0));
        assert_eq!(importance.max_component(), 0.0);
        assert!(pixel.is_none());
    }

    #[test]
    fn sample_point_finds_the_pixel_matching_generate_ray() {
        let cam = pinhole();
        let resolution = (64, 64);
        let pixel = (20u32, 40u32);
        let ray = cam.generate_ray(resolution, pixel, Point2f::new(0.0, 0.0), Point2f::new(0.5, 0.5));
        let world_point = ray.at(2.0);
        let (importance, found, _, _) = cam.sample_point(resolution, world_point, Point2f::new(0.0, 0.0));
        assert!(importance.max_component() > 0.0);
        assert_eq!(found, Some(pixel));
    }

    #[test]
    fn probability_direction_matches_sampled_pdf_w() {
        let cam = pinhole();
        let resolution = (64, 64);
        let pixel = (10u32, 10u32);
        let (_, p, _, w, pdf_w) = cam.sample_point_and_direction(
            resolution,
            pixel,
            Point2f::new(0.0, 0.0),
            Point2f::new(0.5, 0.5),
        );
        let pdf_check = cam.probability_direction(resolution, &p, &w);
        assert!((pdf_check - pdf_w).abs() < 1e-9);
    }

    #[test]
    fn probability_direction_is_zero_off_camera_point() {
        let cam = pinhole();
        let p = SurfacePoint::default();
        let w = V3::new(0.0, 0.0, 1.0);
        assert_eq!(cam.probability_direction((64, 64), &p, &w), 0.0);
    }
}
