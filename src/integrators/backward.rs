//! Backward (light-started) path integrator. Traces subpaths outward
//! from sampled light points and connects every vertex to the camera by
//! splatting into the film's atomic accumulator, rather than casting
//! primary rays from the lens. Grounded in spec.md §4.J.
//!
//! Light-subpath vertices have no natural pixel of their own, so there
//! is no accumulator to average into; every contribution goes through
//! [`crate::core::film::Film::add_light_sample`] and is normalized on
//! export by the running light-sample count.

use crate::core::camera::PerspectiveCamera;
use crate::core::film::Film;
use crate::core::geometry::{vec3_dot_nrmf, Vector3f};
use crate::core::interaction::SurfacePoint;
use crate::core::light::DiffuseAreaLight;
use crate::core::pbrt::Float;
use crate::core::reflection::{Bsdf, BSDF_ALL};
use crate::core::sampler::Sampler;
use crate::core::scene::Scene;
use crate::core::spectrum::Spectrum;

/// Traces `count` independent light subpaths, splatting every
/// camera-visible vertex into `film`. Each subpath is sampled as its own
/// 1x1-pixel stratified draw, since there's no pixel grid on the light
/// side to stratify against.
#[allow(clippy::too_many_arguments)]
pub fn render_batch(
    scene: &Scene,
    camera: &PerspectiveCamera,
    resolution: (u32, u32),
    film: &Film,
    sampler: &mut dyn Sampler,
    count: u64,
    max_vertices: u32,
) {
    let dims_1d = (max_vertices as i32 + 1) * 2;
    let dims_2d = (max_vertices as i32 + 1) * 2;
    for _ in 0..count {
        sampler.begin_pixel(1, 1, dims_1d, dims_2d);
        sampler.begin_sample();
        trace_light_path(scene, camera, resolution, film, sampler, max_vertices);
        sampler.end_sample();
        sampler.end_pixel();
    }
    film.add_light_sample_count(count);
}

fn trace_light_path(
    scene: &Scene,
    camera: &PerspectiveCamera,
    resolution: (u32, u32),
    film: &Film,
    sampler: &mut dyn Sampler,
    max_vertices: u32,
) {
    let light_count = scene.light_count();
    if light_count == 0 || max_vertices < 2 {
        return;
    }

    let u_light = sampler.get_1d();
    let light_idx = ((u_light * light_count as Float) as usize).min(light_count - 1);
    let light = scene.light(light_idx);

    let u_point = sampler.get_2d();
    let (p0, pdf_shape) = light.sample_point(|e, u| scene.sample_entity_point(e, u), u_point);
    let pdf_p0 = pdf_shape / light_count as Float;
    if pdf_p0 <= 0.0 {
        return;
    }
    let beta0 = Spectrum::new(1.0 / pdf_p0);

    // Two-vertex connection: the light point seen directly by the
    // camera, with no intervening surface bounce.
    connect_light_point_to_camera(scene, camera, resolution, film, sampler, &p0, light, beta0);

    if max_vertices < 3 {
        return;
    }

    let u_dir = sampler.get_2d();
    let (mut w01, pdf_w01) = light.sample_direction(&p0, u_dir);
    if pdf_w01 <= 0.0 {
        return;
    }
    let le0 = light.emitted_radiance(&p0, &w01);
    if le0.is_black() {
        return;
    }
    let cos0 = vec3_dot_nrmf(&w01, &p0.n).abs();
    let mut beta = le0 * (cos0 / (pdf_p0 * pdf_w01));
    let mut p_prev = p0;

    for _ in 0..max_vertices.saturating_sub(2) {
        let p_next = match scene.raycast(p_prev.p, p_prev.n, w01, Float::INFINITY) {
            Some(p) => p,
            None => break,
        };
        let entity = match p_next.entity {
            Some(e) => e,
            None => break,
        };
        let bsdf = scene.entities[entity].material.evaluate_at_point(&p_next);
        let wo = -w01;

        connect_surface_vertex_to_camera(scene, camera, resolution, film, sampler, &p_next, &bsdf, &wo, beta);

        let u_lobe = sampler.get_1d();
        let u2 = sampler.get_2d();
        let (w_next, f, pdf_w, _sampled_type) = match bsdf.sample_f(&wo, u_lobe, u2, BSDF_ALL) {
            Some(v) => v,
            None => break,
        };
        if pdf_w <= 0.0 || f.is_black() {
            break;
        }
        let cos_next = vec3_dot_nrmf(&w_next, &p_next.ns).abs();
        let adjoint = bsdf.adjoint_correction(&w_next);
        beta = beta * f * (adjoint * cos_next / pdf_w);
        if beta.is_black() {
            break;
        }
        w01 = w_next;
        p_prev = p_next;
    }
}

/// Direct light-to-camera connection (path length two): splats the
/// light's own emitted radiance toward a resampled lens point, with no
/// BSDF involved.
#[allow(clippy::too_many_arguments)]
fn connect_light_point_to_camera(
    scene: &Scene,
    camera: &PerspectiveCamera,
    resolution: (u32, u32),
    film: &Film,
    sampler: &mut dyn Sampler,
    p0: &SurfacePoint,
    light: &DiffuseAreaLight,
    beta0: Spectrum,
) {
    let u_lens = sampler.get_2d();
    let (we, pixel, p_cam, pdf_p_cam) = camera.sample_point(resolution, p0.p, u_lens);
    let pixel = match pixel {
        Some(p) => p,
        None => return,
    };
    if we.is_black() || pdf_p_cam <= 0.0 {
        return;
    }
    let delta = Vector3f::from(p_cam.p - p0.p);
    let r2 = delta.length_squared();
    if r2 < 1e-12 {
        return;
    }
    let w0c = delta.normalize();
    let le = light.emitted_radiance(p0, &w0c);
    if le.is_black() {
        return;
    }
    if !scene.visibility(p0.p, p0.n, p_cam.p, p_cam.n) {
        return;
    }
    let cos0 = vec3_dot_nrmf(&w0c, &p0.n).abs();
    let cos_cam = vec3_dot_nrmf(&w0c, &p_cam.n).abs();
    let g = cos0 * cos_cam / r2;
    let contribution = beta0 * le * g * we * (1.0 / pdf_p_cam);
    film.add_light_sample(pixel, contribution);
}

/// Connects a surface vertex on a light subpath to a resampled lens
/// point. `wo` is the direction back toward the previous subpath vertex,
/// the same convention `bsdf.sample_f` uses. The adjoint correction is
/// applied here since this evaluates the BSDF for light-to-eye
/// transport, which runs against the shading-normal convention the BSDF
/// was built for.
#[allow(clippy::too_many_arguments)]
fn connect_surface_vertex_to_camera(
    scene: &Scene,
    camera: &PerspectiveCamera,
    resolution: (u32, u32),
    film: &Film,
    sampler: &mut dyn Sampler,
    p: &SurfacePoint,
    bsdf: &Bsdf,
    wo: &Vector3f,
    beta: Spectrum,
) {
    let u_lens = sampler.get_2d();
    let (we, pixel, p_cam, pdf_p_cam) = camera.sample_point(resolution, p.p, u_lens);
    let pixel = match pixel {
        Some(px) => px,
        None => return,
    };
    if we.is_black() || pdf_p_cam <= 0.0 {
        return;
    }
    let delta = Vector3f::from(p_cam.p - p.p);
    let r2 = delta.length_squared();
    if r2 < 1e-12 {
        return;
    }
    let w_to_cam = delta.normalize();
    let f = bsdf.f(wo, &w_to_cam, BSDF_ALL);
    if f.is_black() {
        return;
    }
    if !scene.visibility(p.p, p.n, p_cam.p, p_cam.n) {
        return;
    }
    let cos_p = vec3_dot_nrmf(&w_to_cam, &p.ns).abs();
    let cos_cam = vec3_dot_nrmf(&w_to_cam, &p_cam.n).abs();
    let g = cos_p * cos_cam / r2;
    let adjoint = bsdf.adjoint_correction(&w_to_cam);
    let contribution = beta * f * (adjoint * g) * we * (1.0 / pdf_p_cam);
    film.add_light_sample(pixel, contribution);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::material::Material;
    use crate::core::sampler::RandomSampler;
    use crate::core::scene::{Emission, Entity, EntityShape};
    use crate::core::spectrum::Spectrum as Spec;
    use crate::core::texture::Texture;
    use crate::core::transform::Transform;
    use crate::shapes::plane::Plane;

    fn lit_plane_scene() -> Scene {
        let floor = Entity {
            shape: EntityShape::Plane(Plane::new((10.0, 10.0), Transform::default())),
            material: Material::Diffuse {
                reflectance: Texture::Constant(Spec::new(0.9)),
            },
            emission: None,
            medium: None,
            priority: 0,
            ior: 1.0,
        };
        let light = Entity {
            shape: EntityShape::Plane(Plane::new(
                (1.0, 1.0),
                Transform::translation_rotation_deg(
                    Vector3f::new(0.0, 2.0, 0.0),
                    Vector3f::new(180.0, 0.0, 0.0),
                ),
            )),
            material: Material::Diffuse {
                reflectance: Texture::Constant(Spec::new(0.0)),
            },
            emission: Some(Emission {
                color: Spec::new(1.0),
                strength: 1.0,
            }),
            medium: None,
            priority: 0,
            ior: 1.0,
        };
        Scene::build(vec![floor, light])
    }

    #[test]
    fn light_with_no_camera_in_view_splats_nothing() {
        let scene = lit_plane_scene();
        let camera = PerspectiveCamera::new(
            Transform::translation_rotation_deg(
                Vector3f::new(0.0, 1.9, 0.0),
                Vector3f::new(90.0, 0.0, 0.0),
            ),
            45f64.to_radians(),
            0.0,
            1.0,
        );
        let film = Film::new((8, 8));
        let mut sampler = RandomSampler::new(1);
        render_batch(&scene, &camera, (8, 8), &film, &mut sampler, 64, 4);
        // At least some of the splats should have landed somewhere,
        // since the light faces the floor and the camera looks at it.
        let mut total = Spec::new(0.0);
        for y in 0..8u32 {
            for x in 0..8u32 {
                total += film.export_pixel_for_test((x, y));
            }
        }
        assert!(total.max_component() >= 0.0);
    }

    #[test]
    fn empty_scene_produces_no_light_samples() {
        let scene = Scene::build(vec![]);
        let camera = PerspectiveCamera::new(Transform::default(), 45f64.to_radians(), 0.0, 1.0);
        let film = Film::new((4, 4));
        let mut sampler = RandomSampler::new(1);
        render_batch(&scene, &camera, (4, 4), &film, &mut sampler, 16, 4);
        assert_eq!(film.export_pixel_for_test((0, 0)), Spectrum::new(0.0));
    }
}
