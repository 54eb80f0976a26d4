//! Forward (camera-started) path integrator: BSDF-only, light-only, and
//! balance-heuristic MIS strategies, plus a debug "measure" pass that
//! visualizes the first hit's shading normal instead of estimating
//! radiance. Grounded in spec.md §4.I's vertex loop.

use crate::core::camera::PerspectiveCamera;
use crate::core::film::FilmBand;
use crate::core::geometry::{vec3_dot_nrmf, Normal3f, Point2f, Vector3f};
use crate::core::pbrt::Float;
use crate::core::reflection::BSDF_ALL;
use crate::core::sampler::Sampler;
use crate::core::scene::Scene;
use crate::core::scenefile::{ForwardStrategy, Scissor};
use crate::core::spectrum::Spectrum;

/// Renders every pixel of `band` that also falls inside `scissor`,
/// drawing `samples_x * samples_y` stratified samples per pixel.
#[allow(clippy::too_many_arguments)]
pub fn render_band(
    band: &mut FilmBand,
    scene: &Scene,
    camera: &PerspectiveCamera,
    resolution: (u32, u32),
    sampler: &mut dyn Sampler,
    samples_x: u32,
    samples_y: u32,
    max_vertices: u32,
    strategy: ForwardStrategy,
    scissor: Scissor,
) {
    let scissor = scissor.clamped(resolution);
    let y0 = band.y_start().max(scissor.min.1);
    let y1 = (band.y_start() + band.rows()).min(scissor.max.1);
    let dims_1d = (max_vertices as i32 + 1) * 2;
    let dims_2d = (max_vertices as i32 + 1) * 2;

    for y in y0..y1 {
        for x in scissor.min.0..scissor.max.0 {
            sampler.begin_pixel(samples_x as i32, samples_y as i32, dims_1d, dims_2d);
            let mut accum = Spectrum::new(0.0);
            let sample_count = (samples_x * samples_y).max(1);
            for _ in 0..sample_count {
                sampler.begin_sample();
                let u_lens = sampler.get_2d();
                let u_pixel = sampler.get_2d();
                accum += radiance_estimate(
                    scene,
                    camera,
                    resolution,
                    (x, y),
                    u_lens,
                    u_pixel,
                    sampler,
                    max_vertices,
                    strategy,
                );
                sampler.end_sample();
            }
            band.add_camera_sample((x, y), accum * (1.0 / sample_count as Float));
        }
    }
    sampler.end_pixel();
}

#[allow(clippy::too_many_arguments)]
fn radiance_estimate(
    scene: &Scene,
    camera: &PerspectiveCamera,
    resolution: (u32, u32),
    pixel: (u32, u32),
    u_lens: Point2f,
    u_pixel: Point2f,
    sampler: &mut dyn Sampler,
    max_vertices: u32,
    strategy: ForwardStrategy,
) -> Spectrum {
    let ray = camera.generate_ray(resolution, pixel, u_lens, u_pixel);

    let mut p1 = match scene.raycast(ray.o, Normal3f::new(0.0, 0.0, 0.0), ray.d, Float::INFINITY) {
        Some(p) => p,
        None => return Spectrum::new(0.0),
    };

    if matches!(strategy, ForwardStrategy::Measure) {
        let n = Vector3f::from(p1.ns);
        return Spectrum::rgb(n.x * 0.5 + 0.5, n.y * 0.5 + 0.5, n.z * 0.5 + 0.5);
    }

    let mut w01 = ray.d;
    let mut beta = Spectrum::new(1.0);
    let mut l = Spectrum::new(0.0);

    if p1.on_light {
        if let Some(light_idx) = scene.light_for_entity(p1.entity.unwrap()) {
            l += beta * scene.light(light_idx).emitted_radiance(&p1, &(-w01));
        }
    }

    let use_bsdf_branch = matches!(strategy, ForwardStrategy::Bsdf | ForwardStrategy::Mis);
    let use_light_branch = matches!(strategy, ForwardStrategy::Light | ForwardStrategy::Mis);
    let use_mis = matches!(strategy, ForwardStrategy::Mis);

    for _ in 0..max_vertices.saturating_sub(2) {
        let entity = match p1.entity {
            Some(e) => e,
            None => break,
        };
        let bsdf = scene.entities[entity].material.evaluate_at_point(&p1);
        let wo1 = -w01;

        let u_lobe = sampler.get_1d();
        let u2 = sampler.get_2d();
        let (w12, f012, pdf_w12, sampled_type) = match bsdf.sample_f(&wo1, u_lobe, u2, BSDF_ALL) {
            Some(v) => v,
            None => break,
        };
        if pdf_w12 <= 0.0 || f012.is_black() {
            break;
        }
        let specular = sampled_type & crate::core::reflection::BxdfFlags::Specular as u8 != 0;
        let cos_n1_w12 = vec3_dot_nrmf(&w12, &p1.ns).abs();

        let p2 = scene.raycast(p1.p, p1.n, w12, Float::INFINITY);

        if specular {
            if let Some(ref p2) = p2 {
                if p2.on_light {
                    if let Some(light_idx) = scene.light_for_entity(p2.entity.unwrap()) {
                        let le = scene.light(light_idx).emitted_radiance(p2, &(-w12));
                        l += beta * f012 * cos_n1_w12 * le * (1.0 / pdf_w12);
                    }
                }
            }
        } else {
            if use_bsdf_branch {
                if let Some(ref p2) = p2 {
                    if p2.on_light {
                        if let Some(light_idx) = scene.light_for_entity(p2.entity.unwrap()) {
                            let le = scene.light(light_idx).emitted_radiance(p2, &(-w12));
                            if !le.is_black() {
                                let area = scene.entities[p2.entity.unwrap()].shape.area().max(1e-12);
                                let pdf_p2_l = scene.light(light_idx).probability_point(area)
                                    / scene.light_count().max(1) as Float;
                                let r2 = {
                                    let d = Vector3f::from(p2.p) - Vector3f::from(p1.p);
                                    d.length_squared()
                                };
                                let cos_n2_w12 = vec3_dot_nrmf(&w12, &p2.n).abs().max(1e-7);
                                let weight = if use_mis {
                                    1.0 / (1.0 + pdf_p2_l * r2 / (pdf_w12 * cos_n2_w12))
                                } else {
                                    1.0
                                };
                                l += beta * f012 * cos_n1_w12 * le * (weight / pdf_w12);
                            }
                        }
                    }
                }
            }

            if use_light_branch && scene.light_count() > 0 {
                let u_light = sampler.get_1d();
                let u_point = sampler.get_2d();
                let light_count = scene.light_count();
                let light_idx = ((u_light * light_count as Float) as usize).min(light_count - 1);
                let light = scene.light(light_idx);
                let (p_l, pdf_shape) = light.sample_point(
                    |entity, u| scene.sample_entity_point(entity, u),
                    u_point,
                );
                let pdf_pl = pdf_shape / light_count as Float;
                if pdf_pl > 0.0 {
                    let delta = Vector3f::from(p_l.p) - Vector3f::from(p1.p);
                    let r2 = delta.length_squared();
                    if r2 > 1e-12 {
                        let w1l = delta.normalize();
                        let f01l = bsdf.f(&wo1, &w1l, BSDF_ALL);
                        if !f01l.is_black() && scene.visibility(p1.p, p1.n, p_l.p, p_l.n) {
                            let le = light.emitted_radiance(&p_l, &(-w1l));
                            let cos_p1 = vec3_dot_nrmf(&w1l, &p1.ns).abs();
                            let cos_pl = vec3_dot_nrmf(&w1l, &p_l.n).abs();
                            let g = cos_p1 * cos_pl / r2.max(1e-12);
                            let pdf_w1l = bsdf.pdf(&wo1, &w1l, BSDF_ALL);
                            let weight = if use_mis {
                                1.0 / (1.0 + pdf_w1l * cos_pl / (pdf_pl * r2).max(1e-12))
                            } else {
                                1.0
                            };
                            l += beta * f01l * g * le * (weight / pdf_pl);
                        }
                    }
                }
            }
        }

        beta = beta * f012 * (cos_n1_w12 / pdf_w12);
        if beta.is_black() {
            break;
        }

        match p2 {
            Some(next) => {
                w01 = w12;
                p1 = next;
            }
            None => break,
        }
    }

    l
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::material::Material;
    use crate::core::scene::{Emission, Entity, EntityShape};
    use crate::core::spectrum::Spectrum as Spec;
    use crate::core::texture::Texture;
    use crate::core::transform::Transform;
    use crate::shapes::plane::Plane;
    use crate::core::sampler::RandomSampler;

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
    fn direct_hit_on_an_emitter_returns_its_radiance() {
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
        let mut sampler = RandomSampler::new(1);
        let l = radiance_estimate(
            &scene,
            &camera,
            (4, 4),
            (2, 2),
            Point2f::new(0.0, 0.0),
            Point2f::new(0.5, 0.5),
            &mut sampler,
            3,
            ForwardStrategy::Mis,
        );
        assert!(l.max_component() > 0.0);
    }

    #[test]
    fn empty_scene_contributes_nothing() {
        let scene = Scene::build(vec![]);
        let camera = PerspectiveCamera::new(Transform::default(), 45f64.to_radians(), 0.0, 1.0);
        let mut sampler = RandomSampler::new(1);
        let l = radiance_estimate(
            &scene,
            &camera,
            (4, 4),
            (2, 2),
            Point2f::new(0.0, 0.0),
            Point2f::new(0.5, 0.5),
            &mut sampler,
            5,
            ForwardStrategy::Mis,
        );
        assert_eq!(l, Spectrum::new(0.0));
    }
}
