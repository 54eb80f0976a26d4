//! Bidirectional path integrator: builds a camera subpath and a light
//! subpath independently, then connects every valid `(t, s)` pair of
//! prefixes and combines them with the balance heuristic. Grounded in
//! spec.md §4.K and in the vertex bookkeeping `forward.rs`/`backward.rs`
//! already establish for single-direction transport.
//!
//! Subpaths are owned `Vec<Vertex>` rather than a fixed-size arena: this
//! crate has no arena allocator, and `max_vertices` is already bounded
//! by the scene file, so a growable vector is the direct safe-Rust
//! substitute.

use crate::core::camera::PerspectiveCamera;
use crate::core::film::{FilmBand, LightSplatter};
use crate::core::geometry::{vec3_dot_nrmf, Normal3f, Point3f, Vector3f};
use crate::core::interaction::SurfacePoint;
use crate::core::pbrt::Float;
use crate::core::reflection::{Bsdf, BSDF_ALL};
use crate::core::sampler::Sampler;
use crate::core::scene::Scene;
use crate::core::scenefile::Scissor;
use crate::core::spectrum::Spectrum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VertexKind {
    Camera,
    Light,
    Surface,
}

/// One node of a camera or light subpath. `pdf_fwd`/`pdf_rev` are both
/// area-measure densities: `pdf_fwd` is how this vertex's position was
/// actually sampled walking from the subpath's root, `pdf_rev` is how
/// it *would* have been sampled walking the path from the other end
/// (filled in once the next vertex exists, or overridden locally when
/// evaluating a connection's MIS weight).
struct Vertex {
    kind: VertexKind,
    p: SurfacePoint,
    beta: Spectrum,
    bsdf: Option<Bsdf>,
    pdf_fwd: Float,
    pdf_rev: Float,
    delta: bool,
    light_index: Option<usize>,
}

impl Vertex {
    fn camera(p: SurfacePoint, beta: Spectrum) -> Self {
        Vertex {
            kind: VertexKind::Camera,
            p,
            beta,
            bsdf: None,
            pdf_fwd: 1.0,
            pdf_rev: 0.0,
            delta: false,
            light_index: None,
        }
    }

    fn light(p: SurfacePoint, beta: Spectrum, pdf_fwd: Float, light_index: usize) -> Self {
        Vertex {
            kind: VertexKind::Light,
            p,
            beta,
            bsdf: None,
            pdf_fwd,
            pdf_rev: 0.0,
            delta: false,
            light_index: Some(light_index),
        }
    }

    fn surface(p: SurfacePoint, beta: Spectrum, bsdf: Bsdf, pdf_fwd: Float) -> Self {
        Vertex {
            kind: VertexKind::Surface,
            p,
            beta,
            bsdf: Some(bsdf),
            pdf_fwd,
            pdf_rev: 0.0,
            delta: false,
            light_index: None,
        }
    }

    fn is_on_light(&self) -> bool {
        self.kind == VertexKind::Light || self.p.on_light
    }
}

fn direction(from: Point3f, to: Point3f) -> Vector3f {
    Vector3f::from(to - from)
}

/// Converts a solid-angle pdf at `from`, pointed toward `to`, into the
/// area-measure pdf at `to` that every vertex stores.
fn solid_angle_pdf_to_area(pdf_w: Float, from: Point3f, to: Point3f, to_n: Normal3f) -> Float {
    let d = direction(from, to);
    let dist2 = d.length_squared();
    if dist2 < 1e-12 {
        return 0.0;
    }
    let w = d.normalize();
    let cos_to = vec3_dot_nrmf(&w, &to_n).abs();
    pdf_w * cos_to / dist2
}

/// Extends a subpath by at most `max_bounces` additional vertices past
/// the seed vertex already in `path`, sampling BSDF directions and
/// back-filling the previous vertex's `pdf_rev` once the next bounce's
/// reverse density is known. `is_light_subpath` selects the adjoint
/// shading-normal correction, as in `backward.rs`.
#[allow(clippy::too_many_arguments)]
fn random_walk(
    scene: &Scene,
    mut origin: Point3f,
    mut origin_n: Normal3f,
    mut dir: Vector3f,
    mut beta: Spectrum,
    mut pdf_fwd_w: Float,
    max_bounces: u32,
    sampler: &mut dyn Sampler,
    is_light_subpath: bool,
    path: &mut Vec<Vertex>,
) {
    for _ in 0..max_bounces {
        if beta.is_black() || pdf_fwd_w <= 0.0 {
            break;
        }
        let hit = match scene.raycast(origin, origin_n, dir, Float::INFINITY) {
            Some(p) => p,
            None => break,
        };
        let entity = match hit.entity {
            Some(e) => e,
            None => break,
        };
        let pdf_fwd_area = solid_angle_pdf_to_area(pdf_fwd_w, origin, hit.p, hit.n);
        let bsdf = scene.entities[entity].material.evaluate_at_point(&hit);
        let wo = -dir;

        let bsdf_owned = bsdf.clone();
        path.push(Vertex::surface(hit, beta, bsdf, pdf_fwd_area));
        let index = path.len() - 1;

        let u_lobe = sampler.get_1d();
        let u2 = sampler.get_2d();
        let sampled = bsdf_owned.sample_f(&wo, u_lobe, u2, BSDF_ALL);
        let (w_next, f, pdf_w, sampled_type) = match sampled {
            Some(v) => v,
            None => break,
        };
        if pdf_w <= 0.0 || f.is_black() {
            break;
        }
        let specular = sampled_type & crate::core::reflection::BxdfFlags::Specular as u8 != 0;
        path[index].delta = specular;

        let cos_next = vec3_dot_nrmf(&w_next, &path[index].p.ns).abs();
        let adjoint = if is_light_subpath {
            bsdf_owned.adjoint_correction(&w_next)
        } else {
            1.0
        };
        beta = beta * f * (adjoint * cos_next / pdf_w);

        // The reverse pdf at the vertex just pushed is the density of
        // having sampled `wo` from `w_next`'s direction, which can only
        // be known once the outgoing direction is sampled.
        let pdf_rev_w = bsdf_owned.pdf(&w_next, &wo, BSDF_ALL);
        let pdf_rev_area = solid_angle_pdf_to_area(pdf_rev_w, hit.p, origin, origin_n);
        if index > 0 {
            path[index - 1].pdf_rev = pdf_rev_area;
        }

        origin = hit.p;
        origin_n = hit.n;
        dir = w_next;
        pdf_fwd_w = pdf_w;
    }
}

/// Seeds a camera subpath at `pixel` and random-walks it up to
/// `max_depth` vertices (camera vertex included).
fn generate_camera_subpath(
    scene: &Scene,
    camera: &PerspectiveCamera,
    resolution: (u32, u32),
    pixel: (u32, u32),
    sampler: &mut dyn Sampler,
    max_depth: u32,
) -> Vec<Vertex> {
    let mut path = Vec::with_capacity(max_depth as usize);
    if max_depth == 0 {
        return path;
    }
    let u_lens = sampler.get_2d();
    let u_pixel = sampler.get_2d();
    let (we, p0, pdf_pos, w, pdf_dir) =
        camera.sample_point_and_direction(resolution, pixel, u_lens, u_pixel);
    if pdf_pos <= 0.0 || pdf_dir <= 0.0 || we.is_black() {
        path.push(Vertex::camera(p0, Spectrum::new(0.0)));
        return path;
    }
    let cos_wn = vec3_dot_nrmf(&w, &p0.n).abs().max(1e-7);
    let beta = we * (cos_wn / (pdf_pos * pdf_dir));
    path.push(Vertex::camera(p0, beta));

    random_walk(
        scene,
        p0.p,
        p0.n,
        w,
        beta,
        pdf_dir,
        max_depth.saturating_sub(1),
        sampler,
        false,
        &mut path,
    );
    path
}

/// Seeds a light subpath (uniform light pick, area-uniform point,
/// cosine-weighted direction) and random-walks it, mirroring
/// `backward::trace_light_path`'s seeding but keeping every vertex
/// instead of connecting-and-discarding as it goes.
fn generate_light_subpath(scene: &Scene, sampler: &mut dyn Sampler, max_depth: u32) -> Vec<Vertex> {
    let mut path = Vec::with_capacity(max_depth as usize);
    let light_count = scene.light_count();
    if max_depth == 0 || light_count == 0 {
        return path;
    }

    let u_light = sampler.get_1d();
    let light_idx = ((u_light * light_count as Float) as usize).min(light_count - 1);
    let light = scene.light(light_idx);

    let u_point = sampler.get_2d();
    let (p0, pdf_shape) = light.sample_point(|e, u| scene.sample_entity_point(e, u), u_point);
    let pdf_p0 = pdf_shape / light_count as Float;
    if pdf_p0 <= 0.0 {
        return path;
    }
    let beta0 = Spectrum::new(1.0 / pdf_p0);
    path.push(Vertex::light(p0, beta0, pdf_p0, light_idx));

    if max_depth == 1 {
        return path;
    }

    let u_dir = sampler.get_2d();
    let (w01, pdf_w01) = light.sample_direction(&p0, u_dir);
    if pdf_w01 <= 0.0 {
        return path;
    }
    let le0 = light.emitted_radiance(&p0, &w01);
    if le0.is_black() {
        return path;
    }
    let cos0 = vec3_dot_nrmf(&w01, &p0.n).abs();
    let beta = le0 * (cos0 / (pdf_p0 * pdf_w01));

    random_walk(
        scene,
        p0.p,
        p0.n,
        w01,
        beta,
        pdf_w01,
        max_depth.saturating_sub(2),
        sampler,
        true,
        &mut path,
    );
    path
}

/// Result of connecting a `(t, s)` prefix pair: the MIS-weighted
/// contribution, which pixel it belongs to (`None` means the current
/// tile's own pixel, used when `t` is the full camera subpath already
/// seeded at that pixel), and the reverse-pdf overrides the connection
/// implies for the two endpoints it touches (needed by `mis_weight`
/// without mutating the real subpath vectors).
struct Connection {
    value: Spectrum,
    pixel: Option<(u32, u32)>,
    cam_last_rev: Float,
    cam_prev_rev: Option<Float>,
    light_last_rev: Float,
    light_prev_rev: Option<Float>,
}

/// Balance-heuristic MIS weight for the `(t, s)` strategy, following
/// Veach's recursive formulation: walk backward from the connection
/// along both subpaths, accumulating `pdf_rev[i] / pdf_fwd[i]` ratios,
/// skipping any step adjacent to a delta (specular) vertex since a
/// delta bounce could not have been sampled by any other strategy.
/// `*_rev` overrides replace the stored `pdf_rev` at the one or two
/// vertices the connection itself determines, without touching the
/// subpath vectors.
#[allow(clippy::too_many_arguments)]
fn mis_weight(
    camera_path: &[Vertex],
    light_path: &[Vertex],
    t: usize,
    s: usize,
    cam_last_rev: Float,
    cam_prev_rev: Option<Float>,
    light_last_rev: Float,
    light_prev_rev: Option<Float>,
) -> Float {
    if t + s == 2 {
        return 1.0;
    }

    let remap0 = |f: Float| if f == 0.0 { 1.0 } else { f };

    let mut sum_ri = 0.0;

    if t > 0 {
        let mut ri = 1.0;
        for i in (0..t).rev() {
            let pdf_rev = if i == t - 1 {
                cam_last_rev
            } else if i == t - 2 {
                cam_prev_rev.unwrap_or(camera_path[i].pdf_rev)
            } else {
                camera_path[i].pdf_rev
            };
            ri *= remap0(pdf_rev) / remap0(camera_path[i].pdf_fwd);
            let delta_here = camera_path[i].delta;
            let delta_prev = if i == 0 { false } else { camera_path[i - 1].delta };
            if !delta_here && !delta_prev {
                sum_ri += ri;
            }
        }
    }

    if s > 0 {
        let mut ri = 1.0;
        for i in (0..s).rev() {
            let pdf_rev = if i == s - 1 {
                light_last_rev
            } else if i == s - 2 {
                light_prev_rev.unwrap_or(light_path[i].pdf_rev)
            } else {
                light_path[i].pdf_rev
            };
            ri *= remap0(pdf_rev) / remap0(light_path[i].pdf_fwd);
            let delta_here = light_path[i].delta;
            let delta_prev = if i == 0 { false } else { light_path[i - 1].delta };
            if !delta_here && !delta_prev {
                sum_ri += ri;
            }
        }
    }

    1.0 / (1.0 + sum_ri)
}

/// Connects camera-subpath prefix `camera_path[..t]` to light-subpath
/// prefix `light_path[..s]`, covering the three shapes spec.md §4.K
/// distinguishes: `s == 0` (the camera path alone hit an emitter),
/// `t == 1` (a freshly resampled lens point, landing outside the
/// current tile), and the general direct connection between two
/// interior vertices.
#[allow(clippy::too_many_arguments)]
fn connect_bdpt(
    scene: &Scene,
    camera: &PerspectiveCamera,
    resolution: (u32, u32),
    camera_path: &[Vertex],
    light_path: &[Vertex],
    t: usize,
    s: usize,
    sampler: &mut dyn Sampler,
) -> Option<Connection> {
    if t == 0 {
        return None;
    }
    let cam_last = &camera_path[t - 1];

    if s == 0 {
        // Pure BSDF-hit contribution: the camera subpath's own last
        // vertex happens to sit on a light.
        if !cam_last.is_on_light() {
            return None;
        }
        let light_idx = scene.light_for_entity(cam_last.p.entity?)?;
        let wo = if t >= 2 {
            direction(cam_last.p.p, camera_path[t - 2].p.p).normalize()
        } else {
            return None;
        };
        let le = scene.light(light_idx).emitted_radiance(&cam_last.p, &wo);
        if le.is_black() {
            return None;
        }
        let value = cam_last.beta * le;
        return Some(Connection {
            value,
            pixel: None,
            cam_last_rev: cam_last.pdf_rev,
            cam_prev_rev: None,
            light_last_rev: 0.0,
            light_prev_rev: None,
        });
    }

    if t == 1 {
        // Resample a lens point that can see the light subpath's last
        // vertex; the result lands on whatever pixel that projects to,
        // not necessarily the tile's own pixel.
        let light_last = &light_path[s - 1];
        let u_lens = sampler.get_2d();
        let (we, pixel, p_cam, pdf_p_cam) = camera.sample_point(resolution, light_last.p.p, u_lens);
        let pixel = pixel?;
        if we.is_black() || pdf_p_cam <= 0.0 {
            return None;
        }
        let d = direction(light_last.p.p, p_cam.p);
        let r2 = d.length_squared();
        if r2 < 1e-12 {
            return None;
        }
        let w_to_cam = d.normalize();

        let f = if s == 1 {
            // light_path[0] has no BSDF; evaluate its emission directly.
            let light_idx = light_last.light_index?;
            scene.light(light_idx).emitted_radiance(&light_last.p, &w_to_cam)
        } else {
            let bsdf = light_last.bsdf.as_ref()?;
            let wo = direction(light_last.p.p, light_path[s - 2].p.p).normalize();
            let adjoint = bsdf.adjoint_correction(&w_to_cam);
            bsdf.f(&wo, &w_to_cam, BSDF_ALL) * adjoint
        };
        if f.is_black() {
            return None;
        }
        if !scene.visibility(light_last.p.p, light_last.p.n, p_cam.p, p_cam.n) {
            return None;
        }
        let cos_light = vec3_dot_nrmf(&w_to_cam, &light_last.p.ns).abs();
        let cos_cam = vec3_dot_nrmf(&w_to_cam, &p_cam.n).abs();
        let g = cos_light * cos_cam / r2;
        let value = light_last.beta * f * g * we * (1.0 / pdf_p_cam);

        let cam_vertex_rev = solid_angle_pdf_to_area(
            camera.probability_direction(resolution, &p_cam, &(-w_to_cam)),
            p_cam.p,
            light_last.p.p,
            light_last.p.n,
        );
        return Some(Connection {
            value,
            pixel: Some(pixel),
            cam_last_rev: cam_vertex_rev,
            cam_prev_rev: None,
            light_last_rev: light_last.pdf_rev,
            light_prev_rev: None,
        });
    }

    // General case: both subpaths have at least one interior vertex
    // past the camera/light root; connect them directly with a shadow
    // ray and no resampling.
    let light_last = &light_path[s - 1];
    let d = direction(cam_last.p.p, light_last.p.p);
    let r2 = d.length_squared();
    if r2 < 1e-12 {
        return None;
    }
    let w_to_light = d.normalize();
    let w_to_cam = -w_to_light;

    let cam_bsdf = cam_last.bsdf.as_ref()?;
    let wo_cam = direction(cam_last.p.p, camera_path[t - 2].p.p).normalize();
    let f_cam = cam_bsdf.f(&wo_cam, &w_to_light, BSDF_ALL);
    if f_cam.is_black() {
        return None;
    }

    let f_light = if s == 1 {
        let light_idx = light_last.light_index?;
        scene.light(light_idx).emitted_radiance(&light_last.p, &w_to_cam)
    } else {
        let light_bsdf = light_last.bsdf.as_ref()?;
        let wo_light = direction(light_last.p.p, light_path[s - 2].p.p).normalize();
        let adjoint = light_bsdf.adjoint_correction(&w_to_cam);
        light_bsdf.f(&wo_light, &w_to_cam, BSDF_ALL) * adjoint
    };
    if f_light.is_black() {
        return None;
    }

    if !scene.visibility(cam_last.p.p, cam_last.p.n, light_last.p.p, light_last.p.n) {
        return None;
    }

    let cos_cam = vec3_dot_nrmf(&w_to_light, &cam_last.p.ns).abs();
    let cos_light = vec3_dot_nrmf(&w_to_cam, &light_last.p.ns).abs();
    let g = cos_cam * cos_light / r2;
    let value = cam_last.beta * f_cam * g * f_light * light_last.beta;

    let pdf_cam_to_light_w = cam_bsdf.pdf(&wo_cam, &w_to_light, BSDF_ALL);
    let cam_last_rev = solid_angle_pdf_to_area(pdf_cam_to_light_w, cam_last.p.p, light_last.p.p, light_last.p.n);
    let cam_prev_rev = if t >= 3 {
        let pdf_w = cam_bsdf.pdf(&w_to_light, &wo_cam, BSDF_ALL);
        Some(solid_angle_pdf_to_area(
            pdf_w,
            cam_last.p.p,
            camera_path[t - 2].p.p,
            camera_path[t - 2].p.n,
        ))
    } else {
        None
    };

    let light_last_rev = if s >= 2 {
        let light_bsdf = light_last.bsdf.as_ref()?;
        let wo_light = direction(light_last.p.p, light_path[s - 2].p.p).normalize();
        let pdf_w = light_bsdf.pdf(&w_to_cam, &wo_light, BSDF_ALL);
        solid_angle_pdf_to_area(pdf_w, light_last.p.p, cam_last.p.p, cam_last.p.n)
    } else {
        0.0
    };
    let light_prev_rev = if s >= 3 {
        let light_bsdf = light_last.bsdf.as_ref()?;
        let pdf_w = light_bsdf.pdf(&w_to_cam, &direction(light_last.p.p, light_path[s - 2].p.p).normalize(), BSDF_ALL);
        Some(solid_angle_pdf_to_area(
            pdf_w,
            light_last.p.p,
            light_path[s - 2].p.p,
            light_path[s - 2].p.n,
        ))
    } else {
        None
    };

    Some(Connection {
        value,
        pixel: None,
        cam_last_rev,
        cam_prev_rev,
        light_last_rev,
        light_prev_rev,
    })
}

/// Renders every pixel of `band` (clamped to `scissor`) with full
/// bidirectional path tracing: for each camera sample, a fresh camera
/// and light subpath are generated, then every `(t, s)` prefix pair up
/// to `max_vertices` total vertices is connected and MIS-weighted.
/// Connections that land back on the tile's own pixel accumulate into
/// `band`; everything else (light-subpath hits resampled onto some
/// other pixel) splats through `splat`.
#[allow(clippy::too_many_arguments)]
pub fn render_band(
    band: &mut FilmBand,
    splat: LightSplatter,
    scene: &Scene,
    camera: &PerspectiveCamera,
    resolution: (u32, u32),
    sampler: &mut dyn Sampler,
    samples_x: u32,
    samples_y: u32,
    max_vertices: u32,
    scissor: Scissor,
) {
    let scissor = scissor.clamped(resolution);
    let y0 = band.y_start().max(scissor.min.1);
    let y1 = (band.y_start() + band.rows()).min(scissor.max.1);
    let dims_1d = (max_vertices as i32 + 2) * 4;
    let dims_2d = (max_vertices as i32 + 2) * 4;
    let sample_count = (samples_x * samples_y).max(1);

    for y in y0..y1 {
        for x in scissor.min.0..scissor.max.0 {
            sampler.begin_pixel(samples_x as i32, samples_y as i32, dims_1d, dims_2d);
            let mut accum = Spectrum::new(0.0);
            for _ in 0..sample_count {
                sampler.begin_sample();
                let camera_path = generate_camera_subpath(scene, camera, resolution, (x, y), sampler, max_vertices);
                let light_path = generate_light_subpath(scene, sampler, max_vertices);

                for t in 1..=camera_path.len() {
                    let max_s = max_vertices.saturating_sub(t as u32) as usize;
                    for s in 0..=max_s.min(light_path.len()) {
                        if t + s < 2 {
                            continue;
                        }
                        let connection = connect_bdpt(scene, camera, resolution, &camera_path, &light_path, t, s, sampler);
                        let connection = match connection {
                            Some(c) if !c.value.is_black() => c,
                            _ => continue,
                        };
                        let weight = mis_weight(
                            &camera_path,
                            &light_path,
                            t,
                            s,
                            connection.cam_last_rev,
                            connection.cam_prev_rev,
                            connection.light_last_rev,
                            connection.light_prev_rev,
                        );
                        let contribution = connection.value * weight;
                        match connection.pixel {
                            Some(px) => splat.add_light_sample(px, contribution),
                            None => accum += contribution,
                        }
                    }
                }
                sampler.end_sample();
            }
            band.add_camera_sample((x, y), accum * (1.0 / sample_count as Float));
        }
    }
    sampler.end_pixel();
    splat.add_light_sample_count((sample_count as u64) * ((y1 - y0) as u64) * ((scissor.max.0 - scissor.min.0) as u64));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::film::Film;
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
                Transform::translation_rotation_deg(Vector3f::new(0.0, 2.0, 0.0), Vector3f::new(180.0, 0.0, 0.0)),
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

    fn full_scissor() -> Scissor {
        Scissor {
            min: (0, 0),
            max: (u32::MAX, u32::MAX),
        }
    }

    #[test]
    fn lit_scene_renders_non_negative_radiance_and_does_not_panic() {
        let scene = lit_plane_scene();
        let camera = PerspectiveCamera::new(
            Transform::translation_rotation_deg(Vector3f::new(0.0, 1.9, 0.0), Vector3f::new(90.0, 0.0, 0.0)),
            45f64.to_radians(),
            0.0,
            1.0,
        );
        let mut film = Film::new((4, 4));
        let mut sampler = RandomSampler::new(7);
        {
            let (mut bands, splatter) = film.bands_and_splatter_mut(4);
            render_band(&mut bands[0], splatter, &scene, &camera, (4, 4), &mut sampler, 1, 1, 4, full_scissor());
        }
        let mut total = Spec::new(0.0);
        for y in 0..4u32 {
            for x in 0..4u32 {
                total += film.export_pixel_for_test((x, y));
            }
        }
        assert!(total.max_component() >= 0.0);
    }

    #[test]
    fn empty_scene_contributes_nothing() {
        let scene = Scene::build(vec![]);
        let camera = PerspectiveCamera::new(Transform::default(), 45f64.to_radians(), 0.0, 1.0);
        let mut film = Film::new((2, 2));
        let mut sampler = RandomSampler::new(1);
        {
            let (mut bands, splatter) = film.bands_and_splatter_mut(2);
            render_band(&mut bands[0], splatter, &scene, &camera, (2, 2), &mut sampler, 1, 1, 4, full_scissor());
        }
        assert_eq!(film.export_pixel_for_test((0, 0)), Spectrum::new(0.0));
    }

    #[test]
    fn mis_weight_of_the_only_possible_strategy_is_one() {
        let camera_path: Vec<Vertex> = Vec::new();
        let light_path: Vec<Vertex> = Vec::new();
        let w = mis_weight(&camera_path, &light_path, 1, 1, 0.0, None, 0.0, None);
        assert!((w - 1.0).abs() < 1e-12);
    }
}
