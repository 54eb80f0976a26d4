//! Shared abstractions: math primitives, the sampler discipline, the
//! BSDF/material stack, the scene (entities + BVH + lights), the
//! camera, and the film. Kept as one `core` module rather than split
//! into per-concern top-level modules since every piece here is wired
//! tightly to every other piece (a `SurfacePoint` flows through
//! shapes, materials, lights, and the camera alike).

pub mod camera;
pub mod error;
pub mod film;
pub mod geometry;
pub mod interaction;
pub mod light;
pub mod material;
pub mod microfacet;
pub mod pbrt;
pub mod reflection;
pub mod rng;
pub mod sampler;
pub mod sampling;
pub mod scene;
pub mod scenefile;
pub mod spectrum;
pub mod texture;
pub mod transform;
