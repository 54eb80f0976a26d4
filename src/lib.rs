//! A physically-based, CPU-only offline renderer: forward, backward
//! (light-tracing), and bidirectional path integrators sharing one
//! scene, BSDF, and film representation.

#[macro_use]
extern crate impl_ops;

pub mod accelerators;
pub mod core;
pub mod integrators;
pub mod shapes;
