//! GPU resource framework for a scene-graph renderer.
//!
//! Every drawable that needs texture or framebuffer memory goes through this
//! crate. All operations take the device explicitly and run on the thread
//! owning the GL context.
//!
//! # Overview
//!
//! - [`TextureCache`] loads image files into 2D textures and cube maps, once
//!   per path, and applies per-unit sampler state when a primitive draws.
//! - [`RenderTargetSurface`] renders a nested [`SubRenderer`] into
//!   framebuffer-attached textures and shows the result on a quad, keeping a
//!   CPU pixel mirror in sync on request.
//! - [`GeometryBuffer`] draws parallel per-vertex arrays.
//! - [`Primitive`] is the contract scene traversal drives each drawable
//!   through, with a [`RenderContext`] carrying the device and the cache.

pub mod geometry;
pub mod primitive;
pub mod render_target;
pub mod texture_cache;

#[cfg(test)]
mod test_support;

pub use geometry::{GeometryBuffer, GeometryKind, Vertex, VertexComponent};
pub use primitive::{Primitive, RenderContext, SubRenderer};
pub use render_target::{
    backing_dimension, BindState, RenderTargetSurface, SurfaceOptions, MAX_SURFACE_DIMENSION,
};
pub use texture_cache::TextureCache;
