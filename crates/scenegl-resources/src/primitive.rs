//! The contracts between scene traversal, primitives and nested renderers.

use glam::Mat4;
use scenegl_core::{BoundingBox, PrimitiveState};
use scenegl_device::GlDevice;

use crate::texture_cache::TextureCache;

/// What a primitive needs while drawing: the device and the texture cache
/// that applies its sampler state.
pub struct RenderContext<'a> {
    pub gl: &'a mut dyn GlDevice,
    pub textures: &'a mut TextureCache,
}

impl<'a> RenderContext<'a> {
    pub fn new(gl: &'a mut dyn GlDevice, textures: &'a mut TextureCache) -> Self {
        Self { gl, textures }
    }
}

/// A renderer driven into a surface's framebuffer once per frame.
///
/// # Example
///
/// ```rust,ignore
/// struct Feedback { scene: Vec<Box<dyn Primitive>> }
///
/// impl SubRenderer for Feedback {
///     fn set_resolution(&mut self, _w: u32, _h: u32) {}
///     fn reinitialise(&mut self) {}
///     fn render(&mut self, ctx: &mut RenderContext<'_>) {
///         ctx.gl.clear(Vec4::ZERO);
///         for p in &mut self.scene {
///             p.render(ctx);
///         }
///     }
/// }
/// ```
pub trait SubRenderer {
    /// Logical size of the surface being rendered into.
    fn set_resolution(&mut self, width: u32, height: u32);

    /// Reset per-frame state before [`render`](SubRenderer::render).
    fn reinitialise(&mut self);

    fn render(&mut self, ctx: &mut RenderContext<'_>);
}

/// The host contract scene traversal uses for every drawable.
pub trait Primitive {
    fn render(&mut self, ctx: &mut RenderContext<'_>);

    /// Bounds of the primitive's geometry transformed by `space`.
    fn bounding_box(&self, space: &Mat4) -> BoundingBox;

    /// Bake the state transform into the geometry and reset it to identity.
    /// `scale_rotate_only` drops the translation.
    fn apply_transform(&mut self, scale_rotate_only: bool);

    /// A copy with its own GPU objects.
    fn clone_primitive(&self, gl: &mut dyn GlDevice) -> Box<dyn Primitive>;

    fn state(&self) -> &PrimitiveState;

    fn state_mut(&mut self) -> &mut PrimitiveState;
}
