//! The graphics-device seam the resource layer drives.

use glam::{Vec2, Vec3};
use scenegl_core::{
    Color, FramebufferHandle, PixelFormat, SamplerState, TextureDescriptor, TextureHandle,
    TextureTarget,
};

/// What the current context can do. Decided once, when the device is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Framebuffer objects with texture attachments and mipmap generation.
    pub render_to_texture: bool,
    /// Per-unit texture activation.
    pub multitexture: bool,
    pub max_texture_units: u32,
    pub max_color_attachments: u32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            render_to_texture: true,
            multitexture: true,
            max_texture_units: 8,
            max_color_attachments: 8,
        }
    }
}

/// Storage format of an uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadFormat {
    Rgb8,
    Rgba8,
    Rgba32F,
    Depth24,
}

impl From<PixelFormat> for UploadFormat {
    fn from(format: PixelFormat) -> Self {
        match format {
            PixelFormat::Rgb => UploadFormat::Rgb8,
            PixelFormat::Rgba => UploadFormat::Rgba8,
        }
    }
}

/// Borrowed pixel source for an upload. `Empty` allocates storage only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelData<'a> {
    Empty,
    Bytes(&'a [u8]),
    Floats(&'a [f32]),
}

impl<'a> PixelData<'a> {
    pub fn colors(colors: &'a [Color]) -> Self {
        PixelData::Floats(bytemuck::cast_slice(colors))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PixelData::Empty => true,
            PixelData::Bytes(b) => b.is_empty(),
            PixelData::Floats(f) => f.is_empty(),
        }
    }

    pub(crate) fn as_ptr(&self) -> *const std::ffi::c_void {
        match self {
            PixelData::Empty => std::ptr::null(),
            PixelData::Bytes(b) => b.as_ptr().cast(),
            PixelData::Floats(f) => f.as_ptr().cast(),
        }
    }
}

/// A full image specification for the texture bound on `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageUpload<'a> {
    pub width: u32,
    pub height: u32,
    pub format: UploadFormat,
    pub level: i32,
    pub border: i32,
    /// Upload level 0 and derive the whole mip chain from it. `level` and
    /// `border` are ignored.
    pub build_mipmaps: bool,
    pub pixels: PixelData<'a>,
}

/// A rectangle of texels, origin at the first row uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// One slot of a cube-map assembly as handed to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CubeFaceImage {
    pub handle: TextureHandle,
    /// `None` while the face has not been loaded.
    pub descriptor: Option<TextureDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Fill,
    Line,
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
    /// Independent quads, four vertices each.
    Quads,
}

/// A four-corner quad sampled over `[0, s] x [0, t]` of texture unit 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadDraw {
    /// Counter-clockwise from the (0, 0) texture corner.
    pub corners: [Vec3; 4],
    pub tex_extent: Vec2,
    pub color: Color,
    /// `false` draws flat `color` regardless of enabled texture units.
    pub textured: bool,
}

/// Parallel vertex arrays. Missing arrays use constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexArrays<'a> {
    pub positions: &'a [Vec3],
    pub normals: Option<&'a [Vec3]>,
    pub colors: Option<&'a [Vec3]>,
    pub texcoords: Option<&'a [Vec3]>,
    /// Used when `colors` is `None`; its alpha is always applied.
    pub color: Color,
    /// Shade by the normals with a headlight; unlit draws use the colours
    /// as given.
    pub lit: bool,
}

/// The graphics operations the resource layer needs from a bound context.
///
/// Calls follow GL's bind-then-operate model: texture uploads, sampler and
/// mipmap calls act on whatever is bound to the target on the active unit,
/// and attachment calls act on the bound framebuffer. Implementations must
/// only be used on the thread owning the context.
pub trait GlDevice {
    /// Downcast to a concrete type, e.g. to reach `RawGlDevice::set_transform`
    /// through a `&mut dyn GlDevice`.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Mutable downcast to a concrete type.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;

    fn capabilities(&self) -> Capabilities;

    // -- textures --------------------------------------------------------

    fn gen_texture(&mut self) -> TextureHandle;

    fn delete_texture(&mut self, texture: TextureHandle);

    /// Bind on the active unit. Cube faces bind through the cube-map target.
    fn bind_texture(&mut self, target: TextureTarget, texture: TextureHandle);

    fn upload_image(&mut self, target: TextureTarget, image: &ImageUpload<'_>);

    /// Replace a rectangle of level 0. Pixel data is RGBA.
    fn upload_sub_image(&mut self, target: TextureTarget, rect: PixelRect, pixels: PixelData<'_>);

    fn generate_mipmaps(&mut self, target: TextureTarget);

    /// Apply filtering, wrapping, LOD and environment state. Wrap-R is only
    /// touched when `wrap_r` is set.
    fn apply_sampler(&mut self, target: TextureTarget, state: &SamplerState, wrap_r: bool);

    fn active_unit(&mut self, unit: u32);

    /// Turn sampling of `target` on or off for the active unit.
    fn set_unit_enabled(&mut self, target: TextureTarget, enabled: bool);

    /// Bind six face textures as one cube map addressed by `primary`.
    /// Incomplete face sets must not fail.
    fn bind_cube_map(&mut self, primary: TextureHandle, faces: &[CubeFaceImage; 6]);

    // -- framebuffers ----------------------------------------------------

    fn gen_framebuffer(&mut self) -> FramebufferHandle;

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle);

    fn bind_framebuffer(&mut self, framebuffer: FramebufferHandle);

    /// The currently bound framebuffer.
    fn framebuffer(&self) -> FramebufferHandle;

    fn attach_color(&mut self, index: u32, texture: TextureHandle);

    fn attach_depth(&mut self, texture: TextureHandle);

    fn framebuffer_complete(&mut self) -> bool;

    fn draw_buffer(&mut self, index: u32);

    fn read_buffer(&mut self, index: u32);

    /// Read `width x height` RGBA floats from the read buffer into `out`.
    fn read_pixels(&mut self, width: u32, height: u32, out: &mut [Color]);

    /// Clear colour and depth of the bound framebuffer's draw buffer.
    fn clear(&mut self, color: Color);

    // -- state -----------------------------------------------------------

    /// Save framebuffer, buffer selection, texture, viewport and blend state.
    fn push_state(&mut self);

    /// Restore what the matching `push_state` saved.
    fn pop_state(&mut self);

    fn polygon_mode(&mut self, mode: PolygonMode);

    fn set_blend(&mut self, enabled: bool);

    fn set_line_smooth(&mut self, enabled: bool);

    // -- drawing ---------------------------------------------------------

    fn draw_quad(&mut self, quad: &QuadDraw);

    fn draw_arrays(&mut self, mode: DrawMode, arrays: &VertexArrays<'_>);
}
