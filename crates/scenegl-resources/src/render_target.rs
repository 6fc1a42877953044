//! [`RenderTargetSurface`]: a quad whose texture is rendered by a nested
//! renderer into framebuffer-attached targets, with a CPU pixel mirror.
//!
//! Targets are allocated at the next power of two of the requested size; the
//! visible content is the `[0, width) x [0, height)` corner and the quad
//! samples it with texture coordinates scaled to match.
//!
//! A frame runs in a fixed order:
//!
//! 1. A requested [`upload`](RenderTargetSurface::upload) copies the mirror
//!    to the display texture.
//! 2. The nested renderer draws into the framebuffer (bind / render / unbind).
//! 3. The quad is drawn with the surface's texture state.
//! 4. A requested [`download`](RenderTargetSurface::download) reads the
//!    chosen target back into the mirror.
//!
//! Without framebuffer support the surface is a single static texture built
//! from the mirror and never touches a framebuffer.

use std::path::Path;

use glam::{Mat4, Vec2, Vec3, Vec4};
use scenegl_core::{
    BoundingBox, Color, Filter, FramebufferHandle, Hints, PrimitiveState, ResourceConfig,
    SamplerState, TextureHandle, TextureTarget, Wrap,
};
use scenegl_device::{
    DrawMode, GlDevice, ImageUpload, PixelData, PixelRect, QuadDraw, UploadFormat, VertexArrays,
};
use tracing::{debug, error, trace, warn};

use crate::primitive::{Primitive, RenderContext, SubRenderer};
use crate::texture_cache::TextureCache;

/// Largest width or height a surface accepts.
pub const MAX_SURFACE_DIMENSION: u32 = 16384;

/// Smallest power of two `>= n`, and at least 1. `n` is first clamped to
/// [`MAX_SURFACE_DIMENSION`].
pub fn backing_dimension(n: u32) -> u32 {
    n.clamp(1, MAX_SURFACE_DIMENSION).next_power_of_two()
}

fn surface_dimension(n: u32, axis: &'static str) -> u32 {
    if n > MAX_SURFACE_DIMENSION {
        warn!(axis, requested = n, max = MAX_SURFACE_DIMENSION, "surface size clamped");
    }
    n.clamp(1, MAX_SURFACE_DIMENSION)
}

/// Construction options for a [`RenderTargetSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceOptions {
    /// Colour attachments, clamped to `[1, max colour attachments]`.
    pub attachments: usize,
    /// Run the attached renderer each frame.
    pub renderer_active: bool,
    /// Use framebuffers when the device supports them.
    pub render_to_texture: bool,
    /// Regenerate depth-texture mipmaps on unbind.
    pub depth_mipmaps: bool,
    /// Initial hints. `IGNORE_DEPTH` here skips the depth attachment.
    pub hints: Hints,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            attachments: 1,
            renderer_active: true,
            render_to_texture: true,
            depth_mipmaps: false,
            hints: Hints::default(),
        }
    }
}

impl SurfaceOptions {
    pub fn from_config(config: &ResourceConfig) -> Self {
        Self {
            attachments: config.default_attachments,
            render_to_texture: config.render_to_texture,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindState {
    Unbound,
    Bound,
}

pub struct RenderTargetSurface {
    state: PrimitiveState,
    corners: [Vec3; 4],
    width: u32,
    height: u32,
    backing_width: u32,
    backing_height: u32,
    pixels: Vec<Color>,
    attachment_count: usize,
    targets: Vec<TextureHandle>,
    write_index: usize,
    depth: Option<TextureHandle>,
    framebuffer: FramebufferHandle,
    pending_upload: bool,
    pending_download: bool,
    download_target: Option<TextureHandle>,
    bind_state: BindState,
    render_to_texture: bool,
    renderer_active: bool,
    depth_mipmaps: bool,
    renderer: Option<Box<dyn SubRenderer>>,
}

const UNIT_SQUARE: [Vec3; 4] = [
    Vec3::new(-0.5, -0.5, 0.0),
    Vec3::new(0.5, -0.5, 0.0),
    Vec3::new(0.5, 0.5, 0.0),
    Vec3::new(-0.5, 0.5, 0.0),
];

impl RenderTargetSurface {
    /// A `width x height` surface filled with opaque white.
    pub fn new(gl: &mut dyn GlDevice, width: u32, height: u32, options: SurfaceOptions) -> Self {
        let width = surface_dimension(width, "width");
        let height = surface_dimension(height, "height");
        let pixels = vec![Vec4::ONE; width as usize * height as usize];
        let state = PrimitiveState {
            hints: options.hints,
            ..PrimitiveState::default()
        };
        Self::build(gl, width, height, pixels, state, options)
    }

    fn build(
        gl: &mut dyn GlDevice,
        width: u32,
        height: u32,
        pixels: Vec<Color>,
        state: PrimitiveState,
        options: SurfaceOptions,
    ) -> Self {
        let caps = gl.capabilities();
        let render_to_texture = options.render_to_texture && caps.render_to_texture;
        let attachment_count = if render_to_texture {
            options
                .attachments
                .clamp(1, caps.max_color_attachments.max(1) as usize)
        } else {
            1
        };
        if options.attachments != attachment_count && render_to_texture {
            warn!(
                requested = options.attachments,
                granted = attachment_count,
                "colour attachment count clamped"
            );
        }
        if !render_to_texture {
            warn!("render to texture unavailable, surface is a static texture");
        }

        let mut surface = Self {
            state,
            corners: UNIT_SQUARE,
            width,
            height,
            backing_width: width,
            backing_height: height,
            pixels,
            attachment_count,
            targets: Vec::new(),
            write_index: 0,
            depth: None,
            framebuffer: FramebufferHandle::DEFAULT,
            pending_upload: false,
            pending_download: false,
            download_target: None,
            bind_state: BindState::Unbound,
            render_to_texture,
            renderer_active: options.renderer_active,
            depth_mipmaps: options.depth_mipmaps,
            renderer: None,
        };
        surface.recreate(gl);
        surface
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size of the allocated targets.
    pub fn backing_size(&self) -> (u32, u32) {
        (self.backing_width, self.backing_height)
    }

    /// Texture-coordinate extent of the visible content.
    pub fn tex_extent(&self) -> Vec2 {
        if self.render_to_texture {
            Vec2::new(
                self.width as f32 / self.backing_width as f32,
                self.height as f32 / self.backing_height as f32,
            )
        } else {
            Vec2::ONE
        }
    }

    /// The CPU mirror, `width * height` colours, row-major.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Edit the mirror; call [`upload`](Self::upload) to send it.
    pub fn pixels_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }

    pub fn targets(&self) -> &[TextureHandle] {
        &self.targets
    }

    /// The texture currently rendered into and displayed.
    pub fn render_texture(&self) -> TextureHandle {
        self.targets
            .get(self.write_index)
            .copied()
            .unwrap_or_default()
    }

    pub fn depth_texture(&self) -> Option<TextureHandle> {
        self.depth
    }

    pub fn framebuffer(&self) -> FramebufferHandle {
        self.framebuffer
    }

    pub fn bind_state(&self) -> BindState {
        self.bind_state
    }

    /// `false` when the surface fell back to a static texture.
    pub fn renders_to_texture(&self) -> bool {
        self.render_to_texture
    }

    pub fn set_renderer_active(&mut self, active: bool) {
        self.renderer_active = active;
    }

    /// Attach the nested renderer and tell it the surface size.
    pub fn attach_renderer(&mut self, mut renderer: Box<dyn SubRenderer>) {
        renderer.set_resolution(self.width, self.height);
        self.renderer = Some(renderer);
    }

    pub fn detach_renderer(&mut self) -> Option<Box<dyn SubRenderer>> {
        self.renderer.take()
    }

    pub fn renderer_mut(&mut self) -> Option<&mut (dyn SubRenderer + 'static)> {
        self.renderer.as_deref_mut()
    }

    // -----------------------------------------------------------------------
    // GPU object lifetime
    // -----------------------------------------------------------------------

    /// Resize the mirror (new pixels are white) and rebuild every GPU object
    /// at the new size.
    pub fn resize(&mut self, gl: &mut dyn GlDevice, width: u32, height: u32) {
        self.width = surface_dimension(width, "width");
        self.height = surface_dimension(height, "height");
        self.pixels
            .resize(self.width as usize * self.height as usize, Vec4::ONE);
        self.recreate(gl);
    }

    /// Delete targets, depth texture and framebuffer. A bound surface first
    /// restores the state its bind saved.
    pub fn release(&mut self, gl: &mut dyn GlDevice) {
        if self.bind_state == BindState::Bound {
            debug!(framebuffer = %self.framebuffer, "releasing a bound surface");
            gl.pop_state();
            self.bind_state = BindState::Unbound;
        }
        for texture in self.targets.drain(..) {
            gl.delete_texture(texture);
        }
        if let Some(depth) = self.depth.take() {
            gl.delete_texture(depth);
        }
        if !self.framebuffer.is_default() {
            gl.delete_framebuffer(self.framebuffer);
            self.framebuffer = FramebufferHandle::DEFAULT;
        }
        self.bind_state = BindState::Unbound;
    }

    fn recreate(&mut self, gl: &mut dyn GlDevice) {
        self.release(gl);

        if !self.render_to_texture {
            self.backing_width = self.width;
            self.backing_height = self.height;
            let texture = gl.gen_texture();
            gl.bind_texture(TextureTarget::Texture2d, texture);
            gl.upload_image(
                TextureTarget::Texture2d,
                &ImageUpload {
                    width: self.width,
                    height: self.height,
                    format: UploadFormat::Rgba32F,
                    level: 0,
                    border: 0,
                    build_mipmaps: true,
                    pixels: PixelData::colors(&self.pixels),
                },
            );
            gl.bind_texture(TextureTarget::Texture2d, TextureHandle::NONE);
            self.targets.push(texture);
            self.write_index = 0;
            return;
        }

        self.backing_width = backing_dimension(self.width);
        self.backing_height = backing_dimension(self.height);
        let sampler = self.state.texture_states[0];
        let previous = gl.framebuffer();

        self.framebuffer = gl.gen_framebuffer();
        gl.bind_framebuffer(self.framebuffer);

        for index in 0..self.attachment_count {
            let texture = gl.gen_texture();
            gl.bind_texture(TextureTarget::Texture2d, texture);
            gl.apply_sampler(TextureTarget::Texture2d, &sampler, false);
            gl.upload_image(
                TextureTarget::Texture2d,
                &ImageUpload {
                    width: self.backing_width,
                    height: self.backing_height,
                    format: UploadFormat::Rgba32F,
                    level: 0,
                    border: 0,
                    build_mipmaps: false,
                    pixels: PixelData::Empty,
                },
            );
            gl.upload_sub_image(
                TextureTarget::Texture2d,
                PixelRect::sized(self.width, self.height),
                PixelData::colors(&self.pixels),
            );
            gl.generate_mipmaps(TextureTarget::Texture2d);
            gl.attach_color(index as u32, texture);
            self.targets.push(texture);
        }

        if !self.state.hints.contains(Hints::IGNORE_DEPTH) {
            let depth = gl.gen_texture();
            gl.bind_texture(TextureTarget::Texture2d, depth);
            gl.apply_sampler(
                TextureTarget::Texture2d,
                &SamplerState {
                    min_filter: Filter::Linear,
                    mag_filter: Filter::Linear,
                    wrap_s: Wrap::ClampToEdge,
                    wrap_t: Wrap::ClampToEdge,
                    ..SamplerState::default()
                },
                false,
            );
            gl.upload_image(
                TextureTarget::Texture2d,
                &ImageUpload {
                    width: self.backing_width,
                    height: self.backing_height,
                    format: UploadFormat::Depth24,
                    level: 0,
                    border: 0,
                    build_mipmaps: false,
                    pixels: PixelData::Empty,
                },
            );
            gl.attach_depth(depth);
            self.depth = Some(depth);
        }

        if !gl.framebuffer_complete() {
            error!(
                framebuffer = %self.framebuffer,
                attachments = self.attachment_count,
                "render target framebuffer incomplete"
            );
        }

        gl.bind_framebuffer(previous);
        gl.bind_texture(TextureTarget::Texture2d, TextureHandle::NONE);
        self.write_index = self.write_index.min(self.attachment_count - 1);

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_resolution(self.width, self.height);
        }
        debug!(
            width = self.width,
            height = self.height,
            backing_width = self.backing_width,
            backing_height = self.backing_height,
            framebuffer = %self.framebuffer,
            "render target created"
        );
    }

    // -----------------------------------------------------------------------
    // Framebuffer binding
    // -----------------------------------------------------------------------

    /// Redirect drawing into attachment `index`, or the current write target
    /// when `None`. Out-of-range indices select attachment 0.
    pub fn bind(&mut self, gl: &mut dyn GlDevice, index: Option<usize>) {
        if !self.render_to_texture {
            return;
        }
        if self.bind_state == BindState::Bound {
            warn!(framebuffer = %self.framebuffer, "surface bound twice");
        }
        let index = index
            .filter(|i| *i < self.attachment_count)
            .unwrap_or(if index.is_some() { 0 } else { self.write_index });

        gl.push_state();
        gl.bind_framebuffer(self.framebuffer);
        gl.draw_buffer(index as u32);
        self.bind_state = BindState::Bound;
        trace!(framebuffer = %self.framebuffer, index, "surface bound");
    }

    /// Restore the state saved by [`bind`](Self::bind) and rebuild the
    /// render texture's mipmaps.
    pub fn unbind(&mut self, gl: &mut dyn GlDevice) {
        if !self.render_to_texture {
            return;
        }
        if self.bind_state == BindState::Unbound {
            warn!(framebuffer = %self.framebuffer, "unbind without bind");
            return;
        }

        gl.pop_state();
        self.bind_state = BindState::Unbound;

        gl.bind_texture(TextureTarget::Texture2d, self.render_texture());
        gl.generate_mipmaps(TextureTarget::Texture2d);
        if self.depth_mipmaps {
            if let Some(depth) = self.depth {
                gl.bind_texture(TextureTarget::Texture2d, depth);
                gl.generate_mipmaps(TextureTarget::Texture2d);
            }
        }
        gl.bind_texture(TextureTarget::Texture2d, TextureHandle::NONE);
        trace!(framebuffer = %self.framebuffer, "surface unbound");
    }

    /// Make the attachment holding `texture` the render and display target.
    /// Unknown textures select attachment 0.
    pub fn select_render_target(&mut self, texture: TextureHandle) {
        self.write_index = self.target_index(texture);
    }

    fn target_index(&self, texture: TextureHandle) -> usize {
        self.targets
            .iter()
            .position(|t| *t == texture)
            .unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Pixel transfer
    // -----------------------------------------------------------------------

    /// Send the mirror to the display texture on the next render.
    pub fn upload(&mut self) {
        self.pending_upload = true;
    }

    /// Read a target back into the mirror at the end of the next render.
    /// `None` (or an unknown texture) reads the current write target.
    pub fn download(&mut self, target: Option<TextureHandle>) {
        self.pending_download = true;
        self.download_target = target.filter(|t| t.is_some());
    }

    fn upload_pixels(&self, gl: &mut dyn GlDevice) {
        gl.bind_texture(TextureTarget::Texture2d, self.render_texture());
        gl.upload_sub_image(
            TextureTarget::Texture2d,
            PixelRect::sized(self.width, self.height),
            PixelData::colors(&self.pixels),
        );
        gl.generate_mipmaps(TextureTarget::Texture2d);
        gl.bind_texture(TextureTarget::Texture2d, TextureHandle::NONE);
    }

    fn download_pixels(&mut self, gl: &mut dyn GlDevice) {
        if !self.render_to_texture {
            return;
        }
        let index = match self.download_target {
            Some(texture) => self.target_index(texture),
            None => self.write_index,
        };
        self.bind(gl, Some(index));
        gl.read_buffer(index as u32);
        gl.read_pixels(self.width, self.height, &mut self.pixels);
        self.unbind(gl);
    }

    /// Replace the mirror with an image file, resizing when its dimensions
    /// differ, and request an upload.
    pub fn load(
        &mut self,
        gl: &mut dyn GlDevice,
        textures: &TextureCache,
        path: impl AsRef<Path>,
    ) -> bool {
        let path = path.as_ref();
        let Some((width, height, pixels)) = textures.load_pixels(path) else {
            return false;
        };
        if width > MAX_SURFACE_DIMENSION || height > MAX_SURFACE_DIMENSION {
            warn!(path = %path.display(), width, height, "image too large for a surface");
            return false;
        }
        let resized = (width, height) != (self.width, self.height);
        self.width = width;
        self.height = height;
        self.pixels = pixels;
        if resized {
            self.recreate(gl);
        }
        self.upload();
        true
    }

    /// Write the mirror to an image file.
    pub fn save(&self, textures: &TextureCache, path: impl AsRef<Path>) -> bool {
        textures.save_pixels(path, self.width, self.height, &self.pixels)
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    fn draw_outline(&self, gl: &mut dyn GlDevice, mode: DrawMode) {
        gl.draw_arrays(
            mode,
            &VertexArrays {
                positions: &self.corners,
                normals: None,
                colors: None,
                texcoords: None,
                color: self.state.wire_color,
                lit: false,
            },
        );
    }

    /// A copy with the same pixels, hints and size but fresh GPU objects and
    /// no renderer.
    pub fn clone_surface(&self, gl: &mut dyn GlDevice) -> RenderTargetSurface {
        let options = SurfaceOptions {
            attachments: self.attachment_count,
            renderer_active: self.renderer_active,
            render_to_texture: self.render_to_texture,
            depth_mipmaps: self.depth_mipmaps,
            hints: self.state.hints,
        };
        let mut copy = Self::build(
            gl,
            self.width,
            self.height,
            self.pixels.clone(),
            self.state.clone(),
            options,
        );
        copy.corners = self.corners;
        copy.write_index = self.write_index.min(copy.attachment_count - 1);
        copy.pending_upload = self.pending_upload;
        copy.pending_download = self.pending_download;
        copy
    }
}

impl Primitive for RenderTargetSurface {
    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        self.state.textures[0] = self.render_texture();

        if self.pending_upload {
            self.upload_pixels(ctx.gl);
            self.pending_upload = false;
        }

        if self.render_to_texture && self.renderer_active {
            if let Some(mut renderer) = self.renderer.take() {
                self.bind(ctx.gl, None);
                renderer.reinitialise();
                renderer.render(ctx);
                self.unbind(ctx.gl);
                self.renderer = Some(renderer);
            }
        }

        ctx.textures
            .apply_current(ctx.gl, &self.state.textures, &self.state.texture_states);

        let hints = self.state.hints;
        if hints.contains(Hints::WIRE) {
            self.draw_outline(ctx.gl, DrawMode::LineLoop);
        }
        if hints.contains(Hints::POINTS) {
            self.draw_outline(ctx.gl, DrawMode::Points);
        }
        if hints.contains(Hints::NOBLEND) {
            ctx.gl.set_blend(false);
        }

        ctx.gl.draw_quad(&QuadDraw {
            corners: self.corners,
            tex_extent: self.tex_extent(),
            color: self.state.color,
            textured: true,
        });

        ctx.gl.bind_texture(TextureTarget::Texture2d, TextureHandle::NONE);
        ctx.gl.set_unit_enabled(TextureTarget::Texture2d, false);
        if hints.contains(Hints::NOBLEND) {
            ctx.gl.set_blend(true);
        }

        if self.pending_download {
            self.download_pixels(ctx.gl);
            self.pending_download = false;
            self.download_target = None;
        }
    }

    fn bounding_box(&self, space: &Mat4) -> BoundingBox {
        self.corners
            .iter()
            .map(|p| space.transform_point3(*p))
            .collect()
    }

    fn apply_transform(&mut self, scale_rotate_only: bool) {
        let transform = self.state.transform;
        for corner in &mut self.corners {
            *corner = if scale_rotate_only {
                transform.transform_vector3(*corner)
            } else {
                transform.transform_point3(*corner)
            };
        }
        self.state.transform = Mat4::IDENTITY;
    }

    fn clone_primitive(&self, gl: &mut dyn GlDevice) -> Box<dyn Primitive> {
        Box::new(self.clone_surface(gl))
    }

    fn state(&self) -> &PrimitiveState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PrimitiveState {
        &mut self.state
    }
}

impl Drop for RenderTargetSurface {
    fn drop(&mut self) {
        if !self.targets.is_empty() || self.depth.is_some() || !self.framebuffer.is_default() {
            warn!(
                framebuffer = %self.framebuffer,
                targets = self.targets.len(),
                "render target dropped without release, GPU objects leaked"
            );
        }
    }
}

impl std::fmt::Debug for RenderTargetSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTargetSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("backing", &(self.backing_width, self.backing_height))
            .field("targets", &self.targets)
            .field("depth", &self.depth)
            .field("framebuffer", &self.framebuffer)
            .field("bind_state", &self.bind_state)
            .field("render_to_texture", &self.render_to_texture)
            .finish_non_exhaustive()
    }
}
