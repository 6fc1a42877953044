//! In-memory [`GlDevice`] for tests.
//!
//! Every call is appended to [`RecordingDevice::calls`]. Enough GL state is
//! simulated for the resource layer's contracts to be observable: texture
//! names and level-0 contents, per-unit bindings and enables, framebuffer
//! attachments with clear / read-back, and the push/pop state stack.

use std::collections::{HashMap, HashSet};

use glam::Vec4;
use scenegl_core::{Color, FramebufferHandle, SamplerState, TextureHandle, TextureTarget};

use crate::device::{
    Capabilities, CubeFaceImage, DrawMode, GlDevice, ImageUpload, PixelData, PixelRect,
    PolygonMode, QuadDraw, UploadFormat, VertexArrays,
};

#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    GenTexture(TextureHandle),
    DeleteTexture(TextureHandle),
    BindTexture {
        unit: u32,
        target: TextureTarget,
        texture: TextureHandle,
    },
    UploadImage {
        target: TextureTarget,
        texture: TextureHandle,
        width: u32,
        height: u32,
        format: UploadFormat,
        level: i32,
        border: i32,
        build_mipmaps: bool,
    },
    UploadSubImage {
        target: TextureTarget,
        texture: TextureHandle,
        rect: PixelRect,
    },
    GenerateMipmaps {
        target: TextureTarget,
        texture: TextureHandle,
    },
    ApplySampler {
        unit: u32,
        target: TextureTarget,
        state: SamplerState,
        wrap_r: bool,
    },
    ActiveUnit(u32),
    UnitEnabled {
        unit: u32,
        target: TextureTarget,
        enabled: bool,
    },
    BindCubeMap {
        unit: u32,
        primary: TextureHandle,
        faces: [TextureHandle; 6],
    },
    GenFramebuffer(FramebufferHandle),
    DeleteFramebuffer(FramebufferHandle),
    BindFramebuffer(FramebufferHandle),
    AttachColor {
        framebuffer: FramebufferHandle,
        index: u32,
        texture: TextureHandle,
    },
    AttachDepth {
        framebuffer: FramebufferHandle,
        texture: TextureHandle,
    },
    DrawBuffer(u32),
    ReadBuffer(u32),
    ReadPixels {
        width: u32,
        height: u32,
    },
    Clear(Color),
    PushState,
    PopState,
    PolygonMode(PolygonMode),
    Blend(bool),
    LineSmooth(bool),
    DrawQuad(QuadDraw),
    DrawArrays {
        mode: DrawMode,
        count: usize,
        lit: bool,
    },
}

/// Level-0 contents of a simulated texture, RGBA floats, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct TexImage {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<Color>,
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    framebuffer: FramebufferHandle,
    draw_buffer: u32,
    read_buffer: u32,
    active_unit: u32,
    blend: bool,
}

#[derive(Debug)]
pub struct RecordingDevice {
    pub calls: Vec<GlCall>,
    caps: Capabilities,
    /// What `framebuffer_complete` reports.
    pub complete: bool,
    next_texture: u32,
    next_framebuffer: u32,
    live_textures: HashSet<TextureHandle>,
    live_framebuffers: HashSet<FramebufferHandle>,
    images: HashMap<TextureHandle, TexImage>,
    bindings: HashMap<(u32, TextureTarget), TextureHandle>,
    enabled: HashMap<(u32, TextureTarget), bool>,
    active_unit: u32,
    framebuffer: FramebufferHandle,
    attachments: HashMap<FramebufferHandle, HashMap<u32, TextureHandle>>,
    draw_buffer: u32,
    read_buffer: u32,
    blend: bool,
    stack: Vec<Snapshot>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::default())
    }

    pub fn with_capabilities(caps: Capabilities) -> Self {
        Self {
            calls: Vec::new(),
            caps,
            complete: true,
            next_texture: 1,
            next_framebuffer: 1,
            live_textures: HashSet::new(),
            live_framebuffers: HashSet::new(),
            images: HashMap::new(),
            bindings: HashMap::new(),
            enabled: HashMap::new(),
            active_unit: 0,
            framebuffer: FramebufferHandle::DEFAULT,
            attachments: HashMap::new(),
            draw_buffer: 0,
            read_buffer: 0,
            blend: false,
            stack: Vec::new(),
        }
    }

    /// A device without framebuffer support.
    pub fn without_render_to_texture() -> Self {
        Self::with_capabilities(Capabilities {
            render_to_texture: false,
            ..Capabilities::default()
        })
    }

    /// A device without per-unit texture activation.
    pub fn without_multitexture() -> Self {
        Self::with_capabilities(Capabilities {
            multitexture: false,
            ..Capabilities::default()
        })
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Index of the first call matching `pred`.
    pub fn position(&self, pred: impl Fn(&GlCall) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }

    pub fn is_live(&self, texture: TextureHandle) -> bool {
        self.live_textures.contains(&texture)
    }

    pub fn live_textures(&self) -> usize {
        self.live_textures.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.live_framebuffers.len()
    }

    pub fn image(&self, texture: TextureHandle) -> Option<&TexImage> {
        self.images.get(&texture)
    }

    /// Texel at `(x, y)` of a texture's level 0.
    pub fn texel(&self, texture: TextureHandle, x: u32, y: u32) -> Option<Color> {
        let image = self.images.get(&texture)?;
        if x >= image.width || y >= image.height {
            return None;
        }
        image
            .texels
            .get((y * image.width + x) as usize)
            .copied()
    }

    pub fn bound(&self, unit: u32, target: TextureTarget) -> TextureHandle {
        self.bindings
            .get(&(unit, target.bind_point()))
            .copied()
            .unwrap_or_default()
    }

    pub fn unit_enabled(&self, unit: u32, target: TextureTarget) -> bool {
        self.enabled
            .get(&(unit, target.bind_point()))
            .copied()
            .unwrap_or(false)
    }

    pub fn attachment(&self, framebuffer: FramebufferHandle, index: u32) -> TextureHandle {
        self.attachments
            .get(&framebuffer)
            .and_then(|a| a.get(&index))
            .copied()
            .unwrap_or_default()
    }

    pub fn state_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn blend(&self) -> bool {
        self.blend
    }

    fn current(&self, target: TextureTarget) -> TextureHandle {
        self.bound(self.active_unit, target)
    }

    fn attached(&self, index: u32) -> Option<TextureHandle> {
        if self.framebuffer.is_default() {
            return None;
        }
        let texture = self.attachment(self.framebuffer, index);
        texture.is_some().then_some(texture)
    }
}

fn decode_pixels(pixels: PixelData<'_>, format: UploadFormat, count: usize) -> Vec<Color> {
    let mut texels = match (pixels, format) {
        (PixelData::Bytes(bytes), UploadFormat::Rgb8) => bytes
            .chunks_exact(3)
            .map(|p| Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, 255.0) / 255.0)
            .collect(),
        (PixelData::Bytes(bytes), _) => bytes
            .chunks_exact(4)
            .map(|p| Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / 255.0)
            .collect(),
        (PixelData::Floats(floats), _) => floats
            .chunks_exact(4)
            .map(|p| Vec4::new(p[0], p[1], p[2], p[3]))
            .collect(),
        (PixelData::Empty, _) => Vec::new(),
    };
    texels.resize(count, Vec4::ZERO);
    texels
}

impl GlDevice for RecordingDevice {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn gen_texture(&mut self) -> TextureHandle {
        let texture = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.live_textures.insert(texture);
        self.calls.push(GlCall::GenTexture(texture));
        texture
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.live_textures.remove(&texture);
        self.images.remove(&texture);
        self.bindings.retain(|_, bound| *bound != texture);
        self.calls.push(GlCall::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, target: TextureTarget, texture: TextureHandle) {
        self.bindings
            .insert((self.active_unit, target.bind_point()), texture);
        self.calls.push(GlCall::BindTexture {
            unit: self.active_unit,
            target,
            texture,
        });
    }

    fn upload_image(&mut self, target: TextureTarget, image: &ImageUpload<'_>) {
        let texture = self.current(target);
        let level = if image.build_mipmaps { 0 } else { image.level };
        if level == 0 && texture.is_some() {
            let count = image.width as usize * image.height as usize;
            self.images.insert(
                texture,
                TexImage {
                    width: image.width,
                    height: image.height,
                    texels: decode_pixels(image.pixels, image.format, count),
                },
            );
        }
        self.calls.push(GlCall::UploadImage {
            target,
            texture,
            width: image.width,
            height: image.height,
            format: image.format,
            level: image.level,
            border: image.border,
            build_mipmaps: image.build_mipmaps,
        });
    }

    fn upload_sub_image(&mut self, target: TextureTarget, rect: PixelRect, pixels: PixelData<'_>) {
        let texture = self.current(target);
        let format = match pixels {
            PixelData::Floats(_) => UploadFormat::Rgba32F,
            _ => UploadFormat::Rgba8,
        };
        let count = rect.width as usize * rect.height as usize;
        let src = decode_pixels(pixels, format, count);
        if let Some(image) = self.images.get_mut(&texture) {
            for row in 0..rect.height {
                for col in 0..rect.width {
                    let (x, y) = (rect.x + col, rect.y + row);
                    if x < image.width && y < image.height {
                        image.texels[(y * image.width + x) as usize] =
                            src[(row * rect.width + col) as usize];
                    }
                }
            }
        }
        self.calls.push(GlCall::UploadSubImage {
            target,
            texture,
            rect,
        });
    }

    fn generate_mipmaps(&mut self, target: TextureTarget) {
        let texture = self.current(target);
        self.calls.push(GlCall::GenerateMipmaps { target, texture });
    }

    fn apply_sampler(&mut self, target: TextureTarget, state: &SamplerState, wrap_r: bool) {
        self.calls.push(GlCall::ApplySampler {
            unit: self.active_unit,
            target,
            state: *state,
            wrap_r,
        });
    }

    fn active_unit(&mut self, unit: u32) {
        self.active_unit = unit;
        self.calls.push(GlCall::ActiveUnit(unit));
    }

    fn set_unit_enabled(&mut self, target: TextureTarget, enabled: bool) {
        self.enabled
            .insert((self.active_unit, target.bind_point()), enabled);
        self.calls.push(GlCall::UnitEnabled {
            unit: self.active_unit,
            target,
            enabled,
        });
    }

    fn bind_cube_map(&mut self, primary: TextureHandle, faces: &[CubeFaceImage; 6]) {
        self.bindings
            .insert((self.active_unit, TextureTarget::CubeMap), primary);
        self.calls.push(GlCall::BindCubeMap {
            unit: self.active_unit,
            primary,
            faces: faces.map(|f| f.handle),
        });
    }

    fn gen_framebuffer(&mut self) -> FramebufferHandle {
        let framebuffer = FramebufferHandle(self.next_framebuffer);
        self.next_framebuffer += 1;
        self.live_framebuffers.insert(framebuffer);
        self.calls.push(GlCall::GenFramebuffer(framebuffer));
        framebuffer
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.live_framebuffers.remove(&framebuffer);
        self.attachments.remove(&framebuffer);
        if self.framebuffer == framebuffer {
            self.framebuffer = FramebufferHandle::DEFAULT;
        }
        self.calls.push(GlCall::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.framebuffer = framebuffer;
        self.calls.push(GlCall::BindFramebuffer(framebuffer));
    }

    fn framebuffer(&self) -> FramebufferHandle {
        self.framebuffer
    }

    fn attach_color(&mut self, index: u32, texture: TextureHandle) {
        self.attachments
            .entry(self.framebuffer)
            .or_default()
            .insert(index, texture);
        self.calls.push(GlCall::AttachColor {
            framebuffer: self.framebuffer,
            index,
            texture,
        });
    }

    fn attach_depth(&mut self, texture: TextureHandle) {
        self.calls.push(GlCall::AttachDepth {
            framebuffer: self.framebuffer,
            texture,
        });
    }

    fn framebuffer_complete(&mut self) -> bool {
        self.complete
    }

    fn draw_buffer(&mut self, index: u32) {
        self.draw_buffer = index;
        self.calls.push(GlCall::DrawBuffer(index));
    }

    fn read_buffer(&mut self, index: u32) {
        self.read_buffer = index;
        self.calls.push(GlCall::ReadBuffer(index));
    }

    fn read_pixels(&mut self, width: u32, height: u32, out: &mut [Color]) {
        self.calls.push(GlCall::ReadPixels { width, height });
        let Some(image) = self
            .attached(self.read_buffer)
            .and_then(|texture| self.images.get(&texture))
        else {
            return;
        };
        for y in 0..height.min(image.height) {
            for x in 0..width.min(image.width) {
                let dst = (y * width + x) as usize;
                if let Some(slot) = out.get_mut(dst) {
                    *slot = image.texels[(y * image.width + x) as usize];
                }
            }
        }
    }

    fn clear(&mut self, color: Color) {
        self.calls.push(GlCall::Clear(color));
        if let Some(texture) = self.attached(self.draw_buffer) {
            if let Some(image) = self.images.get_mut(&texture) {
                image.texels.fill(color);
            }
        }
    }

    fn push_state(&mut self) {
        self.stack.push(Snapshot {
            framebuffer: self.framebuffer,
            draw_buffer: self.draw_buffer,
            read_buffer: self.read_buffer,
            active_unit: self.active_unit,
            blend: self.blend,
        });
        self.calls.push(GlCall::PushState);
    }

    fn pop_state(&mut self) {
        if let Some(s) = self.stack.pop() {
            self.framebuffer = s.framebuffer;
            self.draw_buffer = s.draw_buffer;
            self.read_buffer = s.read_buffer;
            self.active_unit = s.active_unit;
            self.blend = s.blend;
        }
        self.calls.push(GlCall::PopState);
    }

    fn polygon_mode(&mut self, mode: PolygonMode) {
        self.calls.push(GlCall::PolygonMode(mode));
    }

    fn set_blend(&mut self, enabled: bool) {
        self.blend = enabled;
        self.calls.push(GlCall::Blend(enabled));
    }

    fn set_line_smooth(&mut self, enabled: bool) {
        self.calls.push(GlCall::LineSmooth(enabled));
    }

    fn draw_quad(&mut self, quad: &QuadDraw) {
        self.calls.push(GlCall::DrawQuad(*quad));
    }

    fn draw_arrays(&mut self, mode: DrawMode, arrays: &VertexArrays<'_>) {
        self.calls.push(GlCall::DrawArrays {
            mode,
            count: arrays.positions.len(),
            lit: arrays.lit,
        });
    }
}
