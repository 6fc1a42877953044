//! [`RawGlDevice`]: the [`GlDevice`] seam over a current OpenGL 3.2+ core
//! context, using raw `gl` calls.
//!
//! A core context has no fixed-function texturing, so the pieces of it the
//! resource layer relies on are kept here instead:
//!
//! - Per-unit enable flags and texture environment (mode + colour) are
//!   tracked on the device and fed to the presentation program at draw time.
//!   Unit 0 may hold a 2D texture or a cube map; enabled 2D textures on
//!   higher units are combined over it in unit order. The last unit is kept
//!   free for the idle unit-0 sampler, so a context needs at least two.
//! - Attribute push/pop is a stack of [`SavedGlState`] snapshots.
//! - Cube-map faces that live in separate texture objects are composed into
//!   the primary object when the cube map is bound.

use std::collections::HashMap;

use gl::types::{GLenum, GLint, GLsizei, GLuint};
use glam::{Mat4, Vec3, Vec4};
use scenegl_core::{
    Color, CubeFace, EnvMode, FramebufferHandle, Filter, PixelFormat, SamplerState,
    TextureDescriptor, TextureHandle, TextureTarget, Wrap,
};
use tracing::{debug, error, trace, warn};

use crate::device::{
    Capabilities, CubeFaceImage, DrawMode, GlDevice, ImageUpload, PixelData, PixelRect,
    PolygonMode, QuadDraw, UploadFormat, VertexArrays,
};
use crate::loader::{is_context_current, load_gl};
use crate::program::{
    DrawUniforms, PresentProgram, SamplerLayout, TextureMode, VertexBatch, MAX_STAGES,
};
use crate::saved_state::SavedGlState;

/// Fixed-function texture state of one unit.
#[derive(Debug, Clone, Copy, PartialEq)]
struct UnitState {
    enabled_2d: bool,
    enabled_cube: bool,
    env_mode: EnvMode,
    env_color: Color,
}

impl Default for UnitState {
    fn default() -> Self {
        Self {
            enabled_2d: false,
            enabled_cube: false,
            env_mode: EnvMode::Modulate,
            env_color: Color::ZERO,
        }
    }
}

struct SavedFrame {
    gl: SavedGlState,
    units: Vec<UnitState>,
    active_unit: u32,
    polygon_mode: PolygonMode,
}

/// OpenGL implementation of [`GlDevice`].
///
/// Must be created and used on the thread that owns the context.
pub struct RawGlDevice {
    caps: Capabilities,
    units: Vec<UnitState>,
    /// `None` when the context is too small to run the presentation program.
    layout: Option<SamplerLayout>,
    active_unit: u32,
    saved: Vec<SavedFrame>,
    program: Option<PresentProgram>,
    program_failed: bool,
    /// Face sets last composed into each primary cube texture.
    composed: HashMap<TextureHandle, [TextureHandle; 6]>,
    transform: Mat4,
    polygon_mode: PolygonMode,
}

impl RawGlDevice {
    /// Load GL entry points and query what the current context supports.
    pub fn new() -> Self {
        load_gl();
        if !is_context_current() {
            warn!("RawGlDevice created without a current GL context");
        }

        // SAFETY: entry points are loaded; queries only read context state.
        let caps = unsafe { detect_capabilities() };
        debug!(?caps, "GL device ready");
        if !caps.render_to_texture {
            warn!("framebuffer objects unavailable, render targets will be static textures");
        }
        let layout = SamplerLayout::for_units(caps.max_texture_units as usize);
        if layout.is_none() {
            warn!(
                units = caps.max_texture_units,
                "context has a single texture unit, nothing will be drawn"
            );
        }

        Self {
            caps,
            units: vec![UnitState::default(); caps.max_texture_units.max(1) as usize],
            layout,
            active_unit: 0,
            saved: Vec::new(),
            program: None,
            program_failed: false,
            composed: HashMap::new(),
            transform: Mat4::IDENTITY,
            polygon_mode: PolygonMode::Fill,
        }
    }

    /// Model-view-projection matrix applied by `draw_quad` and `draw_arrays`.
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    fn unit_mut(&mut self) -> &mut UnitState {
        &mut self.units[self.active_unit as usize]
    }

    fn ensure_program(&mut self) -> Option<&PresentProgram> {
        if self.program.is_none() && !self.program_failed {
            // SAFETY: the device is only used with its context current.
            match unsafe { PresentProgram::new() } {
                Ok(program) => {
                    debug!("presentation program built");
                    self.program = Some(program);
                }
                Err(e) => {
                    error!("{e:#}");
                    self.program_failed = true;
                }
            }
        }
        self.program.as_ref()
    }

    fn uniforms(
        &self,
        textured: bool,
        color: Color,
        vertex_color: bool,
        lit: bool,
    ) -> Option<DrawUniforms> {
        let layout = self.layout?;
        let stages = texture_stages(&self.units, layout.stages, textured);
        Some(DrawUniforms {
            mvp: self.transform,
            texture_mode: stages.mode,
            env_modes: stages.env_modes,
            env_colors: stages.env_colors,
            color,
            vertex_color,
            lit,
            layout,
        })
    }

    fn draw_batch(&mut self, mode: GLenum, batch: &VertexBatch, uniforms: Option<DrawUniforms>) {
        let Some(uniforms) = uniforms else {
            return;
        };
        let Some(program) = self.ensure_program() else {
            return;
        };
        // SAFETY: the program was built in this context.
        unsafe { program.draw(mode, batch, &uniforms) };
    }

    /// Copy each face texture into the matching face of `primary` through
    /// client memory. Both objects are cube-map textures, so a face is read
    /// back from its own cube target and re-specified on the primary.
    unsafe fn compose_cube(&mut self, primary: TextureHandle, faces: &[CubeFaceImage; 6]) {
        let handles = faces.map(|f| f.handle);
        if self.composed.get(&primary) == Some(&handles) {
            return;
        }

        let plan = plan_cube_copies(primary, faces);
        gl::PixelStorei(gl::PACK_ALIGNMENT, 1);
        gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
        for copy in &plan.copies {
            let desc = copy.descriptor;
            let face_target = face_target(copy.face);
            let (internal, format) = match desc.format {
                PixelFormat::Rgb => (gl::RGB8, gl::RGB),
                PixelFormat::Rgba => (gl::RGBA8, gl::RGBA),
            };
            let mut texels =
                vec![0u8; desc.width as usize * desc.height as usize * desc.format.channels()];
            gl::BindTexture(gl::TEXTURE_CUBE_MAP, copy.source.raw());
            gl::GetTexImage(face_target, 0, format, gl::UNSIGNED_BYTE, texels.as_mut_ptr().cast());
            gl::BindTexture(gl::TEXTURE_CUBE_MAP, primary.raw());
            gl::TexImage2D(
                face_target,
                0,
                internal as GLint,
                desc.width as GLsizei,
                desc.height as GLsizei,
                0,
                format,
                gl::UNSIGNED_BYTE,
                texels.as_ptr().cast(),
            );
        }

        gl::BindTexture(gl::TEXTURE_CUBE_MAP, primary.raw());
        if plan.complete {
            gl::GenerateMipmap(gl::TEXTURE_CUBE_MAP);
            trace!(%primary, copied = plan.copies.len(), "cube map composed");
        } else {
            trace!(%primary, copied = plan.copies.len(), "cube map composed from an incomplete face set");
        }
        self.composed.insert(primary, handles);
    }
}

// ---------------------------------------------------------------------------
// Cube composition and texture stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
struct FaceCopy {
    face: CubeFace,
    source: TextureHandle,
    descriptor: TextureDescriptor,
}

#[derive(Debug, Clone, PartialEq)]
struct CubeCopyPlan {
    copies: Vec<FaceCopy>,
    /// Every face is loaded and all share one size, so mipmaps can be built.
    complete: bool,
}

/// Faces to copy into `primary`. Unloaded faces make the set incomplete;
/// the primary's own face is already in place.
fn plan_cube_copies(primary: TextureHandle, faces: &[CubeFaceImage; 6]) -> CubeCopyPlan {
    let mut copies = Vec::new();
    let mut complete = true;
    let mut size = None;
    for (face, image) in CubeFace::ALL.into_iter().zip(faces) {
        let Some(descriptor) = image.descriptor else {
            complete = false;
            continue;
        };
        let dims = (descriptor.width, descriptor.height);
        if size.is_some_and(|s| s != dims) {
            complete = false;
        }
        size = Some(dims);
        if image.handle.is_none() || image.handle == primary {
            continue;
        }
        copies.push(FaceCopy {
            face,
            source: image.handle,
            descriptor,
        });
    }
    CubeCopyPlan { copies, complete }
}

struct TextureStages {
    mode: TextureMode,
    env_modes: [i32; MAX_STAGES],
    env_colors: [Vec4; MAX_STAGES],
}

/// Fold the emulated per-unit state into the program's stage inputs. Unit 0
/// may sample a cube map; higher units only contribute enabled 2D textures.
/// Untextured draws disable every stage.
fn texture_stages(units: &[UnitState], stage_count: usize, textured: bool) -> TextureStages {
    let mut stages = TextureStages {
        mode: TextureMode::None,
        env_modes: [-1; MAX_STAGES],
        env_colors: [Vec4::ZERO; MAX_STAGES],
    };
    if !textured {
        return stages;
    }
    for (index, unit) in units.iter().take(stage_count.min(MAX_STAGES)).enumerate() {
        stages.env_colors[index] = unit.env_color;
        if index == 0 {
            stages.mode = match (unit.enabled_cube, unit.enabled_2d) {
                (true, _) => TextureMode::CubeMap,
                (false, true) => TextureMode::Texture2d,
                (false, false) => TextureMode::None,
            };
            stages.env_modes[0] = unit.env_mode.code();
        } else if unit.enabled_2d {
            stages.env_modes[index] = unit.env_mode.code();
        }
    }
    stages
}

impl Default for RawGlDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RawGlDevice {
    fn drop(&mut self) {
        if let Some(mut program) = self.program.take() {
            if is_context_current() {
                // SAFETY: built in this context, which is still current.
                unsafe { program.delete() };
            }
        }
        if !self.saved.is_empty() {
            warn!(depth = self.saved.len(), "GL device dropped with unpopped state");
        }
    }
}

// ---------------------------------------------------------------------------
// Enum mapping
// ---------------------------------------------------------------------------

fn bind_target(target: TextureTarget) -> GLenum {
    match target.bind_point() {
        TextureTarget::Texture2d => gl::TEXTURE_2D,
        _ => gl::TEXTURE_CUBE_MAP,
    }
}

/// Image targets written by an upload to `target`.
fn image_targets(target: TextureTarget) -> Vec<GLenum> {
    match target {
        TextureTarget::Texture2d => vec![gl::TEXTURE_2D],
        TextureTarget::CubeFace(face) => vec![face_target(face)],
        TextureTarget::CubeMap => CubeFace::ALL.iter().map(|f| face_target(*f)).collect(),
    }
}

fn face_target(face: CubeFace) -> GLenum {
    gl::TEXTURE_CUBE_MAP_POSITIVE_X + face.index() as GLenum
}

/// (internal format, pixel format, component type)
fn upload_formats(format: UploadFormat) -> (GLenum, GLenum, GLenum) {
    match format {
        UploadFormat::Rgb8 => (gl::RGB8, gl::RGB, gl::UNSIGNED_BYTE),
        UploadFormat::Rgba8 => (gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE),
        UploadFormat::Rgba32F => (gl::RGBA32F, gl::RGBA, gl::FLOAT),
        UploadFormat::Depth24 => (gl::DEPTH_COMPONENT24, gl::DEPTH_COMPONENT, gl::FLOAT),
    }
}

fn filter(filter: Filter) -> GLenum {
    match filter {
        Filter::Nearest => gl::NEAREST,
        Filter::Linear => gl::LINEAR,
        Filter::NearestMipmapNearest => gl::NEAREST_MIPMAP_NEAREST,
        Filter::LinearMipmapNearest => gl::LINEAR_MIPMAP_NEAREST,
        Filter::NearestMipmapLinear => gl::NEAREST_MIPMAP_LINEAR,
        Filter::LinearMipmapLinear => gl::LINEAR_MIPMAP_LINEAR,
    }
}

fn wrap(wrap: Wrap) -> GLenum {
    match wrap {
        // Legacy clamp has no core equivalent.
        Wrap::Clamp | Wrap::ClampToEdge => gl::CLAMP_TO_EDGE,
        Wrap::ClampToBorder => gl::CLAMP_TO_BORDER,
        Wrap::Repeat => gl::REPEAT,
        Wrap::MirroredRepeat => gl::MIRRORED_REPEAT,
    }
}

fn draw_mode(mode: DrawMode) -> GLenum {
    match mode {
        DrawMode::Points => gl::POINTS,
        DrawMode::Lines => gl::LINES,
        DrawMode::LineLoop => gl::LINE_LOOP,
        DrawMode::Triangles | DrawMode::Quads => gl::TRIANGLES,
        DrawMode::TriangleStrip => gl::TRIANGLE_STRIP,
        DrawMode::TriangleFan => gl::TRIANGLE_FAN,
    }
}

unsafe fn detect_capabilities() -> Capabilities {
    let render_to_texture = gl::GenFramebuffers::is_loaded()
        && gl::FramebufferTexture2D::is_loaded()
        && gl::GenerateMipmap::is_loaded();
    let multitexture = gl::ActiveTexture::is_loaded();

    let mut units: GLint = 1;
    let mut attachments: GLint = 1;
    if gl::GetIntegerv::is_loaded() {
        gl::GetIntegerv(gl::MAX_TEXTURE_IMAGE_UNITS, &mut units);
        if render_to_texture {
            gl::GetIntegerv(gl::MAX_COLOR_ATTACHMENTS, &mut attachments);
        }
    }

    Capabilities {
        render_to_texture,
        multitexture,
        max_texture_units: units.max(1) as u32,
        max_color_attachments: attachments.max(1) as u32,
    }
}

/// Expand independent quads (four vertices each) to triangle pairs.
fn quads_to_triangles<T: Copy>(items: &[T]) -> Vec<T> {
    items
        .chunks_exact(4)
        .flat_map(|q| [q[0], q[1], q[2], q[0], q[2], q[3]])
        .collect()
}

// ---------------------------------------------------------------------------
// GlDevice
// ---------------------------------------------------------------------------

impl GlDevice for RawGlDevice {
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
        let mut id: GLuint = 0;
        unsafe { gl::GenTextures(1, &mut id) };
        TextureHandle(id)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if texture.is_none() {
            return;
        }
        self.composed.remove(&texture);
        unsafe { gl::DeleteTextures(1, &texture.raw()) };
    }

    fn bind_texture(&mut self, target: TextureTarget, texture: TextureHandle) {
        unsafe { gl::BindTexture(bind_target(target), texture.raw()) };
    }

    fn upload_image(&mut self, target: TextureTarget, image: &ImageUpload<'_>) {
        let (internal, format, ty) = upload_formats(image.format);
        let (level, border) = if image.build_mipmaps {
            (0, 0)
        } else {
            (image.level, image.border)
        };

        unsafe {
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
            for image_target in image_targets(target) {
                gl::TexImage2D(
                    image_target,
                    level,
                    internal as GLint,
                    image.width as GLsizei,
                    image.height as GLsizei,
                    border,
                    format,
                    ty,
                    image.pixels.as_ptr(),
                );
            }
            // A lone face is not cube complete; its chain is built once the
            // faces are composed.
            if image.build_mipmaps && !matches!(target, TextureTarget::CubeFace(_)) {
                gl::GenerateMipmap(bind_target(target));
            }
        }
    }

    fn upload_sub_image(&mut self, target: TextureTarget, rect: PixelRect, pixels: PixelData<'_>) {
        let ty = match pixels {
            PixelData::Empty => return,
            PixelData::Bytes(_) => gl::UNSIGNED_BYTE,
            PixelData::Floats(_) => gl::FLOAT,
        };
        unsafe {
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
            for image_target in image_targets(target) {
                gl::TexSubImage2D(
                    image_target,
                    0,
                    rect.x as GLint,
                    rect.y as GLint,
                    rect.width as GLsizei,
                    rect.height as GLsizei,
                    gl::RGBA,
                    ty,
                    pixels.as_ptr(),
                );
            }
        }
    }

    fn generate_mipmaps(&mut self, target: TextureTarget) {
        unsafe { gl::GenerateMipmap(bind_target(target)) };
    }

    fn apply_sampler(&mut self, target: TextureTarget, state: &SamplerState, wrap_r: bool) {
        let t = bind_target(target);
        unsafe {
            gl::TexParameteri(t, gl::TEXTURE_MIN_FILTER, filter(state.min_filter) as GLint);
            gl::TexParameteri(t, gl::TEXTURE_MAG_FILTER, filter(state.mag_filter.as_mag()) as GLint);
            gl::TexParameteri(t, gl::TEXTURE_WRAP_S, wrap(state.wrap_s) as GLint);
            gl::TexParameteri(t, gl::TEXTURE_WRAP_T, wrap(state.wrap_t) as GLint);
            if wrap_r {
                gl::TexParameteri(t, gl::TEXTURE_WRAP_R, wrap(state.wrap_r) as GLint);
            }
            gl::TexParameterfv(t, gl::TEXTURE_BORDER_COLOR, state.border_color.to_array().as_ptr());
            gl::TexParameterf(t, gl::TEXTURE_MIN_LOD, state.min_lod);
            gl::TexParameterf(t, gl::TEXTURE_MAX_LOD, state.max_lod);
        }
        // Residency priority is not part of the core profile.
        let unit = self.unit_mut();
        unit.env_mode = state.env_mode;
        unit.env_color = state.env_color;
    }

    fn active_unit(&mut self, unit: u32) {
        if unit as usize >= self.units.len() {
            warn!(unit, available = self.units.len(), "texture unit out of range");
            return;
        }
        if self.caps.multitexture {
            unsafe { gl::ActiveTexture(gl::TEXTURE0 + unit) };
        }
        self.active_unit = unit;
    }

    fn set_unit_enabled(&mut self, target: TextureTarget, enabled: bool) {
        let unit = self.unit_mut();
        match target.bind_point() {
            TextureTarget::Texture2d => unit.enabled_2d = enabled,
            _ => unit.enabled_cube = enabled,
        }
    }

    fn bind_cube_map(&mut self, primary: TextureHandle, faces: &[CubeFaceImage; 6]) {
        if primary.is_none() {
            return;
        }
        unsafe {
            // Composition rebinds textures; keep the caller's active unit.
            self.compose_cube(primary, faces);
            gl::BindTexture(gl::TEXTURE_CUBE_MAP, primary.raw());
        }
        trace!(unit = self.active_unit, %primary, "bound cube map");
    }

    fn gen_framebuffer(&mut self) -> FramebufferHandle {
        if !self.caps.render_to_texture {
            return FramebufferHandle::DEFAULT;
        }
        let mut id: GLuint = 0;
        unsafe { gl::GenFramebuffers(1, &mut id) };
        FramebufferHandle(id)
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if framebuffer.is_default() {
            return;
        }
        unsafe { gl::DeleteFramebuffers(1, &framebuffer.raw()) };
    }

    fn bind_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        unsafe { gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer.raw()) };
    }

    fn framebuffer(&self) -> FramebufferHandle {
        let mut id: GLint = 0;
        unsafe { gl::GetIntegerv(gl::DRAW_FRAMEBUFFER_BINDING, &mut id) };
        FramebufferHandle(id as GLuint)
    }

    fn attach_color(&mut self, index: u32, texture: TextureHandle) {
        unsafe {
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                gl::COLOR_ATTACHMENT0 + index,
                gl::TEXTURE_2D,
                texture.raw(),
                0,
            );
        }
    }

    fn attach_depth(&mut self, texture: TextureHandle) {
        unsafe {
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                gl::DEPTH_ATTACHMENT,
                gl::TEXTURE_2D,
                texture.raw(),
                0,
            );
        }
    }

    fn framebuffer_complete(&mut self) -> bool {
        let status = unsafe { gl::CheckFramebufferStatus(gl::FRAMEBUFFER) };
        if status != gl::FRAMEBUFFER_COMPLETE {
            debug!(status, "framebuffer incomplete");
        }
        status == gl::FRAMEBUFFER_COMPLETE
    }

    fn draw_buffer(&mut self, index: u32) {
        unsafe { gl::DrawBuffer(gl::COLOR_ATTACHMENT0 + index) };
    }

    fn read_buffer(&mut self, index: u32) {
        unsafe { gl::ReadBuffer(gl::COLOR_ATTACHMENT0 + index) };
    }

    fn read_pixels(&mut self, width: u32, height: u32, out: &mut [Color]) {
        let needed = width as usize * height as usize;
        if out.len() < needed {
            warn!(needed, have = out.len(), "read_pixels buffer too small");
            return;
        }
        unsafe {
            gl::PixelStorei(gl::PACK_ALIGNMENT, 4);
            gl::ReadPixels(
                0,
                0,
                width as GLsizei,
                height as GLsizei,
                gl::RGBA,
                gl::FLOAT,
                out.as_mut_ptr().cast(),
            );
        }
    }

    fn clear(&mut self, color: Color) {
        unsafe {
            gl::ClearColor(color.x, color.y, color.z, color.w);
            gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);
        }
    }

    fn push_state(&mut self) {
        // SAFETY: context is current while the device is in use.
        let snapshot = unsafe { SavedGlState::save() };
        self.saved.push(SavedFrame {
            gl: snapshot,
            units: self.units.clone(),
            active_unit: self.active_unit,
            polygon_mode: self.polygon_mode,
        });
    }

    fn pop_state(&mut self) {
        let Some(frame) = self.saved.pop() else {
            warn!("pop_state without matching push_state");
            return;
        };
        // SAFETY: objects referenced by the snapshot outlive the pass.
        unsafe { frame.gl.restore() };
        self.units = frame.units;
        self.active_unit = frame.active_unit;
        self.polygon_mode(frame.polygon_mode);
    }

    fn polygon_mode(&mut self, mode: PolygonMode) {
        let gl_mode = match mode {
            PolygonMode::Fill => gl::FILL,
            PolygonMode::Line => gl::LINE,
            PolygonMode::Point => gl::POINT,
        };
        unsafe { gl::PolygonMode(gl::FRONT_AND_BACK, gl_mode) };
        self.polygon_mode = mode;
    }

    fn set_blend(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(gl::BLEND);
                gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
            } else {
                gl::Disable(gl::BLEND);
            }
        }
    }

    fn set_line_smooth(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(gl::LINE_SMOOTH);
            } else {
                gl::Disable(gl::LINE_SMOOTH);
            }
        }
    }

    fn draw_quad(&mut self, quad: &QuadDraw) {
        let [a, b, c, d] = quad.corners;
        let normal = (b - a).cross(d - a).normalize_or_zero();
        let (s, t) = (quad.tex_extent.x, quad.tex_extent.y);
        let uv = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(s, 0.0, 0.0),
            Vec3::new(s, t, 0.0),
            Vec3::new(0.0, t, 0.0),
        ];

        let batch = VertexBatch {
            positions: quads_to_triangles(&[a, b, c, d]),
            normals: vec![normal; 6],
            colors: vec![quad.color.truncate(); 6],
            texcoords: quads_to_triangles(&uv),
        };
        let uniforms = self.uniforms(quad.textured, quad.color, false, false);
        self.draw_batch(gl::TRIANGLES, &batch, uniforms);
    }

    fn draw_arrays(&mut self, mode: DrawMode, arrays: &VertexArrays<'_>) {
        let n = arrays.positions.len();
        let stream = |src: Option<&[Vec3]>, fill: Vec3| match src {
            Some(v) if v.len() >= n => v[..n].to_vec(),
            _ => vec![fill; n],
        };

        let mut batch = VertexBatch {
            positions: arrays.positions.to_vec(),
            normals: stream(arrays.normals, Vec3::Z),
            colors: stream(arrays.colors, arrays.color.truncate()),
            texcoords: stream(arrays.texcoords, Vec3::ZERO),
        };
        if mode == DrawMode::Quads {
            batch.positions = quads_to_triangles(&batch.positions);
            batch.normals = quads_to_triangles(&batch.normals);
            batch.colors = quads_to_triangles(&batch.colors);
            batch.texcoords = quads_to_triangles(&batch.texcoords);
        }

        let uniforms = self.uniforms(
            arrays.texcoords.is_some(),
            arrays.color,
            arrays.colors.is_some(),
            arrays.lit,
        );
        self.draw_batch(draw_mode(mode), &batch, uniforms);
    }
}
