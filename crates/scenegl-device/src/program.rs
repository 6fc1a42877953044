//! The single shader program used to present quads and vertex arrays in a
//! core-profile context.
//!
//! Texture environment modes are evaluated in the fragment stage, so the
//! classic modulate/decal/blend/replace/add combinations still work without
//! fixed-function texturing. Unit 0 may hold a 2D texture or a cube map;
//! units 1-7 combine on top of it as 2D layers, in unit order.

use std::ffi::{CStr, CString};

use anyhow::{bail, Result};
use gl::types::{GLchar, GLenum, GLint, GLsizei, GLsizeiptr, GLuint};
use glam::{Mat4, Vec3, Vec4};

const VERTEX_SOURCE: &str = r#"#version 150
in vec3 a_position;
in vec3 a_normal;
in vec3 a_color;
in vec3 a_texcoord;

uniform mat4 u_mvp;

out vec3 v_normal;
out vec3 v_color;
out vec2 v_texcoord;

void main() {
    v_normal = a_normal;
    v_color = a_color;
    v_texcoord = a_texcoord.xy;
    gl_Position = u_mvp * vec4(a_position, 1.0);
}
"#;

const FRAGMENT_PRELUDE: &str = r#"#version 150
in vec3 v_normal;
in vec3 v_color;
in vec2 v_texcoord;

uniform sampler2D u_tex2d;
uniform samplerCube u_cube;
uniform int u_texture_mode;
uniform int u_env_mode[8];
uniform vec4 u_env_color[8];
uniform vec4 u_color;
uniform bool u_vertex_color;
uniform bool u_lit;

out vec4 frag_color;

vec4 combine(vec4 base, vec4 texel, int mode, vec4 env_color) {
    if (mode == 1) {
        return vec4(mix(base.rgb, texel.rgb, texel.a), base.a);
    } else if (mode == 2) {
        return vec4(mix(base.rgb, env_color.rgb, texel.rgb), base.a * texel.a);
    } else if (mode == 3) {
        return texel;
    } else if (mode == 4) {
        return vec4(base.rgb + texel.rgb, base.a * texel.a);
    }
    return base * texel;
}
"#;

/// Texture stages the fragment stage combines, unit 0 included.
pub(crate) const MAX_STAGES: usize = 8;

/// Fragment source: unit 0 samples a 2D or cube texture, units
/// `1..MAX_STAGES` each add a 2D layer whose env mode is `>= 0`.
pub(crate) fn fragment_source() -> String {
    let mut source = String::from(FRAGMENT_PRELUDE);
    for stage in 1..MAX_STAGES {
        source.push_str(&format!("uniform sampler2D u_layer{stage};\n"));
    }
    source.push_str(
        r#"
void main() {
    vec4 color = u_vertex_color ? vec4(v_color, u_color.a) : u_color;
    if (u_lit) {
        float diffuse = max(dot(normalize(v_normal), vec3(0.0, 0.0, 1.0)), 0.0);
        color.rgb *= 0.2 + 0.8 * diffuse;
    }
    if (u_texture_mode == 1) {
        color = combine(color, texture(u_tex2d, v_texcoord), u_env_mode[0], u_env_color[0]);
    } else if (u_texture_mode == 2) {
        color = combine(color, texture(u_cube, normalize(v_normal)), u_env_mode[0], u_env_color[0]);
    }
"#,
    );
    for stage in 1..MAX_STAGES {
        source.push_str(&format!(
            "    if (u_env_mode[{stage}] >= 0) {{\n        color = combine(color, texture(u_layer{stage}, v_texcoord), u_env_mode[{stage}], u_env_color[{stage}]);\n    }}\n"
        ));
    }
    source.push_str("    frag_color = color;\n}\n");
    source
}

const ATTRIBUTES: [&CStr; 4] = [c"a_position", c"a_normal", c"a_color", c"a_texcoord"];

/// Which sampler the fragment stage reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextureMode {
    None = 0,
    Texture2d = 1,
    CubeMap = 2,
}

/// Per-draw uniform values.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DrawUniforms {
    pub mvp: Mat4,
    pub texture_mode: TextureMode,
    /// Env mode code per stage; `-1` skips the stage. Stage 0 is governed by
    /// `texture_mode` instead.
    pub env_modes: [i32; MAX_STAGES],
    pub env_colors: [Vec4; MAX_STAGES],
    pub color: Vec4,
    pub vertex_color: bool,
    pub lit: bool,
    pub layout: SamplerLayout,
}

/// Which texture units the program's samplers read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SamplerLayout {
    /// Stages backed by a real unit: units `0..stages`.
    pub stages: usize,
    /// A unit no stage uses, for whichever unit-0 sampler is idle. Two
    /// sampler types may not share a unit within one draw.
    pub spare: i32,
}

impl SamplerLayout {
    /// `None` when the context has a single unit, which leaves nowhere to
    /// park the idle sampler.
    pub(crate) fn for_units(unit_count: usize) -> Option<Self> {
        if unit_count < 2 {
            return None;
        }
        let spare = unit_count - 1;
        Some(Self {
            stages: spare.min(MAX_STAGES),
            spare: spare as i32,
        })
    }
}

/// Expanded, equal-length vertex streams ready for upload.
#[derive(Debug, Default)]
pub(crate) struct VertexBatch {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Vec3>,
    pub texcoords: Vec<Vec3>,
}

impl VertexBatch {
    pub(crate) fn len(&self) -> usize {
        self.positions.len()
    }
}

struct Locations {
    mvp: GLint,
    tex2d: GLint,
    cube: GLint,
    layers: [GLint; MAX_STAGES - 1],
    texture_mode: GLint,
    env_mode: GLint,
    env_color: GLint,
    color: GLint,
    vertex_color: GLint,
    lit: GLint,
}

pub(crate) struct PresentProgram {
    program: GLuint,
    vao: GLuint,
    vbos: [GLuint; 4],
    locations: Locations,
}

impl PresentProgram {
    /// # Safety
    ///
    /// A GL 3.2+ context must be current.
    pub(crate) unsafe fn new() -> Result<Self> {
        let vs = compile(gl::VERTEX_SHADER, VERTEX_SOURCE)?;
        let fs = match compile(gl::FRAGMENT_SHADER, &fragment_source()) {
            Ok(fs) => fs,
            Err(e) => {
                gl::DeleteShader(vs);
                return Err(e);
            }
        };

        let program = gl::CreateProgram();
        gl::AttachShader(program, vs);
        gl::AttachShader(program, fs);
        for (index, name) in ATTRIBUTES.iter().enumerate() {
            gl::BindAttribLocation(program, index as GLuint, name.as_ptr());
        }
        gl::BindFragDataLocation(program, 0, c"frag_color".as_ptr());
        gl::LinkProgram(program);
        gl::DetachShader(program, vs);
        gl::DetachShader(program, fs);
        gl::DeleteShader(vs);
        gl::DeleteShader(fs);

        let mut linked = 0;
        gl::GetProgramiv(program, gl::LINK_STATUS, &mut linked);
        if linked == 0 {
            let log = program_log(program);
            gl::DeleteProgram(program);
            bail!("presentation program failed to link: {log}");
        }

        let uniform = |name: &CStr| gl::GetUniformLocation(program, name.as_ptr());
        let mut layers = [-1; MAX_STAGES - 1];
        for (i, location) in layers.iter_mut().enumerate() {
            let name = CString::new(format!("u_layer{}", i + 1))?;
            *location = uniform(&name);
        }
        let locations = Locations {
            mvp: uniform(c"u_mvp"),
            tex2d: uniform(c"u_tex2d"),
            cube: uniform(c"u_cube"),
            layers,
            texture_mode: uniform(c"u_texture_mode"),
            env_mode: uniform(c"u_env_mode"),
            env_color: uniform(c"u_env_color"),
            color: uniform(c"u_color"),
            vertex_color: uniform(c"u_vertex_color"),
            lit: uniform(c"u_lit"),
        };

        let mut vao = 0;
        gl::GenVertexArrays(1, &mut vao);
        let mut vbos = [0; 4];
        gl::GenBuffers(4, vbos.as_mut_ptr());

        Ok(Self {
            program,
            vao,
            vbos,
            locations,
        })
    }

    /// Draw `batch` with `mode`. The caller's program and vertex array are
    /// left bound afterwards.
    ///
    /// # Safety
    ///
    /// The context this program was built in must be current.
    pub(crate) unsafe fn draw(&self, mode: GLenum, batch: &VertexBatch, uniforms: &DrawUniforms) {
        if batch.len() == 0 {
            return;
        }

        let mut prev_program = 0;
        let mut prev_vao = 0;
        let mut prev_buffer = 0;
        gl::GetIntegerv(gl::CURRENT_PROGRAM, &mut prev_program);
        gl::GetIntegerv(gl::VERTEX_ARRAY_BINDING, &mut prev_vao);
        gl::GetIntegerv(gl::ARRAY_BUFFER_BINDING, &mut prev_buffer);

        gl::UseProgram(self.program);
        gl::BindVertexArray(self.vao);

        let streams = [
            &batch.positions,
            &batch.normals,
            &batch.colors,
            &batch.texcoords,
        ];
        for (slot, stream) in streams.iter().enumerate() {
            let floats: &[f32] = bytemuck::cast_slice(stream.as_slice());
            gl::BindBuffer(gl::ARRAY_BUFFER, self.vbos[slot]);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                std::mem::size_of_val(floats) as GLsizeiptr,
                floats.as_ptr().cast(),
                gl::STREAM_DRAW,
            );
            gl::VertexAttribPointer(slot as GLuint, 3, gl::FLOAT, gl::FALSE, 0, std::ptr::null());
            gl::EnableVertexAttribArray(slot as GLuint);
        }

        let l = &self.locations;
        gl::UniformMatrix4fv(l.mvp, 1, gl::FALSE, uniforms.mvp.to_cols_array().as_ptr());
        let units = sampler_units(uniforms.texture_mode, uniforms.layout);
        gl::Uniform1i(l.tex2d, units.tex2d);
        gl::Uniform1i(l.cube, units.cube);
        for (location, unit) in l.layers.iter().zip(units.layers) {
            gl::Uniform1i(*location, unit);
        }
        gl::Uniform1i(l.texture_mode, uniforms.texture_mode as GLint);
        gl::Uniform1iv(l.env_mode, MAX_STAGES as GLsizei, uniforms.env_modes.as_ptr());
        let env_colors: &[f32] = bytemuck::cast_slice(&uniforms.env_colors);
        gl::Uniform4fv(l.env_color, MAX_STAGES as GLsizei, env_colors.as_ptr());
        gl::Uniform4fv(l.color, 1, uniforms.color.to_array().as_ptr());
        gl::Uniform1i(l.vertex_color, uniforms.vertex_color as GLint);
        gl::Uniform1i(l.lit, uniforms.lit as GLint);

        gl::DrawArrays(mode, 0, batch.len() as GLint);

        gl::BindBuffer(gl::ARRAY_BUFFER, prev_buffer as GLuint);
        gl::BindVertexArray(prev_vao as GLuint);
        gl::UseProgram(prev_program as GLuint);
    }

    /// # Safety
    ///
    /// The context this program was built in must be current.
    pub(crate) unsafe fn delete(&mut self) {
        if self.program != 0 {
            gl::DeleteBuffers(4, self.vbos.as_ptr());
            gl::DeleteVertexArrays(1, &self.vao);
            gl::DeleteProgram(self.program);
            self.program = 0;
            self.vao = 0;
            self.vbos = [0; 4];
        }
    }
}

/// Texture unit assigned to each sampler uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SamplerUnits {
    pub tex2d: GLint,
    pub cube: GLint,
    /// Units for `u_layer1..`.
    pub layers: [GLint; MAX_STAGES - 1],
}

/// Unit 0 goes to the 2D or cube sampler by mode; the other one parks on the
/// spare unit. Layers past the real stages share the 2D sampler's unit so no
/// unit ever carries two sampler types.
pub(crate) fn sampler_units(mode: TextureMode, layout: SamplerLayout) -> SamplerUnits {
    let (tex2d, cube) = match mode {
        TextureMode::CubeMap => (layout.spare, 0),
        _ => (0, layout.spare),
    };
    let mut layers = [tex2d; MAX_STAGES - 1];
    for (i, unit) in layers.iter_mut().enumerate() {
        let stage = i + 1;
        if stage < layout.stages {
            *unit = stage as GLint;
        }
    }
    SamplerUnits {
        tex2d,
        cube,
        layers,
    }
}

unsafe fn compile(kind: GLenum, source: &str) -> Result<GLuint> {
    let shader = gl::CreateShader(kind);
    let ptr = source.as_ptr() as *const GLchar;
    let len = source.len() as GLint;
    gl::ShaderSource(shader, 1, &ptr, &len);
    gl::CompileShader(shader);

    let mut compiled = 0;
    gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut compiled);
    if compiled == 0 {
        let log = shader_log(shader);
        gl::DeleteShader(shader);
        bail!("shader stage {kind:#x} failed to compile: {log}");
    }
    Ok(shader)
}

unsafe fn shader_log(shader: GLuint) -> String {
    let mut len = 0;
    gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len);
    let mut buf = vec![0u8; len.max(1) as usize];
    let mut written = 0;
    gl::GetShaderInfoLog(shader, len, &mut written, buf.as_mut_ptr() as *mut GLchar);
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).into_owned()
}

unsafe fn program_log(program: GLuint) -> String {
    let mut len = 0;
    gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len);
    let mut buf = vec![0u8; len.max(1) as usize];
    let mut written = 0;
    gl::GetProgramInfoLog(program, len, &mut written, buf.as_mut_ptr() as *mut GLchar);
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).into_owned()
}
