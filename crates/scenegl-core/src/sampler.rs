//! Per-texture-unit sampling state.

use glam::Vec4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl Filter {
    /// Magnification only understands the two base filters.
    pub fn as_mag(self) -> Filter {
        match self {
            Filter::Nearest | Filter::NearestMipmapNearest | Filter::NearestMipmapLinear => {
                Filter::Nearest
            }
            _ => Filter::Linear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wrap {
    Clamp,
    ClampToEdge,
    ClampToBorder,
    Repeat,
    MirroredRepeat,
}

/// How a sampled texel combines with the incoming fragment colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvMode {
    Modulate,
    Decal,
    Blend,
    Replace,
    Add,
}

impl EnvMode {
    /// Stable integer code used by the presentation program.
    pub fn code(self) -> i32 {
        match self {
            EnvMode::Modulate => 0,
            EnvMode::Decal => 1,
            EnvMode::Blend => 2,
            EnvMode::Replace => 3,
            EnvMode::Add => 4,
        }
    }
}

/// Sampler and environment state applied to a texture unit every time a
/// texture is bound on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerState {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub wrap_s: Wrap,
    pub wrap_t: Wrap,
    /// Only applied when the bound texture is a cube map.
    pub wrap_r: Wrap,
    pub border_color: Vec4,
    pub env_mode: EnvMode,
    pub env_color: Vec4,
    pub priority: f32,
    pub min_lod: f32,
    pub max_lod: f32,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            min_filter: Filter::LinearMipmapLinear,
            mag_filter: Filter::Linear,
            wrap_s: Wrap::Repeat,
            wrap_t: Wrap::Repeat,
            wrap_r: Wrap::Repeat,
            border_color: Vec4::ZERO,
            env_mode: EnvMode::Modulate,
            env_color: Vec4::ZERO,
            priority: 1.0,
            min_lod: -1000.0,
            max_lod: 1000.0,
        }
    }
}
