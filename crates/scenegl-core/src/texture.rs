//! Texture descriptions and creation parameters.

use std::fmt;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::handle::TextureHandle;

/// Channel layout of file-backed texture data. Discriminants are the channel
/// counts so a codec's channel count converts directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum PixelFormat {
    Rgb = 3,
    Rgba = 4,
}

impl PixelFormat {
    /// `None` for anything that is neither RGB nor RGBA.
    pub fn from_channels(channels: usize) -> Option<Self> {
        Self::from_usize(channels)
    }

    pub fn channels(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Rgb => f.write_str("RGB"),
            PixelFormat::Rgba => f.write_str("RGBA"),
        }
    }
}

/// Immutable size and format of an uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// The six directions of a cube map. Discriminants index
/// [`CubeMapAssembly::faces`](crate::CubeMapAssembly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum CubeFace {
    PositiveX = 0,
    NegativeX = 1,
    PositiveY = 2,
    NegativeY = 3,
    PositiveZ = 4,
    NegativeZ = 5,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::from_usize(index)
    }
}

/// What a texture object is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Texture2d,
    CubeMap,
    /// A single face image of a cube map. Binds through the cube-map target.
    CubeFace(CubeFace),
}

impl TextureTarget {
    /// The target a texture object is bound to when this target is used.
    pub fn bind_point(self) -> TextureTarget {
        match self {
            TextureTarget::Texture2d => TextureTarget::Texture2d,
            TextureTarget::CubeMap | TextureTarget::CubeFace(_) => TextureTarget::CubeMap,
        }
    }
}

/// Parameters for loading a file-backed texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateParams {
    pub target: TextureTarget,
    /// Upload into this texture instead of allocating one. For cube faces this
    /// is the primary handle of the assembly the face belongs to.
    pub existing: Option<TextureHandle>,
    pub generate_mipmaps: bool,
    pub border: i32,
    pub mip_level: i32,
}

impl Default for CreateParams {
    fn default() -> Self {
        Self {
            target: TextureTarget::Texture2d,
            existing: None,
            generate_mipmaps: true,
            border: 0,
            mip_level: 0,
        }
    }
}

impl CreateParams {
    pub fn cube_face(face: CubeFace, primary: Option<TextureHandle>) -> Self {
        Self {
            target: TextureTarget::CubeFace(face),
            existing: primary,
            ..Self::default()
        }
    }
}

/// Six face textures addressed under one primary handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeMapAssembly {
    pub primary: TextureHandle,
    pub faces: [TextureHandle; 6],
}

impl CubeMapAssembly {
    pub fn new(primary: TextureHandle) -> Self {
        Self {
            primary,
            faces: [TextureHandle::NONE; 6],
        }
    }

    pub fn face(&self, face: CubeFace) -> TextureHandle {
        self.faces[face.index()]
    }

    pub fn set_face(&mut self, face: CubeFace, handle: TextureHandle) {
        self.faces[face.index()] = handle;
    }

    /// All six faces have been loaded.
    pub fn is_complete(&self) -> bool {
        self.faces.iter().all(|h| h.is_some())
    }
}
