//! Opaque GPU object names.

use std::fmt;

/// A GPU texture object name.
///
/// Zero is reserved: it never names a live texture and is what failed loads
/// return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    /// The "no texture" sentinel.
    pub const NONE: TextureHandle = TextureHandle(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_some(self) -> bool {
        self.0 != 0
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// A framebuffer object name. Zero is the default (window) framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FramebufferHandle(pub u32);

impl FramebufferHandle {
    pub const DEFAULT: FramebufferHandle = FramebufferHandle(0);

    pub fn is_default(self) -> bool {
        self.0 == 0
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FramebufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fbo#{}", self.0)
    }
}
