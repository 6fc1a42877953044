//! Per-primitive render hints.

use bitflags::bitflags;

bitflags! {
    /// Presentation toggles carried in a primitive's state. Each flag is
    /// independent of the others.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Hints: u32 {
        const SOLID = 1 << 0;
        const WIRE = 1 << 1;
        const NORMAL = 1 << 2;
        const POINTS = 1 << 3;
        const ANTIALIAS = 1 << 4;
        const BOUND = 1 << 5;
        /// Geometry is drawn with its colours as given, without shading.
        /// Wireframe implies it.
        const UNLIT = 1 << 6;
        const VERTEX_COLORS = 1 << 7;
        const NOBLEND = 1 << 8;
        /// Render targets are created without a depth attachment.
        const IGNORE_DEPTH = 1 << 9;
    }
}

impl Default for Hints {
    fn default() -> Self {
        Hints::SOLID
    }
}
