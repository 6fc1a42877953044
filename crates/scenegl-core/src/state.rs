//! Render state carried by every primitive, plus bounds.

use glam::{Mat4, Vec3, Vec4};

use crate::handle::TextureHandle;
use crate::hints::Hints;
use crate::sampler::SamplerState;

/// RGBA colour, one `f32` per channel.
pub type Color = Vec4;

/// Number of texture units a primitive can address.
pub const MAX_TEXTURE_UNITS: usize = 8;

/// The subset of a scene node's state the resource layer reads.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveState {
    pub textures: [TextureHandle; MAX_TEXTURE_UNITS],
    pub texture_states: [SamplerState; MAX_TEXTURE_UNITS],
    pub hints: Hints,
    pub color: Color,
    pub wire_color: Color,
    /// Local transform, baked into geometry by `apply_transform`.
    pub transform: Mat4,
}

impl Default for PrimitiveState {
    fn default() -> Self {
        Self {
            textures: [TextureHandle::NONE; MAX_TEXTURE_UNITS],
            texture_states: [SamplerState::default(); MAX_TEXTURE_UNITS],
            hints: Hints::default(),
            color: Vec4::ONE,
            wire_color: Vec4::ONE,
            transform: Mat4::IDENTITY,
        }
    }
}

/// Axis-aligned bounds. Starts empty; `expand` grows it to include points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    extent: Option<(Vec3, Vec3)>,
}

impl BoundingBox {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn expand(&mut self, point: Vec3) {
        self.extent = Some(match self.extent {
            Some((min, max)) => (min.min(point), max.max(point)),
            None => (point, point),
        });
    }

    pub fn union(&mut self, other: &BoundingBox) {
        if let Some((min, max)) = other.extent {
            self.expand(min);
            self.expand(max);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.extent.is_none()
    }

    pub fn min(&self) -> Option<Vec3> {
        self.extent.map(|(min, _)| min)
    }

    pub fn max(&self) -> Option<Vec3> {
        self.extent.map(|(_, max)| max)
    }

    /// The eight corners, or nothing when empty.
    pub fn corners(&self) -> Option<[Vec3; 8]> {
        let (a, b) = self.extent?;
        Some([
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ])
    }
}

impl FromIterator<Vec3> for BoundingBox {
    fn from_iter<I: IntoIterator<Item = Vec3>>(iter: I) -> Self {
        let mut bounds = BoundingBox::empty();
        for p in iter {
            bounds.expand(p);
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_grow_to_cover_points() {
        let bounds: BoundingBox = [
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-1.0, 3.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(bounds.min(), Some(Vec3::new(-1.0, -2.0, 0.0)));
        assert_eq!(bounds.max(), Some(Vec3::new(1.0, 3.0, 4.0)));
    }

    #[test]
    fn empty_bounds_have_no_corners() {
        let mut bounds = BoundingBox::empty();
        assert!(bounds.is_empty());
        assert!(bounds.corners().is_none());

        bounds.union(&BoundingBox::empty());
        assert!(bounds.is_empty());
    }
}
