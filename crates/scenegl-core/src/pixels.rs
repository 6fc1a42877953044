//! Conversion between 8-bit images and float colour buffers, and typed views
//! over type-erased per-element data channels.

use std::any::Any;

use anyhow::{bail, Result};
use glam::Vec4;

use crate::codec::DecodedImage;
use crate::state::Color;
use crate::texture::PixelFormat;

/// A per-element data array whose element type is only known at runtime.
pub trait DataChannel: Any {
    /// Downcast to the concrete container. Used by [`typed_view`].
    fn as_any(&self) -> &dyn Any;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> DataChannel for Vec<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

/// The channel's elements as `T`, or `None` when it holds something else.
pub fn typed_view<T: 'static>(channel: &dyn DataChannel) -> Option<&[T]> {
    channel
        .as_any()
        .downcast_ref::<Vec<T>>()
        .map(Vec::as_slice)
}

/// Expand an 8-bit RGB or RGBA image to float colours. RGB gets alpha 1.
pub fn colors_from_image(image: &DecodedImage) -> Vec<Color> {
    let channels = image.format.channels();
    image
        .pixels
        .chunks_exact(channels)
        .map(|px| {
            let c = |i: usize| px[i] as f32 / 255.0;
            match image.format {
                PixelFormat::Rgb => Vec4::new(c(0), c(1), c(2), 1.0),
                PixelFormat::Rgba => Vec4::new(c(0), c(1), c(2), c(3)),
            }
        })
        .collect()
}

/// Quantize float colours to an 8-bit RGBA image. Channels are clamped to
/// `[0, 1]` and truncated.
pub fn image_from_colors(width: u32, height: u32, colors: &[Color]) -> Result<DecodedImage> {
    let expected = width as usize * height as usize;
    if colors.len() < expected {
        bail!(
            "{width}x{height} image needs {expected} colours, buffer holds {}",
            colors.len()
        );
    }

    let quantize = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u8;
    let pixels = colors[..expected]
        .iter()
        .flat_map(|c| [quantize(c.x), quantize(c.y), quantize(c.z), quantize(c.w)])
        .collect();
    DecodedImage::new(width, height, PixelFormat::Rgba, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn rgb_expands_with_opaque_alpha() {
        let image = DecodedImage::new(2, 1, PixelFormat::Rgb, vec![255, 0, 51, 0, 255, 0]).unwrap();
        let colors = colors_from_image(&image);
        assert_eq!(colors, vec![Vec4::new(1.0, 0.0, 0.2, 1.0), Vec4::new(0.0, 1.0, 0.0, 1.0)]);
    }

    #[test]
    fn quantizing_clamps_out_of_range_channels() {
        let image =
            image_from_colors(2, 1, &[Vec4::new(2.0, -1.0, 0.5, 1.0), Vec4::ONE]).unwrap();
        assert_eq!(image.format, PixelFormat::Rgba);
        assert_eq!(image.pixels, vec![255, 0, 127, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn short_colour_buffers_are_rejected() {
        assert!(image_from_colors(2, 2, &[Vec4::ONE; 3]).is_err());
    }

    #[test]
    fn typed_view_only_matches_the_stored_type() {
        let colors: Box<dyn DataChannel> = Box::new(vec![Vec4::ONE; 4]);
        let vectors: Box<dyn DataChannel> = Box::new(vec![Vec3::ZERO; 4]);

        assert_eq!(typed_view::<Color>(colors.as_ref()).map(|c| c.len()), Some(4));
        assert!(typed_view::<Color>(vectors.as_ref()).is_none());
        assert!(typed_view::<Vec3>(vectors.as_ref()).is_some());
    }
}
