//! Image file codec seam and the PNG implementation.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::texture::{PixelFormat, TextureDescriptor};

/// Decoded 8-bit-per-channel image, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, format: PixelFormat, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * format.channels();
        if pixels.len() != expected {
            bail!(
                "{width}x{height} {format} image needs {expected} bytes, got {}",
                pixels.len()
            );
        }
        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    pub fn descriptor(&self) -> TextureDescriptor {
        TextureDescriptor {
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }
}

/// Reads and writes image files. Implementations must only produce RGB or
/// RGBA data; anything else is an error.
pub trait ImageCodec {
    fn decode(&self, path: &Path) -> Result<DecodedImage>;

    fn encode(&self, path: &Path, image: &DecodedImage) -> Result<()>;
}

/// PNG codec. Palette and low bit-depth images are expanded to 8 bits and
/// 16-bit images are stripped to 8 bits. Grey images are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mut decoder = png::Decoder::new(BufReader::new(file));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);

        let mut reader = decoder
            .read_info()
            .with_context(|| format!("reading PNG header of {}", path.display()))?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buf)
            .with_context(|| format!("decoding {}", path.display()))?;
        buf.truncate(info.buffer_size());

        let Some(format) = PixelFormat::from_channels(info.color_type.samples()) else {
            bail!("{}: unsupported pixel format {:?}", path.display(), info.color_type);
        };

        debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            %format,
            "decoded PNG"
        );
        DecodedImage::new(info.width, info.height, format, buf)
    }

    fn encode(&self, path: &Path, image: &DecodedImage) -> Result<()> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut encoder = png::Encoder::new(BufWriter::new(file), image.width, image.height);
        encoder.set_color(match image.format {
            PixelFormat::Rgb => png::ColorType::Rgb,
            PixelFormat::Rgba => png::ColorType::Rgba,
        });
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .with_context(|| format!("writing PNG header to {}", path.display()))?;
        writer
            .write_image_data(&image.pixels)
            .with_context(|| format!("writing pixels to {}", path.display()))?;
        writer.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_written_then_read_keeps_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.png");
        let pixels = vec![
            255, 0, 0, 255, 0, 255, 0, 128, //
            0, 0, 255, 0, 10, 20, 30, 40,
        ];
        let image = DecodedImage::new(2, 2, PixelFormat::Rgba, pixels).unwrap();

        PngCodec.encode(&path, &image).unwrap();
        let decoded = PngCodec.decode(&path).unwrap();

        assert_eq!(decoded, image);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PngCodec.decode(&dir.path().join("absent.png")).is_err());
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(PngCodec.decode(&path).is_err());
    }

    #[test]
    fn grey_images_are_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        for (color, data) in [
            (png::ColorType::Grayscale, vec![0, 255]),
            (png::ColorType::GrayscaleAlpha, vec![0, 255, 255, 255]),
        ] {
            let path = dir.path().join(format!("{color:?}.png"));
            {
                let file = File::create(&path).unwrap();
                let mut encoder = png::Encoder::new(BufWriter::new(file), 2, 1);
                encoder.set_color(color);
                encoder.set_depth(png::BitDepth::Eight);
                let mut writer = encoder.write_header().unwrap();
                writer.write_image_data(&data).unwrap();
            }

            let err = PngCodec.decode(&path).unwrap_err();
            assert!(err.to_string().contains("unsupported pixel format"), "{color:?}");
        }
    }

    #[test]
    fn rgb_images_decode_as_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        let image = DecodedImage::new(1, 2, PixelFormat::Rgb, vec![1, 2, 3, 4, 5, 6]).unwrap();
        PngCodec.encode(&path, &image).unwrap();

        let decoded = PngCodec.decode(&path).unwrap();
        assert_eq!(decoded.format, PixelFormat::Rgb);
        assert_eq!(decoded.pixels, image.pixels);
    }

    #[test]
    fn image_size_is_checked() {
        assert!(DecodedImage::new(2, 2, PixelFormat::Rgb, vec![0; 11]).is_err());
        assert!(DecodedImage::new(2, 2, PixelFormat::Rgb, vec![0; 12]).is_ok());
    }
}
