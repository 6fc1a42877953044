//! End-to-end walk through the resource layer against the in-memory device,
//! with real PNG files on disk.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use anyhow::Result;
use scenegl_core::logging::init_logging;
use scenegl_core::{
    CreateParams, CubeFace, DecodedImage, ImageCodec, PixelFormat, PngCodec, ResourceConfig,
    SamplerState, TextureHandle, TextureTarget,
};
use scenegl_device::{GlCall, GlDevice, RecordingDevice};
use scenegl_resources::{RenderTargetSurface, SurfaceOptions, TextureCache};

/// PNG codec that counts decodes.
#[derive(Clone, Default)]
struct CountingPng {
    decodes: Rc<Cell<usize>>,
}

impl ImageCodec for CountingPng {
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        self.decodes.set(self.decodes.get() + 1);
        PngCodec.decode(path)
    }

    fn encode(&self, path: &Path, image: &DecodedImage) -> Result<()> {
        PngCodec.encode(path, image)
    }
}

fn write_png(path: &Path, width: u32, height: u32, format: PixelFormat, fill: &[u8]) {
    let pixels = fill.repeat(width as usize * height as usize);
    let image = DecodedImage::new(width, height, format, pixels).unwrap();
    PngCodec.encode(path, &image).unwrap();
}

#[test]
fn surface_texture_and_cube_map_scenario() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut gl = RecordingDevice::new();
    let codec = CountingPng::default();
    let config = ResourceConfig {
        search_paths: vec![dir.path().to_path_buf()],
        ..ResourceConfig::default()
    };
    let mut textures = TextureCache::new(&config, gl.capabilities()).with_codec(codec.clone());

    // A 100x100 surface is backed by 128x128 targets.
    let mut surface = RenderTargetSurface::new(&mut gl, 100, 100, SurfaceOptions::default());
    assert_eq!(surface.backing_size(), (128, 128));

    // The same 64x64 RGBA file loads once.
    write_png(&dir.path().join("albedo.png"), 64, 64, PixelFormat::Rgba, &[10, 20, 30, 255]);
    let first = textures.load_texture(&mut gl, "albedo.png", CreateParams::default());
    let second = textures.load_texture(&mut gl, "albedo.png", CreateParams::default());
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(codec.decodes.get(), 1);
    let descriptor = textures.descriptor(first).unwrap();
    assert_eq!((descriptor.width, descriptor.height), (64, 64));
    assert_eq!(descriptor.format, PixelFormat::Rgba);

    // Six face loads fill one assembly.
    for face in CubeFace::ALL {
        let name = format!("sky_{}.png", face.index());
        write_png(&dir.path().join(&name), 4, 4, PixelFormat::Rgb, &[0, 0, 200]);
    }
    let primary = textures.load_texture(
        &mut gl,
        "sky_0.png",
        CreateParams::cube_face(CubeFace::PositiveX, None),
    );
    assert!(primary.is_some());
    for face in &CubeFace::ALL[1..] {
        let name = format!("sky_{}.png", face.index());
        let handle = textures.load_texture(&mut gl, name, CreateParams::cube_face(*face, Some(primary)));
        assert!(handle.is_some());
    }
    let assembly = textures.cube_map(primary).unwrap();
    assert!(assembly.is_complete());
    assert!(assembly.faces.iter().all(|f| f.is_some()));
    let faces = assembly.faces;

    // Binding the primary binds all six faces as a cube map.
    gl.clear_calls();
    let mut handles = [TextureHandle::NONE; 8];
    handles[0] = primary;
    assert!(textures.apply_current(&mut gl, &handles, &[SamplerState::default(); 8]));
    assert!(gl.calls.contains(&GlCall::BindCubeMap {
        unit: 0,
        primary,
        faces,
    }));
    assert!(gl.unit_enabled(0, TextureTarget::CubeMap));
    assert!(!gl.unit_enabled(0, TextureTarget::Texture2d));

    surface.release(&mut gl);
    textures.clear_cache(&mut gl);
    assert_eq!(gl.live_textures(), 0);
    assert_eq!(gl.live_framebuffers(), 0);
}

#[test]
fn surface_pixels_survive_a_png_round_trip() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut gl = RecordingDevice::new();
    let textures = TextureCache::new(&ResourceConfig::default(), gl.capabilities());
    let path = dir.path().join("frame.png");

    let mut surface = RenderTargetSurface::new(&mut gl, 5, 3, SurfaceOptions::default());
    for (i, pixel) in surface.pixels_mut().iter_mut().enumerate() {
        pixel.x = if i % 2 == 0 { 1.0 } else { 0.0 };
    }
    assert!(surface.save(&textures, &path));

    let mut other = RenderTargetSurface::new(&mut gl, 1, 1, SurfaceOptions::default());
    assert!(other.load(&mut gl, &textures, &path));
    assert_eq!((other.width(), other.height()), (5, 3));
    assert_eq!(other.pixels(), surface.pixels());

    surface.release(&mut gl);
    other.release(&mut gl);
}
