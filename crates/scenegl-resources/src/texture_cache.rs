//! [`TextureCache`]: path-keyed store of file-backed textures and cube maps.
//!
//! Every texture the cache allocates is owned by it until [`clear_cache`]
//! releases it. Loads resolve through [`SearchPaths`] and are keyed by the
//! normalized result, so repeated requests for one file decode and upload
//! once. Files that fail to decode are remembered as [`TextureHandle::NONE`]
//! and never retried.
//!
//! [`clear_cache`]: TextureCache::clear_cache

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use scenegl_core::{
    colors_from_image, image_from_colors, typed_view, Color, CreateParams, CubeFace,
    CubeMapAssembly, DataChannel, DecodedImage, ImageCodec, PngCodec, ResourceConfig,
    SamplerState, SearchPaths, TextureDescriptor, TextureHandle, TextureTarget,
    MAX_TEXTURE_UNITS,
};
use scenegl_device::{Capabilities, CubeFaceImage, GlDevice, ImageUpload, PixelData, UploadFormat};
use tracing::{debug, info, trace, warn};

/// Cube-face loads are deduplicated per assembly and direction, so one image
/// can supply several faces of the same cube map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CubeFaceKey {
    primary: Option<TextureHandle>,
    face: CubeFace,
    path: PathBuf,
}

pub struct TextureCache {
    codec: Box<dyn ImageCodec>,
    search_paths: SearchPaths,
    descriptors: HashMap<TextureHandle, TextureDescriptor>,
    loaded: HashMap<PathBuf, TextureHandle>,
    loaded_cube: HashMap<CubeFaceKey, TextureHandle>,
    cube_maps: HashMap<TextureHandle, CubeMapAssembly>,
    owned: HashSet<TextureHandle>,
    multitexturing: bool,
    unit_count: usize,
}

impl TextureCache {
    /// A cache decoding PNG files, limited to what both `config` and the
    /// device allow.
    pub fn new(config: &ResourceConfig, caps: Capabilities) -> Self {
        let multitexturing = config.multitexturing && caps.multitexture;
        let unit_count = if multitexturing {
            config
                .max_texture_units
                .min(caps.max_texture_units as usize)
                .clamp(1, MAX_TEXTURE_UNITS)
        } else {
            1
        };
        debug!(multitexturing, unit_count, "texture cache created");

        Self {
            codec: Box::new(PngCodec),
            search_paths: SearchPaths::new(config.search_paths.iter().cloned()),
            descriptors: HashMap::new(),
            loaded: HashMap::new(),
            loaded_cube: HashMap::new(),
            cube_maps: HashMap::new(),
            owned: HashSet::new(),
            multitexturing,
            unit_count,
        }
    }

    /// Replace the image codec.
    pub fn with_codec(mut self, codec: impl ImageCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn search_paths(&self) -> &SearchPaths {
        &self.search_paths
    }

    pub fn search_paths_mut(&mut self) -> &mut SearchPaths {
        &mut self.search_paths
    }

    /// Units processed by [`apply_current`](Self::apply_current).
    pub fn unit_count(&self) -> usize {
        self.unit_count
    }

    pub fn multitexturing(&self) -> bool {
        self.multitexturing
    }

    pub fn descriptor(&self, texture: TextureHandle) -> Option<TextureDescriptor> {
        self.descriptors.get(&texture).copied()
    }

    pub fn is_cube_map(&self, texture: TextureHandle) -> bool {
        self.cube_maps.contains_key(&texture)
    }

    pub fn cube_map(&self, primary: TextureHandle) -> Option<&CubeMapAssembly> {
        self.cube_maps.get(&primary)
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Load an image file as a texture and return its handle, or
    /// [`TextureHandle::NONE`] when the file cannot be decoded.
    ///
    /// Cube-face targets are forwarded to [`load_cube_face`]. When
    /// `params.existing` is set the image is uploaded into that texture and
    /// nothing is cached for the path.
    ///
    /// [`load_cube_face`]: Self::load_cube_face
    pub fn load_texture(
        &mut self,
        gl: &mut dyn GlDevice,
        path: impl AsRef<Path>,
        params: CreateParams,
    ) -> TextureHandle {
        if let TextureTarget::CubeFace(face) = params.target {
            return self.load_cube_face(gl, path, face, params);
        }

        let full = self.search_paths.resolve_normalized(path);
        if let Some(&cached) = self.loaded.get(&full) {
            trace!(path = %full.display(), texture = %cached, "texture cache hit");
            return cached;
        }

        let Some(image) = self.decode(&full) else {
            self.loaded.insert(full, TextureHandle::NONE);
            return TextureHandle::NONE;
        };

        let texture = match params.existing {
            Some(existing) => existing,
            None => {
                let texture = gl.gen_texture();
                self.owned.insert(texture);
                self.descriptors.insert(texture, image.descriptor());
                self.loaded.insert(full.clone(), texture);
                texture
            }
        };

        Self::upload(gl, texture, &image.descriptor(), &params, &image.pixels);
        debug!(
            path = %full.display(),
            %texture,
            width = image.width,
            height = image.height,
            "texture loaded"
        );
        texture
    }

    /// Load one face of a cube map.
    ///
    /// With no `params.existing` a new primary texture is allocated and an
    /// assembly is started with this face in it; the primary handle is
    /// returned. With `params.existing` naming a primary, a new texture is
    /// allocated for the face and recorded in that assembly's slot for
    /// `face`. Faces may arrive in any order.
    pub fn load_cube_face(
        &mut self,
        gl: &mut dyn GlDevice,
        path: impl AsRef<Path>,
        face: CubeFace,
        params: CreateParams,
    ) -> TextureHandle {
        let key = CubeFaceKey {
            primary: params.existing,
            face,
            path: self.search_paths.resolve_normalized(path),
        };
        if let Some(&cached) = self.loaded_cube.get(&key) {
            trace!(path = %key.path.display(), ?face, texture = %cached, "cube face cache hit");
            return cached;
        }

        let Some(image) = self.decode(&key.path) else {
            self.loaded_cube.insert(key, TextureHandle::NONE);
            return TextureHandle::NONE;
        };

        let texture = gl.gen_texture();
        self.owned.insert(texture);
        self.descriptors.insert(texture, image.descriptor());

        match params.existing {
            None => {
                let mut assembly = CubeMapAssembly::new(texture);
                assembly.set_face(face, texture);
                self.cube_maps.insert(texture, assembly);
            }
            Some(primary) => {
                self.cube_maps
                    .entry(primary)
                    .or_insert_with(|| CubeMapAssembly::new(primary))
                    .set_face(face, texture);
            }
        }

        let params = CreateParams {
            target: TextureTarget::CubeFace(face),
            ..params
        };
        Self::upload(gl, texture, &image.descriptor(), &params, &image.pixels);
        debug!(
            path = %key.path.display(),
            ?face,
            %texture,
            primary = ?params.existing,
            "cube face loaded"
        );

        self.loaded_cube.insert(key, texture);
        texture
    }

    /// Upload 8-bit pixels into `texture`, either as a full mip chain or as a
    /// single level at `params.mip_level`.
    pub fn upload(
        gl: &mut dyn GlDevice,
        texture: TextureHandle,
        descriptor: &TextureDescriptor,
        params: &CreateParams,
        pixels: &[u8],
    ) {
        gl.bind_texture(params.target, texture);
        gl.upload_image(
            params.target,
            &ImageUpload {
                width: descriptor.width,
                height: descriptor.height,
                format: UploadFormat::from(descriptor.format),
                level: params.mip_level,
                border: params.border,
                build_mipmaps: params.generate_mipmaps,
                pixels: PixelData::Bytes(pixels),
            },
        );
    }

    /// Upload a primitive-authored colour channel as a mipmapped float
    /// texture. Channels that do not hold colours, or hold fewer than
    /// `width * height` of them, yield [`TextureHandle::NONE`].
    pub fn make_texture(
        &mut self,
        gl: &mut dyn GlDevice,
        width: u32,
        height: u32,
        data: &dyn DataChannel,
    ) -> TextureHandle {
        let Some(colors) = typed_view::<Color>(data) else {
            return TextureHandle::NONE;
        };
        if colors.len() < width as usize * height as usize {
            warn!(width, height, len = colors.len(), "colour data too short for texture");
            return TextureHandle::NONE;
        }

        let texture = gl.gen_texture();
        self.owned.insert(texture);
        gl.bind_texture(TextureTarget::Texture2d, texture);
        gl.upload_image(
            TextureTarget::Texture2d,
            &ImageUpload {
                width,
                height,
                format: UploadFormat::Rgba32F,
                level: 0,
                border: 0,
                build_mipmaps: true,
                pixels: PixelData::colors(colors),
            },
        );
        texture
    }

    // -----------------------------------------------------------------------
    // Binding
    // -----------------------------------------------------------------------

    /// Bind `handles` to texture units `0..unit_count` with matching sampler
    /// `states`, disabling units whose handle is [`TextureHandle::NONE`].
    /// Returns whether any unit ended up textured.
    ///
    /// Without multitexturing only unit 0 is processed and no unit is ever
    /// activated.
    pub fn apply_current(
        &self,
        gl: &mut dyn GlDevice,
        handles: &[TextureHandle],
        states: &[SamplerState],
    ) -> bool {
        let mut any_bound = false;

        for unit in 0..self.unit_count {
            if self.multitexturing {
                gl.active_unit(unit as u32);
            }

            let texture = handles.get(unit).copied().unwrap_or_default();
            let state = states.get(unit).copied().unwrap_or_default();

            if texture.is_none() {
                gl.set_unit_enabled(TextureTarget::Texture2d, false);
                gl.set_unit_enabled(TextureTarget::CubeMap, false);
                continue;
            }

            if let Some(assembly) = self.cube_maps.get(&texture) {
                let faces = assembly.faces.map(|face| CubeFaceImage {
                    handle: face,
                    descriptor: self.descriptors.get(&face).copied(),
                });
                gl.bind_cube_map(assembly.primary, &faces);
                gl.set_unit_enabled(TextureTarget::Texture2d, false);
                gl.set_unit_enabled(TextureTarget::CubeMap, true);
                gl.apply_sampler(TextureTarget::CubeMap, &state, true);
            } else {
                gl.set_unit_enabled(TextureTarget::CubeMap, false);
                gl.set_unit_enabled(TextureTarget::Texture2d, true);
                gl.bind_texture(TextureTarget::Texture2d, texture);
                gl.apply_sampler(TextureTarget::Texture2d, &state, false);
            }
            any_bound = true;
        }

        if self.multitexturing {
            gl.active_unit(0);
        }
        any_bound
    }

    /// Turn 2D and cube texturing off on every unit.
    pub fn disable_all(&self, gl: &mut dyn GlDevice) {
        for unit in 0..self.unit_count {
            if self.multitexturing {
                gl.active_unit(unit as u32);
            }
            gl.set_unit_enabled(TextureTarget::Texture2d, false);
            gl.set_unit_enabled(TextureTarget::CubeMap, false);
        }
        if self.multitexturing {
            gl.active_unit(0);
        }
    }

    /// Forget every path and assembly and delete every texture the cache
    /// allocated.
    pub fn clear_cache(&mut self, gl: &mut dyn GlDevice) {
        let released = self.owned.len();
        for texture in self.owned.drain() {
            gl.delete_texture(texture);
        }
        self.descriptors.clear();
        self.loaded.clear();
        self.loaded_cube.clear();
        self.cube_maps.clear();
        debug!(released, "texture cache cleared");
    }

    // -----------------------------------------------------------------------
    // Pixel files
    // -----------------------------------------------------------------------

    /// Read an image file as float colours: `(width, height, colours)`.
    pub fn load_pixels(&self, path: impl AsRef<Path>) -> Option<(u32, u32, Vec<Color>)> {
        let full = self.search_paths.resolve(path);
        let image = self.decode(&full)?;
        Some((image.width, image.height, colors_from_image(&image)))
    }

    /// Write float colours to an 8-bit RGBA image file.
    pub fn save_pixels(
        &self,
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        colors: &[Color],
    ) -> bool {
        let path = path.as_ref();
        let result =
            image_from_colors(width, height, colors).and_then(|image| self.codec.encode(path, &image));
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), "saving pixels failed: {e:#}");
                false
            }
        }
    }

    /// Log every loaded 2D texture with its size and format, and return the
    /// same lines.
    pub fn dump(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .loaded
            .iter()
            .filter_map(|(path, texture)| {
                let desc = self.descriptors.get(texture)?;
                Some(format!(
                    "{} {}X{} {}",
                    path.display(),
                    desc.width,
                    desc.height,
                    desc.format
                ))
            })
            .collect();
        lines.sort();
        for line in &lines {
            info!("{line}");
        }
        lines
    }

    fn decode(&self, path: &Path) -> Option<DecodedImage> {
        match self.codec.decode(path) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(path = %path.display(), "texture load failed: {e:#}");
                None
            }
        }
    }
}

impl std::fmt::Debug for TextureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureCache")
            .field("search_paths", &self.search_paths)
            .field("loaded", &self.loaded.len())
            .field("cube_maps", &self.cube_maps.len())
            .field("owned", &self.owned.len())
            .field("unit_count", &self.unit_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{rgba, MemoryCodec};
    use glam::Vec4;
    use scenegl_core::{PixelFormat, Wrap};
    use scenegl_device::{GlCall, RecordingDevice};

    fn cache(gl: &RecordingDevice, codec: &MemoryCodec) -> TextureCache {
        TextureCache::new(&ResourceConfig::default(), gl.capabilities()).with_codec(codec.clone())
    }

    #[test]
    fn same_path_decodes_and_uploads_once() {
        let codec = MemoryCodec::default();
        codec.insert("brick.png", rgba(64, 64, [200, 10, 10, 255]));
        let mut gl = RecordingDevice::new();
        let mut textures = cache(&gl, &codec);

        let first = textures.load_texture(&mut gl, "brick.png", CreateParams::default());
        let second = textures.load_texture(&mut gl, "./brick.png", CreateParams::default());

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(codec.decodes(), 1);
        assert_eq!(gl.count(|c| matches!(c, GlCall::UploadImage { .. })), 1);
        assert_eq!(
            textures.descriptor(first),
            Some(TextureDescriptor {
                width: 64,
                height: 64,
                format: PixelFormat::Rgba
            })
        );
    }

    #[test]
    fn failed_loads_are_not_retried() {
        let codec = MemoryCodec::default();
        let mut gl = RecordingDevice::new();
        let mut textures = cache(&gl, &codec);

        for _ in 0..3 {
            let texture = textures.load_texture(&mut gl, "missing.png", CreateParams::default());
            assert!(texture.is_none());
        }
        assert_eq!(codec.decodes(), 1);
        assert_eq!(gl.live_textures(), 0);
    }

    #[test]
    fn rgb_images_upload_as_rgb8() {
        let codec = MemoryCodec::default();
        codec.insert(
            "sky.png",
            DecodedImage::new(2, 1, PixelFormat::Rgb, vec![0; 6]).unwrap(),
        );
        let mut gl = RecordingDevice::new();
        let mut textures = cache(&gl, &codec);

        textures.load_texture(&mut gl, "sky.png", CreateParams::default());

        assert!(gl
            .calls
            .iter()
            .any(|c| matches!(c, GlCall::UploadImage { format: UploadFormat::Rgb8, build_mipmaps: true, .. })));
    }

    #[test]
    fn existing_texture_receives_a_single_level() {
        let codec = MemoryCodec::default();
        codec.insert("level1.png", rgba(32, 32, [0; 4]));
        let mut gl = RecordingDevice::new();
        let mut textures = cache(&gl, &codec);
        let target = gl.gen_texture();

        let params = CreateParams {
            existing: Some(target),
            generate_mipmaps: false,
            mip_level: 1,
            ..CreateParams::default()
        };
        let returned = textures.load_texture(&mut gl, "level1.png", params);

        assert_eq!(returned, target);
        assert!(gl.calls.iter().any(|c| matches!(
            c,
            GlCall::UploadImage { texture, level: 1, build_mipmaps: false, .. } if *texture == target
        )));
        // Not cached: a second request decodes again.
        textures.load_texture(&mut gl, "level1.png", params);
        assert_eq!(codec.decodes(), 2);
    }

    #[test]
    fn cube_faces_assemble_out_of_order() {
        let codec = MemoryCodec::default();
        for face in CubeFace::ALL {
            codec.insert(format!("sky_{}.png", face.index()), rgba(16, 16, [1, 2, 3, 255]));
        }
        let mut gl = RecordingDevice::new();
        let mut textures = cache(&gl, &codec);

        let primary = textures.load_cube_face(
            &mut gl,
            "sky_4.png",
            CubeFace::PositiveZ,
            CreateParams::default(),
        );
        assert!(textures.is_cube_map(primary));
        assert!(!textures.cube_map(primary).unwrap().is_complete());

        for face in [
            CubeFace::NegativeY,
            CubeFace::PositiveX,
            CubeFace::NegativeZ,
            CubeFace::PositiveY,
            CubeFace::NegativeX,
        ] {
            let path = format!("sky_{}.png", face.index());
            let texture = textures.load_texture(
                &mut gl,
                path,
                CreateParams::cube_face(face, Some(primary)),
            );
            assert!(texture.is_some());
            assert_ne!(texture, primary);
            assert_eq!(textures.cube_map(primary).unwrap().face(face), texture);
        }

        let assembly = textures.cube_map(primary).unwrap();
        assert!(assembly.is_complete());
        assert_eq!(assembly.face(CubeFace::PositiveZ), primary);
    }

    #[test]
    fn one_image_can_supply_every_face() {
        let codec = MemoryCodec::default();
        codec.insert("grid.png", rgba(8, 8, [9; 4]));
        let mut gl = RecordingDevice::new();
        let mut textures = cache(&gl, &codec);

        let primary = textures.load_cube_face(
            &mut gl,
            "grid.png",
            CubeFace::PositiveX,
            CreateParams::default(),
        );
        for face in &CubeFace::ALL[1..] {
            textures.load_cube_face(&mut gl, "grid.png", *face, CreateParams::cube_face(*face, Some(primary)));
        }
        assert!(textures.cube_map(primary).unwrap().is_complete());

        // Reloading a recorded face returns the recorded texture.
        let again = textures.load_cube_face(
            &mut gl,
            "grid.png",
            CubeFace::NegativeZ,
            CreateParams::cube_face(CubeFace::NegativeZ, Some(primary)),
        );
        assert_eq!(again, textures.cube_map(primary).unwrap().face(CubeFace::NegativeZ));
        assert_eq!(codec.decodes(), 6);
    }

    #[test]
    fn incomplete_cube_map_binds_with_empty_faces() {
        let codec = MemoryCodec::default();
        codec.insert("half.png", rgba(8, 8, [5; 4]));
        let mut gl = RecordingDevice::new();
        let mut textures = cache(&gl, &codec);

        let primary = textures.load_cube_face(
            &mut gl,
            "half.png",
            CubeFace::PositiveX,
            CreateParams::default(),
        );
        for face in [CubeFace::NegativeX, CubeFace::PositiveZ] {
            let texture = textures.load_cube_face(
                &mut gl,
                "half.png",
                face,
                CreateParams::cube_face(face, Some(primary)),
            );
            assert!(texture.is_some());
        }
        let assembly = textures.cube_map(primary).unwrap();
        assert!(!assembly.is_complete());
        let faces = assembly.faces;
        assert_eq!(faces.iter().filter(|f| f.is_none()).count(), 3);

        let mut handles = [TextureHandle::NONE; MAX_TEXTURE_UNITS];
        handles[0] = primary;
        let mut states = [SamplerState::default(); MAX_TEXTURE_UNITS];
        states[0].wrap_s = Wrap::Repeat;
        gl.clear_calls();

        assert!(textures.apply_current(&mut gl, &handles, &states));

        assert!(gl.calls.contains(&GlCall::BindCubeMap {
            unit: 0,
            primary,
            faces,
        }));
        assert_eq!(faces[CubeFace::NegativeY.index()], TextureHandle::NONE);
        assert_eq!(faces[CubeFace::NegativeZ.index()], TextureHandle::NONE);
        assert!(gl.calls.contains(&GlCall::ApplySampler {
            unit: 0,
            target: TextureTarget::CubeMap,
            state: states[0],
            wrap_r: true,
        }));
        assert!(gl.unit_enabled(0, TextureTarget::CubeMap));
        assert!(!gl.unit_enabled(0, TextureTarget::Texture2d));
    }

    #[test]
    fn apply_current_binds_2d_and_disables_empty_units() {
        let codec = MemoryCodec::default();
        codec.insert("a.png", rgba(4, 4, [0; 4]));
        let mut gl = RecordingDevice::new();
        let mut textures = cache(&gl, &codec);
        let texture = textures.load_texture(&mut gl, "a.png", CreateParams::default());

        let mut handles = [TextureHandle::NONE; MAX_TEXTURE_UNITS];
        handles[1] = texture;
        let mut states = [SamplerState::default(); MAX_TEXTURE_UNITS];
        states[1].wrap_s = Wrap::ClampToEdge;
        gl.clear_calls();

        assert!(textures.apply_current(&mut gl, &handles, &states));

        assert_eq!(gl.bound(1, TextureTarget::Texture2d), texture);
        assert!(gl.unit_enabled(1, TextureTarget::Texture2d));
        assert!(!gl.unit_enabled(0, TextureTarget::Texture2d));
        assert!(gl.calls.contains(&GlCall::ApplySampler {
            unit: 1,
            target: TextureTarget::Texture2d,
            state: states[1],
            wrap_r: false,
        }));
        assert_eq!(gl.calls.last(), Some(&GlCall::ActiveUnit(0)));
    }

    #[test]
    fn nothing_bound_reports_false() {
        let gl_codec = MemoryCodec::default();
        let mut gl = RecordingDevice::new();
        let textures = cache(&gl, &gl_codec);
        let handles = [TextureHandle::NONE; MAX_TEXTURE_UNITS];
        let states = [SamplerState::default(); MAX_TEXTURE_UNITS];
        assert!(!textures.apply_current(&mut gl, &handles, &states));
    }

    #[test]
    fn single_unit_without_multitexturing() {
        let codec = MemoryCodec::default();
        codec.insert("a.png", rgba(4, 4, [0; 4]));
        let mut gl = RecordingDevice::without_multitexture();
        let mut textures = cache(&gl, &codec);
        let texture = textures.load_texture(&mut gl, "a.png", CreateParams::default());
        assert_eq!(textures.unit_count(), 1);

        let handles = [texture; MAX_TEXTURE_UNITS];
        let states = [SamplerState::default(); MAX_TEXTURE_UNITS];
        gl.clear_calls();
        assert!(textures.apply_current(&mut gl, &handles, &states));

        assert_eq!(gl.count(|c| matches!(c, GlCall::ActiveUnit(_))), 0);
        assert_eq!(gl.count(|c| matches!(c, GlCall::BindTexture { .. })), 1);
    }

    #[test]
    fn config_can_switch_multitexturing_off() {
        let gl = RecordingDevice::new();
        let config = ResourceConfig {
            multitexturing: false,
            ..ResourceConfig::default()
        };
        let textures = TextureCache::new(&config, gl.capabilities());
        assert!(!textures.multitexturing());
        assert_eq!(textures.unit_count(), 1);
    }

    #[test]
    fn clear_releases_allocated_textures() {
        let codec = MemoryCodec::default();
        codec.insert("a.png", rgba(4, 4, [0; 4]));
        codec.insert("b.png", rgba(4, 4, [0; 4]));
        let mut gl = RecordingDevice::new();
        let mut textures = cache(&gl, &codec);
        let a = textures.load_texture(&mut gl, "a.png", CreateParams::default());
        let b = textures.load_cube_face(&mut gl, "b.png", CubeFace::PositiveX, CreateParams::default());
        assert_eq!(gl.live_textures(), 2);

        textures.clear_cache(&mut gl);

        assert_eq!(gl.live_textures(), 0);
        assert!(!textures.is_cube_map(b));
        assert_eq!(textures.descriptor(a), None);
        // A cleared path decodes again.
        textures.load_texture(&mut gl, "a.png", CreateParams::default());
        assert_eq!(codec.decodes(), 3);
    }

    #[test]
    fn make_texture_needs_a_colour_channel() {
        let codec = MemoryCodec::default();
        let mut gl = RecordingDevice::new();
        let mut textures = cache(&gl, &codec);

        let vectors: Vec<glam::Vec3> = vec![glam::Vec3::ZERO; 4];
        assert!(textures.make_texture(&mut gl, 2, 2, &vectors).is_none());
        assert_eq!(gl.live_textures(), 0);

        let colors = vec![Vec4::new(0.5, 0.25, 1.0, 1.0); 4];
        let texture = textures.make_texture(&mut gl, 2, 2, &colors);
        assert!(texture.is_some());
        assert_eq!(gl.texel(texture, 1, 1), Some(colors[3]));
        assert!(gl.calls.iter().any(|c| matches!(
            c,
            GlCall::UploadImage { format: UploadFormat::Rgba32F, build_mipmaps: true, .. }
        )));
    }

    #[test]
    fn pixels_round_trip_through_the_codec() {
        let codec = MemoryCodec::default();
        let gl = RecordingDevice::new();
        let textures = cache(&gl, &codec);
        let colors = vec![Vec4::new(1.0, 0.0, 0.0, 1.0), Vec4::new(0.0, 0.0, 1.0, 0.0)];

        assert!(textures.save_pixels("out.png", 2, 1, &colors));
        let (w, h, loaded) = textures.load_pixels("out.png").unwrap();

        assert_eq!((w, h), (2, 1));
        assert_eq!(loaded, colors);
        assert!(!textures.save_pixels("short.png", 4, 4, &colors));
    }

    #[test]
    fn dump_lists_loaded_textures() {
        let codec = MemoryCodec::default();
        codec.insert("b.png", rgba(8, 4, [0; 4]));
        codec.insert(
            "a.png",
            DecodedImage::new(1, 1, PixelFormat::Rgb, vec![0; 3]).unwrap(),
        );
        let mut gl = RecordingDevice::new();
        let mut textures = cache(&gl, &codec);
        textures.load_texture(&mut gl, "b.png", CreateParams::default());
        textures.load_texture(&mut gl, "a.png", CreateParams::default());
        textures.load_texture(&mut gl, "gone.png", CreateParams::default());

        assert_eq!(textures.dump(), vec!["a.png 1X1 RGB", "b.png 8X4 RGBA"]);
    }
}
