//! Shared types for the scene renderer's GPU resource layer.
//!
//! This crate holds everything the GL device seam and the resource framework
//! agree on, with no GL calls of its own:
//!
//! - [`TextureHandle`] / [`FramebufferHandle`] name GPU objects.
//! - [`TextureDescriptor`], [`CreateParams`], [`CubeMapAssembly`] describe
//!   textures and cube-map face sets.
//! - [`SamplerState`] and [`Hints`] are the per-primitive state the resource
//!   layer applies when drawing.
//! - [`ImageCodec`] / [`PngCodec`] and [`SearchPaths`] are the file-side
//!   collaborators.
//! - [`ResourceConfig`] and [`logging::init_logging`] cover configuration
//!   and diagnostics.

pub mod codec;
pub mod config;
pub mod handle;
pub mod hints;
pub mod logging;
pub mod pixels;
pub mod sampler;
pub mod search_paths;
pub mod state;
pub mod texture;

pub use codec::{DecodedImage, ImageCodec, PngCodec};
pub use config::ResourceConfig;
pub use handle::{FramebufferHandle, TextureHandle};
pub use hints::Hints;
pub use pixels::{colors_from_image, image_from_colors, typed_view, DataChannel};
pub use sampler::{EnvMode, Filter, SamplerState, Wrap};
pub use search_paths::SearchPaths;
pub use state::{BoundingBox, Color, PrimitiveState, MAX_TEXTURE_UNITS};
pub use texture::{
    CreateParams, CubeFace, CubeMapAssembly, PixelFormat, TextureDescriptor, TextureTarget,
};

// Math types appear in the public API.
pub use glam;
