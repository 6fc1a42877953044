//! The graphics device seam used by the scene resource layer.
//!
//! This crate defines the [`GlDevice`] trait, the set of texture,
//! framebuffer, state and draw calls the resource layer issues. On a real
//! context [`RawGlDevice`] implements it with raw `gl` calls against an
//! OpenGL 3.2+ core profile. With the `recording` feature,
//! [`RecordingDevice`] implements it in memory so the resource layer can be
//! tested without a context.

pub mod device;
pub mod loader;
mod program;
pub mod raw;
mod saved_state;

#[cfg(feature = "recording")]
pub mod recording;

pub use device::{
    Capabilities, CubeFaceImage, DrawMode, GlDevice, ImageUpload, PixelData, PixelRect,
    PolygonMode, QuadDraw, UploadFormat, VertexArrays,
};
pub use loader::load_gl;
pub use raw::RawGlDevice;

#[cfg(feature = "recording")]
pub use recording::{GlCall, RecordingDevice, TexImage};
