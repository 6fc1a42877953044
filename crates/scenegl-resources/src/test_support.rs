//! In-memory collaborators for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, Result};
use scenegl_core::{DecodedImage, ImageCodec, PixelFormat};

/// Codec over a shared in-memory file table that counts decodes.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryCodec {
    files: Rc<RefCell<HashMap<PathBuf, DecodedImage>>>,
    decodes: Rc<Cell<usize>>,
}

impl MemoryCodec {
    pub(crate) fn insert(&self, path: impl Into<PathBuf>, image: DecodedImage) {
        self.files.borrow_mut().insert(path.into(), image);
    }

    pub(crate) fn decodes(&self) -> usize {
        self.decodes.get()
    }

    pub(crate) fn file(&self, path: impl AsRef<Path>) -> Option<DecodedImage> {
        self.files.borrow().get(path.as_ref()).cloned()
    }
}

impl ImageCodec for MemoryCodec {
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        self.decodes.set(self.decodes.get() + 1);
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("{}: no such file", path.display()))
    }

    fn encode(&self, path: &Path, image: &DecodedImage) -> Result<()> {
        self.insert(path, image.clone());
        Ok(())
    }
}

/// A solid RGBA image.
pub(crate) fn rgba(width: u32, height: u32, fill: [u8; 4]) -> DecodedImage {
    let pixels = fill.repeat(width as usize * height as usize);
    DecodedImage {
        width,
        height,
        format: PixelFormat::Rgba,
        pixels,
    }
}
