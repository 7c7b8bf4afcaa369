use crate::error::RenderError;
use image::GenericImageView;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Decoded pixel size of a resolved image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width_px: u32,
    pub height_px: u32,
}

/// Turns a stored image handle into decoded dimensions.
pub trait ImageResolver: Send + Sync {
    fn resolve(&self, handle: &str) -> Result<ImageInfo, RenderError>;
}

pub(crate) fn decode_dimensions(handle: &str, bytes: &[u8]) -> Result<ImageInfo, RenderError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|err| RenderError::Asset(format!("cannot decode image '{handle}': {err}")))?;
    let (width_px, height_px) = decoded.dimensions();
    if width_px == 0 || height_px == 0 {
        return Err(RenderError::Asset(format!("image '{handle}' is empty")));
    }
    Ok(ImageInfo {
        width_px,
        height_px,
    })
}

/// Images held in memory, keyed by handle.
#[derive(Debug, Clone, Default)]
pub struct AssetBundle {
    images: HashMap<String, Vec<u8>>,
}

impl AssetBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_image(&mut self, handle: impl Into<String>, data: Vec<u8>) {
        self.images.insert(handle.into(), data);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ImageResolver for AssetBundle {
    fn resolve(&self, handle: &str) -> Result<ImageInfo, RenderError> {
        let Some(bytes) = self.images.get(handle) else {
            return Err(RenderError::Asset(format!("image '{handle}' not found")));
        };
        decode_dimensions(handle, bytes)
    }
}

/// Images stored as files under one root directory. Handles are relative paths
/// and may not climb out of the root.
#[derive(Debug, Clone)]
pub struct DirImageResolver {
    root: PathBuf,
}

impl DirImageResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, handle: &str) -> Result<PathBuf, RenderError> {
        let relative = Path::new(handle);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if handle.trim().is_empty() || escapes {
            return Err(RenderError::Asset(format!(
                "image handle '{handle}' is not a relative path"
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl ImageResolver for DirImageResolver {
    fn resolve(&self, handle: &str) -> Result<ImageInfo, RenderError> {
        let path = self.path_for(handle)?;
        let bytes = std::fs::read(&path)
            .map_err(|err| RenderError::Asset(format!("cannot read {}: {err}", path.display())))?;
        decode_dimensions(handle, &bytes)
    }
}

/// Resolver with nothing in it; every image degrades to a placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImages;

impl ImageResolver for NoImages {
    fn resolve(&self, handle: &str) -> Result<ImageInfo, RenderError> {
        Err(RenderError::Asset(format!("image '{handle}' not found")))
    }
}
