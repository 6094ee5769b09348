//! Asset intake: validation, decoding and preview sizing.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::backend::ImageDecoder;
use crate::config::CropperConfig;
use crate::error::CropError;
use crate::geometry::PreviewSurface;

/// Raw image bytes plus the content type the caller declared for them.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

impl ImageAsset {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.map(str::to_owned),
        }
    }

    /// Reads a file, declaring its content type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CropError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            CropError::InvalidAsset(format!("unable to read {}: {e}", path.display()))
        })?;
        let content_type = ImageFormat::from_path(path)
            .ok()
            .map(|format| format.to_mime_type());
        Ok(Self::new(bytes, content_type))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Pre-flight check applied before a crop session is opened.
    pub fn validate(&self, max_bytes: u64) -> Result<(), CropError> {
        let is_image = self
            .content_type()
            .is_some_and(|t| t.trim().to_ascii_lowercase().starts_with("image/"));
        if !is_image {
            return Err(CropError::InvalidAsset(
                "Please select a valid image file.".to_string(),
            ));
        }

        if self.len() as u64 > max_bytes {
            return Err(CropError::InvalidAsset(format!(
                "Image must be {}MB or smaller.",
                max_bytes / (1024 * 1024)
            )));
        }

        Ok(())
    }
}

/// A decoded source bitmap and the preview surface sized for it.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    bitmap: DynamicImage,
    surface: PreviewSurface,
    content_type: Option<String>,
}

impl LoadedImage {
    pub fn new(bitmap: DynamicImage, surface: PreviewSurface, content_type: Option<String>) -> Self {
        Self {
            bitmap,
            surface,
            content_type,
        }
    }

    pub fn bitmap(&self) -> &DynamicImage {
        &self.bitmap
    }

    pub fn source_width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn source_height(&self) -> u32 {
        self.bitmap.height()
    }

    pub fn surface(&self) -> PreviewSurface {
        self.surface
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The bitmap scaled to exactly fill the preview surface.
    pub fn preview_bitmap(&self, filter: FilterType) -> DynamicImage {
        if self.bitmap.dimensions() == (self.surface.width, self.surface.height) {
            return self.bitmap.clone();
        }
        self.bitmap
            .resize_exact(self.surface.width, self.surface.height, filter)
    }
}

/// Fits `source` inside the configured preview bounds without upscaling,
/// then applies the minimum floor to each axis.
pub fn compute_preview_surface(
    source_width: u32,
    source_height: u32,
    config: &CropperConfig,
) -> PreviewSurface {
    let sw = f64::from(source_width.max(1));
    let sh = f64::from(source_height.max(1));
    let scale = (f64::from(config.max_preview_width) / sw)
        .min(f64::from(config.max_preview_height) / sh)
        .min(1.0);

    let width = ((sw * scale).round() as u32).max(config.min_preview_width).max(1);
    let height = ((sh * scale).round() as u32).max(config.min_preview_height).max(1);
    PreviewSurface::new(width, height)
}

/// Decodes assets and sizes their preview surface.
#[derive(Debug, Clone, Default)]
pub struct ImageLoader {
    config: CropperConfig,
}

impl ImageLoader {
    pub fn new(config: CropperConfig) -> Self {
        Self { config }
    }

    pub fn load(
        &self,
        asset: &ImageAsset,
        decoder: &dyn ImageDecoder,
    ) -> Result<LoadedImage, CropError> {
        if asset.is_empty() {
            return Err(CropError::Decode("image payload is empty".to_string()));
        }

        let bitmap = decoder.decode(asset)?;
        let (source_width, source_height) = bitmap.dimensions();
        if source_width == 0 || source_height == 0 {
            return Err(CropError::Decode(format!(
                "decoded image has no pixels ({source_width}x{source_height})"
            )));
        }

        let surface = compute_preview_surface(source_width, source_height, &self.config);
        log::info!(
            "loaded {}x{} image ({}), preview {}x{}",
            source_width,
            source_height,
            asset.content_type().unwrap_or("unknown type"),
            surface.width,
            surface.height
        );

        Ok(LoadedImage::new(
            bitmap,
            surface,
            asset.content_type().map(str::to_owned),
        ))
    }
}
