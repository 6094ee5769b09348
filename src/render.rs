//! Preview-to-source mapping and final output rendering.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::backend::{ImageEncoder, RasterContext, ResizeRaster, StandardEncoder};
use crate::config::{CropOptions, CropperConfig, OutputFormat};
use crate::error::CropError;
use crate::geometry::{PreviewSurface, SelectionRect};
use crate::loader::LoadedImage;

/// A crop region in source pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SourceRegion {
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }
}

/// Maps a preview-space selection onto the source pixel grid.
///
/// Scales are computed per axis because the preview floor can make the
/// surface's aspect differ slightly from the source's. The result always has
/// at least one pixel on each axis and never reaches past the source edge.
pub fn map_to_source(
    selection: SelectionRect,
    surface: PreviewSurface,
    source_width: u32,
    source_height: u32,
) -> SourceRegion {
    let scale_x = f64::from(source_width) / f64::from(surface.width.max(1));
    let scale_y = f64::from(source_height) / f64::from(surface.height.max(1));

    let x = (f64::from(selection.x) * scale_x).round().max(0.0) as u32;
    let y = (f64::from(selection.y) * scale_y).round().max(0.0) as u32;
    let width = (f64::from(selection.width) * scale_x).round().max(1.0) as u32;
    let height = (f64::from(selection.height) * scale_y).round().max(1.0) as u32;

    let x = x.min(source_width.saturating_sub(1));
    let y = y.min(source_height.saturating_sub(1));
    SourceRegion {
        x,
        y,
        width: width.min(source_width - x).max(1),
        height: height.min(source_height - y).max(1),
    }
}

/// Output dimensions for a region, shrunk proportionally to fit the optional
/// bounds. Never upsamples. A bound of zero counts as unset.
pub fn output_size(
    width: u32,
    height: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> (u32, u32) {
    let max_width = max_width.filter(|w| *w > 0);
    let max_height = max_height.filter(|h| *h > 0);
    if max_width.is_none() && max_height.is_none() {
        return (width, height);
    }

    let width_factor = max_width.map_or(f64::INFINITY, |m| f64::from(m) / f64::from(width.max(1)));
    let height_factor =
        max_height.map_or(f64::INFINITY, |m| f64::from(m) / f64::from(height.max(1)));
    let factor = width_factor.min(height_factor).min(1.0);

    let scaled = |dim: u32| ((f64::from(dim) * factor).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// The final encoded crop.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// `data:<mime>;base64,<payload>`, the form uploads expect.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type(), BASE64.encode(&self.bytes))
    }
}

/// Draws and encodes the committed selection.
pub struct CropRenderer {
    config: CropperConfig,
    raster: Box<dyn RasterContext>,
    encoder: Box<dyn ImageEncoder>,
}

impl Default for CropRenderer {
    fn default() -> Self {
        Self::new(CropperConfig::default())
    }
}

impl CropRenderer {
    pub fn new(config: CropperConfig) -> Self {
        let raster = ResizeRaster::new(config.resize_filter);
        Self::with_backends(config, raster, StandardEncoder)
    }

    pub fn with_backends(
        config: CropperConfig,
        raster: impl RasterContext + 'static,
        encoder: impl ImageEncoder + 'static,
    ) -> Self {
        Self {
            config,
            raster: Box::new(raster),
            encoder: Box::new(encoder),
        }
    }

    /// One deterministic pass: map, draw, encode. Any failure is returned as
    /// is; nothing is retried here.
    pub fn render(
        &self,
        image: &LoadedImage,
        selection: SelectionRect,
        options: &CropOptions,
    ) -> Result<EncodedImage, CropError> {
        let region = map_to_source(
            selection,
            image.surface(),
            image.source_width(),
            image.source_height(),
        );
        let (width, height) = output_size(
            region.width,
            region.height,
            options.max_output_width,
            options.max_output_height,
        );

        let drawn = self
            .raster
            .draw_region(image.bitmap(), region, width, height)?;

        let format = options.resolve_format(image.content_type());
        let quality = options.resolve_quality(&self.config);
        let bytes = self.encoder.encode(&drawn, format, quality)?;

        log::info!(
            "rendered source region {}x{}+{}+{} to {}x{} {} ({} bytes)",
            region.width,
            region.height,
            region.x,
            region.y,
            drawn.width(),
            drawn.height(),
            format,
            bytes.len()
        );

        Ok(EncodedImage {
            bytes,
            format,
            width: drawn.width(),
            height: drawn.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_half_scale_preview_to_source() {
        let region = map_to_source(
            SelectionRect::new(100.0, 80.0, 200.0, 160.0),
            PreviewSurface::new(500, 400),
            1000,
            800,
        );
        assert_eq!(
            region,
            SourceRegion {
                x: 200,
                y: 160,
                width: 400,
                height: 320
            }
        );
    }

    #[test]
    fn mapping_rounds_and_floors() {
        let region = map_to_source(
            SelectionRect::new(0.2, 0.2, 0.1, 0.1),
            PreviewSurface::new(300, 300),
            300,
            300,
        );
        assert_eq!(
            region,
            SourceRegion {
                x: 0,
                y: 0,
                width: 1,
                height: 1
            }
        );
    }

    #[test]
    fn mapping_stays_inside_source() {
        // 100x100 source on a floored 240x180 surface.
        let region = map_to_source(
            SelectionRect::new(0.0, 0.0, 240.0, 180.0),
            PreviewSurface::new(240, 180),
            100,
            100,
        );
        assert_eq!(region.right(), 100);
        assert_eq!(region.bottom(), 100);
    }

    #[test]
    fn output_clamped_by_width() {
        assert_eq!(output_size(800, 600, Some(400), None), (400, 300));
    }

    #[test]
    fn output_uses_tighter_bound() {
        assert_eq!(output_size(800, 600, Some(400), Some(150)), (200, 150));
    }

    #[test]
    fn output_never_upsamples() {
        assert_eq!(output_size(100, 50, Some(1000), Some(1000)), (100, 50));
        assert_eq!(output_size(100, 50, Some(0), None), (100, 50));
    }

    #[test]
    fn output_keeps_at_least_one_pixel() {
        assert_eq!(output_size(1000, 2, Some(10), None), (10, 1));
    }

    #[test]
    fn data_url_carries_mime_type() {
        let encoded = EncodedImage {
            bytes: vec![1, 2, 3],
            format: OutputFormat::Png,
            width: 1,
            height: 1,
        };
        assert_eq!(encoded.to_data_url(), "data:image/png;base64,AQID");
    }
}
