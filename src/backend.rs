//! Platform seams: decoding, raster drawing and encoding.
//!
//! Everything above this module is plain geometry. The defaults here are
//! backed by `image` and `fast_image_resize`; tests swap in fakes.

use std::io::Cursor;

use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageReader, Rgba};

use crate::config::OutputFormat;
use crate::error::CropError;
use crate::loader::ImageAsset;
use crate::render::SourceRegion;

/// Turns raw asset bytes into a bitmap.
pub trait ImageDecoder {
    fn decode(&self, asset: &ImageAsset) -> Result<DynamicImage, CropError>;
}

/// Draws a region of a source bitmap into a surface of the given size.
pub trait RasterContext {
    fn draw_region(
        &self,
        source: &DynamicImage,
        region: SourceRegion,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, CropError>;
}

/// Encodes a bitmap into an output format.
pub trait ImageEncoder {
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, CropError>;
}

/// Decoder backed by the `image` crate.
///
/// Reads the header first and refuses images whose pixel count exceeds
/// `max_decoded_pixels` before committing to a full decode.
#[derive(Debug, Clone)]
pub struct StandardDecoder {
    pub max_decoded_pixels: u64,
}

impl Default for StandardDecoder {
    fn default() -> Self {
        Self {
            max_decoded_pixels: crate::config::CropperConfig::default().max_decoded_pixels,
        }
    }
}

impl StandardDecoder {
    pub fn new(max_decoded_pixels: u64) -> Self {
        Self { max_decoded_pixels }
    }

    fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), CropError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CropError::Decode(format!("unable to sniff image format: {e}")))?;

        if reader.format().is_none() {
            return Err(CropError::Decode("unrecognised image format".to_string()));
        }

        reader
            .into_dimensions()
            .map_err(|e| CropError::Decode(format!("unable to read image dimensions: {e}")))
    }
}

impl ImageDecoder for StandardDecoder {
    fn decode(&self, asset: &ImageAsset) -> Result<DynamicImage, CropError> {
        let bytes = asset.bytes();
        if bytes.is_empty() {
            return Err(CropError::Decode("image payload is empty".to_string()));
        }

        let (width, height) = Self::inspect_dimensions(bytes)?;
        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.max_decoded_pixels {
            return Err(CropError::Decode(format!(
                "image is too large: {width}x{height} ({pixels} pixels, limit {})",
                self.max_decoded_pixels
            )));
        }

        image::load_from_memory(bytes)
            .map_err(|e| CropError::Decode(format!("image decode failed: {e}")))
    }
}

/// Raster context that crops with `image` and downsamples with
/// `fast_image_resize`, falling back to `image::resize_exact`.
#[derive(Debug, Clone)]
pub struct ResizeRaster {
    pub filter: FilterType,
}

impl Default for ResizeRaster {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl ResizeRaster {
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }

    fn resize_with_fast_image_resize(
        &self,
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
    ) -> Result<DynamicImage, CropError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| CropError::Render(format!("unable to wrap source pixels: {e}")))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(self.filter)));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| CropError::Render(format!("resize failed: {e}")))?;

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
            target_width,
            target_height,
            dst_image.into_vec(),
        )
        .ok_or_else(|| CropError::Render("resized buffer has the wrong length".to_string()))?;

        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

impl RasterContext for ResizeRaster {
    fn draw_region(
        &self,
        source: &DynamicImage,
        region: SourceRegion,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, CropError> {
        if width == 0 || height == 0 {
            return Err(CropError::Render(format!(
                "cannot create a {width}x{height} drawing surface"
            )));
        }

        let (source_width, source_height) = source.dimensions();
        if region.width == 0
            || region.height == 0
            || region.right() > source_width
            || region.bottom() > source_height
        {
            return Err(CropError::Render(format!(
                "region {region:?} does not fit a {source_width}x{source_height} source"
            )));
        }

        let cropped = source.crop_imm(region.x, region.y, region.width, region.height);
        if cropped.dimensions() == (width, height) {
            return Ok(cropped);
        }

        match self.resize_with_fast_image_resize(&cropped, width, height) {
            Ok(resized) => Ok(resized),
            Err(err) => {
                log::warn!("fast_image_resize failed, falling back to resize_exact: {err}");
                Ok(cropped.resize_exact(width, height, self.filter))
            }
        }
    }
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}

/// Encoder backed by the `image` codecs.
///
/// JPEG and WebP honour `quality`; PNG is written losslessly. The `image`
/// WebP encoder is lossless only, so below full quality the colour channels
/// are quantised first, trading fidelity for a smaller payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEncoder;

impl ImageEncoder for StandardEncoder {
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, CropError> {
        let mut bytes = Vec::new();

        let result = match format {
            OutputFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut bytes, percent_quality(quality));
                // JPEG has no alpha channel.
                DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)
            }
            OutputFormat::Png => {
                let encoder = PngEncoder::new(&mut bytes);
                to_8bit(image).write_with_encoder(encoder)
            }
            OutputFormat::WebP => {
                let mut bitmap = to_8bit(image);
                let percent = percent_quality(quality);
                if percent < 100 {
                    log::debug!("quantising webp colours at quality {percent}");
                    quantize_for_webp(&mut bitmap, percent);
                }
                let encoder = WebPEncoder::new_lossless(&mut bytes);
                bitmap.write_with_encoder(encoder)
            }
        };

        result.map_err(|e| CropError::Render(format!("{format} encoding failed: {e}")))?;
        Ok(bytes)
    }
}

fn percent_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Snaps colour channels to a coarser palette. Alpha is left untouched.
fn quantize_for_webp(image: &mut DynamicImage, quality: u8) {
    let step = 255.0 / (webp_levels(quality) as f32 - 1.0);
    let snap = |channel: &mut u8| {
        let bucket = (f32::from(*channel) / step).round();
        *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
    };

    match image {
        DynamicImage::ImageRgba8(rgba) => rgba
            .pixels_mut()
            .for_each(|pixel| pixel.0.iter_mut().take(3).for_each(snap)),
        DynamicImage::ImageRgb8(rgb) => rgb
            .pixels_mut()
            .for_each(|pixel| pixel.0.iter_mut().for_each(snap)),
        _ => {}
    }
}

/// Palette size per channel; quadratic so high qualities stay close to lossless.
fn webp_levels(quality: u8) -> u16 {
    if quality >= 100 {
        return 256;
    }
    let normalized = f32::from(quality.max(1)) / 100.0;
    (2.0 + normalized * normalized * 254.0).round().clamp(2.0, 256.0) as u16
}

fn to_8bit(image: &DynamicImage) -> DynamicImage {
    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage, Rgb};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png() {
        let asset = ImageAsset::new(png_bytes(8, 6), Some("image/png"));
        let decoded = StandardDecoder::default().decode(&asset).unwrap();
        assert_eq!(decoded.dimensions(), (8, 6));
    }

    #[test]
    fn rejects_empty_and_garbage() {
        let decoder = StandardDecoder::default();
        let empty = ImageAsset::new(Vec::new(), Some("image/png"));
        assert!(matches!(decoder.decode(&empty), Err(CropError::Decode(_))));

        let garbage = ImageAsset::new(b"definitely not an image".to_vec(), Some("image/png"));
        assert!(matches!(decoder.decode(&garbage), Err(CropError::Decode(_))));
    }

    #[test]
    fn rejects_oversized_header_before_decoding() {
        let asset = ImageAsset::new(png_bytes(20, 20), None);
        let err = StandardDecoder::new(100).decode(&asset).unwrap_err();
        assert!(matches!(err, CropError::Decode(message) if message.contains("too large")));
    }

    #[test]
    fn draws_region_at_requested_size() {
        let source = DynamicImage::ImageRgb8(RgbImage::new(100, 80));
        let region = SourceRegion {
            x: 10,
            y: 10,
            width: 60,
            height: 40,
        };
        let raster = ResizeRaster::default();

        let same = raster.draw_region(&source, region, 60, 40).unwrap();
        assert_eq!(same.dimensions(), (60, 40));

        let smaller = raster.draw_region(&source, region, 30, 20).unwrap();
        assert_eq!(smaller.dimensions(), (30, 20));
    }

    #[test]
    fn refuses_empty_surface_and_out_of_bounds_region() {
        let source = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let raster = ResizeRaster::default();
        let inside = SourceRegion {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
        };
        assert!(matches!(
            raster.draw_region(&source, inside, 0, 5),
            Err(CropError::Render(_))
        ));

        let outside = SourceRegion {
            x: 5,
            y: 0,
            width: 10,
            height: 10,
        };
        assert!(matches!(
            raster.draw_region(&source, outside, 5, 5),
            Err(CropError::Render(_))
        ));
    }

    #[test]
    fn encodes_every_format() {
        let image = DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4));
        for format in [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::WebP] {
            let bytes = StandardEncoder.encode(&image, format, 0.8).unwrap();
            let expected = match format {
                OutputFormat::Jpeg => ImageFormat::Jpeg,
                OutputFormat::Png => ImageFormat::Png,
                OutputFormat::WebP => ImageFormat::WebP,
            };
            assert_eq!(image::guess_format(&bytes).unwrap(), expected);
        }
    }

    #[test]
    fn quality_maps_to_percent() {
        assert_eq!(percent_quality(0.9), 90);
        assert_eq!(percent_quality(0.0), 1);
        assert_eq!(percent_quality(2.0), 100);
    }

    #[test]
    fn lower_webp_quality_shrinks_payload() {
        let image = DynamicImage::ImageRgba8(image::RgbaImage::from_fn(200, 200, |x, y| {
            Rgba([
                (x * 7 % 256) as u8,
                (y * 5 % 256) as u8,
                ((x * y) % 256) as u8,
                255,
            ])
        }));

        let low = StandardEncoder.encode(&image, OutputFormat::WebP, 0.1).unwrap();
        let high = StandardEncoder.encode(&image, OutputFormat::WebP, 1.0).unwrap();
        assert!(low.len() < high.len(), "q0.1={} q1.0={}", low.len(), high.len());

        let decoded = image::load_from_memory(&low).unwrap();
        assert_eq!(decoded.dimensions(), (200, 200));
    }

    #[test]
    fn webp_quantisation_keeps_alpha() {
        let mut image = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            2,
            2,
            Rgba([13, 140, 201, 77]),
        ));
        quantize_for_webp(&mut image, 10);
        let pixel = image.to_rgba8().get_pixel(0, 0).0;
        assert_eq!(pixel[3], 77);
        assert_eq!(webp_levels(10), 5);
        // Five levels: 0, 63.75, 127.5, 191.25, 255.
        assert_eq!(&pixel[..3], &[0, 128, 191]);
    }
}
