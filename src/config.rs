//! Tunables and per-session options.
//!
//! `CropperConfig` holds the knobs that stay fixed for a deployment (preview
//! bounds, thresholds, resource ceilings). `CropOptions` holds what a caller
//! chooses for one crop: aspect lock, output format and size bounds.

use std::fmt;
use std::str::FromStr;

use image::imageops::FilterType;

/// Deployment-wide crop settings.
#[derive(Debug, Clone)]
pub struct CropperConfig {
    /// Largest preview surface, in display pixels.
    pub max_preview_width: u32,
    pub max_preview_height: u32,
    /// Floor applied to each preview dimension so tiny images stay usable.
    pub min_preview_width: u32,
    pub min_preview_height: u32,
    /// A selection narrower or shorter than this on pointer-up is treated as a tap.
    pub min_selection: f32,
    /// Share of each surface axis covered by the default selection.
    pub default_coverage: f32,
    /// Tolerance used when deciding whether a selection covers the whole surface.
    pub full_cover_epsilon: f32,
    /// Encoding quality used when the caller does not pick one.
    pub default_quality: f32,
    /// Largest payload accepted by `ImageAsset::validate`.
    pub max_asset_bytes: u64,
    /// Largest `width * height` the loader will fully decode.
    pub max_decoded_pixels: u64,
    /// Filter used when downsampling previews and output.
    pub resize_filter: FilterType,
}

impl Default for CropperConfig {
    fn default() -> Self {
        Self {
            max_preview_width: 760,
            max_preview_height: 460,
            min_preview_width: 240,
            min_preview_height: 180,
            min_selection: 22.0,
            default_coverage: 0.88,
            full_cover_epsilon: 1.0,
            default_quality: 0.9,
            max_asset_bytes: 10 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            resize_filter: FilterType::Triangle,
        }
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    /// Format implied by a declared content type. Unknown or lossless-only
    /// types other than PNG/WebP fall back to JPEG.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("image/png") => Self::Png,
            Some("image/webp") => Self::WebP,
            _ => Self::Jpeg,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" | "image/jpeg" => Ok(Self::Jpeg),
            "png" | "image/png" => Ok(Self::Png),
            "webp" | "image/webp" => Ok(Self::WebP),
            other => Err(format!(
                "unknown output format: {other} (expected jpeg, png or webp)"
            )),
        }
    }
}

/// Caller choices for a single crop session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropOptions {
    pub title: Option<String>,
    /// Width / height. `None` or a non-positive value means free-form.
    pub aspect_ratio: Option<f32>,
    /// `None` infers the format from the asset's content type.
    pub output_format: Option<OutputFormat>,
    /// Encoding quality in `[0, 1]`.
    pub quality: Option<f32>,
    pub max_output_width: Option<u32>,
    pub max_output_height: Option<u32>,
}

impl CropOptions {
    pub fn with_aspect_ratio(mut self, ratio: f32) -> Self {
        self.aspect_ratio = Some(ratio);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_max_output(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.max_output_width = width;
        self.max_output_height = height;
        self
    }

    /// The aspect lock, if one is actually in effect.
    pub fn effective_aspect_ratio(&self) -> Option<f32> {
        normalize_ratio(self.aspect_ratio)
    }

    pub fn resolve_format(&self, content_type: Option<&str>) -> OutputFormat {
        self.output_format
            .unwrap_or_else(|| OutputFormat::from_content_type(content_type))
    }

    pub fn resolve_quality(&self, config: &CropperConfig) -> f32 {
        let quality = self.quality.unwrap_or(config.default_quality);
        if quality.is_finite() {
            quality.clamp(0.0, 1.0)
        } else {
            config.default_quality
        }
    }

    pub fn resolve_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Crop Image")
    }
}

pub(crate) fn normalize_ratio(ratio: Option<f32>) -> Option<f32> {
    ratio.filter(|r| r.is_finite() && *r > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_inferred_from_content_type() {
        assert_eq!(OutputFormat::from_content_type(Some("image/png")), OutputFormat::Png);
        assert_eq!(OutputFormat::from_content_type(Some("IMAGE/WEBP")), OutputFormat::WebP);
        assert_eq!(OutputFormat::from_content_type(Some("image/gif")), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_content_type(None), OutputFormat::Jpeg);
    }

    #[test]
    fn explicit_format_wins_over_content_type() {
        let options = CropOptions::default().with_output_format(OutputFormat::WebP);
        assert_eq!(options.resolve_format(Some("image/png")), OutputFormat::WebP);
    }

    #[test]
    fn non_positive_ratio_means_free_form() {
        assert_eq!(CropOptions::default().with_aspect_ratio(0.0).effective_aspect_ratio(), None);
        assert_eq!(CropOptions::default().with_aspect_ratio(-2.0).effective_aspect_ratio(), None);
        assert_eq!(
            CropOptions::default().with_aspect_ratio(f32::NAN).effective_aspect_ratio(),
            None
        );
        assert_eq!(
            CropOptions::default().with_aspect_ratio(1.5).effective_aspect_ratio(),
            Some(1.5)
        );
    }

    #[test]
    fn quality_defaults_and_clamps() {
        let config = CropperConfig::default();
        assert_eq!(CropOptions::default().resolve_quality(&config), 0.9);
        assert_eq!(CropOptions::default().with_quality(3.0).resolve_quality(&config), 1.0);
        assert_eq!(CropOptions::default().with_quality(-1.0).resolve_quality(&config), 0.0);
    }

    #[test]
    fn blank_title_falls_back() {
        let options = CropOptions {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(options.resolve_title(), "Crop Image");
    }

    #[test]
    fn parses_format_names() {
        assert_eq!("JPG".parse::<OutputFormat>(), Ok(OutputFormat::Jpeg));
        assert_eq!("image/png".parse::<OutputFormat>(), Ok(OutputFormat::Png));
        assert!("tiff".parse::<OutputFormat>().is_err());
    }
}
