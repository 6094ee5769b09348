//! Interactive image-crop selection engine.
//!
//! A crop runs as a [`CropSession`]: the [`loader`] decodes the asset and
//! sizes a preview surface, the [`selection`] state machine turns pointer
//! events into a clamped (and optionally aspect-locked) rectangle on that
//! surface, and the [`render`] module maps the rectangle back onto source
//! pixels and encodes the result.
//!
//! ```no_run
//! use image_cropper::{CropOptions, CropSession, CropperConfig, ImageAsset, Point, PointerId, StandardDecoder};
//!
//! # fn main() -> Result<(), image_cropper::CropError> {
//! let asset = ImageAsset::from_path("photo.jpg")?;
//! let mut session = CropSession::open(
//!     asset,
//!     CropOptions::default().with_aspect_ratio(1.0),
//!     CropperConfig::default(),
//!     &StandardDecoder::default(),
//! );
//! session.pointer_down(PointerId::PRIMARY, Point::new(10.0, 10.0));
//! session.pointer_move(PointerId::PRIMARY, Point::new(200.0, 180.0));
//! session.pointer_up(PointerId::PRIMARY);
//! let cropped = session.confirm()?;
//! println!("{}x{} {}", cropped.width, cropped.height, cropped.content_type());
//! # Ok(())
//! # }
//! ```

pub mod aspect;
pub mod backend;
pub mod config;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod render;
pub mod selection;
pub mod session;

pub use aspect::AspectPreset;
pub use backend::{ImageDecoder, ImageEncoder, RasterContext, ResizeRaster, StandardDecoder, StandardEncoder};
pub use config::{CropOptions, CropperConfig, OutputFormat};
pub use error::CropError;
pub use geometry::{Point, PreviewSurface, SelectionRect};
pub use loader::{ImageAsset, ImageLoader, LoadedImage, compute_preview_surface};
pub use render::{CropRenderer, EncodedImage, SourceRegion, map_to_source, output_size};
pub use selection::{InteractionMode, PointerId, SelectionLimits, SelectionState};
pub use session::{CompletedLoad, CropSession, PendingLoad, SessionState};
