//! imgelf renders placeholder images: a canvas of the requested size, filled with a background
//! color and stamped with a centered label (by default `"{width} x {height}"`), encoded as PNG,
//! JPEG, GIF, WebP, TIFF, ICO or BMP.
//!
//! # Pipeline overview
//!
//! 1. **Validate**: raw `width`, `height` and format strings are checked together against the
//!    format's limits narrowed by a process-wide cap ([`validate()`]). Every failing field is
//!    reported at once.
//! 2. **Render**: the resolved [`FormatVariant`] fills a [`Canvas`] and draws the label so its ink
//!    box is centered ([`TextRasterizer`]).
//! 3. **Encode**: the same variant serializes the canvas into an [`EncodedImage`] carrying the
//!    MIME type and download filename.
//!
//! [`ImageService`] wraps the three steps and owns the shared, atomically swappable active
//! format. HTTP routing, templates and process bootstrap live outside this crate.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod encode;
mod format;
mod foundation;
mod render;
mod service;
mod validate;

pub use config::{DEFAULT_MAX_DIMENSION, ServiceConfig};
pub use encode::EncodedImage;
pub use format::registry::{
    ActiveFormat, FormatKind, resolve as resolve_format, variant, variants,
};
pub use format::variant::{Bmp, FormatVariant, Gif, Ico, JPEG_QUALITY, Jpeg, Png, Tiff, WebP};
pub use foundation::core::{Color, ColorMode, DimensionLimits, Point, Rect};
pub use foundation::error::{ImgElfError, ImgElfResult};
pub use render::canvas::{Canvas, RenderOptions, RenderRequest, font_size_for};
pub use render::text::{TextLayout, TextRasterizer, centered_origin};
pub use service::ImageService;
pub use validate::{
    Field, ValidatedRequest, ValidationErrors, effective_limits, validate, validate_request,
};
