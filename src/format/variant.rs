use std::fmt;

use image::DynamicImage;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;

use crate::encode::{EncodedImage, encode_with};
use crate::foundation::core::{ColorMode, DimensionLimits};
use crate::foundation::error::ImgElfResult;
use crate::format::registry::FormatKind;
use crate::render::canvas::{self, Canvas, RenderRequest};
use crate::render::text::TextRasterizer;

/// JPEG quality used for every encode.
pub const JPEG_QUALITY: u8 = 75;

/// NeuQuant sampling factor for GIF palettes (1 is slowest, 30 fastest).
const GIF_QUANTIZE_SPEED: i32 = 10;

/// Capabilities shared by every output format.
///
/// The set of implementations is closed; obtain them through [`crate::variant`] or
/// [`crate::resolve_format`].
pub trait FormatVariant: Send + Sync + fmt::Debug {
    /// Registry discriminant.
    fn kind(&self) -> FormatKind;

    /// Native dimension bounds of the container format.
    fn config_limits(&self) -> DimensionLimits;

    /// Closed-form, advisory estimate of the encoded size in bytes.
    ///
    /// `mode` of `None` uses the format's typical bit depth.
    fn estimate_file_size(&self, width: u32, height: u32, mode: Option<ColorMode>) -> u64;

    /// Whether a canvas in `mode` can be encoded without conversion.
    fn supports(&self, mode: ColorMode) -> bool {
        mode.is_renderable()
    }

    /// Rasterize the background and the centered label.
    fn render(&self, request: &RenderRequest, text: &TextRasterizer) -> ImgElfResult<Canvas> {
        canvas::render(request, text)
    }

    /// Serialize `canvas` with this format's encoder.
    fn encode(&self, canvas: Canvas) -> ImgElfResult<EncodedImage> {
        let format = self.kind().image_format();
        encode_with(self, canvas, |image, out| image.write_to(out, format))
    }

    /// Lowercase format name.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// `image/<name>`.
    fn mime_type(&self) -> String {
        self.kind().mime_type()
    }

    /// File extension without the dot.
    fn file_extension(&self) -> &'static str {
        self.kind().file_extension()
    }
}

fn bits_per_pixel(mode: Option<ColorMode>, default_bpp: u32) -> u64 {
    u64::from(mode.map_or(default_bpp, ColorMode::bits_per_pixel))
}

fn channels(mode: Option<ColorMode>) -> u64 {
    u64::from(mode.map_or(3, ColorMode::channels))
}

fn pixels(width: u32, height: u32) -> u64 {
    u64::from(width) * u64::from(height)
}

fn raw_bytes(width: u32, height: u32, bpp: u64) -> u64 {
    pixels(width, height) * bpp / 8
}

/// Portable Network Graphics.
#[derive(Clone, Copy, Debug, Default)]
pub struct Png;

impl FormatVariant for Png {
    fn kind(&self) -> FormatKind {
        FormatKind::Png
    }

    fn config_limits(&self) -> DimensionLimits {
        DimensionLimits::square(1, 100_000)
    }

    // Deflate on flat placeholder content lands well under half the raw size; half is the
    // conservative average.
    fn estimate_file_size(&self, width: u32, height: u32, mode: Option<ColorMode>) -> u64 {
        raw_bytes(width, height, bits_per_pixel(mode, 24)) / 2
    }
}

/// JPEG at [`JPEG_QUALITY`]. Has no alpha channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct Jpeg;

impl FormatVariant for Jpeg {
    fn kind(&self) -> FormatKind {
        FormatKind::Jpeg
    }

    fn config_limits(&self) -> DimensionLimits {
        DimensionLimits::square(1, 65_535)
    }

    fn estimate_file_size(&self, width: u32, height: u32, mode: Option<ColorMode>) -> u64 {
        pixels(width, height) * channels(mode) * 15 / 100
    }

    fn supports(&self, mode: ColorMode) -> bool {
        matches!(mode, ColorMode::Gray | ColorMode::Rgb)
    }

    fn encode(&self, canvas: Canvas) -> ImgElfResult<EncodedImage> {
        encode_with(self, canvas, |image, out| {
            image.write_with_encoder(JpegEncoder::new_with_quality(out, JPEG_QUALITY))
        })
    }
}

/// Graphics Interchange Format, quantized to a 256-entry palette.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gif;

impl FormatVariant for Gif {
    fn kind(&self) -> FormatKind {
        FormatKind::Gif
    }

    fn config_limits(&self) -> DimensionLimits {
        DimensionLimits::square(1, 10_000)
    }

    // One palette index per pixel.
    fn estimate_file_size(&self, width: u32, height: u32, _mode: Option<ColorMode>) -> u64 {
        pixels(width, height)
    }

    fn supports(&self, mode: ColorMode) -> bool {
        matches!(mode, ColorMode::Rgb | ColorMode::Rgba)
    }

    fn encode(&self, canvas: Canvas) -> ImgElfResult<EncodedImage> {
        encode_with(self, canvas, |image, out| {
            let mut encoder = GifEncoder::new_with_speed(out, GIF_QUANTIZE_SPEED);
            encoder.encode(
                image.as_bytes(),
                image.width(),
                image.height(),
                image.color().into(),
            )
        })
    }
}

/// WebP. The bundled encoder is lossless; the estimate models typical lossy output.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebP;

impl FormatVariant for WebP {
    fn kind(&self) -> FormatKind {
        FormatKind::WebP
    }

    fn config_limits(&self) -> DimensionLimits {
        DimensionLimits::square(1, 16_383)
    }

    fn estimate_file_size(&self, width: u32, height: u32, mode: Option<ColorMode>) -> u64 {
        pixels(width, height) * channels(mode) * 20 / 100
    }
}

/// Tagged Image File Format, written uncompressed.
#[derive(Clone, Copy, Debug, Default)]
pub struct Tiff;

impl FormatVariant for Tiff {
    fn kind(&self) -> FormatKind {
        FormatKind::Tiff
    }

    fn config_limits(&self) -> DimensionLimits {
        DimensionLimits::square(1, 30_000)
    }

    fn estimate_file_size(&self, width: u32, height: u32, mode: Option<ColorMode>) -> u64 {
        raw_bytes(width, height, bits_per_pixel(mode, 24))
    }
}

/// Windows icon holding a single PNG-compressed image.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ico;

impl FormatVariant for Ico {
    fn kind(&self) -> FormatKind {
        FormatKind::Ico
    }

    fn config_limits(&self) -> DimensionLimits {
        DimensionLimits::square(16, 256)
    }

    // Icons usually carry alpha, so unknown modes count 32 bits.
    fn estimate_file_size(&self, width: u32, height: u32, mode: Option<ColorMode>) -> u64 {
        raw_bytes(width, height, bits_per_pixel(mode, 32))
    }

    // Icon readers only accept RGBA PNG entries. Widening to RGBA keeps every sample.
    fn encode(&self, canvas: Canvas) -> ImgElfResult<EncodedImage> {
        encode_with(self, canvas, |image, out| {
            DynamicImage::ImageRgba8(image.to_rgba8()).write_to(out, image::ImageFormat::Ico)
        })
    }
}

/// Windows bitmap, rows padded to 4 bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bmp;

impl FormatVariant for Bmp {
    fn kind(&self) -> FormatKind {
        FormatKind::Bmp
    }

    fn config_limits(&self) -> DimensionLimits {
        DimensionLimits::square(1, 10_000)
    }

    fn estimate_file_size(&self, width: u32, height: u32, mode: Option<ColorMode>) -> u64 {
        let bpp = bits_per_pixel(mode, 24);
        let stride = (u64::from(width) * bpp).div_ceil(32) * 4;
        u64::from(height) * stride
    }
}
