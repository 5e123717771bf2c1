use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::foundation::core::{Color, ColorMode};
use crate::foundation::error::{ImgElfError, ImgElfResult};
use crate::render::text::TextRasterizer;

/// Per-request styling. Every field has a default, so partial JSON is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    /// Canvas fill.
    pub background: Color,
    /// Label fill.
    pub text_color: Color,
    /// Whether to draw the label at all.
    pub draw_text: bool,
    /// Label override; `None` draws `"{width} x {height}"`.
    pub custom_text: Option<String>,
    /// Pixel layout of the canvas.
    pub color_mode: ColorMode,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            background: Color::DEFAULT_BACKGROUND,
            text_color: Color::DEFAULT_TEXT,
            draw_text: true,
            custom_text: None,
            color_mode: ColorMode::Rgb,
        }
    }
}

/// Validated dimensions plus styling for one render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderRequest {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Styling.
    pub options: RenderOptions,
}

impl RenderRequest {
    /// Request with default styling.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_options(width, height, RenderOptions::default())
    }

    /// Request with explicit styling.
    pub fn with_options(width: u32, height: u32, options: RenderOptions) -> Self {
        Self {
            width,
            height,
            options,
        }
    }

    /// Text to stamp on the canvas.
    pub fn label(&self) -> String {
        match &self.options.custom_text {
            Some(text) => text.clone(),
            None => format!("{} x {}", self.width, self.height),
        }
    }

    /// Label size in pixels, see [`font_size_for`].
    pub fn font_size(&self) -> u32 {
        font_size_for(self.width, self.height)
    }
}

/// `floor(min(width, height) / 10)`. Zero means the canvas is too thin for a label.
pub fn font_size_for(width: u32, height: u32) -> u32 {
    width.min(height) / 10
}

/// Rasterized pixels in a fixed [`ColorMode`], consumed by an encoder.
#[derive(Clone, Debug)]
pub struct Canvas {
    mode: ColorMode,
    image: DynamicImage,
}

impl Canvas {
    /// A canvas of one solid color.
    pub fn filled(width: u32, height: u32, mode: ColorMode, color: Color) -> ImgElfResult<Self> {
        ensure_renderable(width, height, mode)?;
        Self::from_rgba(RgbaImage::from_pixel(width, height, Rgba(color.to_array())), mode)
    }

    fn from_rgba(buf: RgbaImage, mode: ColorMode) -> ImgElfResult<Self> {
        let rgba = DynamicImage::ImageRgba8(buf);
        let image = match mode {
            ColorMode::Gray => DynamicImage::ImageLuma8(rgba.into_luma8()),
            ColorMode::Rgb => DynamicImage::ImageRgb8(rgba.into_rgb8()),
            ColorMode::Rgba => rgba,
            ColorMode::Bilevel | ColorMode::Palette => {
                return Err(ImgElfError::render(format!(
                    "{mode} canvases cannot be rasterized"
                )));
            }
        };
        Ok(Self { mode, image })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel layout.
    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Borrow the pixel buffer.
    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }

    /// Take the pixel buffer.
    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

fn ensure_renderable(width: u32, height: u32, mode: ColorMode) -> ImgElfResult<()> {
    if width == 0 || height == 0 {
        return Err(ImgElfError::render(format!(
            "canvas dimensions must be positive, got {width}x{height}"
        )));
    }
    if !mode.is_renderable() {
        return Err(ImgElfError::render(format!(
            "{mode} canvases cannot be rasterized"
        )));
    }
    Ok(())
}

/// Fill the background and stamp the centered label.
///
/// The canvas is exactly `request.width x request.height`; nothing is scaled or clamped.
pub(crate) fn render(request: &RenderRequest, text: &TextRasterizer) -> ImgElfResult<Canvas> {
    let RenderRequest {
        width,
        height,
        options,
    } = request;
    ensure_renderable(*width, *height, options.color_mode)?;

    let mut buf = RgbaImage::from_pixel(*width, *height, Rgba(options.background.to_array()));

    if options.draw_text {
        let font_size = request.font_size();
        if font_size == 0 {
            tracing::debug!(width, height, "canvas too thin for a label");
        } else {
            text.draw_centered(
                &mut buf,
                &request.label(),
                font_size as f32,
                options.text_color,
            )?;
        }
    }

    Canvas::from_rgba(buf, options.color_mode)
}
