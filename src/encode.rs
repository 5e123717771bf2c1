use std::io::Cursor;

use image::DynamicImage;

use crate::foundation::error::{ImgElfError, ImgElfResult};
use crate::format::registry::FormatKind;
use crate::format::variant::FormatVariant;
use crate::render::canvas::Canvas;

/// Final output of a generation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    /// Encoded file contents.
    pub bytes: Vec<u8>,
    /// `image/<format>`.
    pub mime_type: String,
    /// Suggested attachment filename, `_ImgElf.<ext>`.
    pub download_name: String,
    /// Format the bytes are encoded in.
    pub format: FormatKind,
    /// Pixel width of the encoded image.
    pub width: u32,
    /// Pixel height of the encoded image.
    pub height: u32,
}

/// Check `canvas` against the variant's supported modes, then run `write` into a fresh buffer.
///
/// Unsupported modes fail before any bytes are produced; the canvas is never converted.
pub(crate) fn encode_with<V, F>(variant: &V, canvas: Canvas, write: F) -> ImgElfResult<EncodedImage>
where
    V: FormatVariant + ?Sized,
    F: FnOnce(&DynamicImage, &mut Cursor<Vec<u8>>) -> image::ImageResult<()>,
{
    let kind = variant.kind();
    let mode = canvas.mode();
    if !variant.supports(mode) {
        return Err(ImgElfError::encoding(
            kind,
            format!("{mode} canvases cannot be encoded as {kind}"),
        ));
    }

    let (width, height) = (canvas.width(), canvas.height());
    let mut out = Cursor::new(Vec::new());
    write(canvas.as_image(), &mut out).map_err(|e| ImgElfError::encoding(kind, e.to_string()))?;
    let bytes = out.into_inner();

    tracing::debug!(format = %kind, width, height, bytes = bytes.len(), "encoded canvas");

    Ok(EncodedImage {
        bytes,
        mime_type: kind.mime_type(),
        download_name: kind.download_name(),
        format: kind,
        width,
        height,
    })
}
