use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{ImgElfError, ImgElfResult};
use crate::format::variant::{Bmp, FormatVariant, Gif, Ico, Jpeg, Png, Tiff, WebP};

/// Discriminant of the closed set of output formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
#[repr(u8)]
pub enum FormatKind {
    /// Portable Network Graphics.
    #[default]
    Png = 0,
    /// JPEG (baseline, quality 75).
    Jpeg = 1,
    /// Graphics Interchange Format.
    Gif = 2,
    /// WebP (lossless).
    WebP = 3,
    /// Tagged Image File Format.
    Tiff = 4,
    /// Windows icon.
    Ico = 5,
    /// Windows bitmap.
    Bmp = 6,
}

impl FormatKind {
    /// Every supported format, in registry order.
    pub const ALL: [Self; 7] = [
        Self::Png,
        Self::Jpeg,
        Self::Gif,
        Self::WebP,
        Self::Tiff,
        Self::Ico,
        Self::Bmp,
    ];

    /// Lowercase registry key; also the file extension and MIME subtype.
    pub fn name(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Tiff => "tiff",
            Self::Ico => "ico",
            Self::Bmp => "bmp",
        }
    }

    /// Case-insensitive lookup. Only the canonical names are recognized (`jpg` is not).
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }

    /// `image/<name>`.
    pub fn mime_type(self) -> String {
        format!("image/{}", self.name())
    }

    /// File extension without the dot.
    pub fn file_extension(self) -> &'static str {
        self.name()
    }

    /// Attachment filename handed to clients, `_ImgElf.<ext>`.
    pub fn download_name(self) -> String {
        format!("_ImgElf.{}", self.file_extension())
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Gif => image::ImageFormat::Gif,
            Self::WebP => image::ImageFormat::WebP,
            Self::Tiff => image::ImageFormat::Tiff,
            Self::Ico => image::ImageFormat::Ico,
            Self::Bmp => image::ImageFormat::Bmp,
        }
    }

    fn from_repr(v: u8) -> Self {
        Self::ALL.get(usize::from(v)).copied().unwrap_or_default()
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormatKind {
    type Err = ImgElfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ImgElfError::invalid_format(s))
    }
}

impl TryFrom<String> for FormatKind {
    type Error = ImgElfError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FormatKind> for &'static str {
    fn from(kind: FormatKind) -> Self {
        kind.name()
    }
}

static PNG: Png = Png;
static JPEG: Jpeg = Jpeg;
static GIF: Gif = Gif;
static WEBP: WebP = WebP;
static TIFF: Tiff = Tiff;
static ICO: Ico = Ico;
static BMP: Bmp = Bmp;

/// The variant implementing `kind`.
pub fn variant(kind: FormatKind) -> &'static dyn FormatVariant {
    match kind {
        FormatKind::Png => &PNG,
        FormatKind::Jpeg => &JPEG,
        FormatKind::Gif => &GIF,
        FormatKind::WebP => &WEBP,
        FormatKind::Tiff => &TIFF,
        FormatKind::Ico => &ICO,
        FormatKind::Bmp => &BMP,
    }
}

/// Resolve a format name (case-insensitive) to its variant.
pub fn resolve(name: &str) -> ImgElfResult<&'static dyn FormatVariant> {
    name.parse::<FormatKind>().map(variant)
}

/// All registered variants, in registry order.
pub fn variants() -> impl Iterator<Item = &'static dyn FormatVariant> {
    FormatKind::ALL.into_iter().map(variant)
}

/// Shared, atomically swappable selection of the active variant.
///
/// Readers take a [`snapshot`](Self::snapshot) once per request and keep using it; a concurrent
/// [`set`](Self::set) never produces a torn value.
#[derive(Debug)]
pub struct ActiveFormat(AtomicU8);

impl ActiveFormat {
    /// Start with `kind` selected.
    pub fn new(kind: FormatKind) -> Self {
        Self(AtomicU8::new(kind as u8))
    }

    /// Current selection.
    pub fn snapshot(&self) -> FormatKind {
        FormatKind::from_repr(self.0.load(Ordering::Acquire))
    }

    /// Select `kind`, returning the previous selection.
    pub fn set(&self, kind: FormatKind) -> FormatKind {
        FormatKind::from_repr(self.0.swap(kind as u8, Ordering::AcqRel))
    }
}

impl Default for ActiveFormat {
    fn default() -> Self {
        Self::new(FormatKind::default())
    }
}
