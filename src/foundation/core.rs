use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{ImgElfError, ImgElfResult};

pub use kurbo::{Point, Rect};

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel, 255 is opaque.
    pub a: u8,
}

impl Color {
    /// Default canvas background (`#2ae5bc`).
    pub const DEFAULT_BACKGROUND: Self = Self::rgb(0x2a, 0xe5, 0xbc);
    /// Default label color (`#ffffff`).
    pub const DEFAULT_TEXT: Self = Self::rgb(0xff, 0xff, 0xff);

    /// Opaque color from its three channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Color with explicit alpha.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (the `#` is optional, case-insensitive).
    pub fn from_hex(s: &str) -> ImgElfResult<Self> {
        parse_hex(s).map_err(ImgElfError::config)
    }

    /// `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub(crate) fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ImgElfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            Arr(Vec<u8>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => parse_hex(&s).map_err(serde::de::Error::custom),
            Repr::Arr(v) => match v.as_slice() {
                [r, g, b] => Ok(Self::rgb(*r, *g, *b)),
                [r, g, b, a] => Ok(Self::rgba(*r, *g, *b, *a)),
                _ => Err(serde::de::Error::custom(
                    "color array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}

fn parse_hex(s: &str) -> Result<Color, String> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    if !s.is_ascii() {
        return Err("hex color must be #RRGGBB or #RRGGBBAA (case-insensitive)".to_owned());
    }

    match s.len() {
        6 => Ok(Color::rgb(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
        )),
        8 => Ok(Color::rgba(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            hex_byte(&s[6..8])?,
        )),
        _ => Err("hex color must be #RRGGBB or #RRGGBBAA (case-insensitive)".to_owned()),
    }
}

/// Pixel layout of a canvas, named after the conventional mode strings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ColorMode {
    /// `1`: one bit per pixel.
    Bilevel,
    /// `L`: 8-bit luma.
    Gray,
    /// `P`: 8-bit palette indices.
    Palette,
    /// `RGB`: 8 bits per channel, no alpha.
    #[default]
    Rgb,
    /// `RGBA`: 8 bits per channel with alpha.
    Rgba,
}

impl ColorMode {
    /// Every mode, in ascending bit depth.
    pub const ALL: [Self; 5] = [
        Self::Bilevel,
        Self::Gray,
        Self::Palette,
        Self::Rgb,
        Self::Rgba,
    ];

    /// Canonical mode string (`1`, `L`, `P`, `RGB`, `RGBA`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Bilevel => "1",
            Self::Gray => "L",
            Self::Palette => "P",
            Self::Rgb => "RGB",
            Self::Rgba => "RGBA",
        }
    }

    /// Storage bits per pixel.
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Bilevel => 1,
            Self::Gray | Self::Palette => 8,
            Self::Rgb => 24,
            Self::Rgba => 32,
        }
    }

    /// Number of bands in the mode.
    pub fn channels(self) -> u32 {
        match self {
            Self::Bilevel | Self::Gray | Self::Palette => 1,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    /// Whether a canvas can be rasterized directly in this mode.
    pub fn is_renderable(self) -> bool {
        matches!(self, Self::Gray | Self::Rgb | Self::Rgba)
    }

    /// Whether the mode carries an alpha channel.
    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba)
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorMode {
    type Err = ImgElfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "bilevel" => Ok(Self::Bilevel),
            "l" | "gray" | "grey" | "luma" => Ok(Self::Gray),
            "p" | "palette" => Ok(Self::Palette),
            "rgb" => Ok(Self::Rgb),
            "rgba" => Ok(Self::Rgba),
            _ => Err(ImgElfError::config(format!(
                "unknown color mode \"{s}\" (expected 1, L, P, RGB or RGBA)"
            ))),
        }
    }
}

impl TryFrom<String> for ColorMode {
    type Error = ImgElfError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColorMode> for &'static str {
    fn from(mode: ColorMode) -> Self {
        mode.name()
    }
}

/// Inclusive per-axis dimension bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionLimits {
    /// Smallest accepted width.
    pub min_width: u32,
    /// Largest accepted width.
    pub max_width: u32,
    /// Smallest accepted height.
    pub min_height: u32,
    /// Largest accepted height.
    pub max_height: u32,
}

impl DimensionLimits {
    /// Same range on both axes.
    pub const fn square(min: u32, max: u32) -> Self {
        Self {
            min_width: min,
            max_width: max,
            min_height: min,
            max_height: max,
        }
    }

    /// Narrow the maxima by a per-axis cap. Never widens; minima are untouched.
    pub fn narrowed(self, cap: Option<u32>) -> Self {
        let Some(cap) = cap else {
            return self;
        };
        Self {
            max_width: self.max_width.min(cap),
            max_height: self.max_height.min(cap),
            ..self
        }
    }

    /// `0 < min <= max` on both axes.
    pub fn is_well_formed(self) -> bool {
        self.min_width > 0
            && self.min_width <= self.max_width
            && self.min_height > 0
            && self.min_height <= self.max_height
    }

    /// Whether `width x height` lies inside the bounds.
    pub fn contains(self, width: u32, height: u32) -> bool {
        (self.min_width..=self.max_width).contains(&width)
            && (self.min_height..=self.max_height).contains(&height)
    }
}
