use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::core::{Color, ColorMode};
use crate::foundation::error::{ImgElfError, ImgElfResult};
use crate::format::registry::FormatKind;
use crate::render::canvas::RenderOptions;

/// Default per-axis pixel cap.
pub const DEFAULT_MAX_DIMENSION: u32 = 10_000;

/// Process-wide settings for an [`crate::ImageService`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Per-axis cap applied on top of every format's own limits. `None` disables it.
    pub absolute_max_dimension: Option<u32>,
    /// Active format at startup.
    pub default_format: FormatKind,
    /// Default canvas fill.
    pub background: Color,
    /// Default label color.
    pub text_color: Color,
    /// Whether labels are drawn by default.
    pub draw_text: bool,
    /// Default canvas color mode.
    pub color_mode: ColorMode,
    /// Extra font directories searched in addition to system fonts.
    pub font_dirs: Vec<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            absolute_max_dimension: Some(DEFAULT_MAX_DIMENSION),
            default_format: FormatKind::Png,
            background: Color::DEFAULT_BACKGROUND,
            text_color: Color::DEFAULT_TEXT,
            draw_text: true,
            color_mode: ColorMode::Rgb,
            font_dirs: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Load and validate a JSON config file.
    pub fn from_path(path: &Path) -> ImgElfResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate config JSON.
    pub fn from_json_str(json: &str) -> ImgElfResult<Self> {
        let cfg: Self = serde_json::from_str(json).context("parse config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings no request could satisfy.
    pub fn validate(&self) -> ImgElfResult<()> {
        if self.absolute_max_dimension == Some(0) {
            return Err(ImgElfError::config(
                "absolute_max_dimension must be >= 1 (use null to disable the cap)",
            ));
        }
        if !self.color_mode.is_renderable() {
            return Err(ImgElfError::config(format!(
                "color_mode {} cannot be rendered (use L, RGB or RGBA)",
                self.color_mode
            )));
        }
        Ok(())
    }

    /// Styling used when a request does not override it.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            background: self.background,
            text_color: self.text_color,
            draw_text: self.draw_text,
            custom_text: None,
            color_mode: self.color_mode,
        }
    }
}
