//! Label measurement and drawing.
//!
//! Text is shaped by `usvg` against a font database (system fonts plus any configured
//! directories) and rasterized by `resvg`. Measurement uses the tight box of the shaped glyph
//! outlines, so centering places the ink itself, not the font's line box, at the canvas center.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use image::RgbaImage;

use crate::foundation::core::{Color, Point, Rect};
use crate::foundation::error::{ImgElfError, ImgElfResult};

const LABEL_FONT_FAMILY: &str = "sans-serif";

/// Shaped label together with its measured box.
#[derive(Debug)]
pub struct TextLayout {
    tree: usvg::Tree,
    bounds: Rect,
}

impl TextLayout {
    /// Ink bounding box in layout space (baseline origin at `y = 0`).
    pub fn bounds(&self) -> Rect {
        self.bounds
    }
}

/// Text measurement and drawing backed by a shared font database.
#[derive(Clone, Debug)]
pub struct TextRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl TextRasterizer {
    /// System fonts plus every `.ttf`/`.otf`/`.ttc` found directly in `font_dirs`.
    pub fn new(font_dirs: &[PathBuf]) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        for dir in font_dirs {
            load_fonts_from_dir(&mut db, dir);
        }
        tracing::debug!(faces = db.len(), "font database ready");
        Self {
            fontdb: Arc::new(db),
        }
    }

    /// A rasterizer without any font face. Labels are skipped.
    pub fn empty() -> Self {
        Self {
            fontdb: Arc::new(usvg::fontdb::Database::new()),
        }
    }

    /// Number of loaded font faces.
    pub fn face_count(&self) -> usize {
        self.fontdb.len()
    }

    /// Whether any face is available for labels.
    pub fn has_fonts(&self) -> bool {
        self.fontdb.len() > 0
    }

    /// Shape `text` at `font_size` and measure its ink box.
    ///
    /// Returns `None` when nothing would be drawn: no font faces, or text without visible glyphs.
    pub fn measure(
        &self,
        text: &str,
        font_size: f32,
        color: Color,
    ) -> ImgElfResult<Option<TextLayout>> {
        if !self.has_fonts() || text.is_empty() {
            return Ok(None);
        }
        if !(font_size.is_finite() && font_size > 0.0) {
            return Err(ImgElfError::render(format!(
                "font size must be positive, got {font_size}"
            )));
        }

        let opts = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            font_resolver: make_font_resolver(),
            ..Default::default()
        };
        let svg = label_svg(text, font_size, color);
        let tree = usvg::Tree::from_str(&svg, &opts).context("parse label svg")?;

        let Some(b) = ink_bounds(tree.root()) else {
            return Ok(None);
        };
        if !(b.width() > 0.0 && b.height() > 0.0) {
            return Ok(None);
        }
        let bounds = Rect::new(
            f64::from(b.left()),
            f64::from(b.top()),
            f64::from(b.right()),
            f64::from(b.bottom()),
        );
        tracing::debug!(
            text,
            font_size,
            width = bounds.width(),
            height = bounds.height(),
            "measured label"
        );
        Ok(Some(TextLayout { tree, bounds }))
    }

    /// Draw `text` so that its ink box is centered on `canvas`.
    ///
    /// Returns the box the text was placed in (canvas space), or `None` when nothing was drawn.
    pub fn draw_centered(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        font_size: f32,
        color: Color,
    ) -> ImgElfResult<Option<Rect>> {
        let Some(layout) = self.measure(text, font_size, color)? else {
            if !self.has_fonts() {
                tracing::warn!("no font face available, label skipped");
            }
            return Ok(None);
        };

        let (width, height) = canvas.dimensions();
        let bounds = layout.bounds;
        let origin = centered_origin(width, height, bounds.width(), bounds.height());

        // Split the origin into a whole-pixel offset and a sub-pixel shift applied while
        // rasterizing, so the pixmap only covers the label.
        let (x0, y0) = (origin.x.floor(), origin.y.floor());
        let (fx, fy) = (origin.x - x0, origin.y - y0);
        let pw = (fx + bounds.width()).ceil().max(1.0) as u32;
        let ph = (fy + bounds.height()).ceil().max(1.0) as u32;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(pw, ph)
            .ok_or_else(|| ImgElfError::render(format!("failed to allocate {pw}x{ph} label pixmap")))?;
        let xform = resvg::tiny_skia::Transform::from_translate(
            (fx - bounds.x0) as f32,
            (fy - bounds.y0) as f32,
        );
        resvg::render(&layout.tree, xform, &mut pixmap.as_mut());

        composite_premul_over(canvas, pixmap.data(), pw, ph, x0 as i64, y0 as i64);

        Ok(Some(Rect::from_origin_size(origin, bounds.size())))
    }
}

// Union of the outline boxes of every text node. A text node's own bounding box is the line
// box (ascent to descent); the flattened group holds the glyph paths.
fn ink_bounds(group: &usvg::Group) -> Option<usvg::Rect> {
    let mut acc: Option<(f32, f32, f32, f32)> = None;
    for node in group.children() {
        let b = match node {
            usvg::Node::Text(text) => Some(text.flattened().abs_bounding_box()),
            usvg::Node::Group(g) => ink_bounds(g),
            usvg::Node::Path(_) | usvg::Node::Image(_) => None,
        };
        let Some(b) = b else {
            continue;
        };
        acc = Some(match acc {
            None => (b.left(), b.top(), b.right(), b.bottom()),
            Some((l, t, r, bt)) => (
                l.min(b.left()),
                t.min(b.top()),
                r.max(b.right()),
                bt.max(b.bottom()),
            ),
        });
    }
    let (l, t, r, b) = acc?;
    usvg::Rect::from_ltrb(l, t, r, b)
}

/// Top-left position that centers a `box_width x box_height` box on the canvas.
pub fn centered_origin(width: u32, height: u32, box_width: f64, box_height: f64) -> Point {
    Point::new(
        f64::from(width) / 2.0 - box_width / 2.0,
        f64::from(height) / 2.0 - box_height / 2.0,
    )
}

fn label_svg(text: &str, font_size: f32, color: Color) -> String {
    let fill = Color { a: 255, ..color }.to_hex();
    let opacity = f32::from(color.a) / 255.0;
    let size = font_size.max(1.0);
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}"><text x="0" y="0" font-family="{LABEL_FONT_FAMILY}" font-size="{font_size}" fill="{fill}" fill-opacity="{opacity}" xml:space="preserve">{}</text></svg>"#,
        escape_xml(text)
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Source-over of a premultiplied RGBA8 pixmap onto a straight RGBA8 canvas, clipped to it.
fn composite_premul_over(canvas: &mut RgbaImage, src: &[u8], sw: u32, sh: u32, dx: i64, dy: i64) {
    let (cw, ch) = canvas.dimensions();
    for sy in 0..sh {
        let ty = dy + i64::from(sy);
        if ty < 0 || ty >= i64::from(ch) {
            continue;
        }
        for sx in 0..sw {
            let tx = dx + i64::from(sx);
            if tx < 0 || tx >= i64::from(cw) {
                continue;
            }
            let i = ((sy * sw + sx) * 4) as usize;
            let Some(px) = src.get(i..i + 4) else {
                continue;
            };
            if px[3] == 0 {
                continue;
            }
            let dst = canvas.get_pixel_mut(tx as u32, ty as u32);
            dst.0 = blend_over([px[0], px[1], px[2], px[3]], dst.0);
        }
    }
}

fn blend_over(src_premul: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let sa = f32::from(src_premul[3]) / 255.0;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let s = f32::from(src_premul[c]) / 255.0;
        let d = f32::from(dst[c]) / 255.0 * da;
        let v = (s + d * (1.0 - sa)) / out_a;
        out[c] = (v * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    out
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        tracing::warn!(dir = %dir.display(), "font directory not readable");
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        if let Err(e) = db.load_font_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "skipping font file");
        }
    }
}

// Requested family first, then the generic families, then whatever face exists. A label is
// better drawn in the wrong face than not at all.
fn make_font_resolver() -> usvg::FontResolver<'static> {
    use usvg::FontResolver;

    FontResolver {
        select_font: Box::new(|font, fontdb| {
            let mut families = Vec::<usvg::fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => usvg::fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => usvg::fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => usvg::fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => usvg::fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => usvg::fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => usvg::fontdb::Family::Name(s),
                });
            }
            families.push(usvg::fontdb::Family::SansSerif);
            families.push(usvg::fontdb::Family::Serif);
            families.push(usvg::fontdb::Family::Monospace);

            let query = usvg::fontdb::Query {
                families: &families,
                weight: usvg::fontdb::Weight(font.weight()),
                stretch: usvg::fontdb::Stretch::Normal,
                style: usvg::fontdb::Style::Normal,
            };

            if let Some(id) = fontdb.query(&query) {
                return Some(id);
            }
            fontdb.faces().next().map(|f| f.id)
        }),
        select_fallback: FontResolver::default_fallback_selector(),
    }
}
