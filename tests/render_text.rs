use image::{ImageFormat, RgbaImage};
use imgelf::{
    Color, ColorMode, ImageService, RenderOptions, ServiceConfig, TextRasterizer, centered_origin,
};

fn rasterizer_with_fonts() -> Option<TextRasterizer> {
    let text = TextRasterizer::new(&[]);
    if !text.has_fonts() {
        eprintln!("skipping: no system fonts available");
        return None;
    }
    Some(text)
}

// Bounding box of every pixel that differs from `background`.
fn ink_box(img: &RgbaImage, background: [u8; 4]) -> Option<(u32, u32, u32, u32)> {
    let mut bbox: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in img.enumerate_pixels() {
        if p.0 == background {
            continue;
        }
        bbox = Some(match bbox {
            None => (x, y, x + 1, y + 1),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)),
        });
    }
    bbox
}

#[test]
fn measured_label_is_placed_at_the_centered_origin() {
    let Some(text) = rasterizer_with_fonts() else {
        return;
    };
    let mut canvas = RgbaImage::from_pixel(400, 200, image::Rgba([0, 0, 0, 255]));
    let layout = text
        .measure("400 x 200", 20.0, Color::DEFAULT_TEXT)
        .unwrap()
        .expect("label should have ink");
    let placed = text
        .draw_centered(&mut canvas, "400 x 200", 20.0, Color::DEFAULT_TEXT)
        .unwrap()
        .expect("label should be drawn");

    let b = layout.bounds();
    let origin = centered_origin(400, 200, b.width(), b.height());
    assert!((placed.x0 - origin.x).abs() < 1e-9);
    assert!((placed.y0 - origin.y).abs() < 1e-9);
    assert!((placed.center().x - 200.0).abs() < 1e-6);
    assert!((placed.center().y - 100.0).abs() < 1e-6);
}

#[test]
fn rendered_ink_is_centered_within_a_pixel() {
    let Some(text) = rasterizer_with_fonts() else {
        return;
    };
    let svc = ImageService::with_rasterizer(ServiceConfig::default(), text).unwrap();
    let opts = RenderOptions {
        background: Color::rgb(0, 0, 0),
        text_color: Color::rgb(255, 255, 255),
        color_mode: ColorMode::Rgba,
        ..RenderOptions::default()
    };
    let encoded = svc.generate_image_with("800", "600", "png", opts).unwrap();
    let img = image::load_from_memory_with_format(&encoded.bytes, ImageFormat::Png)
        .unwrap()
        .to_rgba8();

    let (x0, y0, x1, y1) = ink_box(&img, [0, 0, 0, 255]).expect("label should leave ink");
    let cx = f64::from(x0 + x1) / 2.0;
    let cy = f64::from(y0 + y1) / 2.0;
    // Anti-aliased edges can add a partially covered column or row on either side.
    assert!((cx - 400.0).abs() <= 1.0, "ink center x = {cx}");
    assert!((cy - 300.0).abs() <= 1.0, "ink center y = {cy}");
}

#[test]
fn custom_label_and_disabled_label() {
    let Some(text) = rasterizer_with_fonts() else {
        return;
    };
    let svc = ImageService::with_rasterizer(ServiceConfig::default(), text).unwrap();
    let bg = [0x2a, 0xe5, 0xbc, 0xff];

    let opts = RenderOptions {
        custom_text: Some("Hello <world> & co".to_string()),
        color_mode: ColorMode::Rgba,
        ..RenderOptions::default()
    };
    let encoded = svc.generate_image_with("320", "120", "png", opts).unwrap();
    let img = image::load_from_memory(&encoded.bytes).unwrap().to_rgba8();
    assert!(ink_box(&img, bg).is_some());

    let opts = RenderOptions {
        draw_text: false,
        color_mode: ColorMode::Rgba,
        ..RenderOptions::default()
    };
    let encoded = svc.generate_image_with("320", "120", "png", opts).unwrap();
    let img = image::load_from_memory(&encoded.bytes).unwrap().to_rgba8();
    assert!(ink_box(&img, bg).is_none());
}
