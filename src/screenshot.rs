use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{GenericImageView, ImageFormat};
use std::io::Cursor;

/// Element bounding box in page pixels, as reported by WebDriver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<(f64, f64, f64, f64)> for Rect {
    fn from((x, y, width, height): (f64, f64, f64, f64)) -> Self {
        Self { x, y, width, height }
    }
}

/// Crops a PNG screenshot to `rect`, clamped to the image bounds.
pub fn crop_png(png: &[u8], rect: Rect) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory_with_format(png, ImageFormat::Png)?;
    let (img_w, img_h) = img.dimensions();

    let left = clamp(rect.x, img_w);
    let top = clamp(rect.y, img_h);
    let right = clamp(rect.x + rect.width, img_w);
    let bottom = clamp(rect.y + rect.height, img_h);

    let cropped = img.crop_imm(left, top, right.saturating_sub(left), bottom.saturating_sub(top));

    let mut out = Cursor::new(Vec::new());
    cropped.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn clamp(value: f64, limit: u32) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        (value.round() as u32).min(limit)
    }
}
