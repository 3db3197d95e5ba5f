//! Draws label boxes and text onto an RGB image.
//!
//! Text uses the 8x8 bitmap font from `font8x8`, scaled by an integer factor.

use std::hash::{DefaultHasher, Hash, Hasher};

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};

use crate::geometry::{PixelBox, to_pixel_box};
use crate::labels::BoxRecord;

pub const PALETTE: [[u8; 3]; 20] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [146, 204, 23],
    [61, 219, 134],
    [26, 147, 52],
    [0, 212, 187],
    [44, 153, 168],
    [0, 194, 255],
    [52, 69, 147],
    [100, 115, 255],
    [0, 24, 236],
    [132, 56, 255],
    [82, 0, 133],
    [203, 56, 255],
    [255, 149, 200],
    [255, 55, 199],
];

const BOX_THICKNESS: i64 = 2;
const GLYPH_SIZE: i64 = 8;
const TAG_PADDING: i64 = 4;
const TEXT_WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const OUTLINE_DARK: Rgb<u8> = Rgb([0, 0, 0]);

const OVERLAY_LEFT: i64 = 10;
const OVERLAY_TOP: i64 = 8;
const OVERLAY_LINE_STEP: i64 = 22;
const OVERLAY_SCALE: i64 = 2;

/// Palette slot for a class id: integers by remainder, anything else by hash.
pub fn palette_index(class_id: &str) -> usize {
    let len = PALETTE.len();
    match class_id.parse::<i64>() {
        Ok(id) => id.rem_euclid(len as i64) as usize,
        Err(_) => {
            let mut hasher = DefaultHasher::new();
            class_id.hash(&mut hasher);
            (hasher.finish() % len as u64) as usize
        }
    }
}

pub fn class_color(class_id: &str) -> Rgb<u8> {
    Rgb(PALETTE[palette_index(class_id)])
}

/// Draws every record and returns the boxes as drawn.
pub fn draw_boxes(image: &mut RgbImage, records: &[BoxRecord]) -> Vec<PixelBox> {
    let (width, height) = image.dimensions();
    let mut drawn = Vec::with_capacity(records.len());
    for record in records {
        let b = to_pixel_box(record, width, height);
        let color = class_color(&record.class_id);
        draw_rect_outline(image, b.x1, b.y1, b.x2, b.y2, color, BOX_THICKNESS);

        let tag = format!(
            "{} {}",
            record.class_id,
            if b.was_normalized { "(norm)" } else { "(px)" }
        );
        let (tw, th) = text_size(&tag, 1);
        let tag_top = (b.y1 - th - TAG_PADDING).max(0);
        fill_rect(image, b.x1, tag_top, b.x1 + tw + TAG_PADDING, b.y1, color);
        draw_text(image, b.x1 + 2, tag_top + 2, &tag, TEXT_WHITE, 1);

        drawn.push(b);
    }
    drawn
}

/// Status lines in the top-left corner, dark outline first, then white.
pub fn draw_overlay(image: &mut RgbImage, lines: &[String]) {
    let mut y = OVERLAY_TOP;
    for line in lines {
        for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1), (-1, -1), (1, 1), (-1, 1), (1, -1)] {
            draw_text(image, OVERLAY_LEFT + dx, y + dy, line, OUTLINE_DARK, OVERLAY_SCALE);
        }
        draw_text(image, OVERLAY_LEFT, y, line, TEXT_WHITE, OVERLAY_SCALE);
        y += OVERLAY_LINE_STEP;
    }
}

pub fn text_size(text: &str, scale: i64) -> (i64, i64) {
    let chars = text.chars().count() as i64;
    (chars * GLYPH_SIZE * scale, GLYPH_SIZE * scale)
}

/// Filled rectangle, corners inclusive and in any order, clipped to the image.
pub fn fill_rect(image: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let (w, h) = (i64::from(image.width()), i64::from(image.height()));
    let left = x0.min(x1).max(0);
    let right = x0.max(x1).min(w - 1);
    let top = y0.min(y1).max(0);
    let bottom = y0.max(y1).min(h - 1);
    if left > right || top > bottom {
        return;
    }
    for y in top..=bottom {
        for x in left..=right {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Rectangle outline with each edge `thickness` pixels wide, centered on the edge.
pub fn draw_rect_outline(
    image: &mut RgbImage,
    x1: i64,
    y1: i64,
    x2: i64,
    y2: i64,
    color: Rgb<u8>,
    thickness: i64,
) {
    let lo = thickness / 2;
    let hi = (thickness - 1) / 2;
    let (left, right) = (x1.min(x2), x1.max(x2));
    let (top, bottom) = (y1.min(y2), y1.max(y2));
    fill_rect(image, left - lo, top - lo, right + hi, top + hi, color);
    fill_rect(image, left - lo, bottom - lo, right + hi, bottom + hi, color);
    fill_rect(image, left - lo, top - lo, left + hi, bottom + hi, color);
    fill_rect(image, right - lo, top - lo, right + hi, bottom + hi, color);
}

/// Draws `text` with its top-left corner at `(x, y)`.
pub fn draw_text(image: &mut RgbImage, x: i64, y: i64, text: &str, color: Rgb<u8>, scale: i64) {
    let scale = scale.max(1);
    let (w, h) = (i64::from(image.width()), i64::from(image.height()));
    let mut cursor_x = x;
    for ch in text.chars() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            cursor_x += GLYPH_SIZE * scale;
            continue;
        };
        for (row_idx, &bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let px = cursor_x + col * scale;
                let py = y + row_idx as i64 * scale;
                for sy in 0..scale {
                    for sx in 0..scale {
                        let (tx, ty) = (px + sx, py + sy);
                        if tx >= 0 && ty >= 0 && tx < w && ty < h {
                            image.put_pixel(tx as u32, ty as u32, color);
                        }
                    }
                }
            }
        }
        cursor_x += GLYPH_SIZE * scale;
    }
}
