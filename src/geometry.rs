use crate::labels::BoxRecord;

/// Box corners in image pixels, each clamped to `[0, dim - 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
    pub was_normalized: bool,
}

/// A record counts as normalized when none of its fields exceeds 1.0.
/// A pixel-space box whose values are all <= 1 is read as normalized too.
pub fn is_normalized(record: &BoxRecord) -> bool {
    record.cx.max(record.cy).max(record.w).max(record.h) <= 1.0
}

pub fn to_pixel_box(record: &BoxRecord, width: u32, height: u32) -> PixelBox {
    let normalized = is_normalized(record);
    let (mut cx, mut cy, mut w, mut h) = (record.cx, record.cy, record.w, record.h);
    if normalized {
        cx *= f64::from(width);
        cy *= f64::from(height);
        w *= f64::from(width);
        h *= f64::from(height);
    }
    // Axes are clamped independently; an inverted box stays inverted.
    PixelBox {
        x1: clamp_axis(round_coord(cx - w / 2.0), width),
        y1: clamp_axis(round_coord(cy - h / 2.0), height),
        x2: clamp_axis(round_coord(cx + w / 2.0), width),
        y2: clamp_axis(round_coord(cy + h / 2.0), height),
        was_normalized: normalized,
    }
}

fn round_coord(value: f64) -> i64 {
    // saturating cast, NaN becomes 0
    value.round_ties_even() as i64
}

fn clamp_axis(value: i64, dim: u32) -> i64 {
    value.min(i64::from(dim) - 1).max(0)
}
