use std::path::Path;

use anyhow::Context;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use log::warn;

pub const THUMB_SIZE: (u32, u32) = (220, 124);

const PLACEHOLDER: Rgb<u8> = Rgb([42, 42, 42]);
const BACKGROUND: Rgb<u8> = Rgb([20, 20, 20]);
const FAILED: Rgb<u8> = Rgb([80, 20, 20]);

/// Tile shown for an index whose thumbnail has not been built yet.
pub fn placeholder(size: (u32, u32)) -> RgbImage {
    RgbImage::from_pixel(size.0.max(1), size.1.max(1), PLACEHOLDER)
}

/// Decodes `path` and fits it into a `size` tile. Undecodable files get a
/// dark red tile instead of an error.
pub fn make_thumbnail(path: &Path, size: (u32, u32)) -> RgbImage {
    match try_thumbnail(path, size) {
        Ok(tile) => tile,
        Err(err) => {
            warn!("thumbnail failed: {err:#}");
            RgbImage::from_pixel(size.0.max(1), size.1.max(1), FAILED)
        }
    }
}

pub fn try_thumbnail(path: &Path, size: (u32, u32)) -> anyhow::Result<RgbImage> {
    let src = image::open(path)
        .with_context(|| format!("cannot decode {}", path.display()))?
        .to_rgb8();
    Ok(fit_into_tile(&src, size))
}

/// Shrinks `src` to fit inside the tile, never enlarging, and centers it on
/// the tile background.
pub fn fit_into_tile(src: &RgbImage, size: (u32, u32)) -> RgbImage {
    let (tw, th) = (size.0.max(1), size.1.max(1));
    let mut tile = RgbImage::from_pixel(tw, th, BACKGROUND);
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 {
        return tile;
    }
    let scale = (f64::from(tw) / f64::from(sw))
        .min(f64::from(th) / f64::from(sh))
        .min(1.0);
    let w = ((f64::from(sw) * scale) as u32).clamp(1, tw);
    let h = ((f64::from(sh) * scale) as u32).clamp(1, th);
    let x = i64::from((tw - w) / 2);
    let y = i64::from((th - h) / 2);
    if (w, h) == (sw, sh) {
        imageops::overlay(&mut tile, src, x, y);
    } else {
        let small = imageops::resize(src, w, h, FilterType::Lanczos3);
        imageops::overlay(&mut tile, &small, x, y);
    }
    tile
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_images_are_centered_not_enlarged() {
        let src = RgbImage::from_pixel(20, 10, Rgb([255, 0, 0]));
        let tile = fit_into_tile(&src, THUMB_SIZE);
        assert_eq!(tile.dimensions(), THUMB_SIZE);
        assert_eq!(*tile.get_pixel(110, 62), Rgb([255, 0, 0]));
        assert_eq!(*tile.get_pixel(100, 57), Rgb([255, 0, 0]));
        assert_eq!(*tile.get_pixel(99, 62), BACKGROUND);
        assert_eq!(*tile.get_pixel(120, 62), BACKGROUND);
    }

    #[test]
    fn large_images_are_shrunk_to_fit() {
        let src = RgbImage::from_pixel(440, 124, Rgb([0, 255, 0]));
        let tile = fit_into_tile(&src, THUMB_SIZE);
        // 220x62, letterboxed vertically
        assert_eq!(*tile.get_pixel(0, 30), BACKGROUND);
        assert_eq!(*tile.get_pixel(0, 31), Rgb([0, 255, 0]));
        assert_eq!(*tile.get_pixel(219, 92), Rgb([0, 255, 0]));
        assert_eq!(*tile.get_pixel(0, 93), BACKGROUND);
    }

    #[test]
    fn unreadable_file_gets_error_tile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        std::fs::write(&path, b"nope").unwrap();
        let tile = make_thumbnail(&path, (8, 4));
        assert!(tile.pixels().all(|p| *p == FAILED));
        assert!(try_thumbnail(&path, (8, 4)).is_err());
    }

    #[test]
    fn placeholder_is_flat_grey() {
        let tile = placeholder(THUMB_SIZE);
        assert_eq!(tile.dimensions(), THUMB_SIZE);
        assert!(tile.pixels().all(|p| *p == PLACEHOLDER));
    }
}
