use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageError, RgbImage};
use log::{info, warn};

use crate::annotate::{draw_boxes, draw_overlay};
use crate::display::{self, DisplayStrategy};
use crate::error::{Result, ViewerError};
use crate::labels;

pub const WINDOW_TITLE: &str = "bboxes";

/// What a single-shot run ended with.
#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Saved(PathBuf),
    /// `fallback` is set when the first strategy could not be used.
    Displayed { strategy: &'static str, fallback: bool },
}

pub fn load_image(path: &Path) -> Result<RgbImage> {
    if !path.is_file() {
        return Err(ViewerError::ImageNotFound(path.to_path_buf()));
    }
    let decode_err = |source: ImageError| ViewerError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let dynimg = image::io::Reader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| decode_err(ImageError::IoError(e)))?
        .decode()
        .map_err(decode_err)?;
    Ok(dynimg.to_rgb8())
}

/// Loads an image and draws its labels and optional status lines on it.
///
/// A label path that does not exist is an error unless `allow_missing_labels`
/// is set, in which case the image is returned without boxes.
pub fn load_annotated(
    image_path: &Path,
    label_path: Option<&Path>,
    overlay: &[String],
    allow_missing_labels: bool,
) -> Result<RgbImage> {
    let mut image = load_image(image_path)?;
    let records = match label_path {
        Some(p) if p.is_file() => labels::parse(p)?.records,
        Some(p) if !allow_missing_labels => {
            return Err(ViewerError::LabelsNotFound(p.to_path_buf()));
        }
        _ => Vec::new(),
    };
    draw_boxes(&mut image, &records);
    if !overlay.is_empty() {
        draw_overlay(&mut image, overlay);
    }
    Ok(image)
}

/// Writes the image in the format implied by the extension of `out`,
/// creating missing parent directories first.
pub fn save_image(image: &RgbImage, out: &Path) -> Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ViewerError::OutputDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    image.save(out).map_err(|source| ViewerError::Encode {
        path: out.to_path_buf(),
        source,
    })?;
    info!("saved annotated image to {}", out.display());
    Ok(())
}

/// Annotate one image. With `out` the result is written to disk, otherwise
/// it is shown with the first display strategy that works.
pub fn run(
    image_path: &Path,
    label_path: &Path,
    out: Option<&Path>,
    strategies: &[Box<dyn DisplayStrategy>],
) -> Result<RunOutcome> {
    let annotated = load_annotated(image_path, Some(label_path), &[], false)?;
    if let Some(out) = out {
        save_image(&annotated, out)?;
        return Ok(RunOutcome::Saved(out.to_path_buf()));
    }
    let strategy = display::show_with_fallback(strategies, WINDOW_TITLE, &annotated)?;
    let fallback = strategy != strategies.first().map_or("", |s| s.name());
    if fallback {
        warn!("native window unavailable; used the {strategy} viewer");
    }
    Ok(RunOutcome::Displayed { strategy, fallback })
}
