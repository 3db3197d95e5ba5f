use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// File-level and display-level failures. Each one aborts the current
/// operation and is reported to the user.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("labels not found: {}", .0.display())]
    LabelsNotFound(PathBuf),

    #[error("failed to read labels {}: {source}", .path.display())]
    LabelsUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read image {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to save image {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no window support available, use --out to save the annotated image instead ({detail})")]
    NoDisplaySurface { detail: String },
}

/// A malformed label line. The line is skipped and parsing continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseWarning {
    #[error("line {line} skipped (expected at least 5 values): {content}")]
    TooFewFields { line: usize, content: String },

    #[error("line {line} has invalid values: {content}")]
    InvalidNumber { line: usize, content: String },

    #[error("no bounding boxes found")]
    NoBoxes,
}

/// The settings file could not be read or written. Never fatal.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file i/o: {0}")]
    Io(#[from] io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;
