use std::fmt;
use std::path::{Path, PathBuf};

use glob::{Pattern, glob};
use log::{debug, warn};

pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Images directly inside `dir`, sorted case-insensitively by file name.
/// A missing directory yields an empty list.
pub fn list_images(dir: &Path) -> Vec<PathBuf> {
    if dir.as_os_str().is_empty() || !dir.is_dir() {
        return Vec::new();
    }
    let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
    let pattern = Path::new(&Pattern::escape(&dir.to_string_lossy())).join("*");
    let entries = match glob(&pattern.to_string_lossy()) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot scan {}: {e}", dir.display());
            return Vec::new();
        }
    };
    let mut imgs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();
    imgs.sort_by_key(|p| file_name(p).to_lowercase());
    debug!("found {} images in {}", imgs.len(), dir.display());
    imgs
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The label file state shown next to the current image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelStatus {
    NoImage,
    NoLabelDir,
    Found(String),
    Missing(String),
}

impl fmt::Display for LabelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoImage => f.write_str("-"),
            Self::NoLabelDir => f.write_str("No label folder"),
            Self::Found(name) => f.write_str(name),
            Self::Missing(name) => write!(f, "{name} (not found)"),
        }
    }
}

/// The ordered image list and the position in it.
///
/// `current` is `None` exactly when the list is empty.
#[derive(Debug, Default)]
pub struct BrowserState {
    images: Vec<PathBuf>,
    current: Option<usize>,
    label_dir: PathBuf,
}

impl BrowserState {
    pub fn new(images: Vec<PathBuf>, label_dir: PathBuf) -> Self {
        let mut state = Self {
            images: Vec::new(),
            current: None,
            label_dir,
        };
        state.set_images(images);
        state
    }

    /// Replaces the list, keeping the index when it is still in range.
    pub fn set_images(&mut self, images: Vec<PathBuf>) {
        self.images = images;
        self.current = match (self.images.len(), self.current) {
            (0, _) => None,
            (_, None) => Some(0),
            (len, Some(idx)) => Some(idx.min(len - 1)),
        };
    }

    pub fn set_label_dir(&mut self, dir: PathBuf) {
        self.label_dir = dir;
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_image(&self) -> Option<&Path> {
        self.current.map(|i| self.images[i].as_path())
    }

    /// Returns false when `index` is out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.images.len() {
            return false;
        }
        self.current = Some(index);
        true
    }

    /// Steps back; no-op at the first image.
    pub fn previous(&mut self) -> bool {
        match self.current {
            Some(idx) if idx > 0 => {
                self.current = Some(idx - 1);
                true
            }
            _ => false,
        }
    }

    /// Steps forward; no-op at the last image.
    pub fn next(&mut self) -> bool {
        match self.current {
            Some(idx) if idx + 1 < self.images.len() => {
                self.current = Some(idx + 1);
                true
            }
            _ => false,
        }
    }

    /// `<label_dir>/<image stem>.txt`, when there is an image and the label
    /// folder exists.
    pub fn label_path(&self) -> Option<PathBuf> {
        let image = self.current_image()?;
        if self.label_dir.as_os_str().is_empty() || !self.label_dir.is_dir() {
            return None;
        }
        let stem = image.file_stem()?.to_string_lossy();
        Some(self.label_dir.join(format!("{stem}.txt")))
    }

    pub fn label_status(&self) -> LabelStatus {
        if self.current_image().is_none() {
            return LabelStatus::NoImage;
        }
        match self.label_path() {
            Some(path) if path.is_file() => LabelStatus::Found(file_name(&path)),
            Some(path) => LabelStatus::Missing(file_name(&path)),
            None => LabelStatus::NoLabelDir,
        }
    }

    /// `"<i>/<n>"`, 1-based, or `"0/0"`.
    pub fn position_text(&self) -> String {
        match self.current {
            Some(idx) => format!("{}/{}", idx + 1, self.images.len()),
            None => "0/0".to_owned(),
        }
    }

    pub fn current_file_name(&self) -> String {
        self.current_image()
            .map(file_name)
            .unwrap_or_else(|| "-".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    fn names(list: &[PathBuf]) -> Vec<String> {
        list.iter().map(|p| file_name(p)).collect()
    }

    #[test]
    fn lists_supported_images_sorted_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "A.jpg", "c.tiff", "notes.txt", "d.gif", "e.JPEG", "f.bmp", "g.tif"] {
            touch(dir.path(), name);
        }
        fs::create_dir(dir.path().join("sub.jpg")).unwrap();
        touch(&dir.path().join("sub.jpg"), "nested.jpg");

        let list = list_images(dir.path());
        assert_eq!(names(&list), ["A.jpg", "b.PNG", "c.tiff", "e.JPEG", "f.bmp", "g.tif"]);
        assert!(list.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn directory_with_glob_characters_is_scanned() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("set [1]");
        fs::create_dir(&dir).unwrap();
        touch(&dir, "x.png");
        assert_eq!(names(&list_images(&dir)), ["x.png"]);
    }

    #[test]
    fn missing_directory_is_empty() {
        assert!(list_images(Path::new("/definitely/not/here")).is_empty());
        assert!(list_images(Path::new("")).is_empty());
    }

    fn state(n: usize) -> BrowserState {
        let images = (0..n).map(|i| PathBuf::from(format!("/imgs/{i:03}.jpg"))).collect();
        BrowserState::new(images, PathBuf::new())
    }

    #[test]
    fn empty_list_has_no_index() {
        let s = state(0);
        assert_eq!(s.current_index(), None);
        assert_eq!(s.position_text(), "0/0");
        assert_eq!(s.label_status(), LabelStatus::NoImage);
    }

    #[test]
    fn navigation_is_clamped_without_wraparound() {
        let mut s = state(3);
        assert_eq!(s.current_index(), Some(0));
        assert!(!s.previous());
        assert_eq!(s.current_index(), Some(0));
        assert!(s.next());
        assert!(s.next());
        assert!(!s.next());
        assert_eq!(s.current_index(), Some(2));
        assert_eq!(s.position_text(), "3/3");
    }

    #[test]
    fn directory_change_clamps_index() {
        let mut s = state(10);
        s.select(8);
        s.set_images(vec![PathBuf::from("/a.jpg"), PathBuf::from("/b.jpg")]);
        assert_eq!(s.current_index(), Some(1));
        s.set_images(Vec::new());
        assert_eq!(s.current_index(), None);
        s.set_images(vec![PathBuf::from("/a.jpg")]);
        assert_eq!(s.current_index(), Some(0));
    }

    #[test]
    fn select_rejects_out_of_range() {
        let mut s = state(2);
        assert!(!s.select(2));
        assert!(s.select(1));
        assert_eq!(s.current_index(), Some(1));
    }

    #[test]
    fn label_path_follows_image_stem() {
        let labels = tempfile::tempdir().unwrap();
        touch(labels.path(), "000.txt");
        let mut s = state(2);
        assert_eq!(s.label_status(), LabelStatus::NoLabelDir);

        s.set_label_dir(labels.path().to_path_buf());
        assert_eq!(s.label_path(), Some(labels.path().join("000.txt")));
        assert_eq!(s.label_status().to_string(), "000.txt");

        s.next();
        assert_eq!(s.label_status().to_string(), "001.txt (not found)");
    }
}
