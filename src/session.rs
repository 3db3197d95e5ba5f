//! Interactive session state. Every input from the window is turned into a
//! [`Command`] and applied here, so the egui shell only draws.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::RgbImage;
use log::{info, warn};

use crate::browser::{self, BrowserState};
use crate::error::Result;
use crate::gallery::Gallery;
use crate::runner;
use crate::settings::Settings;
use crate::viewer::{self, Viewer, ViewerOrigin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Main,
    Gallery,
    Viewer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetImageDir(String),
    SetLabelDir(String),
    Previous,
    Next,
    OpenViewer,
    OpenGallery,
    CloseGallery,
    GallerySelect(usize),
    GalleryOpen(usize),
    GalleryOpenSelected,
    /// Moves the selection by a number of tiles, clamped at both ends.
    GalleryStep(isize),
    /// Visible bottom edge of the grid as a fraction of its content height.
    GalleryScrolled(f32),
    GalleryLoadMore,
    ViewerResized(u32, u32),
    ViewerEscape,
    ViewerClose,
    SaveCurrent(PathBuf),
    Quit,
}

/// What the shell has to tell the user after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    None,
    Info(String),
    Warning(String),
    Error(String),
    Quit,
}

pub struct Session<T> {
    browser: BrowserState,
    settings: Settings,
    settings_path: PathBuf,
    view: View,
    gallery: Option<Gallery<T>>,
    viewer: Option<Viewer>,
    scroll_fraction: f32,
}

impl<T> Session<T> {
    /// Restores the last used folders from `settings_path`.
    pub fn new(settings_path: PathBuf) -> Self {
        let settings = Settings::load(&settings_path);
        let images = browser::list_images(Path::new(&settings.image_dir));
        let browser = BrowserState::new(images, PathBuf::from(&settings.label_dir));
        info!("session started with {} images", browser.len());
        Self {
            browser,
            settings,
            settings_path,
            view: View::Main,
            gallery: None,
            viewer: None,
            scroll_fraction: 0.0,
        }
    }

    pub fn browser(&self) -> &BrowserState {
        &self.browser
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn gallery(&self) -> Option<&Gallery<T>> {
        self.gallery.as_ref()
    }

    pub fn dispatch(&mut self, cmd: Command, now: Instant) -> Outcome {
        match cmd {
            Command::SetImageDir(dir) => self.set_image_dir(dir),
            Command::SetLabelDir(dir) => self.set_label_dir(dir),
            Command::Previous => {
                self.browser.previous();
                Outcome::None
            }
            Command::Next => {
                self.browser.next();
                Outcome::None
            }
            Command::OpenViewer => self.open_viewer(ViewerOrigin::Main),
            Command::OpenGallery => self.open_gallery(),
            Command::CloseGallery => {
                self.close_gallery();
                Outcome::None
            }
            Command::GallerySelect(index) => {
                self.gallery_select(index);
                Outcome::None
            }
            Command::GalleryOpen(index) => {
                if self.gallery_select(index) {
                    self.open_viewer(ViewerOrigin::Gallery)
                } else {
                    Outcome::None
                }
            }
            Command::GalleryOpenSelected => match self.gallery.as_ref().and_then(Gallery::selected) {
                Some(index) => self.dispatch(Command::GalleryOpen(index), now),
                None => Outcome::None,
            },
            Command::GalleryStep(delta) => {
                if let Some(target) = self.gallery.as_ref().and_then(|g| g.step_target(delta)) {
                    self.gallery_select(target);
                }
                Outcome::None
            }
            Command::GalleryScrolled(fraction) => {
                self.scroll_fraction = fraction;
                if let Some(gallery) = self.gallery.as_mut() {
                    gallery.schedule_load_check(now);
                }
                Outcome::None
            }
            Command::GalleryLoadMore => {
                if let Some(gallery) = self.gallery.as_mut() {
                    gallery.load_next_batch();
                }
                Outcome::None
            }
            Command::ViewerResized(width, height) => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.resize(now, width, height);
                }
                Outcome::None
            }
            Command::ViewerEscape => {
                match self.viewer.as_ref().map(Viewer::origin) {
                    Some(ViewerOrigin::Gallery) if self.gallery.is_some() => self.back_to_gallery(),
                    _ => self.close_viewer(),
                }
                Outcome::None
            }
            Command::ViewerClose => {
                self.close_viewer();
                Outcome::None
            }
            Command::SaveCurrent(out) => self.save_current(&out),
            Command::Quit => {
                self.cancel_jobs();
                self.persist();
                Outcome::Quit
            }
        }
    }

    /// Runs whatever deferred work is due: the gallery load-more check, a
    /// slice of thumbnail generation and the viewer resize debounce.
    /// Returns true when something visible changed.
    pub fn pump(&mut self, now: Instant, mut make_thumbnail: impl FnMut(&Path) -> T) -> bool {
        let mut changed = false;
        match self.view {
            View::Gallery => {
                if let Some(gallery) = self.gallery.as_mut() {
                    changed |= gallery.poll_load_check(now, self.scroll_fraction).is_some();
                    let images = self.browser.images();
                    changed |= gallery.process_tick(|i| make_thumbnail(&images[i])) > 0;
                }
            }
            View::Viewer => {
                if let Some(viewer) = self.viewer.as_mut() {
                    changed |= viewer.poll(now);
                }
            }
            View::Main => {}
        }
        changed
    }

    /// Time until `pump` has work to do, if anything is scheduled.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        match self.view {
            View::Gallery => self.gallery.as_ref().and_then(|g| g.next_deadline(now)),
            View::Viewer => self.viewer.as_ref().and_then(|v| v.next_deadline(now)),
            View::Main => None,
        }
    }

    /// Renders the current image for the viewer when the index or window
    /// size changed. A load failure closes the viewer before it is returned.
    pub fn viewer_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.view != View::Viewer {
            return Ok(None);
        }
        let (Some(active), Some(index), Some(path)) = (
            self.viewer.as_mut(),
            self.browser.current_index(),
            self.browser.current_image(),
        ) else {
            return Ok(None);
        };
        let label = self.browser.label_path();
        let lines = viewer::overlay_lines(index, self.browser.len(), &browser::file_name(path));
        let frame = active.render(index, &lines, || {
            runner::load_annotated(path, label.as_deref(), &[], true)
        });
        if let Err(e) = &frame {
            warn!("viewer closed: {e}");
            self.close_viewer();
        }
        frame
    }

    /// `"Selected: <i>/<n>  <name>"`, or `"Selected: -"`.
    pub fn selection_text(&self) -> String {
        let selected = self.gallery.as_ref().and_then(Gallery::selected);
        match selected.and_then(|i| self.browser.images().get(i).map(|p| (i, p))) {
            Some((i, path)) => format!(
                "Selected: {}/{}  {}",
                i + 1,
                self.browser.len(),
                browser::file_name(path)
            ),
            None => "Selected: -".to_owned(),
        }
    }

    fn set_image_dir(&mut self, dir: String) -> Outcome {
        let dir = dir.trim().to_owned();
        let path = PathBuf::from(&dir);
        let warning = (!dir.is_empty() && !path.is_dir()).then(|| format!("Not a folder: {dir}"));
        self.browser.set_images(browser::list_images(&path));
        info!("image folder {dir:?}: {} images", self.browser.len());
        self.settings.image_dir = dir;
        self.persist();
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.invalidate();
        }
        if self.gallery.is_some() {
            self.rebuild_gallery();
        }
        warning.map_or(Outcome::None, Outcome::Warning)
    }

    fn set_label_dir(&mut self, dir: String) -> Outcome {
        let dir = dir.trim().to_owned();
        self.browser.set_label_dir(PathBuf::from(&dir));
        self.settings.label_dir = dir;
        self.persist();
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.invalidate();
        }
        Outcome::None
    }

    fn open_viewer(&mut self, origin: ViewerOrigin) -> Outcome {
        if self.browser.is_empty() {
            return Outcome::Warning("No images in the selected folder.".to_owned());
        }
        self.viewer = Some(Viewer::new(origin));
        self.view = View::Viewer;
        Outcome::None
    }

    fn open_gallery(&mut self) -> Outcome {
        if self.browser.is_empty() {
            return Outcome::Warning("No images in the selected folder.".to_owned());
        }
        self.rebuild_gallery();
        self.view = View::Gallery;
        Outcome::None
    }

    fn rebuild_gallery(&mut self) {
        if let Some(old) = self.gallery.as_mut() {
            old.cancel_jobs();
        }
        let mut gallery = Gallery::new(self.browser.len(), self.browser.current_index());
        gallery.load_next_batch();
        self.gallery = Some(gallery);
        self.scroll_fraction = 0.0;
    }

    fn close_gallery(&mut self) {
        if let Some(mut gallery) = self.gallery.take() {
            gallery.cancel_jobs();
        }
        if self.view == View::Gallery {
            self.view = View::Main;
        }
    }

    fn gallery_select(&mut self, index: usize) -> bool {
        let Some(gallery) = self.gallery.as_mut() else {
            return false;
        };
        if gallery.select(index).is_none() {
            return false;
        }
        self.browser.select(index)
    }

    fn back_to_gallery(&mut self) {
        if let Some(mut viewer) = self.viewer.take() {
            viewer.cancel_jobs();
        }
        if let (Some(gallery), Some(index)) = (self.gallery.as_mut(), self.browser.current_index()) {
            gallery.select(index);
        }
        self.view = View::Gallery;
    }

    /// Leaves the viewer and the gallery behind it.
    fn close_viewer(&mut self) {
        if let Some(mut viewer) = self.viewer.take() {
            viewer.cancel_jobs();
        }
        self.close_gallery();
        self.view = View::Main;
    }

    fn save_current(&self, out: &Path) -> Outcome {
        let Some(image) = self.browser.current_image() else {
            return Outcome::Warning("No image selected.".to_owned());
        };
        // Without a label folder the image is saved as is; a folder without
        // the matching file is an error.
        let label = self.browser.label_path();
        let result = runner::load_annotated(image, label.as_deref(), &[], false)
            .and_then(|annotated| runner::save_image(&annotated, out));
        match result {
            Ok(()) => Outcome::Info(format!("Saved: {}", out.display())),
            Err(e) => Outcome::Error(e.to_string()),
        }
    }

    fn cancel_jobs(&mut self) {
        if let Some(gallery) = self.gallery.as_mut() {
            gallery.cancel_jobs();
        }
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.cancel_jobs();
        }
    }

    fn persist(&self) {
        if let Err(e) = self.settings.save(&self.settings_path) {
            warn!("failed to save settings to {}: {e}", self.settings_path.display());
        }
    }
}
