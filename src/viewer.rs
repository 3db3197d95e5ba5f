//! The single-image viewer: keeps the annotated frame for the current index,
//! fits it to the window and debounces resizes.

use std::time::{Duration, Instant};

use image::RgbImage;
use image::imageops::{self, FilterType};
use log::debug;

use crate::annotate::draw_overlay;
use crate::error::Result;
use crate::schedule::Deferred;

pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(40);
pub const KEY_HINT: &str = "A/D or arrows: navigate | Q/Esc: quit";

/// Where the viewer was opened from; decides what Escape returns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerOrigin {
    Main,
    Gallery,
}

pub fn fit_scale(src: (u32, u32), target: (u32, u32)) -> f64 {
    (f64::from(target.0) / f64::from(src.0.max(1))).min(f64::from(target.1) / f64::from(src.1.max(1)))
}

pub fn scaled_size(src: (u32, u32), scale: f64) -> (u32, u32) {
    let w = (f64::from(src.0) * scale).round().max(1.0) as u32;
    let h = (f64::from(src.1) * scale).round().max(1.0) as u32;
    (w, h)
}

/// Lanczos when shrinking, Catmull-Rom when enlarging.
pub fn resample_filter(scale: f64) -> FilterType {
    if scale < 1.0 {
        FilterType::Lanczos3
    } else {
        FilterType::CatmullRom
    }
}

/// `"<i>/<n>  <name>"` and the key hint.
pub fn overlay_lines(index: usize, total: usize, name: &str) -> Vec<String> {
    vec![format!("{}/{}  {name}", index + 1, total), KEY_HINT.to_owned()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RenderKey {
    index: usize,
    width: u32,
    height: u32,
}

#[derive(Debug)]
pub struct Viewer {
    origin: ViewerOrigin,
    decoded: Option<(usize, RgbImage)>,
    rendered: Option<RenderKey>,
    target: Option<(u32, u32)>,
    pending_target: Option<(u32, u32)>,
    resize: Deferred,
}

impl Viewer {
    pub fn new(origin: ViewerOrigin) -> Self {
        Self {
            origin,
            decoded: None,
            rendered: None,
            target: None,
            pending_target: None,
            resize: Deferred::default(),
        }
    }

    pub fn origin(&self) -> ViewerOrigin {
        self.origin
    }

    /// Records a new window size. The first size is taken as is; later ones
    /// wait for `RESIZE_DEBOUNCE` of quiet.
    pub fn resize(&mut self, now: Instant, width: u32, height: u32) {
        let size = (width, height);
        if self.target.is_none() {
            self.target = Some(size);
            return;
        }
        if self.target == Some(size) {
            self.pending_target = None;
            self.resize.cancel();
            return;
        }
        if self.pending_target != Some(size) {
            self.pending_target = Some(size);
            self.resize.reschedule(now, RESIZE_DEBOUNCE);
        }
    }

    /// Applies a debounced size once it is due. Returns true when the
    /// target changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.resize.fire(now) {
            return false;
        }
        match self.pending_target.take() {
            Some(size) if self.target != Some(size) => {
                debug!("viewer target {}x{}", size.0, size.1);
                self.target = Some(size);
                true
            }
            _ => false,
        }
    }

    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.resize.remaining(now)
    }

    /// Drops the cached frame so the next `render` reloads it.
    pub fn invalidate(&mut self) {
        self.decoded = None;
        self.rendered = None;
    }

    pub fn cancel_jobs(&mut self) {
        self.resize.cancel();
        self.pending_target = None;
    }

    /// Renders `index` at the current target size.
    ///
    /// Returns `Ok(None)` when nothing changed since the last frame or the
    /// target is smaller than 2x2. `load` is only called when the index
    /// differs from the cached one.
    pub fn render(
        &mut self,
        index: usize,
        overlay: &[String],
        load: impl FnOnce() -> Result<RgbImage>,
    ) -> Result<Option<RgbImage>> {
        let Some((width, height)) = self.target else {
            return Ok(None);
        };
        if width < 2 || height < 2 {
            return Ok(None);
        }
        let key = RenderKey { index, width, height };
        if self.rendered == Some(key) {
            return Ok(None);
        }
        if !matches!(&self.decoded, Some((cached, _)) if *cached == index) {
            self.decoded = None;
            self.rendered = None;
            self.decoded = Some((index, load()?));
        }
        let Some((_, source)) = &self.decoded else {
            return Ok(None);
        };

        let scale = fit_scale(source.dimensions(), (width, height));
        let (w, h) = scaled_size(source.dimensions(), scale);
        let mut frame = if (w, h) == source.dimensions() {
            source.clone()
        } else {
            imageops::resize(source, w, h, resample_filter(scale))
        };
        if !overlay.is_empty() {
            draw_overlay(&mut frame, overlay);
        }
        self.rendered = Some(key);
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewerError;
    use image::Rgb;
    use std::cell::Cell;
    use std::path::PathBuf;

    const MS: Duration = Duration::from_millis(1);

    fn solid(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([9, 9, 9]))
    }

    #[test]
    fn fit_scale_uses_tighter_axis() {
        assert_eq!(fit_scale((200, 100), (100, 100)), 0.5);
        assert_eq!(fit_scale((100, 100), (400, 300)), 3.0);
        assert_eq!(scaled_size((200, 100), 0.5), (100, 50));
        assert_eq!(scaled_size((1000, 1), 0.1), (100, 1));
    }

    #[test]
    fn filter_depends_on_direction() {
        assert_eq!(resample_filter(0.5), FilterType::Lanczos3);
        assert_eq!(resample_filter(1.0), FilterType::CatmullRom);
        assert_eq!(resample_filter(2.5), FilterType::CatmullRom);
    }

    #[test]
    fn overlay_shows_position_and_hint() {
        assert_eq!(overlay_lines(2, 57, "a.jpg"), ["3/57  a.jpg", KEY_HINT]);
    }

    #[test]
    fn renders_once_per_index_and_size() {
        let mut v = Viewer::new(ViewerOrigin::Main);
        assert!(v.render(0, &[], || Ok(solid(4, 4))).unwrap().is_none());

        v.resize(Instant::now(), 100, 50);
        let loads = Cell::new(0);
        let load = || {
            loads.set(loads.get() + 1);
            Ok(solid(200, 200))
        };
        let frame = v.render(0, &[], load).unwrap().unwrap();
        assert_eq!(frame.dimensions(), (50, 50));
        assert!(v.render(0, &[], load).unwrap().is_none());
        assert_eq!(loads.get(), 1);

        v.render(1, &[], load).unwrap().unwrap();
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn resize_is_debounced() {
        let t0 = Instant::now();
        let mut v = Viewer::new(ViewerOrigin::Gallery);
        v.resize(t0, 300, 300);
        assert_eq!(v.target, Some((300, 300)));
        v.render(0, &[], || Ok(solid(10, 10))).unwrap().unwrap();

        v.resize(t0, 200, 200);
        v.resize(t0 + 30 * MS, 150, 150);
        assert!(!v.poll(t0 + 60 * MS));
        assert_eq!(v.next_deadline(t0 + 60 * MS), Some(10 * MS));
        assert!(v.poll(t0 + 70 * MS));
        assert_eq!(v.target, Some((150, 150)));

        let loads = Cell::new(0);
        let frame = v
            .render(0, &[], || {
                loads.set(loads.get() + 1);
                Ok(solid(10, 10))
            })
            .unwrap()
            .unwrap();
        assert_eq!(frame.dimensions(), (150, 150));
        assert_eq!(loads.get(), 0);
    }

    #[test]
    fn resize_back_to_current_size_cancels() {
        let t0 = Instant::now();
        let mut v = Viewer::new(ViewerOrigin::Main);
        v.resize(t0, 300, 300);
        v.resize(t0, 200, 200);
        v.resize(t0 + 10 * MS, 300, 300);
        assert!(!v.poll(t0 + 100 * MS));
        assert_eq!(v.next_deadline(t0), None);
    }

    #[test]
    fn tiny_target_postpones_rendering() {
        let mut v = Viewer::new(ViewerOrigin::Main);
        v.resize(Instant::now(), 1, 300);
        assert!(v.render(0, &[], || Ok(solid(10, 10))).unwrap().is_none());
    }

    #[test]
    fn load_errors_reach_the_caller() {
        let mut v = Viewer::new(ViewerOrigin::Main);
        v.resize(Instant::now(), 100, 100);
        let err = v
            .render(0, &[], || Err(ViewerError::ImageNotFound(PathBuf::from("x.jpg"))))
            .unwrap_err();
        assert!(matches!(err, ViewerError::ImageNotFound(_)));
        assert!(v.render(0, &[], || Ok(solid(10, 10))).unwrap().is_some());
    }

    #[test]
    fn overlay_is_drawn_on_the_scaled_frame() {
        let mut v = Viewer::new(ViewerOrigin::Main);
        v.resize(Instant::now(), 400, 200);
        let lines = overlay_lines(0, 1, "a.jpg");
        let frame = v.render(0, &lines, || Ok(solid(400, 200))).unwrap().unwrap();
        assert!(frame.pixels().any(|p| *p == Rgb([255, 255, 255])));
    }
}
