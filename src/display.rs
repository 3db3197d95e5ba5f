//! Ways to put a finished frame on screen, tried in order.

use anyhow::{Context, anyhow};
use eframe::egui;
use image::RgbImage;
use image::imageops::{self, FilterType};
use log::{debug, warn};
use minifb::{Key, Window, WindowOptions};

use crate::error::{Result, ViewerError};

/// Largest frame the bitmap viewer opens without shrinking.
const BITMAP_MAX_SIZE: (u32, u32) = (1400, 900);

pub trait DisplayStrategy {
    fn name(&self) -> &'static str;

    /// Cheap check run before `show`.
    fn is_available(&self) -> bool;

    /// Blocks until the user closes the window.
    fn show(&self, title: &str, image: &RgbImage) -> anyhow::Result<()>;
}

/// Native egui window first, plain framebuffer window second.
pub fn default_strategies() -> Vec<Box<dyn DisplayStrategy>> {
    vec![Box::new(NativeWindow), Box::new(BitmapWindow)]
}

/// Shows `image` with the first strategy that is available and succeeds,
/// returning its name.
pub fn show_with_fallback(
    strategies: &[Box<dyn DisplayStrategy>],
    title: &str,
    image: &RgbImage,
) -> Result<&'static str> {
    let mut failures = Vec::new();
    for strategy in strategies {
        if !strategy.is_available() {
            debug!("display strategy {} not available", strategy.name());
            failures.push(format!("{}: not available", strategy.name()));
            continue;
        }
        match strategy.show(title, image) {
            Ok(()) => return Ok(strategy.name()),
            Err(err) => {
                warn!("display strategy {} failed: {err:#}", strategy.name());
                failures.push(format!("{}: {err:#}", strategy.name()));
            }
        }
    }
    if failures.is_empty() {
        failures.push("no display strategies configured".to_owned());
    }
    Err(ViewerError::NoDisplaySurface {
        detail: failures.join("; "),
    })
}

/// True when a window server can be reached. Only meaningful on X11/Wayland
/// systems; elsewhere a window is assumed to be possible.
pub fn display_server_present() -> bool {
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        ["DISPLAY", "WAYLAND_DISPLAY"]
            .iter()
            .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
    }
    #[cfg(not(all(unix, not(target_os = "macos"))))]
    {
        true
    }
}

pub fn to_color_image(image: &RgbImage) -> egui::ColorImage {
    let size = [image.width() as usize, image.height() as usize];
    egui::ColorImage::from_rgb(size, image.as_raw())
}

pub struct NativeWindow;

impl DisplayStrategy for NativeWindow {
    fn name(&self) -> &'static str {
        "native"
    }

    fn is_available(&self) -> bool {
        display_server_present()
    }

    fn show(&self, title: &str, image: &RgbImage) -> anyhow::Result<()> {
        let frame = image.clone();
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title(title)
                .with_inner_size([
                    image.width().clamp(320, 1400) as f32,
                    image.height().clamp(240, 900) as f32,
                ]),
            ..Default::default()
        };
        eframe::run_native(
            title,
            options,
            Box::new(move |cc| {
                cc.egui_ctx.set_visuals(egui::Visuals::dark());
                Box::new(SingleFrameApp::new(frame))
            }),
        )
        .map_err(|e| anyhow!("{e}"))
    }
}

/// Shows one frame scaled to the window; Esc or Q closes.
struct SingleFrameApp {
    frame: RgbImage,
    texture: Option<egui::TextureHandle>,
}

impl SingleFrameApp {
    fn new(frame: RgbImage) -> Self {
        Self { frame, texture: None }
    }
}

impl eframe::App for SingleFrameApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape) || i.key_pressed(egui::Key::Q)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        let frame = &self.frame;
        let tex = self.texture.get_or_insert_with(|| {
            ctx.load_texture("frame", to_color_image(frame), egui::TextureOptions::LINEAR)
        });
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                let available = ui.available_size();
                let (ow, oh) = (frame.width() as f32, frame.height() as f32);
                let scale = (available.x / ow).min(available.y / oh);
                let size = egui::vec2(ow * scale, oh * scale);
                ui.centered_and_justified(|ui| {
                    ui.add(egui::Image::new(&*tex).fit_to_exact_size(size));
                });
            });
    }
}

/// Framebuffer window from `minifb`, for systems where the GPU-backed
/// window cannot be created.
pub struct BitmapWindow;

impl DisplayStrategy for BitmapWindow {
    fn name(&self) -> &'static str {
        "bitmap"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn show(&self, title: &str, image: &RgbImage) -> anyhow::Result<()> {
        let (max_w, max_h) = BITMAP_MAX_SIZE;
        let fitted;
        let image = if image.width() > max_w || image.height() > max_h {
            let scale = (f64::from(max_w) / f64::from(image.width()))
                .min(f64::from(max_h) / f64::from(image.height()));
            let w = ((f64::from(image.width()) * scale).round() as u32).max(1);
            let h = ((f64::from(image.height()) * scale).round() as u32).max(1);
            fitted = imageops::resize(image, w, h, FilterType::Lanczos3);
            &fitted
        } else {
            image
        };
        let (w, h) = (image.width() as usize, image.height() as usize);
        let buffer: Vec<u32> = image
            .pixels()
            .map(|p| (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2]))
            .collect();

        let mut window = Window::new(&format!("{title} (fallback)"), w, h, WindowOptions::default())
            .context("failed to open bitmap window")?;
        window.set_target_fps(30);
        while window.is_open() && !window.is_key_down(Key::Escape) && !window.is_key_down(Key::Q) {
            window
                .update_with_buffer(&buffer, w, h)
                .context("failed to draw bitmap window")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Fake {
        name: &'static str,
        available: bool,
        works: bool,
        shown: Rc<Cell<usize>>,
    }

    fn fake(name: &'static str, available: bool, works: bool) -> (Box<dyn DisplayStrategy>, Rc<Cell<usize>>) {
        let shown = Rc::new(Cell::new(0));
        let strategy = Fake { name, available, works, shown: Rc::clone(&shown) };
        (Box::new(strategy), shown)
    }

    impl DisplayStrategy for Fake {
        fn name(&self) -> &'static str {
            self.name
        }
        fn is_available(&self) -> bool {
            self.available
        }
        fn show(&self, _title: &str, _image: &RgbImage) -> anyhow::Result<()> {
            self.shown.set(self.shown.get() + 1);
            if self.works { Ok(()) } else { Err(anyhow!("{} broke", self.name)) }
        }
    }

    fn frame() -> RgbImage {
        RgbImage::new(4, 4)
    }

    #[test]
    fn first_working_strategy_wins() {
        let (absent, absent_shown) = fake("absent", false, true);
        let (broken, broken_shown) = fake("broken", true, false);
        let (good, good_shown) = fake("good", true, true);
        let (unused, unused_shown) = fake("unused", true, true);
        let strategies = vec![absent, broken, good, unused];

        assert_eq!(show_with_fallback(&strategies, "t", &frame()).unwrap(), "good");
        assert_eq!(absent_shown.get(), 0);
        assert_eq!(broken_shown.get(), 1);
        assert_eq!(good_shown.get(), 1);
        assert_eq!(unused_shown.get(), 0);
    }

    #[test]
    fn all_failing_reports_every_reason() {
        let strategies = vec![fake("native", false, true).0, fake("bitmap", true, false).0];
        let err = show_with_fallback(&strategies, "t", &frame()).unwrap_err();
        let ViewerError::NoDisplaySurface { detail } = err else {
            panic!("unexpected error: {err}");
        };
        assert!(detail.contains("native: not available"));
        assert!(detail.contains("bitmap broke"));
    }

    #[test]
    fn empty_strategy_list_is_no_display() {
        let err = show_with_fallback(&[], "t", &frame()).unwrap_err();
        assert!(matches!(err, ViewerError::NoDisplaySurface { .. }));
    }

    #[test]
    fn color_image_keeps_dimensions() {
        let img = RgbImage::new(7, 3);
        assert_eq!(to_color_image(&img).size, [7, 3]);
    }
}
