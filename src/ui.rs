//! The egui shell: folder fields and buttons, the thumbnail grid and the
//! single-image viewer, all in one window. Input becomes [`Command`]s that
//! the session applies; this module only draws.

use std::path::{Path, PathBuf};
use std::time::Instant;

use eframe::egui;
use egui::{Color32, Key, Sense, Stroke, TextureHandle, TextureOptions, Vec2};
use log::{error, info};

use crate::browser;
use crate::display::to_color_image;
use crate::gallery;
use crate::session::{Command, Outcome, Session, View};
use crate::thumbnail::{self, THUMB_SIZE};

const APP_TITLE: &str = "Visualize BBox";
const MAIN_SIZE: [f32; 2] = [740.0, 320.0];
const MAIN_MIN_SIZE: [f32; 2] = [620.0, 280.0];
const BROWSE_SIZE: [f32; 2] = [1100.0, 760.0];
const TILE_SPACING: f32 = 6.0;

const GRID_BACKGROUND: Color32 = Color32::from_rgb(0x1a, 0x1a, 0x1a);
const TILE_BORDER: Color32 = Color32::from_rgb(0x5a, 0x5a, 0x5a);
const TILE_SELECTED: Color32 = Color32::from_rgb(0x2a, 0x7f, 0xff);

const MAIN_KEYS: &[(Key, Command)] = &[(Key::A, Command::Previous), (Key::D, Command::Next)];

const GALLERY_KEYS: &[(Key, Command)] = &[
    (Key::ArrowLeft, Command::GalleryStep(-1)),
    (Key::ArrowRight, Command::GalleryStep(1)),
    (Key::Enter, Command::GalleryOpenSelected),
    (Key::Escape, Command::CloseGallery),
];

const VIEWER_KEYS: &[(Key, Command)] = &[
    (Key::A, Command::Previous),
    (Key::ArrowLeft, Command::Previous),
    (Key::D, Command::Next),
    (Key::ArrowRight, Command::Next),
    (Key::Escape, Command::ViewerEscape),
    (Key::Q, Command::ViewerClose),
];

const VIEWER_BUTTONS: &[(&str, Command)] = &[
    ("< Previous (A)", Command::Previous),
    ("Next (D) >", Command::Next),
    ("Back (Esc)", Command::ViewerEscape),
    ("Close (Q)", Command::ViewerClose),
];

fn keymap(view: View) -> &'static [(Key, Command)] {
    match view {
        View::Main => MAIN_KEYS,
        View::Gallery => GALLERY_KEYS,
        View::Viewer => VIEWER_KEYS,
    }
}

fn window_size(view: View) -> [f32; 2] {
    match view {
        View::Main => MAIN_SIZE,
        View::Gallery | View::Viewer => BROWSE_SIZE,
    }
}

/// Opens the browser window and blocks until it is closed.
pub fn run(settings_path: PathBuf) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size(MAIN_SIZE)
            .with_min_inner_size(MAIN_MIN_SIZE),
        ..Default::default()
    };
    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Box::new(BrowserApp::new(&cc.egui_ctx, settings_path))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}

struct BrowserApp {
    session: Session<TextureHandle>,
    image_dir_text: String,
    label_dir_text: String,
    placeholder: TextureHandle,
    frame: Option<TextureHandle>,
    shown_view: View,
    last_scroll: Option<(f32, f32)>,
    gallery_columns: usize,
    reveal_selection: bool,
}

impl BrowserApp {
    fn new(ctx: &egui::Context, settings_path: PathBuf) -> Self {
        let session = Session::new(settings_path);
        let placeholder = ctx.load_texture(
            "placeholder",
            to_color_image(&thumbnail::placeholder(THUMB_SIZE)),
            TextureOptions::LINEAR,
        );
        Self {
            image_dir_text: session.settings().image_dir.clone(),
            label_dir_text: session.settings().label_dir.clone(),
            session,
            placeholder,
            frame: None,
            shown_view: View::Main,
            last_scroll: None,
            gallery_columns: 1,
            reveal_selection: false,
        }
    }

    fn apply(&mut self, ctx: &egui::Context, cmd: Command) {
        let outcome = self.session.dispatch(cmd, Instant::now());
        self.report(ctx, outcome);
    }

    fn report(&mut self, ctx: &egui::Context, outcome: Outcome) {
        match outcome {
            Outcome::None => {}
            Outcome::Info(msg) => message(rfd::MessageLevel::Info, "Done", &msg),
            Outcome::Warning(msg) => message(rfd::MessageLevel::Warning, "Warning", &msg),
            Outcome::Error(msg) => message(rfd::MessageLevel::Error, "Error", &msg),
            Outcome::Quit => {
                info!("quit requested");
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }

    fn key_commands(&self, ctx: &egui::Context) -> Vec<Command> {
        let view = self.session.view();
        if view == View::Main && ctx.wants_keyboard_input() {
            return Vec::new();
        }
        let rows = isize::try_from(self.gallery_columns).unwrap_or(1);
        ctx.input(|i| {
            let mut cmds: Vec<Command> = keymap(view)
                .iter()
                .filter(|(key, _)| i.key_pressed(*key))
                .map(|(_, cmd)| cmd.clone())
                .collect();
            if view == View::Gallery {
                if i.key_pressed(Key::ArrowUp) {
                    cmds.push(Command::GalleryStep(-rows));
                }
                if i.key_pressed(Key::ArrowDown) {
                    cmds.push(Command::GalleryStep(rows));
                }
            }
            cmds
        })
    }

    /// Runs the same teardown as Quit when the window goes away by other
    /// means, such as the title bar close button.
    fn shutdown(&mut self) {
        self.session.dispatch(Command::Quit, Instant::now());
    }

    fn pick_folder(current: &str) -> Option<String> {
        let mut dialog = rfd::FileDialog::new();
        if Path::new(current).is_dir() {
            dialog = dialog.set_directory(current);
        }
        dialog.pick_folder().map(|p| p.to_string_lossy().into_owned())
    }

    fn ask_output_path(&self) -> Option<PathBuf> {
        let stem = self
            .session
            .browser()
            .current_image()
            .and_then(|p| p.file_stem())
            .map(|s| format!("{}_bbox.jpg", s.to_string_lossy()))
            .unwrap_or_else(|| "bbox.jpg".to_owned());
        let mut out = rfd::FileDialog::new()
            .add_filter("JPEG", &["jpg", "jpeg"])
            .add_filter("PNG", &["png"])
            .set_file_name(stem)
            .save_file()?;
        if out.extension().is_none() {
            out.set_extension("jpg");
        }
        Some(out)
    }

    fn main_view(&mut self, ctx: &egui::Context) -> Vec<Command> {
        let mut cmds = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Grid::new("folders").num_columns(3).spacing([8.0, 8.0]).show(ui, |ui| {
                ui.label("Image folder:");
                let resp = ui.add(egui::TextEdit::singleline(&mut self.image_dir_text).desired_width(480.0));
                if resp.lost_focus() {
                    cmds.push(Command::SetImageDir(self.image_dir_text.clone()));
                }
                if ui.button("Browse...").clicked() {
                    if let Some(dir) = Self::pick_folder(&self.image_dir_text) {
                        self.image_dir_text = dir.clone();
                        cmds.push(Command::SetImageDir(dir));
                    }
                }
                ui.end_row();

                ui.label("Label folder:");
                let resp = ui.add(egui::TextEdit::singleline(&mut self.label_dir_text).desired_width(480.0));
                if resp.lost_focus() {
                    cmds.push(Command::SetLabelDir(self.label_dir_text.clone()));
                }
                if ui.button("Browse...").clicked() {
                    if let Some(dir) = Self::pick_folder(&self.label_dir_text) {
                        self.label_dir_text = dir.clone();
                        cmds.push(Command::SetLabelDir(dir));
                    }
                }
                ui.end_row();
            });

            ui.separator();
            let browser = self.session.browser();
            egui::Grid::new("status").num_columns(2).spacing([8.0, 4.0]).show(ui, |ui| {
                ui.label("Current file:");
                ui.label(browser.current_file_name());
                ui.end_row();
                ui.label("Current label:");
                ui.label(browser.label_status().to_string());
                ui.end_row();
                ui.label("Position:");
                ui.label(browser.position_text());
                ui.end_row();
            });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("< Previous (A)").clicked() {
                    cmds.push(Command::Previous);
                }
                if ui.button("Next (D) >").clicked() {
                    cmds.push(Command::Next);
                }
                ui.separator();
                if ui.button("View").clicked() {
                    cmds.push(Command::OpenViewer);
                }
                if ui.button("Gallery").clicked() {
                    cmds.push(Command::OpenGallery);
                }
                if ui.button("Save image").clicked() {
                    if let Some(out) = self.ask_output_path() {
                        cmds.push(Command::SaveCurrent(out));
                    }
                }
                if ui.button("Quit").clicked() {
                    cmds.push(Command::Quit);
                }
            });
        });
        cmds
    }

    fn gallery_view(&mut self, ctx: &egui::Context) -> Vec<Command> {
        let mut cmds = Vec::new();
        let Some(grid) = self.session.gallery() else {
            return cmds;
        };
        let images = self.session.browser().images();

        egui::TopBottomPanel::top("gallery_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(grid.status_text());
                ui.add_space(12.0);
                ui.label(self.session.selection_text());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Open selected").clicked() {
                        cmds.push(Command::GalleryOpenSelected);
                    }
                    if ui.button("Close").clicked() {
                        cmds.push(Command::CloseGallery);
                    }
                });
            });
        });

        let mut scroll = None;
        let mut grid_columns = None;
        let reveal = std::mem::take(&mut self.reveal_selection);
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(GRID_BACKGROUND))
            .show(ctx, |ui| {
                let tile = Vec2::new(THUMB_SIZE.0 as f32, THUMB_SIZE.1 as f32);
                let columns = gallery::columns_for_width(ui.available_width(), tile.x, TILE_SPACING);
                grid_columns = Some(columns);
                let output = egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                    ui.spacing_mut().item_spacing = Vec2::splat(TILE_SPACING);
                    for row_start in (0..grid.loaded()).step_by(columns) {
                        ui.horizontal(|ui| {
                            for index in row_start..(row_start + columns).min(grid.loaded()) {
                                ui.vertical(|ui| {
                                    ui.set_width(tile.x);
                                    let tex = grid.thumbnail(index).unwrap_or(&self.placeholder);
                                    let resp = ui.add(
                                        egui::Image::new(tex).fit_to_exact_size(tile).sense(Sense::click()),
                                    );
                                    let selected = grid.selected() == Some(index);
                                    if selected && reveal {
                                        resp.scroll_to_me(Some(egui::Align::Center));
                                    }
                                    let border = if selected {
                                        Stroke::new(2.0, TILE_SELECTED)
                                    } else {
                                        Stroke::new(1.0, TILE_BORDER)
                                    };
                                    ui.painter().rect_stroke(resp.rect.expand(1.0), 0.0, border);
                                    ui.label(gallery::caption(&browser::file_name(&images[index])));
                                    if resp.double_clicked() {
                                        cmds.push(Command::GalleryOpen(index));
                                    } else if resp.clicked() {
                                        cmds.push(Command::GallerySelect(index));
                                    }
                                });
                            }
                        });
                    }
                });
                let height = output.inner_rect.height();
                let bottom = (output.state.offset.y + height) / output.content_size.y.max(1.0);
                scroll = Some(((output.state.offset.y, height), bottom));
            });

        if let Some(columns) = grid_columns {
            self.gallery_columns = columns;
        }
        if let Some((key, bottom)) = scroll {
            if self.last_scroll != Some(key) {
                self.last_scroll = Some(key);
                cmds.push(Command::GalleryScrolled(bottom));
            }
        }
        cmds
    }

    fn viewer_view(&mut self, ctx: &egui::Context) -> Vec<Command> {
        let mut cmds = Vec::new();
        egui::TopBottomPanel::bottom("viewer_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                for (text, cmd) in VIEWER_BUTTONS {
                    if ui.button(*text).clicked() {
                        cmds.push(cmd.clone());
                    }
                }
                ui.add_space(12.0);
                ui.label(self.session.browser().position_text());
            });
        });
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| {
                let size = ui.available_size();
                cmds.push(Command::ViewerResized(size.x.max(0.0) as u32, size.y.max(0.0) as u32));
                if let Some(tex) = &self.frame {
                    let [w, h] = tex.size();
                    ui.centered_and_justified(|ui| {
                        ui.add(egui::Image::new(tex).fit_to_exact_size(Vec2::new(w as f32, h as f32)));
                    });
                }
            });
        cmds
    }

    fn refresh_viewer_frame(&mut self, ctx: &egui::Context) {
        match self.session.viewer_frame() {
            Ok(Some(frame)) => {
                let image = to_color_image(&frame);
                match &mut self.frame {
                    Some(tex) => tex.set(image, TextureOptions::LINEAR),
                    None => self.frame = Some(ctx.load_texture("viewer", image, TextureOptions::LINEAR)),
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!("{e}");
                self.frame = None;
                message(rfd::MessageLevel::Error, "Error", &e.to_string());
            }
        }
    }

    fn sync_window(&mut self, ctx: &egui::Context) {
        let view = self.session.view();
        if view == self.shown_view {
            return;
        }
        if window_size(view) != window_size(self.shown_view) {
            ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(window_size(view).into()));
        }
        if view != View::Viewer {
            self.frame = None;
        }
        if view != View::Gallery {
            self.last_scroll = None;
        }
        self.shown_view = view;
    }
}

impl eframe::App for BrowserApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut cmds = self.key_commands(ctx);
        if cmds.iter().any(|c| matches!(c, Command::GalleryStep(_))) {
            self.reveal_selection = true;
        }
        cmds.extend(match self.session.view() {
            View::Main => self.main_view(ctx),
            View::Gallery => self.gallery_view(ctx),
            View::Viewer => self.viewer_view(ctx),
        });
        for cmd in cmds {
            self.apply(ctx, cmd);
        }

        let now = Instant::now();
        let changed = self.session.pump(now, |path| {
            let tile = thumbnail::make_thumbnail(path, THUMB_SIZE);
            ctx.load_texture(path.to_string_lossy(), to_color_image(&tile), TextureOptions::LINEAR)
        });
        self.refresh_viewer_frame(ctx);
        self.sync_window(ctx);

        if changed {
            ctx.request_repaint();
        } else if let Some(wait) = self.session.next_deadline(now) {
            ctx.request_repaint_after(wait);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.shutdown();
    }
}

fn message(level: rfd::MessageLevel, title: &str, text: &str) {
    rfd::MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(text)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_view_has_a_way_out() {
        assert!(GALLERY_KEYS.iter().any(|(k, c)| *k == Key::Escape && *c == Command::CloseGallery));
        assert!(VIEWER_KEYS.iter().any(|(k, c)| *k == Key::Escape && *c == Command::ViewerEscape));
        assert!(VIEWER_KEYS.iter().any(|(k, c)| *k == Key::Q && *c == Command::ViewerClose));
    }

    #[test]
    fn viewer_navigates_with_letters_and_arrows() {
        let prev: Vec<Key> = VIEWER_KEYS
            .iter()
            .filter(|(_, c)| *c == Command::Previous)
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(prev, [Key::A, Key::ArrowLeft]);
        assert_eq!(keymap(View::Main), MAIN_KEYS);
    }

    #[test]
    fn gallery_arrows_step_the_selection() {
        assert!(GALLERY_KEYS.contains(&(Key::ArrowLeft, Command::GalleryStep(-1))));
        assert!(GALLERY_KEYS.contains(&(Key::ArrowRight, Command::GalleryStep(1))));
    }

    #[test]
    fn viewer_bar_offers_navigation_and_close() {
        let cmds: Vec<&Command> = VIEWER_BUTTONS.iter().map(|(_, c)| c).collect();
        assert_eq!(
            cmds,
            [&Command::Previous, &Command::Next, &Command::ViewerEscape, &Command::ViewerClose]
        );
        assert!(VIEWER_BUTTONS.iter().all(|(text, _)| !text.is_empty()));
    }

    #[test]
    fn closing_the_window_saves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut app = BrowserApp::new(&egui::Context::default(), path.clone());
        assert!(!path.exists());
        app.shutdown();
        assert!(path.is_file());
    }

    #[test]
    fn browsing_views_share_the_large_window() {
        assert_eq!(window_size(View::Gallery), window_size(View::Viewer));
        assert_eq!(window_size(View::Main), MAIN_SIZE);
    }
}
