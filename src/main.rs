mod annotate;
mod browser;
mod display;
mod error;
mod gallery;
mod geometry;
mod labels;
mod runner;
mod schedule;
mod session;
mod settings;
mod thumbnail;
mod ui;
mod viewer;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use log::error;

use crate::runner::RunOutcome;
use crate::settings::Settings;

/// Draw YOLO bounding boxes on an image, or browse a folder of images with
/// their labels.
#[derive(Parser, Debug)]
#[command(name = "bbox-viewer", version)]
struct Cli {
    /// Image to annotate
    image: Option<PathBuf>,

    /// YOLO label file for the image
    labels: Option<PathBuf>,

    /// Save the annotated image here instead of showing it
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Open the folder browser even if files are given
    #[arg(long)]
    gui: bool,

    /// Where the browser remembers its folders
    #[arg(long, value_name = "PATH")]
    state_file: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
enum Mode {
    Browser,
    SingleShot { image: PathBuf, labels: PathBuf },
    Usage,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.gui {
            return Mode::Browser;
        }
        match (&self.image, &self.labels) {
            (None, None) => Mode::Browser,
            (Some(image), Some(labels)) => Mode::SingleShot {
                image: image.clone(),
                labels: labels.clone(),
            },
            _ => Mode::Usage,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    match cli.mode() {
        Mode::Browser => {
            let path = cli.state_file.unwrap_or_else(Settings::default_path);
            match ui::run(path) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("browser failed: {e:#}");
                    eprintln!("[error] {e:#}");
                    ExitCode::FAILURE
                }
            }
        }
        Mode::SingleShot { image, labels } => {
            let strategies = display::default_strategies();
            match runner::run(&image, &labels, cli.out.as_deref(), &strategies) {
                Ok(RunOutcome::Saved(out)) => {
                    println!("[ok] saved annotated image to {}", out.display());
                    ExitCode::SUCCESS
                }
                Ok(RunOutcome::Displayed { strategy, .. }) => {
                    println!("[ok] shown with the {strategy} viewer");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("[error] {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Mode::Usage => {
            eprint!("{}", Cli::command().render_help());
            eprintln!("\n[error] give both IMAGE and LABELS, or neither to open the browser");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(args: &[&str]) -> Mode {
        Cli::try_parse_from(std::iter::once("bbox-viewer").chain(args.iter().copied()))
            .unwrap()
            .mode()
    }

    #[test]
    fn no_arguments_open_the_browser() {
        assert_eq!(mode(&[]), Mode::Browser);
        assert_eq!(mode(&["a.jpg", "a.txt", "--gui"]), Mode::Browser);
    }

    #[test]
    fn two_positionals_run_once() {
        assert_eq!(
            mode(&["a.jpg", "a.txt", "--out", "o.jpg"]),
            Mode::SingleShot {
                image: PathBuf::from("a.jpg"),
                labels: PathBuf::from("a.txt"),
            }
        );
    }

    #[test]
    fn single_positional_is_a_usage_error() {
        assert_eq!(mode(&["a.jpg"]), Mode::Usage);
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Cli::try_parse_from(["bbox-viewer", "--bogus"]).is_err());
    }

    #[test]
    fn state_file_is_optional() {
        let cli = Cli::try_parse_from(["bbox-viewer", "--state-file", "s.json"]).unwrap();
        assert_eq!(cli.state_file, Some(PathBuf::from("s.json")));
        Cli::command().debug_assert();
    }

    #[test]
    fn usage_text_lists_every_option() {
        let help = Cli::command().render_help().to_string();
        for flag in ["--out", "--gui", "--state-file", "IMAGE", "LABELS"] {
            assert!(help.contains(flag), "{flag} missing from help");
        }
    }
}
