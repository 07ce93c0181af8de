// hide console window on Windows in release
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use clap::Parser;
use directories::ProjectDirs;
use std::error::Error;
use std::path::PathBuf;

mod components;
mod ui;
mod util;

use crate::components::bundle::{Bundle, BundleSource};
use crate::ui::{EditorApp, Settings};

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Bundle file to open (and save to)
    #[arg(long)]
    bundle: Option<PathBuf>,

    /// Settings file to use instead of the one in the user's config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start from the sample bundle even if `--bundle` already exists
    #[arg(long)]
    new: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let args = Args::parse();

    let settings_path = args.config.clone().or_else(|| {
        ProjectDirs::from("", "", "bundle-editor").map(|dirs| Settings::get_path(&dirs))
    });
    let settings = match &settings_path {
        Some(path) => Settings::load_from(path).unwrap_or_else(|err| {
            log::error!("could not read settings from {path:?}, using defaults: {err}");
            Settings::default()
        }),
        None => {
            log::warn!("no config directory available, settings won't be saved");
            Settings::default()
        }
    };

    let path = args
        .bundle
        .clone()
        .unwrap_or_else(|| PathBuf::from("bundle.toml"));
    let bundle = if !args.new && path.exists() {
        BundleSource::new(&path).load()?
    } else {
        log::info!("starting from the sample bundle, it will be saved to {path:?}");
        Bundle::sample()
    };

    eframe::run_native(
        "Bundle Editor",
        eframe::NativeOptions::default(),
        Box::new(move |cc| {
            Ok(Box::new(EditorApp::new(
                cc,
                bundle,
                path,
                settings,
                settings_path,
            )))
        }),
    )?;

    Ok(())
}
