// SPDX-License-Identifier: MIT OR Apache-2.0
//! `mxview` - material graph viewer
//!
//! Loads a material document together with the standard libraries,
//! generates a shader for each renderable element and draws it:
//! - Library loading with a configurable search path
//! - Element remapping and skipping
//! - Shader export to `<name>_vs.glsl` / `<name>_ps.glsl`
//! - Reload on document, source and texture changes
//!
//! ## Architecture
//!
//! `mxview_document` reads and prepares documents, `mxview_shadergen`
//! turns renderable elements into GLSL and `mxview_render` binds the
//! result through a [`mxview_render::RenderBackend`]. This binary drives
//! them with a headless backend.

mod cli;
mod error;
mod file_watcher;
mod headless;
mod settings;
mod viewer;

use cli::CliArgs;
use error::ViewerError;
use file_watcher::FileWatcher;
use headless::HeadlessBackend;
use settings::{ViewerSettings, DEFAULT_LIBRARY_ROOT};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use viewer::Viewer;

/// Delay between frames while watching
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

fn main() {
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "mxview_app=debug".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting mxview v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(std::env::args().skip(1)) {
        tracing::error!("{e}");
        std::process::exit(-1);
    }
}

fn run(args: impl IntoIterator<Item = String>) -> Result<(), ViewerError> {
    let cli = CliArgs::parse(args)?;
    if cli.help {
        println!("{}", cli::usage());
        return Ok(());
    }

    let mut settings = match &cli.config {
        Some(path) => ViewerSettings::load(path)?,
        None => ViewerSettings::default(),
    };
    cli.apply(&mut settings);
    if let Ok(cwd) = std::env::current_dir() {
        settings.search_path.append(cwd.join(DEFAULT_LIBRARY_ROOT));
    }

    let material = settings.material.clone().ok_or(ViewerError::NoMaterial)?;
    let mut viewer = Viewer::new(settings, HeadlessBackend::new())?;
    viewer.load(&material)?;
    for (index, subset) in viewer.subsets().iter().enumerate() {
        tracing::debug!("Subset {}: {}", index, subset.label());
    }
    viewer.draw_frame()?;

    if cli.save_shaders {
        viewer.save_shaders()?;
    }

    if !cli.watch {
        return Ok(());
    }

    let mut watcher = FileWatcher::for_materials()?;
    let dir = match viewer.document_path().and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    watcher.watch(&dir)?;
    tracing::info!("Watching {:?}, press Ctrl+C to quit", dir);

    loop {
        for event in watcher.poll_events() {
            if let Err(e) = viewer.handle_file_event(&event) {
                tracing::error!("Reload failed, keeping previous material: {e}");
            }
        }
        viewer.draw_frame()?;
        std::thread::sleep(FRAME_INTERVAL);
    }
}
