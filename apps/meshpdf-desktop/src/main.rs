//! MeshPDF desktop editor
//!
//! Open a PDF, draw signatures, place text, combine files and save or print
//! the flattened result.

mod app;
mod dialogs;
mod print;
mod render;
mod signature_window;

use anyhow::anyhow;
use clap::Parser;
use eframe::egui;
use meshpdf_core::EditorConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "meshpdf")]
#[command(about = "Sign, annotate and combine PDF files")]
struct Args {
    /// PDF to open at startup
    file: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Log to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = EditorConfig::load(args.config.as_deref())?;
    tracing::info!("Starting MeshPDF v{}", env!("CARGO_PKG_VERSION"));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("MeshPDF")
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    let rasterizer = render::default_rasterizer();
    eframe::run_native(
        "MeshPDF",
        options,
        Box::new(move |_cc| Ok(Box::new(app::MeshPdfApp::new(config, rasterizer, args.file)))),
    )
    .map_err(|e| anyhow!("Window error: {}", e))
}
