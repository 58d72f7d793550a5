//! Colorbalance demo: grade an image file with the color balance stage.
//!
//! Reads an sRGB image, converts it to Lab, grades it with the configured
//! backend (GPU, vector or scalar) and writes the result. A parameter preset
//! may be given as JSON; otherwise the neutral defaults are used. With
//! `--preview` a downscaled copy is graded alongside and written too.

mod config;
mod image_loader;
mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use colorbalance_core::{ColorBalanceParams, GradingStage};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::render::Renderer;

#[derive(Parser)]
#[command(name = "colorbalance")]
#[command(version, about = "Apply a lift/gamma/gain color balance to an image")]
struct Cli {
    /// Input image.
    input: PathBuf,
    /// Output image; format follows the extension.
    output: PathBuf,
    /// Parameter preset (JSON).
    params: Option<PathBuf>,
    /// Also write a downscaled preview here (long edge from COLORBALANCE_PREVIEW).
    #[arg(long)]
    preview: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::default();
    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build_global()?;
    }

    let params = match &cli.params {
        Some(path) => ColorBalanceParams::load(path)?,
        None => ColorBalanceParams::default(),
    };
    tracing::info!(mode = params.mode.label(), "grading");
    tracing::debug!(params = %serde_json::to_string(&params)?, "loaded preset");

    let stage = GradingStage::new(params);
    let coeffs = stage.coefficients();
    let image = image_loader::load_image(&cli.input)?;

    let renderer = Renderer::new(config.backend);
    let edge = preview_edge(cli.preview.as_deref(), config.preview_edge);
    let (full, preview) = renderer.render_with_preview(&coeffs, &image, edge);
    if let (Some(path), Some(preview)) = (&cli.preview, preview) {
        let preview = preview?;
        tracing::info!(width = preview.width, height = preview.height, "preview rendered");
        image_loader::save_image(path, &preview)?;
    }
    image_loader::save_image(&cli.output, &full?)?;
    Ok(())
}

/// Long edge of the preview to render, or 0 when none is wanted.
fn preview_edge(path: Option<&Path>, configured: u32) -> u32 {
    if path.is_some() { configured } else { 0 }
}
