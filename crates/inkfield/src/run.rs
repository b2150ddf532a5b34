use anyhow::{Context, Result};
use renderer::{Viewer, ViewerConfig};
use tracing_subscriber::EnvFilter;

use crate::catalog;
use crate::cli::Cli;

const DEFAULT_WINDOW_SIZE: (u32, u32) = (1280, 720);

pub fn initialise_tracing() {
    let default_filter =
        "warn,inkfield=info,renderer=info,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error,winit=error";
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let entries = match &cli.catalog {
        Some(manifest) => catalog::from_manifest(manifest)
            .with_context(|| format!("failed to load catalog {}", manifest.display()))?,
        None => catalog::from_paths(&cli.images).context("no images supplied")?,
    };

    let window_size = cli
        .window
        .as_deref()
        .map(parse_window_size)
        .transpose()?
        .unwrap_or(DEFAULT_WINDOW_SIZE);

    tracing::info!(
        images = entries.len(),
        first = %entries[0].name,
        debug = cli.debug,
        "starting inkfield viewer"
    );

    let config = ViewerConfig {
        window_size,
        entries,
        particle_size: cli.size.clamp(0.0, 1.0),
        debug: cli.debug,
    };
    Viewer::new(config).run()
}

/// Parses `WIDTHxHEIGHT` (e.g. `1280x720`) into physical pixels.
fn parse_window_size(value: &str) -> Result<(u32, u32)> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .with_context(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
    let width: u32 = width
        .trim()
        .parse()
        .with_context(|| format!("invalid width in `{value}`"))?;
    let height: u32 = height
        .trim()
        .parse()
        .with_context(|| format!("invalid height in `{value}`"))?;
    anyhow::ensure!(width > 0 && height > 0, "window size must be non-zero");
    Ok((width, height))
}
