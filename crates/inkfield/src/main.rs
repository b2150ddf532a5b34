//! Entry point wiring for the inkfield viewer: parses the CLI surface,
//! initialises tracing, resolves the image catalog, and hands a
//! `ViewerConfig` to the renderer.

mod catalog;
mod cli;
mod run;

use anyhow::Result;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    run::run(cli)
}
