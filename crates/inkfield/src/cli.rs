use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "inkfield",
    author,
    version,
    about = "Render a still image as a GPU particle field you can smear with the pointer",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Image files to show, in catalog order; the first loads at start-up
    /// and number keys 1-9 switch between them.
    #[arg(value_name = "IMAGE")]
    pub images: Vec<PathBuf>,

    /// TOML catalog of named images (`[[image]] name = "..." path = "..."`);
    /// replaces the positional IMAGE list.
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Initial particle size, clamped to [0,1].
    #[arg(long, value_name = "SIZE", default_value_t = renderer::DEFAULT_PARTICLE_SIZE)]
    pub size: f32,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub window: Option<String>,

    /// Show the raw displacement buffer and per-second frame timing.
    #[arg(long)]
    pub debug: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}
