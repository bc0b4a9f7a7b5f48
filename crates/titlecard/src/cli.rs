use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "titlecard",
    author,
    version,
    about = "Animated title card with line and grain shader effects"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Scene file to load instead of `titlecard.toml` in the config directory.
    #[arg(long, value_name = "PATH", env = "TITLECARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the title text.
    #[arg(long)]
    pub title: Option<String>,

    /// Override the subtitle text.
    #[arg(long)]
    pub subtitle: Option<String>,

    /// Background color (`#rgb`, `#rrggbb` or a CSS color name).
    #[arg(long, alias = "color", value_name = "COLOR")]
    pub background: Option<String>,

    /// Text color (`#rgb`, `#rrggbb` or a CSS color name).
    #[arg(long, value_name = "COLOR")]
    pub text_color: Option<String>,

    /// Window or export resolution (e.g. `1024x768`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Optional FPS cap for the window (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Render a single frame to this PNG instead of opening a window.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Timestamp (seconds) the exported frame is evaluated at.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0, requires = "export")]
    pub time: f32,

    /// Starting distortion amplitude in [0, 1].
    #[arg(long, value_name = "A")]
    pub amplitude: Option<f32>,

    /// Starting slider position in [0.45, 1].
    #[arg(long, value_name = "L")]
    pub len: Option<f32>,

    /// Use only fonts already in the cache; never download.
    #[arg(long)]
    pub cache_only: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect configuration locations and defaults.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print resolved config and cache directories.
    Where,
    /// Print the default scene file.
    Default,
}

pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses `WIDTHxHEIGHT`; both sides must be non-zero.
pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1024x768".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in size '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in size '{trimmed}'"))?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}
