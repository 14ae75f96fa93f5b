//! Command-line arguments owned by the replay tool itself.

use std::path::PathBuf;

use clap::Parser;

/// Replays a captured transcript of backend messages.
#[derive(Parser, Debug)]
#[command(name = "probewire-replay", version)]
pub(crate) struct Cli {
    /// Protocol description document (JSON).
    #[arg(long, value_name = "PATH")]
    pub(crate) protocol: PathBuf,
    /// Transcript with one inbound JSON message per line.
    #[arg(long, value_name = "PATH")]
    pub(crate) transcript: PathBuf,
}
