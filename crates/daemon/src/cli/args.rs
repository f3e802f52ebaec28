pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stash")]
#[command(about = "Serve a directory and export parts of it as archives or playlists")]
#[command(version)]
pub struct Args {
    /// Path to the stash state directory (defaults to ~/.stash)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
