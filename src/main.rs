mod cli;
mod config;
mod error;
mod imap;
mod logging;
mod progress;
mod repository;
mod sync;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use config::Config;

/// Mirrors new mails from a source IMAP mailbox into a destination mailbox.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Config file [default: $XDG_CONFIG_HOME/imapmirror/config.toml]
    #[arg(long)]
    config: Option<PathBuf>,
    /// Only sync this pairing, in this process
    #[arg(long)]
    pairing: Option<String>,
    /// Mirror into this container instead of the configured one
    #[arg(long, requires = "pairing")]
    container: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.pairing.as_deref());

    let config = Config::load_from_file(args.config.as_deref())?;
    cli::run(&args, &config)
}
