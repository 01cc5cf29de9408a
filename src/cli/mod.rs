mod sync;

use anyhow::Result;

use crate::{
    Args,
    cli::sync::{sync_all, sync_pairing},
    config::Config,
};

pub fn run(args: &Args, config: &Config) -> Result<()> {
    if let Some(pairing) = &args.pairing {
        sync_pairing(config, pairing, args.container.as_deref())
    } else {
        sync_all(args.config.as_deref(), config)
    }
}
