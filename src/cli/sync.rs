use std::{env, path::Path, process::Command};

use anyhow::{Context, Result, bail};
use log::{error, info};

use crate::{
    config::Config, error::SyncError, imap::ImapConnector, progress::ProgressStore, sync::Syncer,
};

/// Runs one pass of `name` in this process.
pub fn sync_pairing(config: &Config, name: &str, container: Option<&str>) -> Result<()> {
    let pairing = config
        .pairing(name, container)
        .map_err(SyncError::Configuration)?;
    let store = ProgressStore::new(config.statedir());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .context("tokio runtime should be buildable")?;

    let report = runtime.block_on(Syncer::new(&pairing, &store).sync(&ImapConnector))?;
    if report.reset {
        info!(
            "started over at uid validity {}, {} mails mirrored",
            report.uid_validity, report.transferred
        );
    } else {
        info!("{} mails mirrored", report.transferred);
    }

    Ok(())
}

/// Runs every configured pairing one after another, each in its own process.
pub fn sync_all(config_file: Option<&Path>, config: &Config) -> Result<()> {
    let program = env::current_exe().context("own executable should be locatable")?;

    let mut failed = Vec::new();
    for name in config.pairing_names() {
        let mut subprocess = Command::new(&program);
        if let Some(config_file) = config_file {
            subprocess.arg("--config").arg(config_file);
        }
        subprocess.args(["--pairing", name]);
        let status = subprocess
            .status()
            .with_context(|| format!("pairing {name} should be runnable as subprocess"))?;
        if !status.success() {
            error!("syncing pairing {name} failed");
            failed.push(name);
        }
    }

    if !failed.is_empty() {
        bail!("syncing {} failed", failed.join(", "));
    }
    Ok(())
}
