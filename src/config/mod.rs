mod auth;
mod imapmirror;
mod pairing;

use std::{env, io, path::PathBuf};

use thiserror::Error;

pub use auth::AuthConfig;
pub use imapmirror::Config;
pub use pairing::{Endpoint, Pairing};

#[cfg(test)]
pub use pairing::testing;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} is unreadable: {source}", path.to_string_lossy())]
    Unreadable { path: PathBuf, source: io::Error },
    #[error("config file {} is malformed: {source}", path.to_string_lossy())]
    Malformed {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("neither {0} nor HOME is set")]
    NoHome(&'static str),
    #[error("no pairing named {0} is configured")]
    UnknownPairing(String),
    #[error("since = {value:?} of pairing {pairing} is not a YYYY-MM-DD date: {source}")]
    InvalidSince {
        pairing: String,
        value: String,
        source: jiff::Error,
    },
    #[error("chunk_size of pairing {0} has to be positive")]
    ZeroChunkSize(String),
    #[error("password_cmd for {user} failed: {reason}")]
    PasswordCommand { user: String, reason: String },
    #[error("password_env {variable} for {user} is not set")]
    PasswordEnvironment { user: String, variable: String },
}

/// `$<variable>` or, if unset, `~/<fallback>`, with the program name appended.
fn xdg_dir(variable: &'static str, fallback: &str) -> Result<PathBuf, ConfigError> {
    let mut dir = if let Some(dir) = env::var_os(variable) {
        PathBuf::from(dir)
    } else {
        let mut home = PathBuf::from(env::var_os("HOME").ok_or(ConfigError::NoHome(variable))?);
        home.push(fallback);
        home
    };
    dir.push(env!("CARGO_PKG_NAME"));

    Ok(dir)
}
