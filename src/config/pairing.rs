use std::num::NonZeroUsize;

use derive_getters::Getters;
use jiff::civil;
use serde::Deserialize;

use crate::config::{AuthConfig, ConfigError};

const DEFAULT_CHUNK_SIZE: NonZeroUsize = NonZeroUsize::new(100).expect("100 is not zero");

fn default_port() -> u16 {
    993
}

fn default_mailbox() -> String {
    "INBOX".to_string()
}

#[derive(Debug, Deserialize)]
struct SourceConfig {
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_mailbox")]
    mailbox: String,
    auth: AuthConfig,
}

#[derive(Debug, Deserialize)]
struct DestinationConfig {
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    container: String,
    auth: AuthConfig,
}

/// A pairing as written in the config file.
#[derive(Debug, Deserialize)]
pub struct PairingConfig {
    source: SourceConfig,
    destination: DestinationConfig,
    since: Option<String>,
    chunk_size: Option<usize>,
}

impl PairingConfig {
    pub fn validate(&self, name: &str, container: Option<&str>) -> Result<Pairing, ConfigError> {
        let since = self
            .since
            .as_deref()
            .map(|since| {
                since
                    .parse::<civil::Date>()
                    .map_err(|source| ConfigError::InvalidSince {
                        pairing: name.to_string(),
                        value: since.to_string(),
                        source,
                    })
            })
            .transpose()?;
        let chunk_size = match self.chunk_size {
            None => DEFAULT_CHUNK_SIZE,
            Some(chunk_size) => NonZeroUsize::new(chunk_size)
                .ok_or_else(|| ConfigError::ZeroChunkSize(name.to_string()))?,
        };

        Ok(Pairing {
            name: name.to_string(),
            source: Endpoint {
                host: self.source.host.clone(),
                port: self.source.port,
                auth: self.source.auth.clone(),
            },
            mailbox: self.source.mailbox.clone(),
            destination: Endpoint {
                host: self.destination.host.clone(),
                port: self.destination.port,
                auth: self.destination.auth.clone(),
            },
            container: container.unwrap_or(&self.destination.container).to_string(),
            since,
            chunk_size,
        })
    }
}

#[derive(Debug, Clone, Getters)]
pub struct Endpoint {
    host: String,
    #[getter(skip)]
    port: u16,
    auth: AuthConfig,
}

impl Endpoint {
    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Everything one pass needs to know about a source and destination, validated.
/// The name doubles as the key of the recorded progress.
#[derive(Debug, Clone, Getters)]
pub struct Pairing {
    name: String,
    source: Endpoint,
    mailbox: String,
    destination: Endpoint,
    container: String,
    #[getter(skip)]
    since: Option<civil::Date>,
    #[getter(skip)]
    chunk_size: NonZeroUsize,
}

impl Pairing {
    /// Only mails received on or after this day are mirrored.
    pub fn since(&self) -> Option<civil::Date> {
        self.since
    }

    pub fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }
}
