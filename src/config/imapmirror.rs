use std::{
    collections::BTreeMap,
    fs::read_to_string,
    path::{Path, PathBuf},
};

use derive_getters::Getters;
use serde::Deserialize;

use crate::config::{ConfigError, Pairing, pairing::PairingConfig, xdg_dir};

#[derive(Deserialize)]
struct ConfigFile {
    statedir: Option<PathBuf>,
    pairings: BTreeMap<String, PairingConfig>,
}

#[derive(Debug, Getters)]
pub struct Config {
    statedir: PathBuf,
    #[getter(skip)]
    pairings: BTreeMap<String, PairingConfig>,
}

impl Config {
    pub fn load_from_file(file: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match file {
            Some(file) => file.to_path_buf(),
            None => default_location()?,
        };
        let contents = read_to_string(&path).map_err(|source| ConfigError::Unreadable {
            path: path.clone(),
            source,
        })?;

        Self::parse(&contents, &path)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|source| ConfigError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        let statedir = match file.statedir {
            Some(statedir) => statedir,
            None => default_statedir()?,
        };

        Ok(Self {
            statedir,
            pairings: file.pairings,
        })
    }

    pub fn pairing_names(&self) -> impl Iterator<Item = &str> {
        self.pairings.keys().map(String::as_str)
    }

    /// Validates the pairing `name`, optionally filing mails into `container`
    /// instead of the configured destination container.
    pub fn pairing(
        &self,
        name: &str,
        container: Option<&str>,
    ) -> Result<Pairing, ConfigError> {
        self.pairings
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPairing(name.to_string()))?
            .validate(name, container)
    }
}

fn default_location() -> Result<PathBuf, ConfigError> {
    let mut config_dir = xdg_dir("XDG_CONFIG_HOME", ".config")?;
    config_dir.push("config.toml");

    Ok(config_dir)
}

fn default_statedir() -> Result<PathBuf, ConfigError> {
    xdg_dir("XDG_STATE_HOME", ".local/state")
}
