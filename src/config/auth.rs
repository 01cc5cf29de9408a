use std::{env, process::Command};

use derive_getters::Getters;
use serde::Deserialize;

use crate::config::ConfigError;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PasswordSource {
    Command { password_cmd: String },
    Environment { password_env: String },
}

#[derive(Debug, Clone, Deserialize, Getters)]
pub struct PlainAuthConfig {
    user: String,
    #[getter(skip)]
    #[serde(flatten)]
    password: PasswordSource,
}

impl PlainAuthConfig {
    pub fn password(&self) -> Result<String, ConfigError> {
        match &self.password {
            PasswordSource::Command { password_cmd } => self.run_password_cmd(password_cmd),
            PasswordSource::Environment { password_env } => {
                env::var(password_env).map_err(|_| ConfigError::PasswordEnvironment {
                    user: self.user.clone(),
                    variable: password_env.clone(),
                })
            }
        }
    }

    fn run_password_cmd(&self, password_cmd: &str) -> Result<String, ConfigError> {
        let failure = |reason: String| ConfigError::PasswordCommand {
            user: self.user.clone(),
            reason,
        };
        let mut cmd_parts = password_cmd.split_whitespace();
        let mut cmd = Command::new(
            cmd_parts
                .next()
                .ok_or_else(|| failure("no program given".to_string()))?,
        );
        cmd.args(cmd_parts);
        let output = cmd.output().map_err(|error| failure(error.to_string()))?;
        if !output.status.success() {
            return Err(failure(format!("exited with {}", output.status)));
        }

        let password = String::from_utf8(output.stdout)
            .map_err(|_| failure("output is not UTF-8".to_string()))?
            .trim_end_matches(['\r', '\n'])
            .to_string();
        if password.is_empty() {
            return Err(failure("printed no password".to_string()));
        }

        Ok(password)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AuthConfig {
    Plain(PlainAuthConfig),
}

impl AuthConfig {
    pub fn user(&self) -> &str {
        match self {
            Self::Plain(plain) => plain.user(),
        }
    }

    pub fn password(&self) -> Result<String, ConfigError> {
        match self {
            Self::Plain(plain) => plain.password(),
        }
    }
}
