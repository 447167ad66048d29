use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::ConnectionArgs;
use crate::paths;

pub const DEFAULT_PORT: u16 = 8006;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection defaults read from `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_host: Option<String>,
    pub api_port: Option<u16>,
    pub api_user: Option<String>,
    pub api_password: Option<String>,
    pub api_token_id: Option<String>,
    pub api_token_secret: Option<String>,
    pub validate_certs: Option<bool>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load an explicitly given file, or the default one if it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => {
                let path = paths::default_config_file()?;
                if !path.exists() {
                    return Ok(Self::default());
                }
                Self::load_from_path(&path)
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading connection config from {}", path.display()))?;
        Self::load_from_str(&contents)
            .with_context(|| format!("parsing connection config at {}", path.display()))
    }

    pub fn load_from_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("parsing config")
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required arguments: {0}")]
    Missing(&'static str),

    #[error("parameters are required together: api_token_id, api_token_secret")]
    TokenIncomplete,

    #[error("one of the following is required: api_password, api_token_id")]
    NoCredentials,

    #[error("timeout must be at least one second")]
    ZeroTimeout,
}

#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Token { token_id: String, secret: String },
    Password(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Token { token_id, .. } => f
                .debug_struct("Token")
                .field("token_id", token_id)
                .field("secret", &"********")
                .finish(),
            Auth::Password(_) => f.debug_tuple("Password").field(&"********").finish(),
        }
    }
}

/// Fully resolved connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub auth: Auth,
    pub validate_certs: bool,
    pub timeout: Duration,
}

impl ConnectionSettings {
    /// Merge command line (and its env fallbacks) over the config file
    pub fn resolve(args: &ConnectionArgs, file: FileConfig) -> Result<Self, ConfigError> {
        let host = args
            .api_host
            .clone()
            .or(file.api_host)
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::Missing("api_host"))?;
        let user = args
            .api_user
            .clone()
            .or(file.api_user)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::Missing("api_user"))?;

        let token_id = args.api_token_id.clone().or(file.api_token_id);
        let token_secret = args.api_token_secret.clone().or(file.api_token_secret);
        let password = args.api_password.clone().or(file.api_password);

        let auth = match (token_id, token_secret, password) {
            (Some(token_id), Some(secret), _) => Auth::Token { token_id, secret },
            (Some(_), None, _) | (None, Some(_), _) => return Err(ConfigError::TokenIncomplete),
            (None, None, Some(password)) => Auth::Password(password),
            (None, None, None) => return Err(ConfigError::NoCredentials),
        };

        let timeout_secs = args
            .timeout
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(Self {
            host,
            port: args.api_port.or(file.api_port).unwrap_or(DEFAULT_PORT),
            user,
            auth,
            validate_certs: args.validate_certs.or(file.validate_certs).unwrap_or(false),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn base_url(&self) -> String {
        format!("https://{}:{}/api2/json", self.host, self.port)
    }
}
