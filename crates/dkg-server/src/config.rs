use super::{opts::ServeOpts, ServerError, ServerResult};
use dkg_core::ProtocolConfig;
use serde::{Deserialize, Serialize};
use std::{fs, time::Duration};

/// The server's configuration, read from a TOML file. Every field has a
/// default, so an empty file is a valid configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub protocol: ProtocolConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long a request may take end to end
    pub request_timeout_secs: u64,
    /// Requests served at once before new ones are shed
    pub concurrency_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            request_timeout_secs: 30,
            concurrency_limit: 1024,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Reads the config at `path`, or returns the defaults
    pub fn load(path: Option<&str>) -> ServerResult<Self> {
        let path = match path {
            Some(path) => path,
            None => return Ok(Self::default()),
        };
        let text = fs::read_to_string(path).map_err(|source| ServerError::ReadConfig {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Applies the command line overrides
    pub fn apply(&mut self, opts: &ServeOpts) {
        if let Some(host) = &opts.host {
            self.server.host = host.clone();
        }
        if let Some(port) = opts.port {
            self.server.port = port;
        }
    }
}
