//! # DKG Server
//!
//! Serves P0's side of the two-party DKG over HTTP, and a typed client for
//! the counterpart.

pub mod client;
pub mod config;
pub mod opts;
pub mod routes;
pub mod serve;

#[cfg(test)]
mod test_helpers;

use thiserror::Error;

pub type ServerResult<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("could not read {path}: {source}")]
    ReadConfig {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    ParseConfig(#[from] toml::de::Error),
    #[error("could not print config: {0}")]
    PrintConfig(#[from] toml::ser::Error),
    #[error("{0}")]
    IoError(#[from] std::io::Error),
}
