//! Error types for the sensu-puppet-handler crate.

use std::fmt;

use sensu_puppet_core::{ConfigError, EventError};
use thiserror::Error;

/// The remote service a request was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    PuppetDb,
    Sensu,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PuppetDb => f.write_str("PuppetDB"),
            Self::Sensu => f.write_str("the Sensu API"),
        }
    }
}

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("could not read the certificate/key: {0}")]
    Tls(String),

    #[error("unable to load {path}: {source}")]
    CaCertRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CA certificate: {0}")]
    InvalidCaCert(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} while querying {backend}")]
    UnexpectedStatus {
        backend: Backend,
        status: reqwest::StatusCode,
    },

    #[error("{backend} returned an invalid response: {message}")]
    InvalidResponse { backend: Backend, message: String },
}

pub type Result<T> = std::result::Result<T, HandlerError>;
