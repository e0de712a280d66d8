use thiserror::Error;

/// A missing or malformed handler setting.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("the PuppetDB API endpoint is required")]
    MissingEndpoint,

    #[error("the path to the SSL certificate is required")]
    MissingCert,

    #[error("the path to the private key is required")]
    MissingKey,

    #[error("the path to the Puppet CA certificate is required")]
    MissingCaCert,

    #[error("the Sensu API URL is required")]
    MissingApiUrl,

    #[error("the Sensu API key is required")]
    MissingApiKey,

    #[error("invalid PuppetDB API endpoint URL: {0}")]
    InvalidEndpoint(String),

    #[error("invalid Sensu API URL: {0}")]
    InvalidApiUrl(String),

    #[error("invalid value {value:?} for annotation {key}")]
    InvalidAnnotation { key: String, value: String },

    #[error("failed to load config file: {0}")]
    Load(#[from] config::ConfigError),
}

/// The inbound event is missing a part the handler depends on.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EventError {
    #[error("invalid event: missing check")]
    MissingCheck,

    #[error("invalid event: missing entity")]
    MissingEntity,
}
