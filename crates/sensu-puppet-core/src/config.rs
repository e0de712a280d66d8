//! Configuration for the Sensu Puppet keepalive handler.
//!
//! Configuration is resolved from (in priority order):
//! 1. Event annotations under the plugin keyspace (check before entity)
//! 2. Command-line flags and their environment variables
//! 3. Optional config file (`sensu-puppet-handler.toml` by default)
//! 4. Defaults

use std::fmt;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;
use crate::events::Event;

/// Path appended to the PuppetDB endpoint when none is configured.
pub const DEFAULT_API_PATH: &str = "pdb/query/v4/nodes";

/// Default location of the Sensu backend API.
pub const DEFAULT_SENSU_API_URL: &str = "http://localhost:8080";

/// Annotation prefix under which events may override handler options.
pub const ANNOTATION_KEYSPACE: &str = "sensu.io/plugins/sensu-puppet-handler/config";

/// Option names accepted as annotation overrides.
pub const OPTION_NAMES: &[&str] = &[
    "endpoint",
    "cert",
    "key",
    "ca-cert",
    "insecure-skip-tls-verify",
    "node-name",
    "sensu-api-url",
    "sensu-api-key",
    "sensu-ca-cert",
];

/// Operator-supplied handler settings.
///
/// Built once at startup, adjusted by event annotations, then validated
/// exactly once with [`HandlerConfig::validate`] before any network call.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HandlerConfig {
    /// PuppetDB nodes endpoint. Normalized in place by validation.
    pub endpoint: String,

    /// Client certificate PEM signed by the site's Puppet CA.
    pub cert: String,

    /// Private key PEM for `cert`.
    pub key: String,

    /// Puppet CA certificate PEM used to verify PuppetDB.
    pub ca_cert: String,

    /// Skip server certificate verification for PuppetDB and the Sensu API.
    pub insecure_skip_tls_verify: bool,

    /// Node name to query instead of the entity name.
    pub node_name: Option<String>,

    pub sensu_api_url: String,

    pub sensu_api_key: String,

    /// CA certificate PEM used to verify the Sensu API.
    pub sensu_ca_cert: Option<String>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            cert: String::new(),
            key: String::new(),
            ca_cert: String::new(),
            insecure_skip_tls_verify: false,
            node_name: None,
            sensu_api_url: DEFAULT_SENSU_API_URL.to_string(),
            sensu_api_key: String::new(),
            sensu_ca_cert: None,
        }
    }
}

impl fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConfig")
            .field("endpoint", &self.endpoint)
            .field("cert", &self.cert)
            .field("key", &self.key)
            .field("ca_cert", &self.ca_cert)
            .field("insecure_skip_tls_verify", &self.insecure_skip_tls_verify)
            .field("node_name", &self.node_name)
            .field("sensu_api_url", &self.sensu_api_url)
            .field("sensu_api_key", &"<redacted>")
            .field("sensu_ca_cert", &self.sensu_ca_cert)
            .finish()
    }
}

impl HandlerConfig {
    /// Load the config file layer. A missing file yields the defaults.
    pub fn load(file_prefix: &str) -> Result<Self, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .build()?;

        Ok(cfg.try_deserialize()?)
    }

    /// Apply per-event overrides from annotations in the plugin keyspace.
    ///
    /// Check annotations take precedence over entity annotations; empty
    /// values are ignored.
    pub fn apply_annotations(&mut self, event: &Event) -> Result<(), ConfigError> {
        for option in OPTION_NAMES {
            let key = format!("{ANNOTATION_KEYSPACE}/{option}");
            let from_check = event
                .check
                .as_ref()
                .and_then(|c| c.metadata.annotations.get(&key));
            let from_entity = event
                .entity
                .as_ref()
                .and_then(|e| e.metadata.annotations.get(&key));

            let value = [from_check, from_entity]
                .into_iter()
                .flatten()
                .find(|v| !v.is_empty());

            if let Some(value) = value {
                tracing::debug!(option = %option, "Option overridden by event annotation");
                self.set_option(&key, option, value)?;
            }
        }
        Ok(())
    }

    fn set_option(&mut self, key: &str, option: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidAnnotation {
            key: key.to_string(),
            value: value.to_string(),
        };
        match option {
            "endpoint" => self.endpoint = value.to_string(),
            "cert" => self.cert = value.to_string(),
            "key" => self.key = value.to_string(),
            "ca-cert" => self.ca_cert = value.to_string(),
            "insecure-skip-tls-verify" => {
                self.insecure_skip_tls_verify = parse_bool(value).ok_or_else(invalid)?
            }
            "node-name" => self.node_name = Some(value.to_string()),
            "sensu-api-url" => self.sensu_api_url = value.to_string(),
            "sensu-api-key" => self.sensu_api_key = value.to_string(),
            "sensu-ca-cert" => self.sensu_ca_cert = Some(value.to_string()),
            _ => return Err(invalid()),
        }
        Ok(())
    }

    /// Check required settings and normalize the PuppetDB endpoint.
    ///
    /// Fails on the first missing or invalid field. The endpoint gains the
    /// default API path when it has none; validating an already normalized
    /// config leaves it unchanged.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        if self.cert.is_empty() {
            return Err(ConfigError::MissingCert);
        }
        if self.key.is_empty() {
            return Err(ConfigError::MissingKey);
        }
        if self.ca_cert.is_empty() && !self.insecure_skip_tls_verify {
            return Err(ConfigError::MissingCaCert);
        }
        if self.sensu_api_url.is_empty() {
            return Err(ConfigError::MissingApiUrl);
        }
        if self.sensu_api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        self.endpoint = normalize_endpoint(&self.endpoint)?;
        check_api_url(&self.sensu_api_url)?;

        Ok(())
    }

    /// The configured node name override, if non-empty.
    pub fn node_name_override(&self) -> Option<&str> {
        self.node_name.as_deref().filter(|s| !s.is_empty())
    }
}

fn normalize_endpoint(raw: &str) -> Result<String, ConfigError> {
    let mut url = Url::parse(raw).map_err(|e| ConfigError::InvalidEndpoint(e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidEndpoint("missing host".to_string()));
    }
    if matches!(url.path(), "" | "/") {
        url.set_path(&format!("/{DEFAULT_API_PATH}"));
    }
    Ok(url.into())
}

fn check_api_url(raw: &str) -> Result<(), ConfigError> {
    match Url::parse(raw) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Err(ConfigError::InvalidApiUrl("missing scheme".to_string()))
        }
        Err(e) => Err(ConfigError::InvalidApiUrl(e.to_string())),
        Ok(url) if url.host_str().map_or(true, str::is_empty) => {
            Err(ConfigError::InvalidApiUrl("missing host".to_string()))
        }
        Ok(_) => Ok(()),
    }
}

/// Accepts the boolean spellings Sensu plugins take on the command line.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
