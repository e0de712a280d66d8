//! Sensu API client used to deregister entities.

use reqwest::header::AUTHORIZATION;
use reqwest::Url;

use sensu_puppet_core::{ConfigError, HandlerConfig};

use crate::error::{Backend, HandlerError, Result};
use crate::tls;

/// Result of a successful entity delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    Deleted,
    /// The backend rejected the delete with a client error; the entity is
    /// treated as already gone.
    AlreadyAbsent,
}

/// Authenticated client for the Sensu core/v2 API.
pub struct SensuClient {
    api_url: Url,
    api_key: String,
    http: reqwest::Client,
}

impl SensuClient {
    pub fn new(api_url: &str, api_key: impl Into<String>, http: reqwest::Client) -> Result<Self> {
        let api_url =
            Url::parse(api_url).map_err(|e| ConfigError::InvalidApiUrl(e.to_string()))?;
        if api_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidApiUrl("missing host".to_string()).into());
        }

        Ok(Self {
            api_url,
            api_key: api_key.into(),
            http,
        })
    }

    /// Build a client from the Sensu settings, trusting the optional CA.
    pub fn from_config(config: &HandlerConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .danger_accept_invalid_certs(config.insecure_skip_tls_verify);

        let ca_cert = config.sensu_ca_cert.as_deref().filter(|p| !p.is_empty());
        if let Some(path) = ca_cert {
            for cert in tls::load_ca_certificates(path)? {
                builder = builder.add_root_certificate(cert);
            }
        }

        // Root certificates are only parsed when the client is built.
        let http = builder.build().map_err(|e| match ca_cert {
            Some(_) => HandlerError::InvalidCaCert(e.to_string()),
            None => HandlerError::Transport(e),
        })?;

        Self::new(&config.sensu_api_url, config.sensu_api_key.clone(), http)
    }

    /// `<api>/api/core/v2/namespaces/<namespace>/entities/<name>`
    pub fn entity_url(&self, namespace: &str, name: &str) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "api",
                "core",
                "v2",
                "namespaces",
                namespace,
                "entities",
                name,
            ]);
        }
        url
    }

    /// Delete an entity. Client errors mean it is already gone; server
    /// errors and transport failures are returned.
    pub async fn delete_entity(&self, namespace: &str, name: &str) -> Result<DeletionOutcome> {
        let url = self.entity_url(namespace, name);
        tracing::info!(namespace = %namespace, entity = %name, "Deleting entity");

        let response = self
            .http
            .delete(url)
            .header(AUTHORIZATION, format!("Key {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(DeletionOutcome::Deleted)
        } else if status.as_u16() < 500 {
            tracing::info!(
                namespace = %namespace,
                entity = %name,
                status = %status,
                "Entity already deleted"
            );
            Ok(DeletionOutcome::AlreadyAbsent)
        } else {
            Err(HandlerError::UnexpectedStatus {
                backend: Backend::Sensu,
                status,
            })
        }
    }
}
