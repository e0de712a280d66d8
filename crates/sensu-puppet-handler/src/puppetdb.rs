//! PuppetDB node lookup over mutually authenticated TLS.
//!
//! A node counts as present only when PuppetDB returns its record and the
//! record carries no `deactivated` timestamp.

use reqwest::{StatusCode, Url};
use serde::Deserialize;

use sensu_puppet_core::{ConfigError, Entity, HandlerConfig};

use crate::error::{Backend, HandlerError, Result};
use crate::tls;

/// Whether the Puppet node behind an entity is still live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeExistence {
    Exists,
    /// Not found, or found but deactivated.
    NotExists,
}

/// The only part of a PuppetDB node record the handler reads.
#[derive(Debug, Deserialize)]
struct NodeRecord {
    #[serde(default)]
    deactivated: Option<serde_json::Value>,
}

/// Pick the Puppet node name for an entity.
///
/// The entity's `puppet_node_name` label wins, then the configured
/// override, then the entity name itself.
pub fn resolve_node_name<'a>(config: &'a HandlerConfig, entity: &'a Entity) -> &'a str {
    entity
        .node_name_label()
        .or_else(|| config.node_name_override())
        .unwrap_or(&entity.metadata.name)
}

/// Client for the PuppetDB nodes endpoint.
pub struct PuppetDbClient {
    endpoint: String,
    http: reqwest::Client,
}

impl PuppetDbClient {
    pub fn new(endpoint: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            http,
        }
    }

    /// Build a client presenting the configured certificate and key, and
    /// trusting the configured Puppet CA.
    pub fn from_config(config: &HandlerConfig) -> Result<Self> {
        let identity = tls::load_identity(&config.cert, &config.key)?;

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .danger_accept_invalid_certs(config.insecure_skip_tls_verify);

        if !config.ca_cert.is_empty() {
            for cert in tls::load_ca_certificates(&config.ca_cert)? {
                builder = builder.add_root_certificate(cert);
            }
        }

        let http = builder
            .build()
            .map_err(|e| HandlerError::Tls(e.to_string()))?;

        Ok(Self::new(config.endpoint.clone(), http))
    }

    /// URL of a single node record: the endpoint plus one encoded segment.
    pub fn node_url(&self, node_name: &str) -> Result<Url> {
        let mut url = Url::parse(self.endpoint.trim_end_matches('/'))
            .map_err(|e| ConfigError::InvalidEndpoint(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ConfigError::InvalidEndpoint("cannot be a base URL".to_string()))?
            .pop_if_empty()
            .push(node_name);
        Ok(url)
    }

    /// Look up a node and classify it.
    ///
    /// 200 without `deactivated` is `Exists`; 200 with it, or 404, is
    /// `NotExists`. Any other status is an error so that an unhealthy
    /// PuppetDB never causes entities to be deleted.
    pub async fn node_exists(&self, node_name: &str) -> Result<NodeExistence> {
        let url = self.node_url(node_name)?;
        tracing::debug!(url = %url, "Querying PuppetDB");

        let response = self.http.get(url).send().await.map_err(|e| {
            tracing::warn!(node = %node_name, error = %e, "Error getting Puppet node");
            e
        })?;

        match response.status() {
            StatusCode::OK => {
                let record: NodeRecord =
                    response
                        .json()
                        .await
                        .map_err(|e| HandlerError::InvalidResponse {
                            backend: Backend::PuppetDb,
                            message: e.to_string(),
                        })?;

                if record.deactivated.is_some() {
                    tracing::info!(node = %node_name, "Puppet node is deactivated");
                    Ok(NodeExistence::NotExists)
                } else {
                    tracing::info!(node = %node_name, "Puppet node exists");
                    Ok(NodeExistence::Exists)
                }
            }
            StatusCode::NOT_FOUND => {
                tracing::info!(node = %node_name, "Puppet node does not exist");
                Ok(NodeExistence::NotExists)
            }
            status => Err(HandlerError::UnexpectedStatus {
                backend: Backend::PuppetDb,
                status,
            }),
        }
    }
}
