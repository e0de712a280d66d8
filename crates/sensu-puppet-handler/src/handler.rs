//! Keepalive event handling: validate, filter, resolve, deregister.

use sensu_puppet_core::{Event, EventError, HandlerConfig};

use crate::error::Result;
use crate::puppetdb::{resolve_node_name, NodeExistence, PuppetDbClient};
use crate::sensu::{DeletionOutcome, SensuClient};

/// What the handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Not a keepalive event; nothing was queried.
    Skipped,
    /// The Puppet node is live; the entity was left alone.
    NodeExists,
    /// The Puppet node is gone and the entity was deregistered.
    Deregistered(DeletionOutcome),
}

/// Validate the event and configuration, then act on the event.
///
/// Annotation overrides carried by the event are applied before the
/// configuration is validated. No network I/O happens until both the
/// event and the configuration are valid and the event is a keepalive.
pub async fn handle_event(mut config: HandlerConfig, event: &Event) -> Result<HandlerOutcome> {
    event.validate()?;
    config.apply_annotations(event)?;
    config.validate()?;

    if !event.is_keepalive() {
        tracing::info!("Received non-keepalive event, not checking for Puppet node");
        return Ok(HandlerOutcome::Skipped);
    }

    let puppetdb = PuppetDbClient::from_config(&config)?;
    reconcile(&config, &puppetdb, event).await
}

/// Check the entity's Puppet node and deregister the entity if it is gone.
///
/// The Sensu client is only built once deletion is needed.
pub async fn reconcile(
    config: &HandlerConfig,
    puppetdb: &PuppetDbClient,
    event: &Event,
) -> Result<HandlerOutcome> {
    let entity = event.entity.as_ref().ok_or(EventError::MissingEntity)?;
    let node_name = resolve_node_name(config, entity);

    match puppetdb.node_exists(node_name).await? {
        NodeExistence::Exists => return Ok(HandlerOutcome::NodeExists),
        NodeExistence::NotExists => {}
    }

    let sensu = SensuClient::from_config(config)?;
    let outcome = sensu
        .delete_entity(&entity.metadata.namespace, &entity.metadata.name)
        .await?;

    Ok(HandlerOutcome::Deregistered(outcome))
}
