//! Sensu event types as delivered to handlers.
//!
//! Only the parts of the core/v2 event the handler reads are modelled.
//! Everything else in the payload is ignored on deserialization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EventError;

/// Name of the synthetic check Sensu raises when an agent stops reporting.
pub const KEEPALIVE_CHECK: &str = "keepalive";

/// Entity label that names the Puppet node backing the entity.
pub const NODE_NAME_LABEL: &str = "puppet_node_name";

/// Name, namespace, labels and annotations shared by every Sensu resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Check {
    #[serde(default)]
    pub metadata: ObjectMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub entity_class: String,
}

/// A single Sensu event, read once from stdin per handler invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub check: Option<Check>,
    #[serde(default)]
    pub entity: Option<Entity>,
}

impl Event {
    /// Build an event for an entity in the `default` namespace.
    #[cfg(any(test, feature = "test-util"))]
    pub fn fixture(entity_name: &str, check_name: &str) -> Self {
        Self {
            id: None,
            timestamp: 0,
            check: Some(Check {
                metadata: ObjectMeta {
                    name: check_name.to_string(),
                    namespace: "default".to_string(),
                    ..Default::default()
                },
            }),
            entity: Some(Entity {
                metadata: ObjectMeta {
                    name: entity_name.to_string(),
                    namespace: "default".to_string(),
                    ..Default::default()
                },
                entity_class: "agent".to_string(),
            }),
        }
    }

    /// Ensure the event carries both a check and an entity.
    pub fn validate(&self) -> Result<(), EventError> {
        if self.check.is_none() {
            return Err(EventError::MissingCheck);
        }
        if self.entity.is_none() {
            return Err(EventError::MissingEntity);
        }
        Ok(())
    }

    /// True when the event was raised by the keepalive check.
    pub fn is_keepalive(&self) -> bool {
        self.check
            .as_ref()
            .is_some_and(|c| c.metadata.name == KEEPALIVE_CHECK)
    }
}

impl Entity {
    /// The per-entity Puppet node name override, if labelled.
    pub fn node_name_label(&self) -> Option<&str> {
        self.metadata
            .labels
            .get(NODE_NAME_LABEL)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}
