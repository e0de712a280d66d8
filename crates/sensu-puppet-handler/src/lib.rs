//! sensu-puppet-handler: Deregister Sensu entities without a Puppet node.
//!
//! Invoked once per keepalive failure. Looks the entity's node up in
//! PuppetDB over mutual TLS and deletes the entity from the Sensu backend
//! when the node is missing or deactivated.

pub mod error;
pub mod handler;
pub mod puppetdb;
pub mod sensu;
pub mod tls;

pub use error::{HandlerError, Result};
pub use handler::{handle_event, reconcile, HandlerOutcome};
