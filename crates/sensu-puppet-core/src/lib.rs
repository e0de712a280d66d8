//! sensu-puppet-core: Shared types, configuration, and error handling for the
//! Sensu Puppet keepalive handler.
//!
//! This crate provides the pieces that involve no network I/O:
//! - The Sensu event model (checks, entities, object metadata)
//! - The handler configuration record, its layering and validation
//! - Configuration and input error types

pub mod config;
pub mod error;
pub mod events;

pub use config::HandlerConfig;
pub use error::{ConfigError, EventError};
pub use events::{Check, Entity, Event, ObjectMeta};
