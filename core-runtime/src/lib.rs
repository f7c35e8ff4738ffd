//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the link core crates:
//! - Logging and tracing bootstrap
//! - Configuration, built once and injected
//! - Event bus for UI notifications

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, DatabaseLocation, OAuthClientSettings};
pub use error::{Error, Result};
pub use events::{AuthEvent, CoreEvent, EventBus, LinkEvent};
