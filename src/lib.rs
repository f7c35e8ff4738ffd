//! Workspace umbrella crate.
//!
//! Re-exports the link service so a host application can depend on
//! `finder-link-workspace` and pick bridges with a feature flag:
//!
//! - `desktop-shims` (default): reqwest, OS keyring, tokio fs and the `open`
//!   crate are used for any bridge not injected through the config builder
//! - `headless`: every bridge must be injected

#[cfg(any(feature = "desktop-shims", feature = "headless"))]
pub use core_service::{
    is_pointer_file, CoreConfig, CoreError, LinkService, LinkedDocument, OAuthClientSettings,
    Result,
};
