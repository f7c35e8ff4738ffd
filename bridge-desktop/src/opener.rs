//! Opens URLs with the desktop's default handler.

use bridge_traits::{
    error::{BridgeError, Result},
    opener::UrlOpener,
};
use tracing::info;

/// `UrlOpener` backed by the `open` crate (`open` / `xdg-open` / `start`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemUrlOpener;

impl SystemUrlOpener {
    pub fn new() -> Self {
        Self
    }
}

impl UrlOpener for SystemUrlOpener {
    fn open_url(&self, url: &str) -> Result<()> {
        info!(url, "Opening URL in default handler");
        open::that_detached(url)
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to open {}: {}", url, e)))
    }
}
