//! Platform URL dispatch.

use crate::error::Result;

/// Hands a URL to the platform's default handler (usually the browser).
///
/// Synchronous: implementations only spawn the handler and return.
pub trait UrlOpener: Send + Sync {
    fn open_url(&self, url: &str) -> Result<()>;
}
