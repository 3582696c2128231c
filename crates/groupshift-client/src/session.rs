//! Per-operation client sessions.
//!
//! A session is opened at the start of each logical operation and released
//! when the returned box is dropped, on every exit path. Sessions are never
//! cached across operations or polls.

use async_trait::async_trait;

use crate::client::{GroupClient, ProviderResult};

/// Opens region-scoped client sessions.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Acquire a session for `region`. Credentials and request signing are
    /// the provider's concern.
    async fn open(&self, region: &str) -> ProviderResult<Box<dyn GroupClient>>;
}
