use async_trait::async_trait;
use thiserror::Error;

use super::sniff::SniffError;
use crate::fetch::FetchError;
use crate::intent::{Address, ContentType, Intent};

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Reading the leading bytes failed outright
    #[error("retrieval for sniffing failed: {0}")]
    Io(#[from] FetchError),

    #[error(transparent)]
    Sniff(#[from] SniffError),
}

/// Strategy determining the content type of an addressed resource.
///
/// `supports` is a cheap synchronous guard (typically a scheme check);
/// only supporting resolvers are asked to `resolve`.
#[async_trait]
pub trait ContentTypeResolver: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, address: &Address, intent: &Intent) -> bool;

    /// `Ok(None)` means the type could not be determined
    async fn resolve(
        &self,
        address: &Address,
        intent: &Intent,
    ) -> Result<Option<ContentType>, ResolveError>;
}
