//! Content-type resolver chain
//!
//! Resolvers run in registration order and self-select through
//! [`ContentTypeResolver::supports`]. The first supporting resolver with an
//! answer wins. A resolver that fails is logged and skipped; the chain only
//! reports an I/O error when every supporting resolver failed.

mod extension;
mod file;
mod http;
pub mod sniff;
mod traits;

pub use extension::{ExtensionResolver, guess_from_path};
pub use file::FileResolver;
pub use http::{HttpResolver, reconcile};
pub use sniff::{MagicSniffer, SniffError, SniffPolicy, Sniffer};
pub use traits::{ContentTypeResolver, ResolveError};

use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ResolverKind;
use crate::fetch::Fetcher;
use crate::intent::{Address, ContentType, Intent};
use crate::registry::{EntryId, PriorityList};

#[derive(Default)]
pub struct ResolverChain {
    resolvers: PriorityList<dyn ContentTypeResolver>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the chain from the configured resolver order
    pub fn from_config(
        kinds: &[ResolverKind],
        fetcher: Arc<Fetcher>,
        sniffer: Arc<dyn Sniffer>,
        policy: SniffPolicy,
    ) -> Self {
        let chain = Self::new();

        for kind in kinds {
            let resolver: Arc<dyn ContentTypeResolver> = match kind {
                ResolverKind::Http => {
                    Arc::new(HttpResolver::new(fetcher.clone(), sniffer.clone(), policy))
                }
                ResolverKind::File => {
                    Arc::new(FileResolver::new(fetcher.clone(), sniffer.clone(), policy))
                }
                ResolverKind::Extension => Arc::new(ExtensionResolver),
            };
            chain.register(resolver);
        }

        chain
    }

    /// Append a resolver; it is consulted after every one registered before it
    pub fn register(&self, resolver: Arc<dyn ContentTypeResolver>) -> EntryId {
        debug!(resolver = resolver.name(), "Registering resolver");
        self.resolvers.insert(0, resolver)
    }

    pub fn unregister(&self, id: EntryId) -> bool {
        self.resolvers.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Whether any registered resolver would attempt this address
    pub fn supports_any(&self, address: &Address, intent: &Intent) -> bool {
        self.resolvers
            .snapshot()
            .iter()
            .any(|entry| entry.item().supports(address, intent))
    }

    pub async fn resolve(
        &self,
        address: &Address,
        intent: &Intent,
    ) -> Result<Option<ContentType>, ResolveError> {
        let mut answered = false;
        let mut failure = None;

        for entry in self.resolvers.snapshot().iter() {
            let resolver = entry.item();
            if !resolver.supports(address, intent) {
                continue;
            }

            match resolver.resolve(address, intent).await {
                Ok(Some(content_type)) => {
                    debug!(
                        intent_id = %intent.id(),
                        resolver = resolver.name(),
                        content_type = %content_type,
                        "Content type resolved"
                    );
                    return Ok(Some(content_type));
                }
                Ok(None) => answered = true,
                Err(e) => {
                    warn!(
                        intent_id = %intent.id(),
                        resolver = resolver.name(),
                        error = %e,
                        "Resolver failed, continuing"
                    );
                    failure = Some(e);
                }
            }
        }

        match failure {
            Some(e) if !answered => Err(e),
            _ => Ok(None),
        }
    }
}
