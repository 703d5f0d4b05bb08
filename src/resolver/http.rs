use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::sniff::{SniffPolicy, Sniffer, sniff_with_retry};
use super::traits::{ContentTypeResolver, ResolveError};
use crate::fetch::Fetcher;
use crate::intent::{Address, ContentType, Intent};

/// Resolves `http`/`https` addresses from the response header, re-sniffing
/// the body whenever the header is one of the catch-all labels
pub struct HttpResolver {
    fetcher: Arc<Fetcher>,
    sniffer: Arc<dyn Sniffer>,
    policy: SniffPolicy,
}

impl HttpResolver {
    pub fn new(fetcher: Arc<Fetcher>, sniffer: Arc<dyn Sniffer>, policy: SniffPolicy) -> Self {
        Self {
            fetcher,
            sniffer,
            policy,
        }
    }
}

/// Pick between the transport's declaration and the sniffed type.
///
/// A specific declaration is authoritative. A generic or missing one yields
/// to sniffing, and is kept only when sniffing finds nothing.
pub fn reconcile(declared: Option<ContentType>, sniffed: Option<ContentType>) -> Option<ContentType> {
    match declared {
        Some(declared) if !declared.is_generic() => Some(declared),
        declared => sniffed.or(declared),
    }
}

#[async_trait]
impl ContentTypeResolver for HttpResolver {
    fn name(&self) -> &str {
        "http"
    }

    fn supports(&self, address: &Address, _intent: &Intent) -> bool {
        matches!(address.scheme(), "http" | "https")
    }

    async fn resolve(
        &self,
        address: &Address,
        intent: &Intent,
    ) -> Result<Option<ContentType>, ResolveError> {
        let prefix = self
            .fetcher
            .fetch_prefix(address.url(), self.policy.max_bytes)
            .await?;

        let declared = prefix
            .declared
            .as_deref()
            .and_then(|value| ContentType::parse(value).ok());

        if let Some(declared) = &declared {
            if !declared.is_generic() {
                return Ok(Some(declared.clone()));
            }
        }

        let sniffed = sniff_with_retry(self.sniffer.as_ref(), &prefix.bytes, &self.policy).await?;
        debug!(
            intent_id = %intent.id(),
            declared = ?declared.as_ref().map(ContentType::essence),
            sniffed = ?sniffed.as_ref().map(ContentType::essence),
            "Reconciling declared and sniffed type"
        );

        Ok(reconcile(declared, sniffed))
    }
}
