//! Intent execution engine
//!
//! [`Pipeline::submit`] runs the stages in order: locate the address,
//! resolve the content type, pick a handler (explicit or via the filters),
//! build it through the [`ExecutionContext`] and run it on its own task.
//! Every submission ends in exactly one [`IntentCallback`] invocation,
//! whichever way it goes.
//!
//! ```rust,ignore
//! let (pipeline, ctx) = Pipeline::from_config(&config, HandlerRegistry::with_defaults())?;
//! let completion = pipeline.open(Intent::for_uri("/data/rivers.kml"), &ctx).await;
//! ```

mod callback;
mod error;
mod pipeline;
mod submission;

pub use callback::{ChannelCallback, Completion, FnCallback, IntentCallback};
pub use error::{IntentError, Stage};
pub use pipeline::Pipeline;
pub use submission::Submission;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::{Config, ValidationError};
use crate::fetch::{FetchError, Fetcher};
use crate::filters::{FilterError, FilterRegistry, default_filters};
use crate::handlers::{ExecutionContext, HandlerRegistry};
use crate::locator::{FilePathLocator, LocatorChain};
use crate::resolver::{MagicSniffer, ResolverChain, SniffPolicy};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to build fetch client: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl Pipeline {
    /// Wire a pipeline and its execution context from configuration.
    ///
    /// Empty `locators` / `filters` sections fall back to the built-in file
    /// path locator and routing table.
    pub fn from_config(
        config: &Config,
        handlers: HandlerRegistry,
    ) -> Result<(Pipeline, ExecutionContext), PipelineError> {
        config.validate()?;

        let fetcher = Arc::new(Fetcher::new(&config.fetch)?);

        let locators = LocatorChain::from_config(&config.locators);
        if config.locators.is_empty() {
            locators.register(0, Arc::new(FilePathLocator::default()));
        }

        let resolvers = ResolverChain::from_config(
            &config.resolvers,
            fetcher.clone(),
            Arc::new(MagicSniffer),
            SniffPolicy::from_config(&config.sniff),
        );

        let filters = if config.filters.is_empty() {
            FilterRegistry::from_config(&default_filters(), &handlers)?
        } else {
            FilterRegistry::from_config(&config.filters, &handlers)?
        };

        let ctx = ExecutionContext::new(fetcher);
        for name in config.handlers.keys() {
            ctx.set_options(name.clone(), config.handler_options(name));
        }

        info!(
            locators = locators.len(),
            resolvers = resolvers.len(),
            filters = filters.len(),
            handlers = handlers.names().len(),
            "Pipeline configured"
        );

        let pipeline = Pipeline::builder()
            .locators(locators)
            .resolvers(resolvers)
            .filters(filters)
            .handlers(handlers)
            .maybe_handler_timeout(config.execution.handler_timeout_ms.map(Duration::from_millis))
            .build();

        Ok((pipeline, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterConfig, HandlerConfig, LocatorConfig, LocatorKind};

    #[test]
    fn test_default_wiring() {
        let (pipeline, ctx) =
            Pipeline::from_config(&Config::default(), HandlerRegistry::with_defaults()).unwrap();

        assert_eq!(pipeline.locators().len(), 1);
        assert_eq!(pipeline.resolvers().len(), 3);
        assert_eq!(pipeline.filters().len(), default_filters().len());
        assert!(ctx.options("layer").is_null());
    }

    #[test]
    fn test_configured_sections_replace_defaults() {
        let mut config = Config::default();
        config.locators.push(LocatorConfig {
            name: "catalog".into(),
            kind: LocatorKind::Prefix,
            priority: 5,
            prefix: Some("catalog:".into()),
            replacement: Some("https://catalog.example.org/".into()),
        });
        config.filters.push(FilterConfig {
            name: "everything".into(),
            priority: 0,
            content_types: vec!["*/*".into()],
            uri_pattern: None,
            handler: "bytes".into(),
        });
        config.handlers.insert(
            "text".into(),
            HandlerConfig {
                options: serde_json::json!({ "lossy": true }),
            },
        );

        let (pipeline, ctx) =
            Pipeline::from_config(&config, HandlerRegistry::with_defaults()).unwrap();
        assert_eq!(pipeline.locators().len(), 1);
        assert_eq!(pipeline.filters().len(), 1);
        assert_eq!(ctx.options("text")["lossy"], serde_json::json!(true));
    }

    #[test]
    fn test_filter_naming_missing_handler_fails() {
        let result = Pipeline::from_config(&Config::default(), HandlerRegistry::new());
        assert!(matches!(
            result,
            Err(PipelineError::Filter(FilterError::UnknownHandler { .. }))
        ));
    }
}
