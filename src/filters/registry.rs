use std::sync::Arc;
use tracing::debug;

use super::types::{Filter, FilterError};
use crate::config::FilterConfig;
use crate::handlers::HandlerRegistry;
use crate::intent::Intent;
use crate::registry::{EntryId, PriorityList, Snapshot};

pub type FilterId = EntryId;

/// The pipeline's routing table
#[derive(Default)]
pub struct FilterRegistry {
    filters: PriorityList<Filter>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile configured filters, taking each one's `produces` from the
    /// handler it routes to
    pub fn from_config(
        configs: &[FilterConfig],
        handlers: &HandlerRegistry,
    ) -> Result<Self, FilterError> {
        let registry = Self::new();

        for config in configs {
            let produces = handlers
                .produces(&config.handler)
                .ok_or_else(|| FilterError::UnknownHandler {
                    filter: config.name.clone(),
                    handler: config.handler.clone(),
                })?;
            registry.add_filter(Filter::from_config(config, produces)?);
        }

        Ok(registry)
    }

    pub fn add_filter(&self, filter: Filter) -> FilterId {
        debug!(
            filter = filter.name(),
            handler = filter.handler(),
            priority = filter.priority(),
            "Adding filter"
        );
        self.filters.insert(filter.priority(), Arc::new(filter))
    }

    pub fn remove_filter(&self, id: FilterId) -> Option<Arc<Filter>> {
        self.filters.remove(id)
    }

    /// Remove every filter called `name`
    pub fn remove_filter_named(&self, name: &str) -> usize {
        self.filters.remove_where(|filter| filter.name() == name)
    }

    /// Current table in evaluation order
    pub fn filters(&self) -> Snapshot<Filter> {
        self.filters.snapshot()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Select the filter for `intent`.
    ///
    /// Filters whose handler cannot produce the required return type are
    /// skipped. Among the matches in the highest matching priority tier, the
    /// first one whose declared output is assignable to the expected return
    /// type is preferred; without an
    /// expectation (or when none fits it) the first match wins.
    pub fn find_filter(&self, intent: &Intent) -> Option<Arc<Filter>> {
        let required = intent.required_return_type();
        let expected = intent.expected_return_type();

        let mut tier: Option<i32> = None;
        let mut first = None;

        for entry in self.filters.snapshot().iter() {
            if tier.is_some_and(|priority| entry.priority() < priority) {
                break;
            }

            let filter = entry.item();
            if !filter.matches(intent) {
                continue;
            }
            if let Some(required) = required {
                if !filter.can_produce(required) {
                    debug!(
                        intent_id = %intent.id(),
                        filter = filter.name(),
                        produces = %filter.produces(),
                        %required,
                        "Filter skipped, cannot produce required type"
                    );
                    continue;
                }
            }

            match expected {
                Some(expected) if filter.produces().is_assignable_to(expected) => {
                    return Some(Arc::clone(filter));
                }
                Some(_) => {
                    if first.is_none() {
                        tier = Some(entry.priority());
                        first = Some(Arc::clone(filter));
                    }
                }
                None => return Some(Arc::clone(filter)),
            }
        }

        first
    }
}
