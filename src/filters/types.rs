use bon::Builder;
use regex::Regex;
use thiserror::Error;

use crate::config::FilterConfig;
use crate::intent::{ContentType, Intent, ResultType};

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter '{filter}': invalid content type '{value}'")]
    InvalidContentType { filter: String, value: String },

    #[error("filter '{filter}': invalid URI pattern: {source}")]
    InvalidPattern {
        filter: String,
        #[source]
        source: regex::Error,
    },

    #[error("filter '{filter}' routes to unknown handler '{handler}'")]
    UnknownHandler { filter: String, handler: String },
}

/// One routing rule: which intents go to which handler
#[derive(Debug, Clone, Builder)]
pub struct Filter {
    #[builder(into)]
    name: String,
    #[builder(default)]
    priority: i32,
    /// Accepted types; entries may use `*` wildcards
    #[builder(default)]
    content_types: Vec<ContentType>,
    uri_pattern: Option<Regex>,
    #[builder(into)]
    handler: String,
    /// What the selected handler declares it produces
    #[builder(default = ResultType::Any)]
    produces: ResultType,
}

impl Filter {
    /// Compile a configured filter; `produces` comes from the handler registry
    pub fn from_config(config: &FilterConfig, produces: ResultType) -> Result<Self, FilterError> {
        let content_types = config
            .content_types
            .iter()
            .map(|value| {
                ContentType::parse(value).map_err(|_| FilterError::InvalidContentType {
                    filter: config.name.clone(),
                    value: value.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let uri_pattern = config
            .uri_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|source| FilterError::InvalidPattern {
                filter: config.name.clone(),
                source,
            })?;

        Ok(Self {
            name: config.name.clone(),
            priority: config.priority,
            content_types,
            uri_pattern,
            handler: config.handler.clone(),
            produces,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn content_types(&self) -> &[ContentType] {
        &self.content_types
    }

    pub fn uri_pattern(&self) -> Option<&Regex> {
        self.uri_pattern.as_ref()
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn produces(&self) -> &ResultType {
        &self.produces
    }

    /// Content-type or URI match, ignoring return-type constraints
    pub fn matches(&self, intent: &Intent) -> bool {
        let type_match = intent.content_type().is_some_and(|content_type| {
            self.content_types
                .iter()
                .any(|accepted| content_type.matches(accepted))
        });

        type_match
            || self
                .uri_pattern
                .as_ref()
                .is_some_and(|pattern| pattern.is_match(intent.uri()))
    }

    /// Whether this filter's handler can satisfy `required`
    pub fn can_produce(&self, required: &ResultType) -> bool {
        self.produces.may_produce(required)
    }
}
