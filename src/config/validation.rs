use super::models::{Config, LocatorKind};
use crate::intent::ContentType;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Filter '{filter}' declares neither content_types nor uri_pattern")]
    EmptyFilter { filter: String },

    #[error("Filter '{filter}' has invalid content type '{value}'")]
    InvalidContentType { filter: String, value: String },

    #[error("Filter '{filter}' has invalid uri_pattern: {reason}")]
    InvalidPattern { filter: String, reason: String },

    #[error("Filter name '{0}' is declared more than once")]
    DuplicateFilter(String),

    #[error("Locator '{locator}' of kind prefix requires '{field}'")]
    MissingLocatorField { locator: String, field: &'static str },

    #[error("{field} must be positive")]
    NonPositive { field: &'static str },

    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: u64 },
}

const MAX_FETCH_RETRIES: u32 = 10;

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_limits(config)?;
    validate_locators(config)?;
    validate_filters(config)?;
    Ok(())
}

fn validate_limits(config: &Config) -> Result<(), ValidationError> {
    if config.fetch.max_body_bytes.as_u64() == 0 {
        return Err(ValidationError::NonPositive {
            field: "fetch.max_body_bytes",
        });
    }

    if config.fetch.max_retries == 0 {
        return Err(ValidationError::NonPositive {
            field: "fetch.max_retries",
        });
    }

    if config.fetch.max_retries > MAX_FETCH_RETRIES {
        return Err(ValidationError::TooLarge {
            field: "fetch.max_retries",
            max: MAX_FETCH_RETRIES.into(),
        });
    }

    if config.sniff.max_bytes.as_u64() == 0 {
        return Err(ValidationError::NonPositive {
            field: "sniff.max_bytes",
        });
    }

    if config.sniff.retries == 0 {
        return Err(ValidationError::NonPositive {
            field: "sniff.retries",
        });
    }

    if config.execution.handler_timeout_ms == Some(0) {
        return Err(ValidationError::NonPositive {
            field: "execution.handler_timeout_ms",
        });
    }

    Ok(())
}

fn validate_locators(config: &Config) -> Result<(), ValidationError> {
    for locator in &config.locators {
        if locator.kind != LocatorKind::Prefix {
            continue;
        }

        if locator.prefix.as_deref().unwrap_or("").is_empty() {
            return Err(ValidationError::MissingLocatorField {
                locator: locator.name.clone(),
                field: "prefix",
            });
        }

        if locator.replacement.is_none() {
            return Err(ValidationError::MissingLocatorField {
                locator: locator.name.clone(),
                field: "replacement",
            });
        }
    }

    Ok(())
}

/// Each filter must be able to match something and its rules must parse
fn validate_filters(config: &Config) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();

    for filter in &config.filters {
        if !seen.insert(filter.name.as_str()) {
            return Err(ValidationError::DuplicateFilter(filter.name.clone()));
        }

        if filter.content_types.is_empty() && filter.uri_pattern.is_none() {
            return Err(ValidationError::EmptyFilter {
                filter: filter.name.clone(),
            });
        }

        for value in &filter.content_types {
            if ContentType::parse(value).is_err() {
                return Err(ValidationError::InvalidContentType {
                    filter: filter.name.clone(),
                    value: value.clone(),
                });
            }
        }

        if let Some(pattern) = &filter.uri_pattern {
            Regex::new(pattern).map_err(|e| ValidationError::InvalidPattern {
                filter: filter.name.clone(),
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}
