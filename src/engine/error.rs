use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::handlers::HandlerError;
use crate::intent::{ContentType, ResultType};
use crate::locator::LocateError;

/// Pipeline stage an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Locate,
    Select,
    Execute,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Locate => "locate",
            Stage::Select => "select",
            Stage::Execute => "execute",
            Stage::Verify => "verify",
        })
    }
}

/// Terminal failure delivered to [`IntentCallback::error`]
///
/// [`IntentCallback::error`]: super::IntentCallback::error
#[derive(Debug, Error)]
pub enum IntentError {
    #[error("no address for '{uri}': {source}")]
    Unresolvable {
        uri: String,
        #[source]
        source: LocateError,
    },

    #[error("no handler for {}{}", content_clause(.content_type), required_clause(.required))]
    NoHandler {
        content_type: Option<ContentType>,
        required: Option<ResultType>,
    },

    #[error("handler '{0}' is not registered")]
    UnknownHandler(String),

    #[error("handler '{handler}' failed: {source}")]
    HandlerFailed {
        handler: String,
        #[source]
        source: HandlerError,
    },

    #[error("handler '{handler}' produces {produced}, but {required} is required")]
    RequiredTypeMismatch {
        handler: String,
        required: ResultType,
        produced: ResultType,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("abandoned before completion: {0}")]
    Abandoned(String),
}

fn content_clause(content_type: &Option<ContentType>) -> String {
    match content_type {
        Some(content_type) => format!("content type {content_type}"),
        None => "unknown content type".to_string(),
    }
}

fn required_clause(required: &Option<ResultType>) -> String {
    match required {
        Some(required) => format!(" producing {required}"),
        None => String::new(),
    }
}

impl IntentError {
    pub fn stage(&self) -> Stage {
        match self {
            IntentError::Unresolvable { .. } => Stage::Locate,
            IntentError::NoHandler { .. } | IntentError::UnknownHandler(_) => Stage::Select,
            IntentError::RequiredTypeMismatch { .. } => Stage::Verify,
            IntentError::HandlerFailed { .. }
            | IntentError::Cancelled
            | IntentError::TimedOut(_)
            | IntentError::Abandoned(_) => Stage::Execute,
        }
    }

    /// "No filter matched" is an expected outcome rather than a fault
    pub fn is_no_handler(&self) -> bool {
        matches!(self, IntentError::NoHandler { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_and_stages() {
        let error = IntentError::NoHandler {
            content_type: Some(ContentType::parse("image/png").unwrap()),
            required: None,
        };
        assert_eq!(error.to_string(), "no handler for content type image/png");
        assert_eq!(error.stage(), Stage::Select);
        assert!(error.is_no_handler());

        let error = IntentError::NoHandler {
            content_type: None,
            required: Some(ResultType::Layer),
        };
        assert_eq!(error.to_string(), "no handler for unknown content type producing layer");

        let error = IntentError::RequiredTypeMismatch {
            handler: "text".into(),
            required: ResultType::Layer,
            produced: ResultType::Text,
        };
        assert_eq!(error.to_string(), "handler 'text' produces text, but layer is required");
        assert_eq!(error.stage(), Stage::Verify);
        assert_eq!(IntentError::Cancelled.stage().to_string(), "execute");
    }
}
