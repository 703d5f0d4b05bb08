use reqwest::Url;
use thiserror::Error;

use crate::intent::Intent;

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("malformed address '{value}': {reason}")]
    Malformed { value: String, reason: String },

    #[error("locator failed: {0}")]
    Failed(String),

    #[error("no retrievable address for '{0}'")]
    Unresolvable(String),
}

/// Strategy translating an intent's URI into a retrievable URL.
///
/// Returning `Ok(None)` means "not mine"; the chain moves on. Locators must
/// not keep per-request state.
pub trait Locator: Send + Sync {
    fn name(&self) -> &str;

    fn locate(&self, intent: &Intent) -> Result<Option<Url>, LocateError>;
}
