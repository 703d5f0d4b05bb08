use async_trait::async_trait;
use thiserror::Error;

use super::context::ExecutionContext;
use crate::fetch::FetchError;
use crate::intent::{Address, Intent, Payload, ResultType};

/// Handler errors
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("retrieval failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("could not decode content: {0}")]
    Decode(String),
    #[error("invalid handler options: {0}")]
    InvalidOptions(String),
    #[error("handler construction failed: {0}")]
    Construction(String),
    #[error("fatal handler error: {0}")]
    Fatal(String),
}

/// What a handler gets to work with: the intent as resolved so far and the
/// address the locator chain produced for it
#[derive(Debug, Clone)]
pub struct HandlerInput {
    pub intent: Intent,
    pub address: Address,
}

/// Unit of work turning a resolved intent into a typed result.
///
/// Instances are built per invocation by a [`HandlerFactory`] and may be
/// long-running; the engine runs each one on its own task.
#[async_trait]
pub trait IntentHandler: Send + Sync {
    async fn handle(&self, input: &HandlerInput) -> Result<Payload, HandlerError>;
}

/// Named, stateless constructor for an [`IntentHandler`]
pub trait HandlerFactory: Send + Sync {
    fn name(&self) -> &str;

    /// Most specific type every produced payload is assignable to
    fn produces(&self) -> ResultType;

    /// Build a fresh handler, pulling options and services from `ctx`
    fn build(&self, ctx: &ExecutionContext) -> Result<Box<dyn IntentHandler>, HandlerError>;
}
