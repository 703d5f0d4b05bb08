use async_trait::async_trait;
use std::sync::Arc;

use super::context::ExecutionContext;
use super::traits::{HandlerError, HandlerFactory, HandlerInput, IntentHandler};
use crate::fetch::Fetcher;
use crate::intent::{Payload, ResultType};

/// Catch-all handler returning the raw body
pub struct BytesFactory;

impl HandlerFactory for BytesFactory {
    fn name(&self) -> &str {
        "bytes"
    }

    fn produces(&self) -> ResultType {
        ResultType::Bytes
    }

    fn build(&self, ctx: &ExecutionContext) -> Result<Box<dyn IntentHandler>, HandlerError> {
        Ok(Box::new(BytesHandler {
            fetcher: ctx.fetcher().clone(),
        }))
    }
}

struct BytesHandler {
    fetcher: Arc<Fetcher>,
}

#[async_trait]
impl IntentHandler for BytesHandler {
    async fn handle(&self, input: &HandlerInput) -> Result<Payload, HandlerError> {
        Ok(Payload::Bytes(self.fetcher.fetch(input.address.url()).await?))
    }
}
