use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::context::ExecutionContext;
use super::traits::{HandlerError, HandlerFactory, HandlerInput, IntentHandler};
use crate::fetch::Fetcher;
use crate::intent::{Payload, ResultType};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TextOptions {
    /// Replace invalid UTF-8 instead of failing
    #[serde(default)]
    lossy: bool,
}

pub struct TextFactory;

impl HandlerFactory for TextFactory {
    fn name(&self) -> &str {
        "text"
    }

    fn produces(&self) -> ResultType {
        ResultType::Text
    }

    fn build(&self, ctx: &ExecutionContext) -> Result<Box<dyn IntentHandler>, HandlerError> {
        let options: TextOptions = ctx.typed_options(self.name())?;
        Ok(Box::new(TextHandler {
            fetcher: ctx.fetcher().clone(),
            lossy: options.lossy,
        }))
    }
}

struct TextHandler {
    fetcher: Arc<Fetcher>,
    lossy: bool,
}

#[async_trait]
impl IntentHandler for TextHandler {
    async fn handle(&self, input: &HandlerInput) -> Result<Payload, HandlerError> {
        let bytes = self.fetcher.fetch(input.address.url()).await?;
        decode(bytes.to_vec(), self.lossy).map(Payload::Text)
    }
}

fn decode(bytes: Vec<u8>, lossy: bool) -> Result<String, HandlerError> {
    let bytes = match bytes.strip_prefix(b"\xef\xbb\xbf") {
        Some(rest) => rest.to_vec(),
        None => bytes,
    };

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) if lossy => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        Err(e) => Err(HandlerError::Decode(e.to_string())),
    }
}
