pub mod config;
pub mod dispatch;
pub mod engine;
pub mod fetch;
pub mod filters;
pub mod handlers;
pub mod humanize;
pub mod intent;
pub mod locator;
pub mod observability;
pub mod registry;
pub mod resolver;

pub use dispatch::{DispatchError, Dispatcher};
pub use engine::{Completion, IntentCallback, IntentError, Pipeline, Submission};
pub use handlers::{ExecutionContext, HandlerRegistry};
pub use intent::{Intent, Payload, ResultType};
