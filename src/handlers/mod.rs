//! Handler system
//!
//! Handlers turn a resolved intent into a typed [`Payload`]. They are
//! registered as factories so that every invocation gets a fresh instance,
//! built through the shared [`ExecutionContext`].
//!
//! ## Key Components
//!
//! - [`IntentHandler`] - The unit of work run for one intent
//! - [`HandlerFactory`] - Named constructor declaring the result type it produces
//! - [`HandlerRegistry`] - Name to factory lookup used by filters and explicit handlers
//! - [`ExecutionContext`] - Fetch service, options and injected services
//!
//! ## Example
//!
//! ```rust,ignore
//! use intentbox::handlers::{ExecutionContext, HandlerRegistry};
//!
//! let registry = HandlerRegistry::with_defaults();
//! let factory = registry.get("layer")?;
//! let handler = ctx.instantiate(factory.as_ref())?;
//! let payload = handler.handle(&input).await?;
//! ```
//!
//! [`Payload`]: crate::intent::Payload

mod catalog;
mod context;
mod layer;
mod raw;
mod registry;
mod text;
mod traits;

pub use catalog::CatalogFactory;
pub use context::ExecutionContext;
pub(crate) use context::panic_message;
pub use layer::LayerFactory;
pub use raw::BytesFactory;
pub use registry::{HandlerRegistry, RegistryError};
pub use text::TextFactory;
pub use traits::{HandlerError, HandlerFactory, HandlerInput, IntentHandler};
