//! In-process CQRS message dispatcher.
//!
//! Four message shapes, each with its own dispatch protocol:
//!
//! - **Commands** ([`CommandBus`]): exactly one handler, optionally
//!   returning a result.
//! - **Concurrent commands** ([`ConcurrentCommandBus`]): exactly one
//!   handler behind a per-message-type admission gate capping how many
//!   instances execute simultaneously.
//! - **Events** ([`EventBus`]): ordered, sequential fan-out to every
//!   subscriber.
//! - **Queries** ([`Dispatcher::execute_query`]): exactly one
//!   resolvable handler, enforced at dispatch time.
//!
//! Dispatch identity is the message's runtime type; handlers are plain
//! structs implementing one handler trait per shape. Nothing is
//! persisted: all registrations live in memory for the lifetime of the
//! bus that holds them.

mod command;
mod dispatcher;
mod error;
mod event;
mod gate;
mod provider;
mod query;
mod registry;

pub use command::{
    Command, CommandBus, CommandHandler, ConcurrentCommand, ConcurrentCommandBus,
    ConcurrentCommandHandler,
};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, HandlerError};
pub use event::{Event, EventBus, EventHandler};
pub use gate::{AdmissionGate, AdmissionPermit};
pub use provider::{HandlerProvider, HandlerProviderBuilder, Visibility};
pub use query::{Query, QueryHandler};

// Re-export the cancellation primitive so handler implementations
// don't need a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
