//! Dispatcher: the top-level component bundling the registry-backed
//! buses with an optional handler provider.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::command::{CommandBus, ConcurrentCommandBus};
use crate::error::DispatchError;
use crate::event::EventBus;
use crate::provider::HandlerProvider;
use crate::query::Query;

/// One dispatch surface for all four message shapes.
///
/// The dispatcher owns a [`CommandBus`], an [`EventBus`], and a
/// [`ConcurrentCommandBus`], plus an optional [`HandlerProvider`] for
/// the provider-driven paths (queries in particular). It is an explicit
/// component constructed and injected by the application, with no
/// ambient global state; pass it (or a clone) wherever dispatch is
/// needed.
///
/// ## Example
///
/// ```ignore
/// let provider = Arc::new(
///     HandlerProvider::builder()
///         .query_handler(GetOrderHandler)
///         .build(),
/// );
/// let dispatcher = Dispatcher::with_provider(provider);
///
/// dispatcher.command_bus().subscribe(CreateOrderHandler)?;
/// dispatcher.command_bus().execute(CreateOrder { .. }, ct.clone()).await?;
///
/// let order = dispatcher.execute_query(GetOrder { id }, ct).await?;
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    commands: CommandBus,
    concurrent_commands: ConcurrentCommandBus,
    events: EventBus,
    provider: Option<Arc<HandlerProvider>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a dispatcher with empty buses and no handler provider.
    ///
    /// Provider-driven dispatch (queries included) fails with
    /// [`DispatchError::Precondition`] until a provider is configured.
    pub fn new() -> Self {
        Dispatcher {
            commands: CommandBus::new(),
            concurrent_commands: ConcurrentCommandBus::new(),
            events: EventBus::new(),
            provider: None,
        }
    }

    /// Create a dispatcher with empty buses and the given provider.
    pub fn with_provider(provider: Arc<HandlerProvider>) -> Self {
        Dispatcher {
            commands: CommandBus::new(),
            concurrent_commands: ConcurrentCommandBus::new(),
            events: EventBus::new(),
            provider: Some(provider),
        }
    }

    /// The single-handler command bus.
    pub fn command_bus(&self) -> &CommandBus {
        &self.commands
    }

    /// The bounded-concurrency command bus.
    pub fn concurrent_command_bus(&self) -> &ConcurrentCommandBus {
        &self.concurrent_commands
    }

    /// The fan-out event bus.
    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// The configured handler provider, or
    /// [`DispatchError::Precondition`] when none was supplied.
    pub fn provider(&self) -> Result<&Arc<HandlerProvider>, DispatchError> {
        self.provider
            .as_ref()
            .ok_or(DispatchError::Precondition("handler provider not configured"))
    }

    /// Execute `query` through the configured provider.
    ///
    /// See [`HandlerProvider::execute_query`] for the cardinality and
    /// visibility rules.
    pub async fn execute_query<Q: Query>(
        &self,
        query: Q,
        ct: CancellationToken,
    ) -> Result<Q::Output, DispatchError> {
        self.provider()?.execute_query(query, ct).await
    }
}
