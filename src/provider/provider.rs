//! Handler provider: explicit registration and resolution of handler
//! implementations.

use std::any::{type_name, Any};
use std::collections::HashMap;

use std::sync::Arc;

use crate::command::{Command, CommandHandler, ConcurrentCommand, ConcurrentCommandHandler};
use crate::event::{Event, EventHandler};
use crate::query::{Query, QueryHandler};
use crate::registry::Registry;

/// Declared visibility of a handler registration.
///
/// Stands in for the original runtime reflection over implementation
/// types: a handler registered [`Visibility::Internal`] is skipped by
/// command and event resolution, and rejected by query dispatch even
/// when it is the sole registrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Resolvable by every dispatch path.
    Public,
    /// Excluded from public dispatch; registration-time opt-out.
    Internal,
}

/// One registration: a type-erased handler plus its declared visibility.
struct ProviderEntry {
    handler: Box<dyn Any + Send + Sync>,
    visibility: Visibility,
}

/// Looks up zero, one, or many handler implementations for a message
/// type.
///
/// The provider is the dispatcher's external-collaborator seam: it
/// knows nothing about invocation protocols, only how to hand back the
/// handlers registered for a message-type/result-type pair. It is built
/// once at startup through [`HandlerProviderBuilder`] and immutable
/// afterwards, apart from the lazily created admission gates used by
/// provider-driven concurrent dispatch.
///
/// ## Example
///
/// ```ignore
/// let provider = Arc::new(
///     HandlerProvider::builder()
///         .query_handler(GetOrderHandler)
///         .command_handler(CreateOrderHandler)
///         .event_handler(OrderCreatedMailer)
///         .event_handler(OrderCreatedAuditor)
///         .build(),
/// );
/// ```
pub struct HandlerProvider {
    commands: HashMap<&'static str, Vec<ProviderEntry>>,
    concurrent_commands: HashMap<&'static str, Vec<ProviderEntry>>,
    events: HashMap<&'static str, Vec<ProviderEntry>>,
    queries: HashMap<&'static str, Vec<ProviderEntry>>,
    pub(super) gates: Registry,
}

impl HandlerProvider {
    /// Start a registration builder.
    pub fn builder() -> HandlerProviderBuilder {
        HandlerProviderBuilder::default()
    }

    /// All publicly-visible command handlers registered for `C`.
    pub fn command_handlers<C: Command>(&self) -> Vec<Arc<dyn CommandHandler<C>>> {
        resolve_public(&self.commands, type_name::<C>())
    }

    /// All publicly-visible concurrent command handlers registered for
    /// `C`.
    pub fn concurrent_command_handlers<C: ConcurrentCommand>(
        &self,
    ) -> Vec<Arc<dyn ConcurrentCommandHandler<C>>> {
        resolve_public(&self.concurrent_commands, type_name::<C>())
    }

    /// All publicly-visible event handlers registered for `E`.
    pub fn event_handlers<E: Event>(&self) -> Vec<Arc<dyn EventHandler<E>>> {
        resolve_public(&self.events, type_name::<E>())
    }

    /// All query handlers registered for `Q`, with their visibility.
    ///
    /// Query dispatch enforces cardinality over the unfiltered list, so
    /// internal registrations count toward ambiguity; visibility is
    /// checked only once a single candidate survives.
    pub fn query_handlers<Q: Query>(&self) -> Vec<(Arc<dyn QueryHandler<Q>>, Visibility)> {
        resolve_all(&self.queries, type_name::<Q>())
    }
}

fn resolve_all<V: Any + Clone>(
    entries: &HashMap<&'static str, Vec<ProviderEntry>>,
    key: &str,
) -> Vec<(V, Visibility)> {
    entries
        .get(key)
        .map(|registered| {
            registered
                .iter()
                .filter_map(|entry| {
                    entry
                        .handler
                        .downcast_ref::<V>()
                        .map(|handler| (handler.clone(), entry.visibility))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn resolve_public<V: Any + Clone>(
    entries: &HashMap<&'static str, Vec<ProviderEntry>>,
    key: &str,
) -> Vec<V> {
    resolve_all(entries, key)
        .into_iter()
        .filter(|(_, visibility)| *visibility == Visibility::Public)
        .map(|(handler, _)| handler)
        .collect()
}

/// Startup-only registration of handler implementations.
///
/// Each `*_handler` method registers with [`Visibility::Public`]; the
/// `*_handler_with` variants take an explicit visibility. Registration
/// order is preserved per message type.
#[derive(Default)]
pub struct HandlerProviderBuilder {
    commands: HashMap<&'static str, Vec<ProviderEntry>>,
    concurrent_commands: HashMap<&'static str, Vec<ProviderEntry>>,
    events: HashMap<&'static str, Vec<ProviderEntry>>,
    queries: HashMap<&'static str, Vec<ProviderEntry>>,
}

impl HandlerProviderBuilder {
    /// Register a command handler for `C`.
    pub fn command_handler<C, H>(self, handler: H) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        self.command_handler_with(handler, Visibility::Public)
    }

    /// Register a command handler for `C` with an explicit visibility.
    pub fn command_handler_with<C, H>(mut self, handler: H, visibility: Visibility) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        tracing::debug!(
            handler = type_name::<H>(),
            command = type_name::<C>(),
            "registered command handler"
        );
        let handler: Arc<dyn CommandHandler<C>> = Arc::new(handler);
        push_entry(&mut self.commands, type_name::<C>(), handler, visibility);
        self
    }

    /// Register a concurrent command handler for `C`.
    pub fn concurrent_command_handler<C, H>(self, handler: H) -> Self
    where
        C: ConcurrentCommand,
        H: ConcurrentCommandHandler<C> + 'static,
    {
        self.concurrent_command_handler_with(handler, Visibility::Public)
    }

    /// Register a concurrent command handler for `C` with an explicit
    /// visibility.
    pub fn concurrent_command_handler_with<C, H>(
        mut self,
        handler: H,
        visibility: Visibility,
    ) -> Self
    where
        C: ConcurrentCommand,
        H: ConcurrentCommandHandler<C> + 'static,
    {
        tracing::debug!(
            handler = type_name::<H>(),
            command = type_name::<C>(),
            "registered concurrent command handler"
        );
        let handler: Arc<dyn ConcurrentCommandHandler<C>> = Arc::new(handler);
        push_entry(
            &mut self.concurrent_commands,
            type_name::<C>(),
            handler,
            visibility,
        );
        self
    }

    /// Register an event handler for `E`.
    pub fn event_handler<E, H>(self, handler: H) -> Self
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        self.event_handler_with(handler, Visibility::Public)
    }

    /// Register an event handler for `E` with an explicit visibility.
    pub fn event_handler_with<E, H>(mut self, handler: H, visibility: Visibility) -> Self
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        tracing::debug!(
            handler = type_name::<H>(),
            event = type_name::<E>(),
            "registered event handler"
        );
        let handler: Arc<dyn EventHandler<E>> = Arc::new(handler);
        push_entry(&mut self.events, type_name::<E>(), handler, visibility);
        self
    }

    /// Register a query handler for `Q`.
    pub fn query_handler<Q, H>(self, handler: H) -> Self
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        self.query_handler_with(handler, Visibility::Public)
    }

    /// Register a query handler for `Q` with an explicit visibility.
    pub fn query_handler_with<Q, H>(mut self, handler: H, visibility: Visibility) -> Self
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        tracing::debug!(
            handler = type_name::<H>(),
            query = type_name::<Q>(),
            "registered query handler"
        );
        let handler: Arc<dyn QueryHandler<Q>> = Arc::new(handler);
        push_entry(&mut self.queries, type_name::<Q>(), handler, visibility);
        self
    }

    /// Finish registration and produce the immutable provider.
    pub fn build(self) -> HandlerProvider {
        HandlerProvider {
            commands: self.commands,
            concurrent_commands: self.concurrent_commands,
            events: self.events,
            queries: self.queries,
            gates: Registry::new(),
        }
    }
}

fn push_entry<V: Any + Send + Sync>(
    entries: &mut HashMap<&'static str, Vec<ProviderEntry>>,
    key: &'static str,
    handler: V,
    visibility: Visibility,
) {
    entries.entry(key).or_default().push(ProviderEntry {
        handler: Box::new(handler),
        visibility,
    });
}
