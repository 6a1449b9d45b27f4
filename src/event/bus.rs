//! Event bus: multi-handler fan-out dispatch.

use std::any::type_name;
use std::sync::Arc;

use super::handler::{Event, EventHandler};
use crate::error::DispatchError;
use crate::registry::Registry;

/// Fan-out dispatch to an ordered list of subscribers.
///
/// Handlers are invoked sequentially in subscription order, each
/// awaited before the next starts. There is no parallel fan-out and
/// no isolation between handlers: the first failure aborts the rest.
///
/// Publishing an event type that has never been subscribed is an
/// error, not a no-op.
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create an empty event bus.
    pub fn new() -> Self {
        EventBus {
            registry: Arc::new(Registry::new()),
        }
    }

    /// Append `handler` to the subscription list for event type `E`.
    ///
    /// Any number of handlers may subscribe to the same event type;
    /// subscription order is the fan-out order.
    pub fn subscribe<E, H>(&self, handler: H) -> Result<(), DispatchError>
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        let handler: Arc<dyn EventHandler<E>> = Arc::new(handler);
        self.registry.append(type_name::<E>(), handler)
    }

    /// Publish `event` to every subscribed handler, in subscription
    /// order.
    ///
    /// Fails with [`DispatchError::HandlerNotRegistered`] when no
    /// subscription list exists for `E`. A handler failure propagates
    /// immediately; handlers later in the list are not invoked.
    pub async fn publish<E: Event>(&self, event: &E) -> Result<(), DispatchError> {
        let message_type = type_name::<E>();
        let handlers = self
            .registry
            .get::<Vec<Arc<dyn EventHandler<E>>>>(message_type)?
            .ok_or(DispatchError::HandlerNotRegistered { message_type })?;

        for handler in &handlers {
            handler.handle(event).await.map_err(DispatchError::Handler)?;
        }
        Ok(())
    }

    /// Publish `event` on a detached task and return immediately.
    ///
    /// Fire-and-forget: failures, including a missing subscription
    /// list, are logged at `warn` level instead of being surfaced.
    pub fn publish_detached<E: Event>(&self, event: E) {
        let bus = self.clone();
        tokio::spawn(async move {
            if let Err(error) = bus.publish(&event).await {
                tracing::warn!(
                    event = type_name::<E>(),
                    %error,
                    "detached event publish failed"
                );
            }
        });
    }
}
