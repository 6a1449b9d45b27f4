//! Event and event-handler traits.

use async_trait::async_trait;

use crate::error::HandlerError;

/// A message representing a fact, dispatched to zero-or-more handlers.
pub trait Event: Send + Sync + 'static {}

/// Handles events of type `E`.
///
/// Every subscribed handler receives a reference to the same event
/// instance. Event handling carries no cancellation token: publishing
/// a fact is not a cancellable operation.
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    /// React to the event. An error aborts the remaining fan-out and
    /// propagates to the publisher.
    async fn handle(&self, event: &E) -> Result<(), HandlerError>;
}
