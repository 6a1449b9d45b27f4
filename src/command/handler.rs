//! Command and command-handler traits.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::HandlerError;

/// A message representing an intent to act, dispatched to exactly one
/// handler.
///
/// `Output` is the value the handler produces; fire-and-forget style
/// commands use `Output = ()`. Dispatch identity is the command's type,
/// so two distinct types never share a handler.
pub trait Command: Send + Sync + 'static {
    /// The result type returned by this command's handler.
    type Output: Send + 'static;
}

/// Handles commands of type `C`.
///
/// ## Example
///
/// ```ignore
/// struct CreateOrder { id: String }
///
/// impl Command for CreateOrder {
///     type Output = u64;
/// }
///
/// struct CreateOrderHandler;
///
/// #[async_trait]
/// impl CommandHandler<CreateOrder> for CreateOrderHandler {
///     async fn handle(
///         &self,
///         command: CreateOrder,
///         _ct: CancellationToken,
///     ) -> Result<u64, HandlerError> {
///         Ok(persist_order(command.id).await?)
///     }
/// }
/// ```
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Execute the command, returning its result or an opaque failure.
    ///
    /// The cancellation token is forwarded from the dispatching caller;
    /// a well-behaved handler observes it during long-running work.
    async fn handle(&self, command: C, ct: CancellationToken) -> Result<C::Output, HandlerError>;
}
