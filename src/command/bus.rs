//! Command bus: exactly-one-handler dispatch.

use std::any::type_name;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::handler::{Command, CommandHandler};
use crate::error::DispatchError;
use crate::registry::Registry;

/// Single-handler, at-most-one-registration command dispatch.
///
/// Each command type maps to at most one handler; re-subscribing for
/// the same type silently replaces the previous handler. The bus is
/// cheap to clone; clones share one registry.
///
/// ## Example
///
/// ```ignore
/// let bus = CommandBus::new();
/// bus.subscribe(CreateOrderHandler)?;
///
/// let order_id = bus
///     .execute(CreateOrder { id: "o1".into() }, CancellationToken::new())
///     .await?;
/// ```
#[derive(Clone)]
pub struct CommandBus {
    registry: Arc<Registry>,
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    /// Create an empty command bus.
    pub fn new() -> Self {
        CommandBus {
            registry: Arc::new(Registry::new()),
        }
    }

    /// Register `handler` for command type `C`, replacing any prior
    /// registration for the same type.
    pub fn subscribe<C, H>(&self, handler: H) -> Result<(), DispatchError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let handler: Arc<dyn CommandHandler<C>> = Arc::new(handler);
        self.registry.insert(type_name::<C>(), handler)
    }

    /// Execute `command` on its registered handler and return the
    /// handler's result.
    ///
    /// Fails with [`DispatchError::HandlerNotRegistered`] when no
    /// handler is bound to `C`. Handler failures propagate verbatim as
    /// [`DispatchError::Handler`]. `ct` is forwarded into the handler;
    /// pass a fresh token when cancellation is not needed.
    pub async fn execute<C: Command>(
        &self,
        command: C,
        ct: CancellationToken,
    ) -> Result<C::Output, DispatchError> {
        let message_type = type_name::<C>();
        let handler = self
            .registry
            .get::<Arc<dyn CommandHandler<C>>>(message_type)?
            .ok_or(DispatchError::HandlerNotRegistered { message_type })?;

        handler
            .handle(command, ct)
            .await
            .map_err(DispatchError::Handler)
    }

    /// Execute `command` on a detached task and return immediately.
    ///
    /// Fire-and-forget: the eventual result or failure never reaches
    /// the caller. Failures, including an unregistered handler, are
    /// logged at `warn` level instead of being surfaced.
    pub fn execute_detached<C: Command>(&self, command: C) {
        let bus = self.clone();
        tokio::spawn(async move {
            if let Err(error) = bus.execute(command, CancellationToken::new()).await {
                tracing::warn!(
                    command = type_name::<C>(),
                    %error,
                    "detached command execution failed"
                );
            }
        });
    }
}
