//! Concurrent command bus: command dispatch with a per-message-type
//! concurrency budget.

use std::any::type_name;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{DispatchError, HandlerError};
use crate::gate::AdmissionGate;
use crate::registry::Registry;

/// A command whose handler may run a bounded number of instances
/// simultaneously.
pub trait ConcurrentCommand: Send + Sync + 'static {
    /// The result type returned by this command's handler.
    type Output: Send + 'static;
}

/// Handles commands of type `C` under a concurrency budget.
#[async_trait]
pub trait ConcurrentCommandHandler<C: ConcurrentCommand>: Send + Sync {
    /// Maximum simultaneous executions of this handler. A value of 0
    /// is treated as 1.
    fn concurrent_limit(&self) -> usize {
        1
    }

    /// Execute the command, returning its result or an opaque failure.
    async fn handle(&self, command: C, ct: CancellationToken) -> Result<C::Output, HandlerError>;
}

/// Registry entry: the handler and its admission gate.
struct ConcurrentEntry<C: ConcurrentCommand> {
    handler: Arc<dyn ConcurrentCommandHandler<C>>,
    gate: Arc<AdmissionGate>,
}

// Manual impl: a derived Clone would bound C: Clone.
impl<C: ConcurrentCommand> Clone for ConcurrentEntry<C> {
    fn clone(&self) -> Self {
        ConcurrentEntry {
            handler: Arc::clone(&self.handler),
            gate: Arc::clone(&self.gate),
        }
    }
}

/// Command dispatch guarded by an [`AdmissionGate`] per message type.
///
/// Subscribing reads the handler's `concurrent_limit` and creates a
/// gate with that capacity; every execute acquires a slot before the
/// handler runs and releases it when the handler exits, whatever the
/// outcome. When all slots are taken, callers wait cooperatively until
/// a slot frees or their cancellation token fires.
#[derive(Clone)]
pub struct ConcurrentCommandBus {
    registry: Arc<Registry>,
}

impl Default for ConcurrentCommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrentCommandBus {
    /// Create an empty concurrent command bus.
    pub fn new() -> Self {
        ConcurrentCommandBus {
            registry: Arc::new(Registry::new()),
        }
    }

    /// Register `handler` for command type `C` with a fresh gate sized
    /// to the handler's `concurrent_limit`, replacing any prior entry
    /// (and its gate) for the same type.
    pub fn subscribe<C, H>(&self, handler: H) -> Result<(), DispatchError>
    where
        C: ConcurrentCommand,
        H: ConcurrentCommandHandler<C> + 'static,
    {
        let gate = Arc::new(AdmissionGate::new(handler.concurrent_limit()));
        let entry = ConcurrentEntry {
            handler: Arc::new(handler) as Arc<dyn ConcurrentCommandHandler<C>>,
            gate,
        };
        self.registry.insert(type_name::<C>(), entry)
    }

    /// Execute `command`, waiting for gate admission first.
    ///
    /// If all slots for `C` are taken, the call suspends until a slot
    /// frees; if `ct` fires during that wait, the call fails with
    /// [`DispatchError::Cancelled`] before the handler ever runs and no
    /// slot is consumed. Once admitted, the slot is released on every
    /// exit path, whether the handler succeeds, fails, or observes
    /// cancellation itself.
    pub async fn execute<C: ConcurrentCommand>(
        &self,
        command: C,
        ct: CancellationToken,
    ) -> Result<C::Output, DispatchError> {
        let message_type = type_name::<C>();
        let entry = self
            .registry
            .get::<ConcurrentEntry<C>>(message_type)?
            .ok_or(DispatchError::HandlerNotRegistered { message_type })?;

        let _permit = entry.gate.admit(&ct).await?;
        entry
            .handler
            .handle(command, ct)
            .await
            .map_err(DispatchError::Handler)
    }

    /// Execute `command` on a detached task and return immediately.
    ///
    /// Fire-and-forget: failures are logged at `warn` level instead of
    /// being surfaced to the caller.
    pub fn execute_detached<C: ConcurrentCommand>(&self, command: C) {
        let bus = self.clone();
        tokio::spawn(async move {
            if let Err(error) = bus.execute(command, CancellationToken::new()).await {
                tracing::warn!(
                    command = type_name::<C>(),
                    %error,
                    "detached concurrent command execution failed"
                );
            }
        });
    }

    /// The admission gate currently registered for `C`, if any.
    ///
    /// Intended for observability: inspecting capacity and free slots.
    pub fn admission_gate<C: ConcurrentCommand>(&self) -> Option<Arc<AdmissionGate>> {
        self.registry
            .get::<ConcurrentEntry<C>>(type_name::<C>())
            .ok()
            .flatten()
            .map(|entry| entry.gate)
    }
}
