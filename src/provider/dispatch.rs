//! Provider-driven dispatch: execution paths that resolve handlers
//! from the [`HandlerProvider`] instead of a bus registry.
//!
//! These paths allow multiple simultaneously-resolved handlers per
//! message type: commands fan out to every public handler, events run
//! all public handlers concurrently, queries enforce exactly-one
//! cardinality, and concurrent commands share one lazily-created
//! admission gate per message type.

use std::any::type_name;
use std::future::Future;
use std::sync::Arc;

use futures::future::{join_all, select_all};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use super::provider::{HandlerProvider, Visibility};
use crate::command::{Command, ConcurrentCommand};
use crate::error::DispatchError;
use crate::event::Event;
use crate::gate::AdmissionGate;
use crate::query::Query;

impl HandlerProvider {
    /// Execute `command` on every publicly-visible handler registered
    /// for `C`, returning the first-completed result once all handlers
    /// have finished.
    ///
    /// Zero public handlers is [`DispatchError::HandlerNotRegistered`];
    /// an internal-only registration reads as not registered here.
    /// Any handler failure propagates to the caller.
    pub async fn execute<C>(
        &self,
        command: C,
        ct: CancellationToken,
    ) -> Result<C::Output, DispatchError>
    where
        C: Command + Clone,
    {
        let message_type = type_name::<C>();
        let handlers = self.command_handlers::<C>();
        if handlers.is_empty() {
            return Err(DispatchError::HandlerNotRegistered { message_type });
        }

        let futures: Vec<_> = handlers
            .iter()
            .map(|handler| handler.handle(command.clone(), ct.clone()))
            .collect();
        first_completed(futures).await.map_err(DispatchError::Handler)
    }

    /// Execute `command` on a detached task and return immediately,
    /// logging any failure at `warn` level.
    pub fn execute_detached<C>(self: &Arc<Self>, command: C)
    where
        C: Command + Clone,
    {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = provider.execute(command, CancellationToken::new()).await {
                tracing::warn!(
                    command = type_name::<C>(),
                    %error,
                    "detached provider command execution failed"
                );
            }
        });
    }

    /// Execute a concurrent `command` on every publicly-visible
    /// handler registered for `C`, all sharing one admission gate.
    ///
    /// The gate is get-or-created per message type on first dispatch,
    /// sized from the creating handler's `concurrent_limit`; racing
    /// first dispatches still produce exactly one gate. Each handler
    /// invocation acquires a slot before running and releases it on
    /// exit. Returns the first-completed result once all handlers have
    /// finished.
    pub async fn execute_concurrent<C>(
        &self,
        command: C,
        ct: CancellationToken,
    ) -> Result<C::Output, DispatchError>
    where
        C: ConcurrentCommand + Clone,
    {
        let message_type = type_name::<C>();
        let handlers = self.concurrent_command_handlers::<C>();
        if handlers.is_empty() {
            return Err(DispatchError::HandlerNotRegistered { message_type });
        }

        let mut admissions = Vec::with_capacity(handlers.len());
        for handler in handlers {
            let gate = self.gates.get_or_insert_with(message_type, || {
                Arc::new(AdmissionGate::new(handler.concurrent_limit()))
            })?;
            admissions.push((handler, gate));
        }

        let futures: Vec<_> = admissions
            .iter()
            .map(|(handler, gate)| {
                let command = command.clone();
                let ct = ct.clone();
                async move {
                    let _permit = gate.admit(&ct).await?;
                    handler
                        .handle(command, ct)
                        .await
                        .map_err(DispatchError::Handler)
                }
                .boxed()
            })
            .collect();
        first_completed(futures).await
    }

    /// Execute a concurrent `command` on a detached task and return
    /// immediately, logging any failure at `warn` level.
    pub fn execute_concurrent_detached<C>(self: &Arc<Self>, command: C)
    where
        C: ConcurrentCommand + Clone,
    {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = provider
                .execute_concurrent(command, CancellationToken::new())
                .await
            {
                tracing::warn!(
                    command = type_name::<C>(),
                    %error,
                    "detached provider concurrent command execution failed"
                );
            }
        });
    }

    /// Publish `event` to every publicly-visible handler registered
    /// for `E`, running them concurrently.
    ///
    /// Unlike the registry-backed [`EventBus`], zero handlers is a
    /// no-op on this path, not an error. All handlers run to
    /// completion; the first failure encountered propagates afterwards.
    ///
    /// [`EventBus`]: crate::EventBus
    pub async fn publish<E: Event>(&self, event: &E) -> Result<(), DispatchError> {
        let handlers = self.event_handlers::<E>();
        let results = join_all(handlers.iter().map(|handler| handler.handle(event))).await;
        for result in results {
            result.map_err(DispatchError::Handler)?;
        }
        Ok(())
    }

    /// Publish `event` on a detached task and return immediately,
    /// logging any failure at `warn` level.
    pub fn publish_detached<E: Event>(self: &Arc<Self>, event: E) {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = provider.publish(&event).await {
                tracing::warn!(
                    event = type_name::<E>(),
                    %error,
                    "detached provider event publish failed"
                );
            }
        });
    }

    /// Execute `query` on its single registered handler.
    ///
    /// Cardinality is strict: zero handlers is
    /// [`DispatchError::HandlerNotRegistered`], more than one is
    /// [`DispatchError::AmbiguousHandler`] (counted before any
    /// visibility filtering), and a sole internal handler is rejected
    /// with [`DispatchError::HandlerNotVisible`].
    pub async fn execute_query<Q: Query>(
        &self,
        query: Q,
        ct: CancellationToken,
    ) -> Result<Q::Output, DispatchError> {
        let query_type = type_name::<Q>();
        let mut handlers = self.query_handlers::<Q>();
        match handlers.len() {
            0 => Err(DispatchError::HandlerNotRegistered {
                message_type: query_type,
            }),
            count if count > 1 => Err(DispatchError::AmbiguousHandler { query_type, count }),
            _ => {
                let (handler, visibility) = handlers.remove(0);
                if visibility == Visibility::Internal {
                    return Err(DispatchError::HandlerNotVisible {
                        message_type: query_type,
                    });
                }
                handler
                    .handle(query, ct)
                    .await
                    .map_err(DispatchError::Handler)
            }
        }
    }
}

/// Await every future, then yield the first-completed result.
///
/// Errors from any future propagate; no result is returned until all
/// futures have finished.
async fn first_completed<F, T, E>(futures: Vec<F>) -> Result<T, E>
where
    F: Future<Output = Result<T, E>> + Unpin,
{
    let (first, _index, remaining) = select_all(futures).await;
    let rest = join_all(remaining).await;
    let value = first?;
    for result in rest {
        result?;
    }
    Ok(value)
}
