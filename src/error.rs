//! Error types for message dispatch.

use std::error::Error as StdError;

/// Opaque failure returned by a handler.
///
/// The dispatcher treats handler failures as black boxes: whatever a
/// handler returns here is propagated verbatim to the awaiting caller
/// as [`DispatchError::Handler`], with the original error preserved as
/// the source.
pub type HandlerError = Box<dyn StdError + Send + Sync>;

/// Errors surfaced by the dispatch engine itself.
///
/// Everything except [`DispatchError::Handler`] is a dispatch-level
/// failure: a configuration problem, a caller bug, or a cancellation.
/// None of these are retried by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A required collaborator is absent (caller bug, never retried).
    #[error("precondition violated: {0}")]
    Precondition(&'static str),

    /// No handler is bound to this message type (configuration error).
    #[error("handler for message type {message_type} not registered")]
    HandlerNotRegistered {
        /// Fully-qualified name of the message type being dispatched.
        message_type: &'static str,
    },

    /// More than one handler is registered for a query type.
    ///
    /// Multiple query registrations are a configuration error, not
    /// something resolved by priority or registration order.
    #[error("query type {query_type} has {count} handlers, register exactly one")]
    AmbiguousHandler {
        /// Fully-qualified name of the query type.
        query_type: &'static str,
        /// How many handlers were resolved.
        count: usize,
    },

    /// The sole resolved handler was registered as internal.
    #[error("handler for message type {message_type} is not public")]
    HandlerNotVisible {
        /// Fully-qualified name of the message type.
        message_type: &'static str,
    },

    /// The caller's cancellation signal fired before the handler ran.
    #[error("dispatch cancelled before handler execution")]
    Cancelled,

    /// The registry lock was poisoned by a panicking writer.
    #[error("registry lock poisoned during {0}")]
    LockPoisoned(&'static str),

    /// The handler itself failed; the inner error is propagated verbatim.
    #[error("handler failed: {0}")]
    Handler(#[source] HandlerError),
}

impl DispatchError {
    /// True for errors that indicate a registration/configuration
    /// problem rather than a runtime failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DispatchError::HandlerNotRegistered { .. }
                | DispatchError::AmbiguousHandler { .. }
                | DispatchError::HandlerNotVisible { .. }
        )
    }
}
