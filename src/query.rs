//! Query and query-handler traits.
//!
//! Unlike commands and events, queries are not resolved from a bus
//! registry: they go through the [`HandlerProvider`], which enforces
//! the exactly-one-handler cardinality rule at dispatch time. See
//! [`HandlerProvider::execute_query`] and
//! [`Dispatcher::execute_query`].
//!
//! [`HandlerProvider`]: crate::HandlerProvider
//! [`HandlerProvider::execute_query`]: crate::HandlerProvider::execute_query
//! [`Dispatcher::execute_query`]: crate::Dispatcher::execute_query

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::HandlerError;

/// A message requesting data, requiring exactly one resolvable handler.
pub trait Query: Send + Sync + 'static {
    /// The answer type returned by this query's handler.
    type Output: Send + 'static;
}

/// Handles queries of type `Q`.
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    /// Answer the query, returning its result or an opaque failure.
    async fn handle(&self, query: Q, ct: CancellationToken) -> Result<Q::Output, HandlerError>;
}
