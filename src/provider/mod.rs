//! Handler provider: the explicit registration/resolution collaborator
//! and the dispatch paths that resolve through it.
//!
//! Registration is an explicit call list at startup (no runtime
//! scanning): build a [`HandlerProvider`] once, share it behind an
//! `Arc`, and hand it to a [`Dispatcher`] or call its dispatch methods
//! directly.
//!
//! [`Dispatcher`]: crate::Dispatcher

mod dispatch;
mod provider;

pub use provider::{HandlerProvider, HandlerProviderBuilder, Visibility};
