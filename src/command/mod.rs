//! Command dispatch: exactly-one-handler execution, with an optional
//! per-type concurrency budget.
//!
//! Two buses live here:
//!
//! - [`CommandBus`]: one handler per command type, invoked directly.
//! - [`ConcurrentCommandBus`]: one handler per command type, invoked
//!   behind an admission gate that caps how many instances of that
//!   command type execute simultaneously.
//!
//! Both offer awaited execution (`execute`) and fire-and-forget
//! execution (`execute_detached`), where failures are logged rather
//! than surfaced.

mod bus;
mod concurrent;
mod handler;

pub use bus::CommandBus;
pub use concurrent::{ConcurrentCommand, ConcurrentCommandBus, ConcurrentCommandHandler};
pub use handler::{Command, CommandHandler};
