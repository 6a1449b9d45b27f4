//! Event dispatch: ordered, sequential fan-out to every subscriber of
//! an event type.

mod bus;
mod handler;

pub use bus::EventBus;
pub use handler::{Event, EventHandler};
