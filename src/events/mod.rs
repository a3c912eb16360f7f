//! Event bus and event payloads.

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventHandler, SubscriptionHandle};
pub use types::{Event, EventType};
