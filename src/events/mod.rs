//! Inter-component event system.
//!
//! - [`Event`] / [`EventType`]: immutable typed notifications with a JSON payload.
//! - [`EventBus`]: concurrent fan-out with a join barrier and per-handler
//!   failure isolation.

pub mod base_event;
pub mod event_bus;

pub use base_event::{Event, EventType};
pub use event_bus::{
    EventBus, EventHandler, FailureReason, HandlerFailure, HandlerId, PublishReport,
};
