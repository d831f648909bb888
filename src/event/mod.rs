// src/event/mod.rs

//! Inbound build-finished events.
//!
//! - [`message`] decodes bus messages into an immutable [`BuildEvent`].
//! - [`properties`] turns the event's ordered property pairs into a typed
//!   [`PropertyBag`] and the list of partials it asks for.
//! - [`classifier`] decides whether an event is interesting at all.

pub mod classifier;
pub mod message;
pub mod properties;

pub use classifier::BuildClassifier;
pub use message::BuildEvent;
pub use properties::{PartialTarget, PropertyBag};
