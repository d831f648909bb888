// src/transport/mod.rs

//! Message transport adapters.
//!
//! The listener pulls [`Delivery`] values from an [`EventSource`] and
//! acknowledges each one once the pipeline is done with it. Sources decode
//! bus messages themselves; a message that cannot be decoded is logged and
//! dropped by the source and never reaches the listener.

pub mod json_lines;

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::event::BuildEvent;

pub use json_lines::JsonLinesSource;

/// Opaque per-delivery token handed back on acknowledgement.
pub type DeliveryTag = u64;

/// One decoded message awaiting acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub tag: DeliveryTag,
    pub event: BuildEvent,
}

/// A stream of build-finished messages with explicit acknowledgement.
pub trait EventSource: Send {
    /// Next decoded message, or `None` once the source is exhausted.
    fn next_delivery(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Delivery>>> + Send + '_>>;

    /// Acknowledge a delivery previously returned by `next_delivery`.
    fn ack(&mut self, tag: DeliveryTag) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
