// src/engine/mod.rs

//! Event processing engine.
//!
//! - [`pipeline`] turns one build-finished event into submitted task graphs
//!   and is the failure boundary for that event.
//! - [`listener`] drives the pipeline from an event source, acknowledging
//!   each delivery after the pipeline has finished with it.

pub mod listener;
pub mod pipeline;

pub use listener::{Listener, ListenerStats};
pub use pipeline::{EventOutcome, Pipeline, ReleasePolicy, SubmittedGraph};
