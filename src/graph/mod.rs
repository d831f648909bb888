// src/graph/mod.rs

//! Task graph construction.
//!
//! - [`ids`] provides the id and clock effects.
//! - [`model`] holds the graph data model and its invariants.
//! - [`builder`] assembles the generate → sign → publish chain.

pub mod builder;
pub mod ids;
pub mod model;

pub use builder::{GraphBuilder, GraphSettings, artifacts_url};
pub use ids::{Clock, FixedClock, GraphId, IdGenerator, SlugIdGenerator, SystemClock, TaskId};
pub use model::{ArtifactSpec, Metadata, TaskGraph, TaskNode, WorkerPool};
