// src/scheduler/mod.rs

//! Graph submission to the job scheduler.

pub mod client;
pub mod wire;

pub use client::{DryRunSubmitter, GraphStatus, GraphSubmitter, SchedulerClient, SubmissionResult};
pub use wire::GraphDefinition;
