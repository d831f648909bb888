// src/config/mod.rs

//! Configuration loading and validation for funsize.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate URLs, credentials and release policy (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    BalrogSection, ConfigFile, EncryptionSection, ListenerSection, RawConfigFile,
    ReleasesSection, SchedulerSection, WorkerSection,
};
