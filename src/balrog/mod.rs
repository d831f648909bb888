// src/balrog/mod.rs

//! Release resolution against the update-metadata service.
//!
//! - [`platforms`] translates build platforms to update platforms.
//! - [`releases`] holds the pure selection rules (filter, order, limit, pair).
//! - [`client`] provides the [`ReleaseResolver`] trait and its HTTP
//!   implementation.

pub mod client;
pub mod platforms;
pub mod releases;

pub use client::{BalrogClient, ReleaseResolver};
pub use platforms::PlatformMap;
pub use releases::{BuildArtifact, Release, ReleasePair, ReleaseQuery, pick_pair, select_releases};
