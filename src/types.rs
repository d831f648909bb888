// src/types.rs

use serde::Deserialize;

/// Which fetched release bounds the "from" side of an update.
///
/// The newest fetched release is always the "to" side.
///
/// - `Oldest`: the tail of the limited release list (with the default limit
///   of 3 this generates a partial from the build two nightlies back).
/// - `Previous`: the second-newest release, regardless of the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateFrom {
    Oldest,
    Previous,
}

impl Default for UpdateFrom {
    fn default() -> Self {
        UpdateFrom::Oldest
    }
}

/// Role of a node in the three-stage update graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskRole {
    /// Generates the partial update from two complete updates.
    Generate,
    /// Signs the generated partial update.
    Sign,
    /// Publishes the signed partial to the update server.
    Publish,
}
