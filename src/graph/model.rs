// src/graph/model.rs

//! Task graph data model.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::crypto::EncryptedEnvVar;
use crate::errors::{FunsizeError, Result};
use crate::graph::ids::{GraphId, TaskId};
use crate::types::TaskRole;

/// Where tasks run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPool {
    pub provisioner_id: String,
    pub worker_type: String,
}

/// Artifacts a task publishes, and until when they stay retrievable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    /// Public artifact name, e.g. `public/env`.
    pub name: String,
    /// Directory inside the task container.
    pub path: String,
    pub expires: DateTime<Utc>,
}

/// Human-readable description shown by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    pub owner: String,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct TaskNode {
    pub id: TaskId,
    pub role: TaskRole,
    pub depends_on: BTreeSet<TaskId>,
    pub image: String,
    pub command: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub encrypted_env: Vec<EncryptedEnvVar>,
    pub created: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub max_run_time_secs: u32,
    pub artifacts: Option<ArtifactSpec>,
    pub metadata: Metadata,
}

impl TaskNode {
    pub fn artifact_expiry(&self) -> Option<DateTime<Utc>> {
        self.artifacts.as_ref().map(|a| a.expires)
    }
}

/// A DAG of tasks submitted to the scheduler as one unit.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    pub id: GraphId,
    pub nodes: Vec<TaskNode>,
    pub worker: WorkerPool,
    pub scopes: Vec<String>,
    pub metadata: Metadata,
}

impl TaskGraph {
    /// First node with the given role.
    pub fn node(&self, role: TaskRole) -> Option<&TaskNode> {
        self.nodes.iter().find(|n| n.role == role)
    }

    /// Check the graph invariants: unique task ids, dependencies present in
    /// this graph, no cycles.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for node in self.nodes.iter() {
            if !ids.insert(node.id.as_str()) {
                return Err(FunsizeError::InvalidGraph(format!(
                    "duplicate task id {}",
                    node.id
                )));
            }
        }

        // Edge direction: dependency -> dependent.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for node in self.nodes.iter() {
            graph.add_node(node.id.as_str());
        }
        for node in self.nodes.iter() {
            for dep in node.depends_on.iter() {
                if !ids.contains(dep.as_str()) {
                    return Err(FunsizeError::InvalidGraph(format!(
                        "task {} depends on {} which is not in graph {}",
                        node.id, dep, self.id
                    )));
                }
                graph.add_edge(dep.as_str(), node.id.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(FunsizeError::InvalidGraph(format!(
                "cycle detected in graph {} involving task {}",
                self.id,
                cycle.node_id()
            ))),
        }
    }
}
