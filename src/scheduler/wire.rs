// src/scheduler/wire.rs

//! Scheduler wire schema.
//!
//! Field names follow the scheduler's JSON schema (camelCase); timestamps
//! are RFC 3339 with millisecond precision in UTC.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::model::{Metadata, TaskGraph, TaskNode, WorkerPool};

pub fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDefinition {
    pub scopes: Vec<String>,
    pub tasks: Vec<GraphTask>,
    pub metadata: WireMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphTask {
    pub task_id: String,
    pub requires: Vec<String>,
    pub task: TaskDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub provisioner_id: String,
    pub worker_type: String,
    pub created: String,
    pub deadline: String,
    pub payload: TaskPayload,
    pub metadata: WireMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub image: String,
    pub command: Vec<String>,
    pub max_run_time: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub artifacts: BTreeMap<String, WireArtifact>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Base64 sealed envelopes; the worker decrypts them into `env`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encrypted_env: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireArtifact {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub expires: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMetadata {
    pub name: String,
    pub description: String,
    pub owner: String,
    pub source: String,
}

impl From<&Metadata> for WireMetadata {
    fn from(m: &Metadata) -> Self {
        Self {
            name: m.name.clone(),
            description: m.description.clone(),
            owner: m.owner.clone(),
            source: m.source.clone(),
        }
    }
}

impl GraphTask {
    fn from_node(node: &TaskNode, worker: &WorkerPool) -> Self {
        let artifacts = node
            .artifacts
            .iter()
            .map(|a| {
                (
                    a.name.clone(),
                    WireArtifact {
                        path: a.path.clone(),
                        kind: "directory".to_string(),
                        expires: timestamp(a.expires),
                    },
                )
            })
            .collect();

        Self {
            task_id: node.id.to_string(),
            requires: node.depends_on.iter().map(|d| d.to_string()).collect(),
            task: TaskDefinition {
                provisioner_id: worker.provisioner_id.clone(),
                worker_type: worker.worker_type.clone(),
                created: timestamp(node.created),
                deadline: timestamp(node.deadline),
                payload: TaskPayload {
                    image: node.image.clone(),
                    command: node.command.clone(),
                    max_run_time: node.max_run_time_secs,
                    artifacts,
                    env: node.env.clone(),
                    encrypted_env: node
                        .encrypted_env
                        .iter()
                        .map(|v| v.ciphertext.clone())
                        .collect(),
                },
                metadata: WireMetadata::from(&node.metadata),
            },
        }
    }
}

impl From<&TaskGraph> for GraphDefinition {
    fn from(graph: &TaskGraph) -> Self {
        Self {
            scopes: graph.scopes.clone(),
            tasks: graph
                .nodes
                .iter()
                .map(|n| GraphTask::from_node(n, &graph.worker))
                .collect(),
            metadata: WireMetadata::from(&graph.metadata),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_use_millis_and_z() {
        let t = Utc.with_ymd_and_hms(2015, 6, 1, 12, 30, 0).unwrap();
        assert_eq!(timestamp(t), "2015-06-01T12:30:00.000Z");
    }

    #[test]
    fn artifact_kind_serializes_as_type() {
        let a = WireArtifact {
            path: "/home/worker/artifacts/".into(),
            kind: "directory".into(),
            expires: "2015-06-08T12:30:00.000Z".into(),
        };
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["type"], "directory");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn payload_omits_empty_optional_sections() {
        let p = TaskPayload {
            image: "img".into(),
            command: vec!["/runme.sh".into()],
            max_run_time: 300,
            artifacts: BTreeMap::new(),
            env: BTreeMap::new(),
            encrypted_env: Vec::new(),
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["maxRunTime"], 300);
        assert!(json.get("artifacts").is_none());
        assert!(json.get("encryptedEnv").is_none());
    }
}
