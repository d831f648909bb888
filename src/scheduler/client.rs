// src/scheduler/client.rs

//! Graph submission.
//!
//! - [`SchedulerClient`] creates the graph on the remote scheduler.
//! - [`DryRunSubmitter`] only logs what would have been submitted.
//!
//! Neither waits for the tasks to run; acceptance of the graph is the
//! whole contract. Neither retries.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::errors::{FunsizeError, Result};
use crate::graph::model::TaskGraph;
use crate::scheduler::wire::GraphDefinition;

/// State reported by the scheduler once a graph has been accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStatus {
    pub task_graph_id: String,
    #[serde(default)]
    pub scheduler_id: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmissionResult {
    pub status: GraphStatus,
}

/// Hands a finished graph to a scheduler.
pub trait GraphSubmitter: Send + Sync {
    fn submit<'a>(
        &'a self,
        graph: &'a TaskGraph,
    ) -> Pin<Box<dyn Future<Output = Result<SubmissionResult>> + Send + 'a>>;
}

/// HTTP client for the task-graph scheduler.
pub struct SchedulerClient {
    client: Client,
    root_url: Url,
    client_id: String,
    access_token: String,
}

impl fmt::Debug for SchedulerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerClient")
            .field("root_url", &self.root_url.as_str())
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl SchedulerClient {
    pub fn new(
        root_url: &str,
        client_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self> {
        let root_url = Url::parse(root_url).map_err(|e| {
            FunsizeError::ConfigError(format!("invalid scheduler root_url {root_url}: {e}"))
        })?;
        let client = Client::builder()
            .user_agent(concat!("funsize/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FunsizeError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            root_url,
            client_id: client_id.into(),
            access_token: access_token.into(),
        })
    }

    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        Self::new(
            &cfg.scheduler.root_url,
            cfg.scheduler.client_id.clone(),
            cfg.scheduler.access_token.clone(),
        )
    }

    fn graph_url(&self, graph_id: &str) -> Result<Url> {
        let mut url = self.root_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                FunsizeError::ConfigError(format!(
                    "scheduler root_url cannot be a base URL: {}",
                    self.root_url
                ))
            })?
            .pop_if_empty()
            .extend(["task-graph", graph_id]);
        Ok(url)
    }

    async fn create_graph(&self, graph: &TaskGraph) -> Result<SubmissionResult> {
        let url = self.graph_url(graph.id.as_str())?;
        let body = GraphDefinition::from(graph);
        debug!(%url, tasks = body.tasks.len(), "submitting task graph");

        let response = self
            .client
            .put(url)
            .basic_auth(&self.client_id, Some(&self.access_token))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                FunsizeError::SubmissionFailure(format!("graph {}: request failed: {e}", graph.id))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FunsizeError::SubmissionFailure(format!(
                "graph {}: scheduler returned {status}: {text}",
                graph.id
            )));
        }

        response.json::<SubmissionResult>().await.map_err(|e| {
            FunsizeError::SubmissionFailure(format!("graph {}: malformed response: {e}", graph.id))
        })
    }
}

impl GraphSubmitter for SchedulerClient {
    fn submit<'a>(
        &'a self,
        graph: &'a TaskGraph,
    ) -> Pin<Box<dyn Future<Output = Result<SubmissionResult>> + Send + 'a>> {
        Box::pin(self.create_graph(graph))
    }
}

/// Logs the graph instead of submitting it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunSubmitter;

impl DryRunSubmitter {
    pub const STATE: &'static str = "dry-run";

    fn render(graph: &TaskGraph) -> Result<SubmissionResult> {
        let body = GraphDefinition::from(graph);
        let json = serde_json::to_string_pretty(&body)
            .map_err(|e| FunsizeError::SubmissionFailure(format!("graph {}: {e}", graph.id)))?;
        info!(graph_id = %graph.id, "dry-run, not submitting:\n{json}");

        Ok(SubmissionResult {
            status: GraphStatus {
                task_graph_id: graph.id.to_string(),
                scheduler_id: String::new(),
                state: Self::STATE.to_string(),
            },
        })
    }
}

impl GraphSubmitter for DryRunSubmitter {
    fn submit<'a>(
        &'a self,
        graph: &'a TaskGraph,
    ) -> Pin<Box<dyn Future<Output = Result<SubmissionResult>> + Send + 'a>> {
        Box::pin(async move { Self::render(graph) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_url_appends_graph_id() {
        let c = SchedulerClient::new("https://scheduler.taskcluster.net/v1/", "id", "tok").unwrap();
        assert_eq!(
            c.graph_url("abc").unwrap().as_str(),
            "https://scheduler.taskcluster.net/v1/task-graph/abc"
        );
    }

    #[test]
    fn debug_hides_access_token() {
        let c = SchedulerClient::new("https://scheduler.example/v1", "funsize", "t0ken").unwrap();
        let rendered = format!("{c:?}");
        assert!(rendered.contains("funsize"));
        assert!(!rendered.contains("t0ken"));
    }

    #[test]
    fn submission_response_parses() {
        let json = r#"{"status":{"taskGraphId":"g1","schedulerId":"task-graph-scheduler","state":"running"}}"#;
        let result: SubmissionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.status.task_graph_id, "g1");
        assert_eq!(result.status.state, "running");
    }
}
