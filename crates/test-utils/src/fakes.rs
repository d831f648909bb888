#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use funsize::balrog::{BuildArtifact, Release, ReleaseQuery, ReleaseResolver, select_releases};
use funsize::crypto::{EncryptedEnvVar, EnvEncryptor};
use funsize::errors::{FunsizeError, Result};
use funsize::event::BuildEvent;
use funsize::graph::{GraphId, IdGenerator, TaskGraph, TaskId};
use funsize::scheduler::{GraphStatus, GraphSubmitter, SubmissionResult};
use funsize::transport::{Delivery, DeliveryTag, EventSource};

/// URL the fake resolver reports for a complete update.
pub fn complete_mar_url(release: &str, platform: &str, locale: &str) -> String {
    format!("https://archive.example/{release}/{platform}/{locale}/complete.mar")
}

/// In-memory release resolver.
///
/// Releases are registered per `(product, branch)` and run through the real
/// selection rules, so query options behave as against the service.
/// Lookups for a branch marked with [`FakeResolver::fail_branch`] return a
/// `LookupFailure`.
#[derive(Default)]
pub struct FakeResolver {
    releases: BTreeMap<(String, String), Vec<Release>>,
    failing_branches: Mutex<BTreeSet<String>>,
    build_calls: Mutex<Vec<(String, String, String)>>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_releases(mut self, product: &str, branch: &str, names: &[&str]) -> Self {
        self.releases.insert(
            (product.to_string(), branch.to_string()),
            names.iter().map(|n| Release::new(*n)).collect(),
        );
        self
    }

    pub fn fail_branch(&self, branch: &str) {
        self.failing_branches.lock().unwrap().insert(branch.to_string());
    }

    pub fn heal_branch(&self, branch: &str) {
        self.failing_branches.lock().unwrap().remove(branch);
    }

    /// `(release, platform, locale)` of every build lookup, in call order.
    pub fn build_calls(&self) -> Vec<(String, String, String)> {
        self.build_calls.lock().unwrap().clone()
    }

    fn check_branch(&self, branch: &str) -> Result<()> {
        if self.failing_branches.lock().unwrap().contains(branch) {
            return Err(FunsizeError::LookupFailure(format!(
                "simulated outage for {branch}"
            )));
        }
        Ok(())
    }
}

impl ReleaseResolver for FakeResolver {
    fn get_releases<'a>(
        &'a self,
        product: &'a str,
        branch: &'a str,
        query: ReleaseQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Release>>> + Send + 'a>> {
        Box::pin(async move {
            self.check_branch(branch)?;
            let all = self
                .releases
                .get(&(product.to_string(), branch.to_string()))
                .cloned()
                .unwrap_or_default();
            Ok(select_releases(all, &query))
        })
    }

    fn get_build<'a>(
        &'a self,
        release: &'a str,
        platform: &'a str,
        locale: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<BuildArtifact>> + Send + 'a>> {
        Box::pin(async move {
            self.build_calls.lock().unwrap().push((
                release.to_string(),
                platform.to_string(),
                locale.to_string(),
            ));
            Ok(BuildArtifact {
                complete_update_url: complete_mar_url(release, platform, locale),
            })
        })
    }
}

/// Records every accepted graph; optionally rejects graphs past a limit.
#[derive(Clone, Default)]
pub struct RecordingSubmitter {
    graphs: Arc<Mutex<Vec<TaskGraph>>>,
    accept_limit: Option<usize>,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A submitter that answers every graph with a `SubmissionFailure`.
    pub fn rejecting() -> Self {
        Self::rejecting_after(0)
    }

    /// Accept the first `accepted` graphs, then reject every later one.
    pub fn rejecting_after(accepted: usize) -> Self {
        Self {
            graphs: Arc::default(),
            accept_limit: Some(accepted),
        }
    }

    pub fn graphs(&self) -> Vec<TaskGraph> {
        self.graphs.lock().unwrap().clone()
    }
}

impl GraphSubmitter for RecordingSubmitter {
    fn submit<'a>(
        &'a self,
        graph: &'a TaskGraph,
    ) -> Pin<Box<dyn Future<Output = Result<SubmissionResult>> + Send + 'a>> {
        Box::pin(async move {
            let mut graphs = self.graphs.lock().unwrap();
            if self.accept_limit.is_some_and(|limit| graphs.len() >= limit) {
                return Err(FunsizeError::SubmissionFailure(format!(
                    "graph {} rejected",
                    graph.id
                )));
            }
            graphs.push(graph.clone());
            Ok(SubmissionResult {
                status: GraphStatus {
                    task_graph_id: graph.id.to_string(),
                    scheduler_id: "fake-scheduler".to_string(),
                    state: "running".to_string(),
                },
            })
        })
    }
}

/// Encryptor that always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingEncryptor;

impl EnvEncryptor for FailingEncryptor {
    fn encrypt_env_var(
        &self,
        _task_id: &TaskId,
        _valid_from: DateTime<Utc>,
        _valid_until: DateTime<Utc>,
        name: &str,
        _plaintext: &str,
    ) -> Result<EncryptedEnvVar> {
        Err(FunsizeError::EncryptionFailure(format!(
            "simulated failure sealing {name}"
        )))
    }
}

/// Deterministic ids: `task-1`, `task-2`, ... and `graph-1`, `graph-2`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    fn bump(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl IdGenerator for SequentialIds {
    fn task_id(&self) -> TaskId {
        TaskId::from(format!("task-{}", self.bump()))
    }

    fn graph_id(&self) -> GraphId {
        GraphId::from(format!("graph-{}", self.bump()))
    }
}

/// Event source backed by a queue of events.
///
/// Acknowledged tags are shared so a test can inspect them after the
/// listener has consumed the source.
pub struct VecEventSource {
    events: VecDeque<BuildEvent>,
    next_tag: DeliveryTag,
    acked: Arc<Mutex<Vec<DeliveryTag>>>,
}

impl VecEventSource {
    pub fn new(events: Vec<BuildEvent>) -> Self {
        Self {
            events: events.into(),
            next_tag: 0,
            acked: Arc::default(),
        }
    }

    pub fn acked(&self) -> Arc<Mutex<Vec<DeliveryTag>>> {
        Arc::clone(&self.acked)
    }
}

impl EventSource for VecEventSource {
    fn next_delivery(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Delivery>>> + Send + '_>> {
        let next = self.events.pop_front().map(|event| {
            self.next_tag += 1;
            Delivery {
                tag: self.next_tag,
                event,
            }
        });
        Box::pin(async move { Ok(next) })
    }

    fn ack(&mut self, tag: DeliveryTag) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.acked.lock().unwrap().push(tag);
        Box::pin(async { Ok(()) })
    }
}
