// src/graph/builder.rs

//! Builds the three-stage partial-update graph:
//!
//! ```text
//! generate ──▶ sign ──▶ publish
//! ```
//!
//! - **generate** diffs two complete updates into a partial.
//! - **sign** fetches generate's artifacts by task id and signs them.
//! - **publish** fetches sign's artifacts by task id and submits them to the
//!   update server, using credentials sealed for its own task id.
//!
//! Tasks never carry each other's output; they carry the retrieval URL of
//! the dependency's artifact directory.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::ConfigFile;
use crate::crypto::EnvEncryptor;
use crate::errors::Result;
use crate::graph::ids::{Clock, IdGenerator, TaskId};
use crate::graph::model::{ArtifactSpec, Metadata, TaskGraph, TaskNode, WorkerPool};
use crate::types::TaskRole;

pub const ARTIFACT_NAME: &str = "public/env";
pub const ARTIFACT_PATH: &str = "/home/worker/artifacts/";
pub const MAX_RUN_TIME_SECS: u32 = 300;

const OWNER: &str = "release+funsize@mozilla.com";
const SOURCE: &str = "https://github.com/mozilla/funsize";
const SCOPES: &[&str] = &["queue:*", "docker-worker:*", "scheduler:*"];

fn stage_deadline(role: TaskRole) -> Duration {
    match role {
        TaskRole::Generate | TaskRole::Sign => Duration::hours(2),
        TaskRole::Publish => Duration::hours(6),
    }
}

fn artifact_lifetime() -> Duration {
    Duration::days(7)
}

fn secret_lifetime() -> Duration {
    Duration::hours(24)
}

/// Static inputs of every graph, taken from configuration once.
#[derive(Clone)]
pub struct GraphSettings {
    pub worker: WorkerPool,
    pub generator_image: String,
    pub signer_image: String,
    pub submitter_image: String,
    /// Queue API root used to address a task's artifacts.
    pub queue_root: String,
    /// Update server the publish task submits to.
    pub publish_api_root: String,
    pub publish_username: String,
    pub publish_password: String,
}

impl std::fmt::Debug for GraphSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphSettings")
            .field("worker", &self.worker)
            .field("queue_root", &self.queue_root)
            .field("publish_api_root", &self.publish_api_root)
            .finish_non_exhaustive()
    }
}

impl GraphSettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            worker: WorkerPool {
                provisioner_id: cfg.worker.provisioner_id.clone(),
                worker_type: cfg.worker.worker_type.clone(),
            },
            generator_image: cfg.worker.generator_image.clone(),
            signer_image: cfg.worker.signer_image.clone(),
            submitter_image: cfg.worker.submitter_image.clone(),
            queue_root: cfg.scheduler.queue_root.clone(),
            publish_api_root: cfg.publish_api_root().to_string(),
            publish_username: cfg.balrog.username.clone(),
            publish_password: cfg.balrog.password.clone(),
        }
    }
}

/// Retrieval prefix for the artifacts of `task_id`.
pub fn artifacts_url(queue_root: &str, task_id: &TaskId) -> String {
    format!(
        "{}/task/{}/artifacts/{}",
        queue_root.trim_end_matches('/'),
        task_id,
        ARTIFACT_NAME
    )
}

/// Builds partial-update graphs.
///
/// Holds only read-only settings and shared effect handles, so one builder
/// serves concurrent events.
#[derive(Clone)]
pub struct GraphBuilder {
    settings: GraphSettings,
    encryptor: Arc<dyn EnvEncryptor>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl GraphBuilder {
    pub fn new(
        settings: GraphSettings,
        encryptor: Arc<dyn EnvEncryptor>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            settings,
            encryptor,
            clock,
            ids,
        }
    }

    /// Build the generate → sign → publish graph for one platform/locale.
    ///
    /// Fails without producing a graph if either publish secret cannot be
    /// encrypted.
    pub fn build_graph(
        &self,
        platform: &str,
        locale: &str,
        from_url: &str,
        to_url: &str,
    ) -> Result<TaskGraph> {
        let now = self.clock.now();

        let generate_id = self.ids.task_id();
        let sign_id = self.ids.task_id();
        let publish_id = self.ids.task_id();

        let generate = self.generate_node(
            now,
            generate_id.clone(),
            platform,
            locale,
            from_url,
            to_url,
        );
        let sign = self.sign_node(now, sign_id.clone(), &generate_id, platform, locale);
        let publish = self.publish_node(now, publish_id, &sign_id, platform, locale)?;

        let graph = TaskGraph {
            id: self.ids.graph_id(),
            nodes: vec![generate, sign, publish],
            worker: self.settings.worker.clone(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            metadata: Metadata {
                name: "Funsize".to_string(),
                description: format!("Partial update for {platform} {locale}"),
                owner: OWNER.to_string(),
                source: SOURCE.to_string(),
            },
        };
        graph.validate()?;
        Ok(graph)
    }

    fn base_node(
        &self,
        now: DateTime<Utc>,
        id: TaskId,
        role: TaskRole,
        image: &str,
        depends_on: Option<&TaskId>,
        title: &str,
    ) -> TaskNode {
        TaskNode {
            id,
            role,
            depends_on: depends_on.into_iter().cloned().collect::<BTreeSet<_>>(),
            image: image.to_string(),
            command: vec!["/runme.sh".to_string()],
            env: BTreeMap::new(),
            encrypted_env: Vec::new(),
            created: now,
            deadline: now + stage_deadline(role),
            max_run_time_secs: MAX_RUN_TIME_SECS,
            artifacts: None,
            metadata: Metadata {
                name: title.to_string(),
                description: title.to_string(),
                owner: OWNER.to_string(),
                source: SOURCE.to_string(),
            },
        }
    }

    fn artifacts(now: DateTime<Utc>) -> Option<ArtifactSpec> {
        Some(ArtifactSpec {
            name: ARTIFACT_NAME.to_string(),
            path: ARTIFACT_PATH.to_string(),
            expires: now + artifact_lifetime(),
        })
    }

    fn generate_node(
        &self,
        now: DateTime<Utc>,
        id: TaskId,
        platform: &str,
        locale: &str,
        from_url: &str,
        to_url: &str,
    ) -> TaskNode {
        let title = format!("Funsize update generator task for {platform} {locale}");
        let mut node = self.base_node(
            now,
            id,
            TaskRole::Generate,
            &self.settings.generator_image,
            None,
            &title,
        );
        node.env.insert("FROM_MAR".into(), from_url.to_string());
        node.env.insert("TO_MAR".into(), to_url.to_string());
        node.env.insert("PLATFORM".into(), platform.to_string());
        node.env.insert("LOCALE".into(), locale.to_string());
        node.artifacts = Self::artifacts(now);
        node
    }

    fn sign_node(
        &self,
        now: DateTime<Utc>,
        id: TaskId,
        generate_id: &TaskId,
        platform: &str,
        locale: &str,
    ) -> TaskNode {
        let title = format!("Funsize signing task for {platform} {locale}");
        let mut node = self.base_node(
            now,
            id,
            TaskRole::Sign,
            &self.settings.signer_image,
            Some(generate_id),
            &title,
        );
        node.env.insert(
            "PARENT_TASK_ARTIFACTS_URL_PREFIX".into(),
            artifacts_url(&self.settings.queue_root, generate_id),
        );
        node.artifacts = Self::artifacts(now);
        node
    }

    fn publish_node(
        &self,
        now: DateTime<Utc>,
        id: TaskId,
        sign_id: &TaskId,
        platform: &str,
        locale: &str,
    ) -> Result<TaskNode> {
        let title = format!("Funsize balrog submitter task for {platform} {locale}");
        let valid_until = now + secret_lifetime();

        let username = self.encryptor.encrypt_env_var(
            &id,
            now,
            valid_until,
            "BALROG_USERNAME",
            &self.settings.publish_username,
        )?;
        let password = self.encryptor.encrypt_env_var(
            &id,
            now,
            valid_until,
            "BALROG_PASSWORD",
            &self.settings.publish_password,
        )?;

        let mut node = self.base_node(
            now,
            id,
            TaskRole::Publish,
            &self.settings.submitter_image,
            Some(sign_id),
            &title,
        );
        node.env.insert(
            "PARENT_TASK_ARTIFACTS_URL_PREFIX".into(),
            artifacts_url(&self.settings.queue_root, sign_id),
        );
        node.env.insert("BALROG_API_ROOT".into(), self.settings.publish_api_root.clone());
        node.encrypted_env = vec![username, password];
        Ok(node)
    }
}
