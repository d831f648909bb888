// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::UpdateFrom;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [balrog]
/// api_root = "https://aus4-admin.mozilla.org/api"
/// username = "funsize"
/// password = "secret"
///
/// [scheduler]
/// root_url = "https://scheduler.taskcluster.net/v1"
/// queue_root = "https://queue.taskcluster.net/v1"
/// client_id = "funsize"
/// access_token = "token"
///
/// [worker]
/// worker_type = "b2gtest"
/// generator_image = "rail/funsize-update-generator"
/// signer_image = "rail/funsize-signer"
/// submitter_image = "rail/funsize-balrog-submitter"
///
/// [encryption]
/// public_key = "docker-worker-pub.key"
/// ```
///
/// `[releases]`, `[listener]` and `[platforms]` are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub balrog: BalrogSection,
    pub scheduler: SchedulerSection,
    pub worker: WorkerSection,
    pub encryption: EncryptionSection,

    #[serde(default)]
    pub releases: ReleasesSection,

    #[serde(default)]
    pub listener: ListenerSection,

    /// Overrides for the build platform → update platform table.
    #[serde(default)]
    pub platforms: BTreeMap<String, Vec<String>>,
}

/// Validated configuration.
///
/// Constructed only through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// then handed, read-only, to every component at construction time.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub balrog: BalrogSection,
    pub scheduler: SchedulerSection,
    pub worker: WorkerSection,
    pub encryption: EncryptionSection,
    pub releases: ReleasesSection,
    pub listener: ListenerSection,
    pub platforms: BTreeMap<String, Vec<String>>,
    base_dir: Option<PathBuf>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            balrog: raw.balrog,
            scheduler: raw.scheduler,
            worker: raw.worker,
            encryption: raw.encryption,
            releases: raw.releases,
            listener: raw.listener,
            platforms: raw.platforms,
            base_dir: None,
        }
    }

    /// Directory that relative paths (CA bundle, public key) resolve against.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// API root the publish task submits to; defaults to the lookup API root.
    pub fn publish_api_root(&self) -> &str {
        self.worker
            .publish_api_root
            .as_deref()
            .unwrap_or(&self.balrog.api_root)
    }
}

/// `[balrog]` section: the update-metadata service.
#[derive(Clone, Deserialize)]
pub struct BalrogSection {
    pub api_root: String,
    pub username: String,
    pub password: String,

    /// Optional PEM trust anchor for the service's TLS certificate.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,
}

impl fmt::Debug for BalrogSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BalrogSection")
            .field("api_root", &self.api_root)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ca_cert", &self.ca_cert)
            .finish()
    }
}

/// `[scheduler]` section: the external job scheduler.
#[derive(Clone, Deserialize)]
pub struct SchedulerSection {
    pub root_url: String,

    /// Queue API root, used to build artifact retrieval URLs between tasks.
    #[serde(default = "default_queue_root")]
    pub queue_root: String,

    pub client_id: String,
    pub access_token: String,
}

fn default_queue_root() -> String {
    "https://queue.taskcluster.net/v1".to_string()
}

impl fmt::Debug for SchedulerSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerSection")
            .field("root_url", &self.root_url)
            .field("queue_root", &self.queue_root)
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// `[worker]` section: where and with which images graph tasks run.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSection {
    #[serde(default = "default_provisioner_id")]
    pub provisioner_id: String,
    pub worker_type: String,
    pub generator_image: String,
    pub signer_image: String,
    pub submitter_image: String,

    /// API root the publish task talks to. Falls back to `balrog.api_root`.
    #[serde(default)]
    pub publish_api_root: Option<String>,
}

fn default_provisioner_id() -> String {
    "aws-provisioner".to_string()
}

/// `[encryption]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptionSection {
    /// File holding the downstream worker's public key.
    pub public_key: PathBuf,
}

/// `[releases]` section: which releases bound a partial update.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleasesSection {
    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default)]
    pub update_from: UpdateFrom,

    #[serde(default)]
    pub include_latest: bool,
}

fn default_limit() -> usize {
    3
}

impl Default for ReleasesSection {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            update_from: UpdateFrom::default(),
            include_latest: false,
        }
    }
}

/// `[listener]` section: which branches produce interesting builds.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenerSection {
    #[serde(default = "default_branches")]
    pub branches: Vec<String>,
}

pub fn default_branches() -> Vec<String> {
    ["mozilla-central", "mozilla-aurora", "comm-central", "comm-aurora"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ListenerSection {
    fn default() -> Self {
        Self {
            branches: default_branches(),
        }
    }
}
