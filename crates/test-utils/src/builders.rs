#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crypto_box::SecretKey;
use crypto_box::aead::OsRng;
use serde_json::{Value, json};

use funsize::config::{
    BalrogSection, ConfigFile, EncryptionSection, ListenerSection, RawConfigFile,
    ReleasesSection, SchedulerSection, WorkerSection,
};
use funsize::crypto::{PublicKey, armor_public_key};
use funsize::event::BuildEvent;
use funsize::types::UpdateFrom;

/// Builder for `BuildEvent`.
pub struct BuildEventBuilder {
    event: BuildEvent,
}

impl BuildEventBuilder {
    pub fn new(builder_name: &str) -> Self {
        Self {
            event: BuildEvent {
                routing_key: "build.test.1.finished".to_string(),
                builder_name: builder_name.to_string(),
                result_code: 0,
                properties: Vec::new(),
            },
        }
    }

    /// A successful en-US nightly with the builder name the nightly grammar
    /// expects for `platform`.
    pub fn nightly(product: &str, branch: &str, platform: &str) -> Self {
        let builder = match platform {
            "linux" => format!("Linux {branch} nightly"),
            "linux64" => format!("Linux x86-64 {branch} nightly"),
            "win32" => format!("WINNT 5.2 {branch} nightly"),
            "win64" => format!("WINNT 6.1 x86-64 {branch} nightly"),
            "macosx64" => format!("OS X 10.7 {branch} nightly"),
            other => format!("{other} {branch} nightly"),
        };

        Self::new(&builder)
            .routing_key(&format!("build.{branch}-{platform}-nightly.1.finished"))
            .property("appName", json!(product))
            .property("branch", json!(branch))
            .property("platform", json!(platform))
    }

    /// A successful l10n repack reporting per-locale results such as
    /// `("de", "success")`.
    pub fn l10n(product: &str, branch: &str, platform: &str, locales: &[(&str, &str)]) -> Self {
        let info = json!({ "platform": platform, "branch": branch, "appName": product });
        let locales: Vec<Value> = locales.iter().map(|(l, r)| json!([l, r])).collect();

        Self::new(&format!("{product} {branch} {platform} l10n nightly-1"))
            .routing_key(&format!("build.{branch}-{platform}-l10n-nightly-1.1.finished"))
            .property("locales", Value::Array(locales))
            .property("funsize_info", Value::String(info.to_string()))
    }

    pub fn routing_key(mut self, key: &str) -> Self {
        self.event.routing_key = key.to_string();
        self
    }

    pub fn result_code(mut self, code: i64) -> Self {
        self.event.result_code = code;
        self
    }

    pub fn locale(self, locale: &str) -> Self {
        self.property("locale", json!(locale))
    }

    pub fn property(mut self, key: &str, value: Value) -> Self {
        self.event.properties.push((key.to_string(), value));
        self
    }

    pub fn build(self) -> BuildEvent {
        self.event
    }

    /// The event as a bus message line, as `JsonLinesSource` reads it.
    pub fn to_json_line(&self) -> String {
        let properties: Vec<Value> = self
            .event
            .properties
            .iter()
            .map(|(k, v)| json!([k, v, "test"]))
            .collect();

        json!({
            "routingKey": self.event.routing_key,
            "payload": {
                "results": self.event.result_code,
                "build": {
                    "builderName": self.event.builder_name,
                    "properties": properties,
                }
            }
        })
        .to_string()
    }
}

/// Builder for `ConfigFile` with working defaults for every section.
pub struct ConfigBuilder {
    config: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                balrog: BalrogSection {
                    api_root: "https://balrog.example/api".to_string(),
                    username: "ffxbld".to_string(),
                    password: "balrog-password".to_string(),
                    ca_cert: None,
                },
                scheduler: SchedulerSection {
                    root_url: "https://scheduler.example/v1".to_string(),
                    queue_root: "https://queue.example/v1".to_string(),
                    client_id: "funsize".to_string(),
                    access_token: "scheduler-token".to_string(),
                },
                worker: WorkerSection {
                    provisioner_id: "aws-provisioner".to_string(),
                    worker_type: "b2gtest".to_string(),
                    generator_image: "rail/funsize-update-generator".to_string(),
                    signer_image: "rail/funsize-signer".to_string(),
                    submitter_image: "rail/funsize-balrog-submitter".to_string(),
                    publish_api_root: None,
                },
                encryption: EncryptionSection {
                    public_key: PathBuf::from("worker-pub.key"),
                },
                releases: ReleasesSection::default(),
                listener: ListenerSection::default(),
                platforms: BTreeMap::new(),
            },
        }
    }

    pub fn balrog_root(mut self, url: &str) -> Self {
        self.config.balrog.api_root = url.to_string();
        self
    }

    pub fn scheduler_root(mut self, url: &str) -> Self {
        self.config.scheduler.root_url = url.to_string();
        self
    }

    pub fn public_key(mut self, path: &Path) -> Self {
        self.config.encryption.public_key = path.to_path_buf();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.config.releases.limit = limit;
        self
    }

    pub fn update_from(mut self, from: UpdateFrom) -> Self {
        self.config.releases.update_from = from;
        self
    }

    pub fn branches(mut self, branches: &[&str]) -> Self {
        self.config.listener.branches = branches.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fresh worker keypair.
pub fn test_keypair() -> (SecretKey, PublicKey) {
    let secret = SecretKey::generate(&mut OsRng);
    let public = secret.public_key();
    (secret, public)
}

/// Write `key` in armored form to `dir/worker-pub.key`.
pub fn write_public_key(dir: &Path, key: &PublicKey) -> PathBuf {
    let path = dir.join("worker-pub.key");
    std::fs::write(&path, armor_public_key(key)).expect("write public key");
    path
}
