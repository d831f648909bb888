// src/config/validate.rs

use reqwest::Url;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{FunsizeError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = FunsizeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_urls(cfg)?;
    validate_credentials(cfg)?;
    validate_worker(cfg)?;
    validate_releases(cfg)?;
    validate_listener(cfg)?;
    Ok(())
}

fn validate_urls(cfg: &RawConfigFile) -> Result<()> {
    ensure_http_url("balrog.api_root", &cfg.balrog.api_root)?;
    ensure_http_url("scheduler.root_url", &cfg.scheduler.root_url)?;
    ensure_http_url("scheduler.queue_root", &cfg.scheduler.queue_root)?;
    if let Some(ref root) = cfg.worker.publish_api_root {
        ensure_http_url("worker.publish_api_root", root)?;
    }
    Ok(())
}

fn ensure_http_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| {
        FunsizeError::ConfigError(format!("{field} is not a valid URL ({value}): {e}"))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FunsizeError::ConfigError(format!(
            "{field} must use http or https (got {other})"
        ))),
    }
}

fn validate_credentials(cfg: &RawConfigFile) -> Result<()> {
    let required = [
        ("balrog.username", &cfg.balrog.username),
        ("balrog.password", &cfg.balrog.password),
        ("scheduler.client_id", &cfg.scheduler.client_id),
        ("scheduler.access_token", &cfg.scheduler.access_token),
    ];
    ensure_non_empty(&required)
}

fn validate_worker(cfg: &RawConfigFile) -> Result<()> {
    let required = [
        ("worker.provisioner_id", &cfg.worker.provisioner_id),
        ("worker.worker_type", &cfg.worker.worker_type),
        ("worker.generator_image", &cfg.worker.generator_image),
        ("worker.signer_image", &cfg.worker.signer_image),
        ("worker.submitter_image", &cfg.worker.submitter_image),
    ];
    ensure_non_empty(&required)
}

fn ensure_non_empty(fields: &[(&str, &String)]) -> Result<()> {
    for (field, value) in fields {
        if value.trim().is_empty() {
            return Err(FunsizeError::ConfigError(format!(
                "{field} must not be empty"
            )));
        }
    }
    Ok(())
}

fn validate_releases(cfg: &RawConfigFile) -> Result<()> {
    // A partial needs two distinct releases.
    if cfg.releases.limit < 2 {
        return Err(FunsizeError::ConfigError(format!(
            "[releases].limit must be >= 2 (got {})",
            cfg.releases.limit
        )));
    }
    Ok(())
}

fn validate_listener(cfg: &RawConfigFile) -> Result<()> {
    if cfg.listener.branches.is_empty() {
        return Err(FunsizeError::ConfigError(
            "[listener].branches must list at least one branch".to_string(),
        ));
    }
    for (platform, update_platforms) in cfg.platforms.iter() {
        if update_platforms.is_empty() {
            return Err(FunsizeError::ConfigError(format!(
                "[platforms].{platform} must map to at least one update platform"
            )));
        }
    }
    Ok(())
}
