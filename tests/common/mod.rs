#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use funsize::crypto::EnvEncryptor;
use funsize::engine::{Pipeline, ReleasePolicy};
use funsize::event::BuildClassifier;
use funsize::graph::{FixedClock, GraphBuilder, GraphSettings, IdGenerator, SlugIdGenerator};
use funsize::scheduler::GraphSubmitter;
use funsize::balrog::ReleaseResolver;
use funsize_test_utils::builders::ConfigBuilder;

pub use funsize_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// The instant every test clock is pinned to.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 6, 1, 12, 0, 0).unwrap()
}

pub fn graph_builder(encryptor: Arc<dyn EnvEncryptor>, ids: Arc<dyn IdGenerator>) -> GraphBuilder {
    let cfg = ConfigBuilder::new().build();
    GraphBuilder::new(
        GraphSettings::from_config(&cfg),
        encryptor,
        Arc::new(FixedClock::new(t0())),
        ids,
    )
}

pub fn pipeline(
    resolver: Arc<dyn ReleaseResolver>,
    encryptor: Arc<dyn EnvEncryptor>,
    submitter: Arc<dyn GraphSubmitter>,
    policy: ReleasePolicy,
) -> Pipeline {
    let cfg = ConfigBuilder::new().build();
    Pipeline::new(
        BuildClassifier::new(&cfg.listener.branches).unwrap(),
        resolver,
        graph_builder(encryptor, Arc::new(SlugIdGenerator)),
        submitter,
        policy,
    )
}
