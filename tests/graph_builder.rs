mod common;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::Duration;

use funsize::crypto::{SealedBoxEncryptor, open_env_var};
use funsize::errors::FunsizeError;
use funsize::graph::{SlugIdGenerator, TaskGraph};
use funsize::types::TaskRole;
use funsize_test_utils::builders::test_keypair;
use funsize_test_utils::fakes::{FailingEncryptor, SequentialIds};

use common::{TestResult, graph_builder, t0};

const FROM: &str = "https://archive.example/old/complete.mar";
const TO: &str = "https://archive.example/new/complete.mar";

fn build(ids: Arc<SequentialIds>) -> (funsize::crypto::SecretKey, TaskGraph) {
    let (secret, public) = test_keypair();
    let builder = graph_builder(Arc::new(SealedBoxEncryptor::new(public)), ids);
    let graph = builder.build_graph("linux64", "de", FROM, TO).unwrap();
    (secret, graph)
}

#[test]
fn graph_is_a_three_node_chain() -> TestResult {
    let (_, graph) = build(Arc::new(SequentialIds::default()));
    assert_eq!(graph.nodes.len(), 3);

    let generate = graph.node(TaskRole::Generate).unwrap();
    let sign = graph.node(TaskRole::Sign).unwrap();
    let publish = graph.node(TaskRole::Publish).unwrap();

    assert!(generate.depends_on.is_empty());
    assert_eq!(sign.depends_on, BTreeSet::from([generate.id.clone()]));
    assert_eq!(publish.depends_on, BTreeSet::from([sign.id.clone()]));
    graph.validate()?;
    Ok(())
}

#[test]
fn nodes_reference_dependencies_by_artifact_url() -> TestResult {
    let (_, graph) = build(Arc::new(SequentialIds::default()));
    let generate = graph.node(TaskRole::Generate).unwrap();
    let sign = graph.node(TaskRole::Sign).unwrap();
    let publish = graph.node(TaskRole::Publish).unwrap();

    assert_eq!(generate.env["FROM_MAR"], FROM);
    assert_eq!(generate.env["TO_MAR"], TO);
    assert_eq!(generate.env["PLATFORM"], "linux64");
    assert_eq!(generate.env["LOCALE"], "de");

    assert_eq!(
        sign.env["PARENT_TASK_ARTIFACTS_URL_PREFIX"],
        format!("https://queue.example/v1/task/{}/artifacts/public/env", generate.id)
    );
    assert_eq!(
        publish.env["PARENT_TASK_ARTIFACTS_URL_PREFIX"],
        format!("https://queue.example/v1/task/{}/artifacts/public/env", sign.id)
    );
    assert_eq!(publish.env["BALROG_API_ROOT"], "https://balrog.example/api");
    assert!(!publish.env.contains_key("BALROG_PASSWORD"));
    Ok(())
}

#[test]
fn deadlines_and_expiry_are_relative_to_now() -> TestResult {
    let (_, graph) = build(Arc::new(SequentialIds::default()));
    let generate = graph.node(TaskRole::Generate).unwrap();
    let sign = graph.node(TaskRole::Sign).unwrap();
    let publish = graph.node(TaskRole::Publish).unwrap();

    for node in graph.nodes.iter() {
        assert_eq!(node.created, t0());
    }
    assert_eq!(generate.deadline, t0() + Duration::hours(2));
    assert_eq!(sign.deadline, t0() + Duration::hours(2));
    assert_eq!(publish.deadline, t0() + Duration::hours(6));

    assert_eq!(generate.artifact_expiry(), Some(t0() + Duration::days(7)));
    assert_eq!(sign.artifact_expiry(), Some(t0() + Duration::days(7)));
    assert_eq!(publish.artifact_expiry(), None);
    Ok(())
}

#[test]
fn publish_secrets_are_bound_to_the_publish_task() -> TestResult {
    let (secret, graph) = build(Arc::new(SequentialIds::default()));
    let publish = graph.node(TaskRole::Publish).unwrap();
    assert_eq!(publish.encrypted_env.len(), 2);

    let mut recovered = Vec::new();
    for var in publish.encrypted_env.iter() {
        assert_eq!(var.task_id, publish.id);
        let envelope = open_env_var(&secret, var)?;
        assert_eq!(envelope.task_id, publish.id.as_str());
        assert_eq!(envelope.start_time, t0().timestamp_millis());
        assert_eq!(envelope.end_time, (t0() + Duration::hours(24)).timestamp_millis());
        recovered.push((envelope.name, envelope.value));
    }
    recovered.sort();
    assert_eq!(
        recovered,
        vec![
            ("BALROG_PASSWORD".to_string(), "balrog-password".to_string()),
            ("BALROG_USERNAME".to_string(), "ffxbld".to_string()),
        ]
    );

    for role in [TaskRole::Generate, TaskRole::Sign] {
        assert!(graph.node(role).unwrap().encrypted_env.is_empty());
    }
    Ok(())
}

#[test]
fn ids_are_never_reused() -> TestResult {
    let (_, public) = test_keypair();
    let builder = graph_builder(
        Arc::new(SealedBoxEncryptor::new(public)),
        Arc::new(SlugIdGenerator),
    );

    let mut seen = HashSet::new();
    for _ in 0..20 {
        let graph = builder.build_graph("win32", "en-US", FROM, TO)?;
        assert!(seen.insert(graph.id.to_string()));
        for node in graph.nodes {
            assert!(seen.insert(node.id.to_string()));
        }
    }
    Ok(())
}

#[test]
fn encryption_failure_yields_no_graph() -> TestResult {
    let builder = graph_builder(Arc::new(FailingEncryptor), Arc::new(SequentialIds::default()));
    let err = builder.build_graph("linux", "en-US", FROM, TO).unwrap_err();
    assert!(matches!(err, FunsizeError::EncryptionFailure(_)));
    Ok(())
}
