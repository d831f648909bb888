mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

use funsize::balrog::ReleaseQuery;
use funsize::crypto::SealedBoxEncryptor;
use funsize::engine::{EventOutcome, Pipeline, ReleasePolicy};
use funsize::types::{TaskRole, UpdateFrom};
use funsize_test_utils::builders::{BuildEventBuilder, test_keypair};
use funsize_test_utils::fakes::{
    FailingEncryptor, FakeResolver, RecordingSubmitter, complete_mar_url,
};

use common::{TestResult, init_tracing, pipeline, with_timeout};

const NIGHTLIES: &[&str] = &[
    "Firefox-mozilla-central-nightly-20150101030201",
    "Firefox-mozilla-central-nightly-20150102030201",
    "Firefox-mozilla-central-nightly-20150103030201",
    "Firefox-mozilla-central-nightly-20150104030201",
    "Firefox-mozilla-central-latest",
];

fn resolver() -> FakeResolver {
    FakeResolver::new()
        .with_releases("Firefox", "mozilla-central", NIGHTLIES)
        .with_releases(
            "Firefox",
            "mozilla-aurora",
            &[
                "Firefox-mozilla-aurora-nightly-20150101004001",
                "Firefox-mozilla-aurora-nightly-20150102004001",
            ],
        )
}

fn setup(
    resolver: FakeResolver,
    submitter: RecordingSubmitter,
    policy: ReleasePolicy,
) -> (Arc<FakeResolver>, Pipeline) {
    let resolver = Arc::new(resolver);
    let (_, public) = test_keypair();
    let p = pipeline(
        resolver.clone(),
        Arc::new(SealedBoxEncryptor::new(public)),
        Arc::new(submitter),
        policy,
    );
    (resolver, p)
}

fn submitted_count(outcome: &EventOutcome) -> usize {
    match outcome {
        EventOutcome::Submitted(graphs) => graphs.len(),
        other => panic!("expected submission, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_and_foreign_builds_are_ignored() -> TestResult {
    init_tracing();
    let submitter = RecordingSubmitter::new();
    let (_, p) = setup(resolver(), submitter.clone(), ReleasePolicy::default());

    let failed = BuildEventBuilder::nightly("Firefox", "mozilla-central", "linux64")
        .result_code(2)
        .build();
    let foreign = BuildEventBuilder::new("b2g_mozilla-central_nexus-5-l_nightly").build();

    assert_eq!(with_timeout(p.handle(&failed)).await, EventOutcome::Ignored);
    assert_eq!(with_timeout(p.handle(&foreign)).await, EventOutcome::Ignored);
    assert!(submitter.graphs().is_empty());
    Ok(())
}

#[tokio::test]
async fn default_policy_updates_from_the_oldest_of_three() -> TestResult {
    init_tracing();
    let submitter = RecordingSubmitter::new();
    let (resolver, p) = setup(resolver(), submitter.clone(), ReleasePolicy::default());

    let event = BuildEventBuilder::nightly("Firefox", "mozilla-central", "linux64").build();
    let outcome = with_timeout(p.handle(&event)).await;
    assert_eq!(submitted_count(&outcome), 1);

    let graphs = submitter.graphs();
    let generate = graphs[0].node(TaskRole::Generate).unwrap();
    assert_eq!(
        generate.env["FROM_MAR"],
        complete_mar_url("Firefox-mozilla-central-nightly-20150102030201", "linux64", "en-US")
    );
    assert_eq!(
        generate.env["TO_MAR"],
        complete_mar_url("Firefox-mozilla-central-nightly-20150104030201", "linux64", "en-US")
    );
    assert_eq!(resolver.build_calls().len(), 2);
    Ok(())
}

#[tokio::test]
async fn previous_policy_updates_from_the_second_newest() -> TestResult {
    init_tracing();
    let submitter = RecordingSubmitter::new();
    let policy = ReleasePolicy {
        query: ReleaseQuery {
            limit: 3,
            ..ReleaseQuery::default()
        },
        update_from: UpdateFrom::Previous,
    };
    let (_, p) = setup(resolver(), submitter.clone(), policy);

    let event = BuildEventBuilder::nightly("Firefox", "mozilla-central", "win32")
        .locale("fr")
        .build();
    with_timeout(p.handle(&event)).await;

    let graphs = submitter.graphs();
    let generate = graphs[0].node(TaskRole::Generate).unwrap();
    assert_eq!(
        generate.env["FROM_MAR"],
        complete_mar_url("Firefox-mozilla-central-nightly-20150103030201", "win32", "fr")
    );
    assert_eq!(generate.env["LOCALE"], "fr");
    Ok(())
}

#[tokio::test]
async fn the_same_event_twice_yields_two_distinct_graphs() -> TestResult {
    init_tracing();
    let submitter = RecordingSubmitter::new();
    let (_, p) = setup(resolver(), submitter.clone(), ReleasePolicy::default());

    let event = BuildEventBuilder::nightly("Firefox", "mozilla-central", "macosx64").build();
    with_timeout(p.handle(&event)).await;
    with_timeout(p.handle(&event)).await;

    let graphs = submitter.graphs();
    assert_eq!(graphs.len(), 2);
    assert_ne!(graphs[0].id, graphs[1].id);
    Ok(())
}

#[tokio::test]
async fn lookup_failure_does_not_affect_the_next_event() -> TestResult {
    init_tracing();
    let submitter = RecordingSubmitter::new();
    let (resolver, p) = setup(resolver(), submitter.clone(), ReleasePolicy::default());
    resolver.fail_branch("mozilla-aurora");

    let aurora = BuildEventBuilder::nightly("Firefox", "mozilla-aurora", "linux").build();
    let central = BuildEventBuilder::nightly("Firefox", "mozilla-central", "linux").build();

    assert_eq!(
        with_timeout(p.handle(&aurora)).await,
        EventOutcome::Failed {
            kind: "lookup",
            submitted: Vec::new()
        }
    );
    assert_eq!(submitted_count(&with_timeout(p.handle(&central)).await), 1);
    assert_eq!(submitter.graphs().len(), 1);

    resolver.heal_branch("mozilla-aurora");
    assert_eq!(submitted_count(&with_timeout(p.handle(&aurora)).await), 1);
    Ok(())
}

#[tokio::test]
async fn too_few_releases_is_a_lookup_failure() -> TestResult {
    init_tracing();
    let submitter = RecordingSubmitter::new();
    let resolver = FakeResolver::new().with_releases(
        "Firefox",
        "mozilla-central",
        &["Firefox-mozilla-central-nightly-20150101030201", "Firefox-mozilla-central-latest"],
    );
    let (_, p) = setup(resolver, submitter.clone(), ReleasePolicy::default());

    let event = BuildEventBuilder::nightly("Firefox", "mozilla-central", "linux64").build();
    assert_eq!(
        with_timeout(p.handle(&event)).await,
        EventOutcome::Failed {
            kind: "lookup",
            submitted: Vec::new()
        }
    );
    assert!(submitter.graphs().is_empty());
    Ok(())
}

#[tokio::test]
async fn l10n_repack_submits_one_graph_per_successful_locale() -> TestResult {
    init_tracing();
    let submitter = RecordingSubmitter::new();
    let (_, p) = setup(resolver(), submitter.clone(), ReleasePolicy::default());

    let event = BuildEventBuilder::l10n(
        "Firefox",
        "mozilla-central",
        "win64",
        &[("de", "success"), ("fr", "failed"), ("ja", "success")],
    )
    .build();

    let graphs = match with_timeout(p.handle(&event)).await {
        EventOutcome::Submitted(graphs) => graphs,
        other => panic!("expected submission, got {other:?}"),
    };
    let locales: Vec<_> = graphs.iter().map(|g| g.target.locale.as_str()).collect();
    assert_eq!(locales, vec!["de", "ja"]);
    assert_ne!(graphs[0].graph_id, graphs[1].graph_id);
    assert!(graphs.iter().all(|g| g.state == "running"));
    Ok(())
}

#[tokio::test]
async fn missing_properties_are_a_malformed_event() -> TestResult {
    init_tracing();
    let submitter = RecordingSubmitter::new();
    let (_, p) = setup(resolver(), submitter.clone(), ReleasePolicy::default());

    let event = BuildEventBuilder::new("Linux x86-64 mozilla-central nightly")
        .property("appName", serde_json::json!("Firefox"))
        .build();
    assert_eq!(
        with_timeout(p.handle(&event)).await,
        EventOutcome::Failed {
            kind: "malformed_event",
            submitted: Vec::new()
        }
    );
    Ok(())
}

#[tokio::test]
async fn encryption_failure_submits_nothing() -> TestResult {
    init_tracing();
    let submitter = RecordingSubmitter::new();
    let p = pipeline(
        Arc::new(resolver()),
        Arc::new(FailingEncryptor),
        Arc::new(submitter.clone()),
        ReleasePolicy::default(),
    );

    let event =
        BuildEventBuilder::l10n("Firefox", "mozilla-central", "linux", &[("de", "success")])
            .build();
    assert_eq!(
        with_timeout(p.handle(&event)).await,
        EventOutcome::Failed {
            kind: "encryption",
            submitted: Vec::new()
        }
    );
    assert!(submitter.graphs().is_empty());
    Ok(())
}

#[tokio::test]
async fn submission_failure_is_reported() -> TestResult {
    init_tracing();
    let (_, p) = setup(resolver(), RecordingSubmitter::rejecting(), ReleasePolicy::default());

    let event = BuildEventBuilder::nightly("Firefox", "mozilla-central", "linux64").build();
    assert_eq!(
        with_timeout(p.handle(&event)).await,
        EventOutcome::Failed {
            kind: "submission",
            submitted: Vec::new()
        }
    );

    let err = with_timeout(p.process(&event)).await.unwrap_err();
    assert!(err.to_string().contains("rejected"));
    Ok(())
}

#[tokio::test]
async fn rejected_second_locale_reports_the_graph_already_accepted() -> TestResult {
    init_tracing();
    let submitter = RecordingSubmitter::rejecting_after(1);
    let (_, p) = setup(resolver(), submitter.clone(), ReleasePolicy::default());

    let event = BuildEventBuilder::l10n(
        "Firefox",
        "mozilla-central",
        "linux",
        &[("de", "success"), ("ja", "success")],
    )
    .build();

    let submitted = match with_timeout(p.handle(&event)).await {
        EventOutcome::Failed { kind, submitted } => {
            assert_eq!(kind, "submission");
            submitted
        }
        other => panic!("expected failure, got {other:?}"),
    };
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].target.locale, "de");
    assert_eq!(submitted[0].graph_id, submitter.graphs()[0].id);
    Ok(())
}

/// Counts ERROR-level events seen while installed.
#[derive(Clone, Default)]
struct ErrorCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[tokio::test]
async fn lookup_failure_is_logged_at_error_once() -> TestResult {
    let counter = ErrorCounter::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(counter.clone()));

    let (resolver, p) = setup(resolver(), RecordingSubmitter::new(), ReleasePolicy::default());
    resolver.fail_branch("mozilla-aurora");

    let event = BuildEventBuilder::nightly("Firefox", "mozilla-aurora", "linux").build();
    assert_eq!(
        with_timeout(p.handle(&event)).await,
        EventOutcome::Failed {
            kind: "lookup",
            submitted: Vec::new()
        }
    );
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    Ok(())
}
