// src/engine/pipeline.rs

//! Per-event pipeline:
//!
//! ```text
//! classify ─▶ targets ─▶ releases ─▶ builds ─▶ graph ─▶ submit
//! ```
//!
//! [`Pipeline::process`] returns the first error it hits. [`Pipeline::handle`]
//! is the failure boundary: it runs `process` inside the event's span and
//! turns any error into a log line and an [`EventOutcome::Failed`], so one
//! bad event never affects the next.
//!
//! Submissions are not rolled back. When the scheduler rejects a later graph
//! of a multi-locale event, the graphs it already accepted are reported in
//! the `Failed` outcome.

use std::fmt;
use std::sync::Arc;

use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::balrog::{ReleaseQuery, ReleaseResolver, pick_pair};
use crate::config::ConfigFile;
use crate::errors::Result;
use crate::event::{BuildClassifier, BuildEvent, PartialTarget, PropertyBag};
use crate::graph::builder::GraphBuilder;
use crate::graph::ids::GraphId;
use crate::graph::model::TaskGraph;
use crate::scheduler::GraphSubmitter;
use crate::types::UpdateFrom;

/// One graph accepted by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedGraph {
    pub graph_id: GraphId,
    pub target: PartialTarget,
    pub state: String,
}

/// What became of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Failed build or builder outside the nightly grammar.
    Ignored,
    /// Every requested partial was submitted.
    Submitted(Vec<SubmittedGraph>),
    /// Processing stopped at an error of this kind (see `FunsizeError::kind`).
    /// `submitted` holds the graphs accepted before the failure.
    Failed {
        kind: &'static str,
        submitted: Vec<SubmittedGraph>,
    },
}

/// Release selection knobs taken from `[releases]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleasePolicy {
    pub query: ReleaseQuery,
    pub update_from: UpdateFrom,
}

impl Default for ReleasePolicy {
    fn default() -> Self {
        Self {
            query: ReleaseQuery {
                limit: 3,
                ..ReleaseQuery::default()
            },
            update_from: UpdateFrom::Oldest,
        }
    }
}

impl ReleasePolicy {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            query: ReleaseQuery {
                limit: cfg.releases.limit,
                include_latest: cfg.releases.include_latest,
                reverse: true,
            },
            update_from: cfg.releases.update_from,
        }
    }
}

/// Everything needed to turn an event into submitted graphs.
///
/// All fields are read-only after construction; a pipeline can be shared
/// across concurrently processed events.
pub struct Pipeline {
    classifier: BuildClassifier,
    resolver: Arc<dyn ReleaseResolver>,
    builder: GraphBuilder,
    submitter: Arc<dyn GraphSubmitter>,
    policy: ReleasePolicy,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("classifier", &self.classifier)
            .field("builder", &self.builder)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(
        classifier: BuildClassifier,
        resolver: Arc<dyn ReleaseResolver>,
        builder: GraphBuilder,
        submitter: Arc<dyn GraphSubmitter>,
        policy: ReleasePolicy,
    ) -> Self {
        Self {
            classifier,
            resolver,
            builder,
            submitter,
            policy,
        }
    }

    pub fn classifier(&self) -> &BuildClassifier {
        &self.classifier
    }

    /// Process one event; never fails.
    pub async fn handle(&self, event: &BuildEvent) -> EventOutcome {
        let span = info_span!(
            "event",
            routing_key = %event.routing_key,
            builder = %event.builder_name,
        );

        async {
            match self.process(event).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(error.kind = err.kind(), error = %err, "dropping event");
                    EventOutcome::Failed {
                        kind: err.kind(),
                        submitted: Vec::new(),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Process one event, propagating the first failure.
    ///
    /// All graphs are built before any is submitted, so a lookup or
    /// encryption failure for one locale submits nothing for the event. A
    /// rejection after the first accepted graph yields `Ok(Failed { .. })`
    /// carrying the graphs already submitted.
    pub async fn process(&self, event: &BuildEvent) -> Result<EventOutcome> {
        if !self.classifier.is_interesting(event) {
            debug!(result_code = event.result_code, "not an interesting build");
            return Ok(EventOutcome::Ignored);
        }

        let bag = PropertyBag::from(event.properties.as_slice());
        let targets = bag.targets()?;
        info!(targets = targets.len(), "interesting build");

        let mut graphs = Vec::with_capacity(targets.len());
        for target in targets {
            let graph = self.prepare(&target).await.inspect_err(|err| {
                error!(
                    product = %target.product,
                    branch = %target.branch,
                    platform = %target.platform,
                    locale = %target.locale,
                    error.kind = err.kind(),
                    error = %err,
                    "failed to prepare partial"
                );
            })?;
            graphs.push((target, graph));
        }

        let mut submitted = Vec::with_capacity(graphs.len());
        for (target, graph) in graphs {
            let result = match self.submitter.submit(&graph).await {
                Ok(result) => result,
                Err(err) if submitted.is_empty() => return Err(err),
                Err(err) => {
                    error!(
                        graph_id = %graph.id,
                        platform = %target.platform,
                        locale = %target.locale,
                        already_submitted = submitted.len(),
                        error.kind = err.kind(),
                        error = %err,
                        "task graph rejected after earlier graphs were accepted"
                    );
                    return Ok(EventOutcome::Failed {
                        kind: err.kind(),
                        submitted,
                    });
                }
            };
            info!(
                graph_id = %graph.id,
                platform = %target.platform,
                locale = %target.locale,
                state = %result.status.state,
                "task graph submitted"
            );
            submitted.push(SubmittedGraph {
                graph_id: graph.id,
                target,
                state: result.status.state,
            });
        }

        Ok(EventOutcome::Submitted(submitted))
    }

    /// Resolve the release pair and build the graph for one target.
    async fn prepare(&self, target: &PartialTarget) -> Result<TaskGraph> {
        let releases = self
            .resolver
            .get_releases(&target.product, &target.branch, self.policy.query)
            .await?;
        let pair = pick_pair(&releases, self.policy.update_from)?;
        debug!(from = %pair.from.name, to = %pair.to.name, "release pair");

        let from = self
            .resolver
            .get_build(&pair.from.name, &target.platform, &target.locale)
            .await?;
        let to = self
            .resolver
            .get_build(&pair.to.name, &target.platform, &target.locale)
            .await?;

        self.builder.build_graph(
            &target.platform,
            &target.locale,
            &from.complete_update_url,
            &to.complete_update_url,
        )
    }
}
