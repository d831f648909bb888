// src/engine/listener.rs

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::pipeline::{EventOutcome, Pipeline};
use crate::errors::Result;
use crate::transport::EventSource;

/// Counters kept by the listener across its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub received: u64,
    pub ignored: u64,
    pub failed: u64,
    /// Events with every requested graph submitted.
    pub handled: u64,
    /// Graphs accepted by the scheduler, including those of failed events.
    pub graphs_submitted: u64,
}

impl ListenerStats {
    fn record(&mut self, outcome: &EventOutcome) {
        self.received += 1;
        match outcome {
            EventOutcome::Ignored => self.ignored += 1,
            EventOutcome::Failed { submitted, .. } => {
                self.failed += 1;
                self.graphs_submitted += submitted.len() as u64;
            }
            EventOutcome::Submitted(graphs) => {
                self.handled += 1;
                self.graphs_submitted += graphs.len() as u64;
            }
        }
    }
}

/// Pulls deliveries from a source, runs each through the pipeline and
/// acknowledges it afterwards.
///
/// Pipeline failures are already absorbed by [`Pipeline::handle`]; only
/// transport errors end the loop.
pub struct Listener<S: EventSource> {
    source: S,
    pipeline: Arc<Pipeline>,
    stats: ListenerStats,
}

impl<S: EventSource> std::fmt::Debug for Listener<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<S: EventSource> Listener<S> {
    pub fn new(source: S, pipeline: Arc<Pipeline>) -> Self {
        Self {
            source,
            pipeline,
            stats: ListenerStats::default(),
        }
    }

    /// Run until the source is exhausted.
    pub async fn run(self) -> Result<ListenerStats> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run until the source is exhausted or `shutdown` resolves.
    ///
    /// Shutdown is only observed while waiting for the next delivery; an
    /// event already in the pipeline is finished and acknowledged first.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<ListenerStats>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("listener started");

        loop {
            let delivery = tokio::select! {
                next = self.source.next_delivery() => match next? {
                    Some(d) => d,
                    None => {
                        info!("event source exhausted");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    info!("shutdown requested; stopping listener");
                    break;
                }
            };

            let outcome = self.pipeline.handle(&delivery.event).await;
            debug!(tag = delivery.tag, ?outcome, "event processed");
            self.stats.record(&outcome);

            self.source.ack(delivery.tag).await?;
        }

        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_each_outcome() {
        let mut stats = ListenerStats::default();
        stats.record(&EventOutcome::Ignored);
        stats.record(&EventOutcome::Failed {
            kind: "lookup",
            submitted: Vec::new(),
        });
        stats.record(&EventOutcome::Submitted(Vec::new()));
        assert_eq!(
            stats,
            ListenerStats {
                received: 3,
                ignored: 1,
                failed: 1,
                handled: 1,
                graphs_submitted: 0,
            }
        );
    }
}
