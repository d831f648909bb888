// src/transport/json_lines.rs

//! Bus messages as JSON lines, one message per line (file or STDIN).

use std::future::Future;
use std::io;
use std::pin::Pin;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, warn};

use crate::errors::{FunsizeError, Result};
use crate::event::BuildEvent;
use crate::transport::{Delivery, DeliveryTag, EventSource};

/// Reads one message per line.
///
/// Blank lines are skipped. Lines that do not decode (including lines that
/// are not UTF-8) are logged and dropped. Tags are line numbers (1-based).
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    line_no: DeliveryTag,
    pending: Option<DeliveryTag>,
    acked: u64,
    dropped: u64,
}

impl<R> std::fmt::Debug for JsonLinesSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSource")
            .field("line_no", &self.line_no)
            .field("pending", &self.pending)
            .field("acked", &self.acked)
            .field("dropped", &self.dropped)
            .finish()
    }
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            pending: None,
            acked: 0,
            dropped: 0,
        }
    }

    /// Messages acknowledged so far.
    pub fn acked(&self) -> u64 {
        self.acked
    }

    /// Lines dropped because they did not decode.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    async fn read_next(&mut self) -> Result<Option<Delivery>> {
        if let Some(tag) = self.pending {
            return Err(FunsizeError::Other(anyhow::anyhow!(
                "delivery {tag} has not been acknowledged"
            )));
        }

        loop {
            let next = self.lines.next_line().await;
            self.line_no += 1;
            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(None),
                // The offending bytes are already consumed, so reading resumes
                // at the next line.
                Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                    self.dropped += 1;
                    warn!(line = self.line_no, error = %err, "dropping undecodable message");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            if line.trim().is_empty() {
                continue;
            }

            match BuildEvent::from_json(&line) {
                Ok(event) => {
                    self.pending = Some(self.line_no);
                    return Ok(Some(Delivery {
                        tag: self.line_no,
                        event,
                    }));
                }
                Err(err) => {
                    self.dropped += 1;
                    warn!(line = self.line_no, error = %err, "dropping undecodable message");
                }
            }
        }
    }

    fn acknowledge(&mut self, tag: DeliveryTag) -> Result<()> {
        match self.pending {
            Some(pending) if pending == tag => {
                self.pending = None;
                self.acked += 1;
                debug!(tag, "acknowledged");
                Ok(())
            }
            _ => Err(FunsizeError::Other(anyhow::anyhow!(
                "unknown delivery tag {tag}"
            ))),
        }
    }
}

impl<R: AsyncBufRead + Unpin + Send> EventSource for JsonLinesSource<R> {
    fn next_delivery(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Delivery>>> + Send + '_>> {
        Box::pin(self.read_next())
    }

    fn ack(&mut self, tag: DeliveryTag) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let result = self.acknowledge(tag);
        Box::pin(async move { result })
    }
}
