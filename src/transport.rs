//! Line-oriented local transport
//!
//! Reads one JSON request per line, runs each on its own task through the
//! router and writes one JSON response line per request, in completion order.

use std::sync::Arc;

use command_handlers::{classify, CommandCtx, CommandError, CommandResponse, CommandRouter};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uia_core_types::SessionId;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One request line
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub command: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

/// Totals reported when the transport shuts down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    pub received: usize,
    pub rejected: usize,
    /// Most requests running at once
    pub peak_in_flight: usize,
}

pub struct LineTransport {
    router: Arc<CommandRouter>,
    listener: CancellationToken,
}

impl LineTransport {
    /// `listener` is cancelled when the transport should stop taking requests
    pub fn new(router: Arc<CommandRouter>, listener: CancellationToken) -> Self {
        Self { router, listener }
    }

    /// Serve until end of input or until the listener token is cancelled.
    ///
    /// Requests already running when the loop ends still get their response.
    pub async fn serve<R, W>(&self, input: R, output: W) -> Result<ServeSummary, TransportError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<CommandResponse>();
        let writer = tokio::spawn(write_responses(rx, output));
        let mut in_flight = JoinSet::new();
        let mut summary = ServeSummary::default();
        let mut lines = input.lines();

        loop {
            let line = select! {
                biased;
                _ = self.listener.cancelled() => {
                    info!("listener stopped");
                    break;
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_abnormal_end(joined);
                    continue;
                }
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                debug!("input closed");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            summary.received += 1;

            let request = match serde_json::from_str::<LineRequest>(&line) {
                Ok(request) => request,
                Err(err) => {
                    summary.rejected += 1;
                    warn!(error = %err, "rejecting malformed request line");
                    let failure = classify(&CommandError::from(err), None);
                    let _ = tx.send(CommandResponse::failed(None, &failure));
                    continue;
                }
            };

            if !self.router.handles(&request.command) {
                warn!(command = %request.command, "no handler registered for command");
            }
            let router = self.router.clone();
            let tx = tx.clone();
            in_flight.spawn(async move {
                let ctx = CommandCtx::new(request.session_id.map(SessionId));
                let response = router.dispatch(&request.command, ctx, request.payload).await;
                let _ = tx.send(response);
            });
            summary.peak_in_flight = summary.peak_in_flight.max(in_flight.len());
        }

        while let Some(joined) = in_flight.join_next().await {
            log_abnormal_end(joined);
        }
        drop(tx);
        match writer.await {
            Ok(result) => result?,
            Err(err) => warn!(error = %err, "response writer ended abnormally"),
        }
        info!(
            received = summary.received,
            rejected = summary.rejected,
            peak_in_flight = summary.peak_in_flight,
            "transport closed"
        );
        Ok(summary)
    }
}

fn log_abnormal_end(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        warn!(error = %err, "request task ended abnormally");
    }
}

async fn write_responses<W>(
    mut rx: mpsc::UnboundedReceiver<CommandResponse>,
    mut output: W,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_vec(&response)?;
        line.push(b'\n');
        output.write_all(&line).await?;
        output.flush().await?;
    }
    output.shutdown().await?;
    Ok(())
}
