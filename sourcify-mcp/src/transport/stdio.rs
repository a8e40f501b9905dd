//! Newline-delimited JSON-RPC over a byte stream.
//!
//! Each line is one request. Requests run concurrently; responses are
//! written in completion order through a single writer task, one JSON
//! document per line.

use crate::server::McpServer;
use crate::types::{McpError, McpRequest, McpResponse, RequestId};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Serve requests read from `input` until EOF, writing responses to `output`.
///
/// In-flight invocations are drained before returning.
pub async fn serve<R, W>(server: Arc<McpServer>, input: R, output: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(write_lines(output, rx));

    let mut lines = BufReader::new(input).lines();
    let mut in_flight = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        debug!("← {line}");

        let request: McpRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                queue(&tx, &McpResponse::error(RequestId::Null, McpError::parse_error(e)));
                continue;
            }
        };

        let server = server.clone();
        let tx = tx.clone();
        in_flight.spawn(async move {
            if let Some(response) = server.handle_request(request).await {
                queue(&tx, &response);
            }
        });

        while in_flight.try_join_next().is_some() {}
    }

    info!("stdin closed, waiting for {} in-flight requests", in_flight.len());
    while in_flight.join_next().await.is_some() {}

    drop(tx);
    writer
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

fn queue(tx: &mpsc::UnboundedSender<String>, response: &McpResponse) {
    match serde_json::to_string(response) {
        Ok(line) => {
            if tx.send(line).is_err() {
                error!("Response dropped: output closed");
            }
        }
        Err(e) => error!("Failed to serialize response: {e}"),
    }
}

async fn write_lines<W>(mut output: W, mut rx: mpsc::UnboundedReceiver<String>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        debug!("→ {line}");
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}
