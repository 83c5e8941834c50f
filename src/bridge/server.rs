// Ripple - a social feed client core
// Copyright (C) 2026 Ripple Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Bridge server over a local socket
//!
//! One UI shell connects at a time. All outbound traffic, responses
//! and pushed events alike, goes through a single per-client queue so
//! lines never interleave.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::models::{error_codes, BridgeError, BridgeMessage};

use super::handler::MessageHandler;

/// Named pipe name for Windows
#[cfg(windows)]
const SOCKET_NAME: &str = r"\\.\pipe\ripple_core";

/// Unix socket path
#[cfg(not(windows))]
const SOCKET_NAME: &str = "/tmp/ripple_core.sock";

/// Run the bridge server until the shutdown signal fires
pub async fn run_server(
    handler: Arc<MessageHandler>,
    shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    info!("Starting bridge server on {}", SOCKET_NAME);

    #[cfg(windows)]
    {
        run_windows_pipe_server(handler, shutdown).await
    }

    #[cfg(not(windows))]
    {
        run_unix_socket_server(handler, shutdown).await
    }
}

#[cfg(not(windows))]
async fn run_unix_socket_server(
    handler: Arc<MessageHandler>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    use tokio::net::UnixListener;

    // Remove a stale socket file from a previous run
    let _ = std::fs::remove_file(SOCKET_NAME);

    let listener = UnixListener::bind(SOCKET_NAME).context("Failed to bind Unix socket")?;

    info!("Listening on {}", SOCKET_NAME);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        info!("Shell connected");
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = serve_client(reader, writer, handler).await {
                                error!("Client handler error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }
            _ = shutdown.recv() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    // Cleanup
    let _ = std::fs::remove_file(SOCKET_NAME);

    Ok(())
}

#[cfg(windows)]
async fn run_windows_pipe_server(
    handler: Arc<MessageHandler>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    use tokio::net::windows::named_pipe::ServerOptions;

    loop {
        // Create a new pipe instance for the next client
        let pipe = ServerOptions::new()
            .create(SOCKET_NAME)
            .context("Failed to create named pipe")?;

        info!("Waiting for shell connection...");

        tokio::select! {
            result = pipe.connect() => {
                match result {
                    Ok(()) => {
                        info!("Shell connected");
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            let (reader, writer) = tokio::io::split(pipe);
                            if let Err(e) = serve_client(reader, writer, handler).await {
                                error!("Client handler error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }
            _ = shutdown.recv() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

/// Serve one connected shell: a writer task drains the outbound queue,
/// the read loop parses requests and queues responses.
async fn serve_client<R, W>(reader: R, writer: W, handler: Arc<MessageHandler>) -> Result<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<BridgeMessage>(64);
    handler.set_event_sink(outbound_tx.clone()).await;

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(message) = outbound_rx.recv().await {
            let line = match serde_json::to_string(&message) {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to serialize outbound message: {}", e);
                    continue;
                }
            };
            if writer.write_all(line.as_bytes()).await.is_err()
                || writer.write_all(b"\n").await.is_err()
                || writer.flush().await.is_err()
            {
                break;
            }
            debug!("Sent: {}", line);
        }
    });

    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                info!("Shell disconnected");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                debug!("Received: {}", trimmed);

                match serde_json::from_str::<BridgeMessage>(trimmed) {
                    Ok(msg) => {
                        let response = handler.handle_message(msg).await;
                        if outbound_tx.send(response).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse message: {}", e);
                        let response = BridgeMessage::response_err(
                            "unknown",
                            BridgeError::new(
                                error_codes::PARSE_ERROR,
                                format!("Failed to parse message: {e}"),
                            ),
                        );
                        if outbound_tx.send(response).await.is_err() {
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                error!("Read error: {}", e);
                break;
            }
        }
    }

    drop(outbound_tx);
    let _ = writer_task.await;

    Ok(())
}
