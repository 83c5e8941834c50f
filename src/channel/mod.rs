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

//! Realtime channel for messages and notifications
//!
//! Maintains one line-delimited JSON connection to the backend's socket
//! gateway. The first line after connect is an auth frame carrying the
//! bearer token; every following line is a `{ "event": ..., "data": ... }`
//! frame in either direction.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, warn};

use crate::log_channel;
use crate::models::{DirectMessage, Notification, OutgoingMessage};

/// Inbound event names the gateway emits.
const EVENT_NEW_MESSAGE: &str = "newMessage";
const EVENT_NEW_NOTIFICATION: &str = "new-notification";

/// Outbound event names this client emits.
const EVENT_AUTH: &str = "auth";
const EVENT_SEND_MESSAGE: &str = "sendMessage";

/// One line on the wire
#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    event: String,
    data: serde_json::Value,
}

/// Event from the realtime channel
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// Channel is connected and authenticated
    Connected,
    /// A direct message arrived
    NewMessage(DirectMessage),
    /// A notification arrived
    NewNotification(Notification),
    /// Channel closed, with a reason
    Disconnected(String),
}

/// Live connection to the socket gateway
pub struct ChannelHandle {
    addr: String,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ChannelHandle {
    /// Connect, authenticate, and start forwarding inbound frames to
    /// `event_tx`. The returned handle sends outbound frames and owns
    /// the connection's shutdown signal.
    pub async fn connect(
        addr: &str,
        token: &str,
        event_tx: mpsc::Sender<ChannelEvent>,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("Failed to connect to channel at {addr}"))?;
        let (read_half, write_half) = stream.into_split();
        let writer = Arc::new(Mutex::new(write_half));

        // Auth frame goes out before anything else.
        let auth = Frame {
            event: EVENT_AUTH.to_string(),
            data: serde_json::json!({ "token": token }),
        };
        write_frame(&writer, &auth).await?;

        log_channel!(connected, addr);
        let _ = event_tx.send(ChannelEvent::Connected).await;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(read_loop(
            addr.to_string(),
            read_half,
            event_tx,
            shutdown_rx,
        ));

        Ok(Self {
            addr: addr.to_string(),
            writer,
            shutdown_tx,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send a direct message through the channel.
    pub async fn send(&self, message: &OutgoingMessage) -> Result<()> {
        let frame = Frame {
            event: EVENT_SEND_MESSAGE.to_string(),
            data: serde_json::to_value(message)?,
        };
        write_frame(&self.writer, &frame).await
    }

    /// Close the connection and stop the read loop.
    pub fn disconnect(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

async fn write_frame(writer: &Arc<Mutex<OwnedWriteHalf>>, frame: &Frame) -> Result<()> {
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');

    let mut guard = writer.lock().await;
    guard
        .write_all(line.as_bytes())
        .await
        .context("Failed to write channel frame")?;
    guard.flush().await.context("Failed to flush channel")?;
    Ok(())
}

async fn read_loop(
    addr: String,
    read_half: tokio::net::tcp::OwnedReadHalf,
    event_tx: mpsc::Sender<ChannelEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    let reason = loop {
        line.clear();

        tokio::select! {
            _ = shutdown_rx.recv() => {
                break "closed by client".to_string();
            }
            read = reader.read_line(&mut line) => {
                match read {
                    Ok(0) => break "connection closed by gateway".to_string(),
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        handle_frame(trimmed, &event_tx).await;
                    }
                    Err(e) => break format!("read error: {e}"),
                }
            }
        }
    };

    log_channel!(disconnected, &addr, &reason);
    let _ = event_tx.send(ChannelEvent::Disconnected(reason)).await;
}

async fn handle_frame(raw: &str, event_tx: &mpsc::Sender<ChannelEvent>) {
    let frame: Frame = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Malformed channel frame: {}", e);
            return;
        }
    };

    log_channel!(message, &frame.event);

    match frame.event.as_str() {
        EVENT_NEW_MESSAGE => match serde_json::from_value::<DirectMessage>(frame.data) {
            Ok(message) => {
                let _ = event_tx.send(ChannelEvent::NewMessage(message)).await;
            }
            Err(e) => warn!("Undecodable message frame: {}", e),
        },
        EVENT_NEW_NOTIFICATION => match serde_json::from_value::<Notification>(frame.data) {
            Ok(notification) => {
                let _ = event_tx
                    .send(ChannelEvent::NewNotification(notification))
                    .await;
            }
            Err(e) => warn!("Undecodable notification frame: {}", e),
        },
        other => {
            debug!("Unhandled channel event: {}", other);
        }
    }
}

/// Conversation buffer that merges the history feed with live frames.
///
/// A message sent while its conversation page is still loading can
/// arrive twice, once over the channel and once in the fetched history.
/// The inbox keeps each message id exactly once, whichever path
/// delivered it first.
#[derive(Debug, Default)]
pub struct Inbox {
    messages: Vec<DirectMessage>,
    seen: HashSet<String>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a live message. Returns false if its id is already held.
    pub fn push_live(&mut self, message: DirectMessage) -> bool {
        if !self.seen.insert(message.id.clone()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Prepend an older history page, skipping ids already held.
    /// `history` is expected oldest-first within the page.
    pub fn merge_history(&mut self, history: Vec<DirectMessage>) -> usize {
        let fresh: Vec<DirectMessage> = history
            .into_iter()
            .filter(|m| self.seen.insert(m.id.clone()))
            .collect();

        let added = fresh.len();
        self.messages.splice(0..0, fresh);
        added
    }

    pub fn messages(&self) -> &[DirectMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop everything (on logout).
    pub fn clear(&mut self) {
        self.messages.clear();
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageSender;
    use chrono::Utc;

    fn message(id: &str) -> DirectMessage {
        DirectMessage {
            id: id.to_string(),
            sender: MessageSender {
                id: "u1".to_string(),
            },
            receiver_id: "u2".to_string(),
            content: format!("msg {id}"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn live_duplicate_is_dropped() {
        let mut inbox = Inbox::new();
        assert!(inbox.push_live(message("m1")));
        assert!(!inbox.push_live(message("m1")));
        assert_eq!(inbox.len(), 1);
    }

    #[test]
    fn history_skips_messages_already_delivered_live() {
        let mut inbox = Inbox::new();
        inbox.push_live(message("m3"));

        // History page includes the message the channel already delivered.
        let added = inbox.merge_history(vec![message("m1"), message("m2"), message("m3")]);
        assert_eq!(added, 2);

        let ids: Vec<&str> = inbox.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn live_message_after_history_is_kept_once() {
        let mut inbox = Inbox::new();
        inbox.merge_history(vec![message("m1"), message("m2")]);

        assert!(!inbox.push_live(message("m2")));
        assert!(inbox.push_live(message("m3")));

        let ids: Vec<&str> = inbox.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn older_pages_prepend_in_order() {
        let mut inbox = Inbox::new();
        inbox.merge_history(vec![message("m3"), message("m4")]);
        inbox.merge_history(vec![message("m1"), message("m2")]);

        let ids: Vec<&str> = inbox.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn frame_roundtrip() {
        let frame = Frame {
            event: EVENT_SEND_MESSAGE.to_string(),
            data: serde_json::json!({ "receiverId": "u2", "content": "hey" }),
        };

        let line = serde_json::to_string(&frame).unwrap();
        let back: Frame = serde_json::from_str(&line).unwrap();
        assert_eq!(back.event, "sendMessage");
        assert_eq!(back.data["receiverId"], "u2");
    }
}
