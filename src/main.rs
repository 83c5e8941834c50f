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

//! Ripple Core - headless client for the Ripple social backend
//!
//! This binary runs as a background process and serves the UI shell
//! over a local socket using a JSON-based bridge protocol.

mod api;
mod auth;
mod bridge;
mod channel;
mod feed;
mod logger;
mod models;
mod store;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

use logger::Logger;
use store::SessionStore;

/// Backend REST base URL, overridable for development setups
const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Socket gateway address for the realtime channel
const DEFAULT_CHANNEL_ADDR: &str = "localhost:5001";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging system
    Logger::init()?;

    info!("Ripple Core starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let backend_url =
        std::env::var("RIPPLE_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());
    let channel_addr =
        std::env::var("RIPPLE_CHANNEL_ADDR").unwrap_or_else(|_| DEFAULT_CHANNEL_ADDR.to_string());

    info!("Backend: {}", backend_url);

    let store = Arc::new(SessionStore::open().await?);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handler = Arc::new(bridge::MessageHandler::new(
        &backend_url,
        &channel_addr,
        store,
        shutdown_tx,
    ));

    match bridge::run_server(handler, shutdown_rx).await {
        Ok(_) => {
            info!("Ripple Core shutting down gracefully");
        }
        Err(e) => {
            error!("Fatal error in bridge server: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
