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

//! Structured logging: console output for development, rotated JSON
//! files for the installed app. `RUST_LOG` overrides the level.

use anyhow::Result;
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logger configuration
pub struct LoggerConfig {
    /// Directory rotated log files land in
    pub log_dir: PathBuf,
    /// Prefix for rotated file names
    pub file_prefix: String,
    /// Default level when RUST_LOG is unset
    pub level: Level,
    /// Emit human-readable output on stderr
    pub console_output: bool,
    /// Emit JSON lines to the rotated file
    pub file_output: bool,
    /// Rotation cadence for the file appender
    pub rotation: Rotation,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let log_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Ripple")
            .join("logs");

        Self {
            log_dir,
            file_prefix: "ripple".to_string(),
            level: Level::INFO,
            console_output: true,
            file_output: true,
            rotation: Rotation::DAILY,
        }
    }
}

/// Main logger struct
pub struct Logger;

impl Logger {
    /// Initialize with the default configuration
    pub fn init() -> Result<()> {
        Self::init_with_config(LoggerConfig::default())
    }

    /// Initialize with a custom configuration
    pub fn init_with_config(config: LoggerConfig) -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("ripple_core={}", config.level)));

        let file_layer = if config.file_output {
            std::fs::create_dir_all(&config.log_dir)?;
            let appender =
                RollingFileAppender::new(config.rotation, &config.log_dir, &config.file_prefix);
            Some(
                fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .json(),
            )
        } else {
            None
        };

        let console_layer = config.console_output.then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_span_events(FmtSpan::CLOSE)
        });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(console_layer)
            .init();

        Ok(())
    }
}

/// Macro for logging backend API calls
#[macro_export]
macro_rules! log_api_call {
    ($method:expr, $path:expr) => {
        tracing::info!(
            target: "api",
            method = $method,
            path = $path,
            "API call started"
        )
    };
    ($method:expr, $path:expr, $status:expr) => {
        tracing::info!(
            target: "api",
            method = $method,
            path = $path,
            status = $status,
            "API call completed"
        )
    };
}

/// Macro for logging bridge messages
#[macro_export]
macro_rules! log_bridge {
    (request, $method:expr, $id:expr) => {
        tracing::debug!(
            target: "bridge",
            direction = "request",
            method = $method,
            id = $id,
            "Bridge request received"
        )
    };
    (response, $method:expr, $id:expr, $success:expr) => {
        tracing::debug!(
            target: "bridge",
            direction = "response",
            method = $method,
            id = $id,
            success = $success,
            "Bridge response sent"
        )
    };
    (event, $event:expr) => {
        tracing::debug!(
            target: "bridge",
            direction = "event",
            event = $event,
            "Bridge event sent"
        )
    };
}

/// Macro for logging socket channel events
#[macro_export]
macro_rules! log_channel {
    (connected, $addr:expr) => {
        tracing::info!(
            target: "channel",
            event = "connected",
            addr = $addr,
            "Channel connected"
        )
    };
    (disconnected, $addr:expr, $reason:expr) => {
        tracing::warn!(
            target: "channel",
            event = "disconnected",
            addr = $addr,
            reason = $reason,
            "Channel disconnected"
        )
    };
    (message, $event:expr) => {
        tracing::trace!(
            target: "channel",
            event = $event,
            "Channel frame received"
        )
    };
}
