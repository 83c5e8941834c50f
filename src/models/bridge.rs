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

//! Bridge message envelope for communication with the UI shell

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type of bridge message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Request,
    Response,
    Event,
}

/// A bridge message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeMessage {
    /// Unique message ID (UUID)
    pub id: String,

    /// Message type
    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Method name for requests
    pub method: Option<String>,

    /// Parameters for requests
    pub params: Option<Value>,

    /// Result for responses
    pub result: Option<Value>,

    /// Error for failed responses
    pub error: Option<BridgeError>,
}

impl BridgeMessage {
    /// Create a new request message
    pub fn request(method: &str, params: Option<Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message_type: MessageType::Request,
            method: Some(method.to_string()),
            params,
            result: None,
            error: None,
        }
    }

    /// Create a success response
    pub fn response_ok(id: &str, result: Value) -> Self {
        Self {
            id: id.to_string(),
            message_type: MessageType::Response,
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn response_err(id: &str, error: BridgeError) -> Self {
        Self {
            id: id.to_string(),
            message_type: MessageType::Response,
            method: None,
            params: None,
            result: None,
            error: Some(error),
        }
    }

    /// Create an event message
    pub fn event(method: &str, params: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message_type: MessageType::Event,
            method: Some(method.to_string()),
            params: Some(params),
            result: None,
            error: None,
        }
    }
}

/// Error in a bridge response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    pub data: Option<Value>,
}

impl BridgeError {
    /// Create a new error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Add data to the error
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Standard error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // Application-specific errors
    pub const NOT_AUTHENTICATED: i32 = -1001;
    pub const VALIDATION_FAILED: i32 = -1002;
    pub const NETWORK_ERROR: i32 = -1003;
    pub const API_ERROR: i32 = -1004;
    pub const FEED_NOT_FOUND: i32 = -1005;
    pub const CHANNEL_ERROR: i32 = -1006;
}

/// Bridge method names
pub mod methods {
    // Authentication
    pub const AUTH_LOGIN: &str = "auth.login";
    pub const AUTH_REGISTER: &str = "auth.register";
    pub const AUTH_FORGOT_PASSWORD: &str = "auth.forgot_password";
    pub const AUTH_RESET_PASSWORD: &str = "auth.reset_password";
    pub const AUTH_RESTORE: &str = "auth.restore";
    pub const AUTH_LOGOUT: &str = "auth.logout";

    // Feeds
    pub const FEED_OPEN: &str = "feed.open";
    pub const FEED_NEXT: &str = "feed.next";
    pub const FEED_VISIBILITY: &str = "feed.visibility";
    pub const FEED_CLOSE: &str = "feed.close";

    // Posts
    pub const POST_GET: &str = "post.get";
    pub const POST_CREATE: &str = "post.create";
    pub const POST_EDIT: &str = "post.edit";
    pub const POST_DELETE: &str = "post.delete";
    pub const POST_LIKE: &str = "post.like";
    pub const POST_UNLIKE: &str = "post.unlike";

    // Comments
    pub const COMMENT_CREATE: &str = "comment.create";
    pub const COMMENT_EDIT: &str = "comment.edit";
    pub const COMMENT_DELETE: &str = "comment.delete";
    pub const COMMENT_LIKE: &str = "comment.like";
    pub const COMMENT_UNLIKE: &str = "comment.unlike";
    pub const COMMENT_EXPAND: &str = "comment.expand";
    pub const COMMENT_COLLAPSE: &str = "comment.collapse";

    // Users
    pub const USER_ME: &str = "user.me";
    pub const USER_GET: &str = "user.get";
    pub const USER_UPDATE: &str = "user.update";
    pub const USER_FOLLOW: &str = "user.follow";
    pub const USER_UNFOLLOW: &str = "user.unfollow";
    pub const USER_CONNECTIONS: &str = "user.connections";

    // Media
    pub const MEDIA_UPLOAD: &str = "media.upload";

    // Socket channel
    pub const CHANNEL_CONNECT: &str = "channel.connect";
    pub const CHANNEL_SEND: &str = "channel.send";
    pub const CHANNEL_DISCONNECT: &str = "channel.disconnect";

    // Local settings
    pub const SETTINGS_GET: &str = "settings.get";
    pub const SETTINGS_SET: &str = "settings.set";
    pub const SETTINGS_ALL: &str = "settings.all";

    // Routing
    pub const ROUTE_CHECK: &str = "route.check";

    // System
    pub const PING: &str = "ping";
    pub const SHUTDOWN: &str = "shutdown";
}

/// Event names pushed to the UI shell
pub mod events {
    pub const NEW_MESSAGE: &str = "event.new_message";
    pub const NEW_NOTIFICATION: &str = "event.new_notification";
    pub const TOGGLE_SETTLED: &str = "event.toggle_settled";
    pub const SESSION_EXPIRED: &str = "event.session_expired";
    pub const CHANNEL_CONNECTED: &str = "event.channel_connected";
    pub const CHANNEL_DISCONNECTED: &str = "event.channel_disconnected";
    pub const ERROR: &str = "event.error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_response_pair_share_id() {
        let req = BridgeMessage::request(methods::PING, None);
        let res = BridgeMessage::response_ok(&req.id, serde_json::json!({ "pong": true }));
        assert_eq!(req.id, res.id);
        assert_eq!(res.message_type, MessageType::Response);
        assert!(res.error.is_none());
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let msg = BridgeMessage::request(
            methods::FEED_NEXT,
            Some(serde_json::json!({ "feed_id": "f1" })),
        );
        let line = serde_json::to_string(&msg).unwrap();
        let back: BridgeMessage = serde_json::from_str(&line).unwrap();
        assert_eq!(back.method.as_deref(), Some(methods::FEED_NEXT));
        assert_eq!(back.message_type, MessageType::Request);
    }
}
