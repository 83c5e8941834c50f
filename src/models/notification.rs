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

//! Notification model
//!
//! The backend sends a record with a `type` discriminator and a union
//! of optional payload references. Here that shape is a tagged variant:
//! each kind carries exactly the references it needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Comment, Post, User};

/// Payload of a notification, keyed by the wire `type` field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// Someone followed you
    Follow,
    /// Someone liked your post
    Like {
        #[serde(rename = "postId")]
        post: Box<Post>,
    },
    /// Someone commented on your post
    Comment {
        #[serde(rename = "postId")]
        post: Box<Post>,
        #[serde(rename = "commentId")]
        comment: Box<Comment>,
    },
    /// Someone replied to your comment
    CommentReply {
        #[serde(rename = "postId")]
        post: Box<Post>,
        #[serde(rename = "commentId")]
        comment: Box<Comment>,
    },
}

/// A notification delivered by the backend or the socket channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique identifier
    #[serde(rename = "_id")]
    pub id: String,

    /// Kind-specific payload
    #[serde(flatten)]
    pub kind: NotificationKind,

    /// Human-readable summary from the backend
    #[serde(default)]
    pub message: String,

    /// The user that triggered the notification
    #[serde(rename = "senderId")]
    pub sender: User,

    /// Id of the recipient
    #[serde(default)]
    pub recipient_id: String,

    /// Whether this notification has been read
    #[serde(default)]
    pub read: bool,

    /// When this notification was created
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> serde_json::Value {
        serde_json::json!({
            "_id": "u2",
            "username": "theo",
            "email": "theo@example.com",
        })
    }

    fn post() -> serde_json::Value {
        serde_json::json!({
            "_id": "p1",
            "content": "hello",
            "author": { "_id": "u1", "username": "mira", "avatar": "" },
            "createdAt": "2026-01-10T08:00:00Z",
            "updatedAt": "2026-01-10T08:00:00Z",
        })
    }

    #[test]
    fn follow_carries_no_payload() {
        let raw = serde_json::json!({
            "_id": "n1",
            "type": "FOLLOW",
            "message": "theo followed you",
            "senderId": sender(),
            "recipientId": "u1",
            "read": false,
            "createdAt": "2026-01-10T09:00:00Z",
        });

        let n: Notification = serde_json::from_value(raw).unwrap();
        assert_eq!(n.kind, NotificationKind::Follow);
        assert_eq!(n.sender.id, "u2");
        assert!(!n.read);
    }

    #[test]
    fn like_carries_the_post() {
        let raw = serde_json::json!({
            "_id": "n2",
            "type": "LIKE",
            "senderId": sender(),
            "postId": post(),
            "createdAt": "2026-01-10T09:00:00Z",
        });

        let n: Notification = serde_json::from_value(raw).unwrap();
        match n.kind {
            NotificationKind::Like { post } => assert_eq!(post.id, "p1"),
            other => panic!("wrong kind: {other:?}"),
        }
    }

    #[test]
    fn kinds_with_payloads_compare_by_value() {
        let raw = serde_json::json!({
            "_id": "n2",
            "type": "LIKE",
            "senderId": sender(),
            "postId": post(),
            "createdAt": "2026-01-10T09:00:00Z",
        });

        let a: Notification = serde_json::from_value(raw.clone()).unwrap();
        let b: Notification = serde_json::from_value(raw).unwrap();
        assert_eq!(a.kind, b.kind);
        assert_ne!(a.kind, NotificationKind::Follow);
    }

    #[test]
    fn comment_reply_carries_post_and_comment() {
        let raw = serde_json::json!({
            "_id": "n3",
            "type": "COMMENT_REPLY",
            "senderId": sender(),
            "postId": post(),
            "commentId": {
                "_id": "c1",
                "content": "nice",
                "userId": sender(),
                "postId": "p1",
                "createdAt": "2026-01-10T08:30:00Z",
                "updatedAt": "2026-01-10T08:30:00Z",
            },
            "createdAt": "2026-01-10T09:00:00Z",
        });

        let n: Notification = serde_json::from_value(raw).unwrap();
        match n.kind {
            NotificationKind::CommentReply { post, comment } => {
                assert_eq!(post.id, "p1");
                assert_eq!(comment.id, "c1");
            }
            other => panic!("wrong kind: {other:?}"),
        }
    }
}
