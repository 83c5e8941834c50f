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

//! Comment model
//!
//! Comments form a shallow two-level tree: top-level comments on a
//! post, plus one level of replies addressed by `parent_id`. The wire
//! format carries `depth` and nested-set ordering fields suggesting
//! deeper nesting; the client renders one reply level only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::User;

/// A comment on a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Unique identifier
    #[serde(rename = "_id")]
    pub id: String,

    /// Text content (editable)
    pub content: String,

    /// The user that wrote this comment, embedded by value
    #[serde(rename = "userId")]
    pub user: User,

    /// Id of the post this comment belongs to
    pub post_id: String,

    /// Id of the parent comment, if this is a reply. Must reference a
    /// top-level comment on the same post; not enforced client-side.
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Ids of users that liked this comment
    #[serde(default)]
    pub likes: HashSet<String>,

    /// Nesting depth as reported by the backend; display caps at 1
    #[serde(default)]
    pub depth: u32,

    /// Whether the comment was soft-deleted
    #[serde(default)]
    pub is_deleted: bool,

    /// When this comment was created
    pub created_at: DateTime<Utc>,

    /// When this comment was last edited
    pub updated_at: DateTime<Utc>,
}

/// Request to create a comment or a reply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub post_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub content: String,
}

/// Request to edit a comment's content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditComment {
    pub content: String,
}

/// Body for the delete endpoint, which addresses a comment within its post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteComment {
    pub comment_id: String,
    pub post_id: String,
}
