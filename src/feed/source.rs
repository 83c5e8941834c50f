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

//! Backend-backed page sources
//!
//! One source per feed kind; the filter (author id, search text,
//! conversation partner) is baked into the kind at `feed.open` time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::{ApiClient, ApiError};
use crate::models::{Comment, DirectMessage, Notification, Post, User};

use super::{FeedKey, PageSource};

/// The kinds of paginated feeds the UI can open
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedKind {
    /// All posts, newest first
    Home,
    /// Posts by one author
    Profile { author_id: String },
    /// Top-level comments of a post
    Comments { post_id: String },
    /// Replies of one top-level comment
    Replies { post_id: String, parent_id: String },
    /// The viewer's notifications
    Notifications,
    /// Direct-message history with a connection
    Conversation { connection_id: String },
    /// Users matching a search text
    UserSearch { query: String },
}

impl FeedKind {
    /// Default page size for this feed kind
    pub fn default_limit(&self) -> u32 {
        match self {
            FeedKind::Home | FeedKind::Profile { .. } => 10,
            FeedKind::Comments { .. } | FeedKind::Replies { .. } => 10,
            FeedKind::Notifications => 10,
            FeedKind::Conversation { .. } => 10,
            FeedKind::UserSearch { .. } => 10,
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            FeedKind::Home => "home",
            FeedKind::Profile { .. } => "profile",
            FeedKind::Comments { .. } => "comments",
            FeedKind::Replies { .. } => "replies",
            FeedKind::Notifications => "notifications",
            FeedKind::Conversation { .. } => "conversation",
            FeedKind::UserSearch { .. } => "user_search",
        }
    }
}

/// An item of any feed, serialized for the bridge as the plain entity
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FeedEntry {
    Post(Post),
    Comment(Comment),
    User(User),
    Notification(Notification),
    Message(DirectMessage),
}

impl FeedKey for FeedEntry {
    fn key(&self) -> &str {
        match self {
            FeedEntry::Post(p) => &p.id,
            FeedEntry::Comment(c) => &c.id,
            FeedEntry::User(u) => &u.id,
            FeedEntry::Notification(n) => &n.id,
            FeedEntry::Message(m) => &m.id,
        }
    }
}

/// Page source that resolves a [`FeedKind`] against the backend
pub struct BackendSource {
    client: Arc<ApiClient>,
    kind: FeedKind,
}

impl BackendSource {
    pub fn new(client: Arc<ApiClient>, kind: FeedKind) -> Self {
        Self { client, kind }
    }

    pub fn kind(&self) -> &FeedKind {
        &self.kind
    }
}

#[async_trait]
impl PageSource<FeedEntry> for BackendSource {
    async fn fetch(&self, page: u32, limit: u32) -> Result<Vec<FeedEntry>, ApiError> {
        let entries = match &self.kind {
            FeedKind::Home => self
                .client
                .list_posts(page, limit, None)
                .await?
                .into_iter()
                .map(FeedEntry::Post)
                .collect(),
            FeedKind::Profile { author_id } => self
                .client
                .list_posts(page, limit, Some(author_id))
                .await?
                .into_iter()
                .map(FeedEntry::Post)
                .collect(),
            FeedKind::Comments { post_id } => self
                .client
                .list_comments(post_id, None, page, limit)
                .await?
                .into_iter()
                .map(FeedEntry::Comment)
                .collect(),
            FeedKind::Replies { post_id, parent_id } => self
                .client
                .list_comments(post_id, Some(parent_id), page, limit)
                .await?
                .into_iter()
                .map(FeedEntry::Comment)
                .collect(),
            FeedKind::Notifications => self
                .client
                .list_notifications(page, limit)
                .await?
                .into_iter()
                .map(FeedEntry::Notification)
                .collect(),
            FeedKind::Conversation { connection_id } => self
                .client
                .conversation(connection_id, page, limit)
                .await?
                .into_iter()
                .map(FeedEntry::Message)
                .collect(),
            FeedKind::UserSearch { query } => self
                .client
                .search_users(query, page, limit)
                .await?
                .into_iter()
                .map(FeedEntry::User)
                .collect(),
        };

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_kind_decodes_from_bridge_params() {
        let raw = serde_json::json!({ "kind": "profile", "author_id": "u1" });
        let kind: FeedKind = serde_json::from_value(raw).unwrap();
        assert_eq!(
            kind,
            FeedKind::Profile {
                author_id: "u1".to_string()
            }
        );
        assert_eq!(kind.name(), "profile");
    }

    #[test]
    fn entries_serialize_as_plain_entities() {
        let user = User {
            id: "u1".to_string(),
            username: "mira".to_string(),
            full_name: None,
            email: "mira@example.com".to_string(),
            avatar: String::new(),
            short_description: None,
            followers: Default::default(),
            followings: Default::default(),
        };

        let value = serde_json::to_value(FeedEntry::User(user)).unwrap();
        // No enum wrapper in the wire shape.
        assert_eq!(value.get("_id").and_then(|v| v.as_str()), Some("u1"));
        assert!(value.get("User").is_none());
    }
}
