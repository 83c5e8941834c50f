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

//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The author of a post, embedded by value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar: String,
}

/// A post in a feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Unique identifier
    #[serde(rename = "_id")]
    pub id: String,

    /// Text content (editable)
    pub content: String,

    /// Image URLs; order is preserved for display only
    #[serde(default)]
    pub images: Vec<String>,

    /// The account that authored this post
    pub author: Author,

    /// Ids of users that liked this post
    #[serde(default)]
    pub likes: HashSet<String>,

    /// When this post was created
    pub created_at: DateTime<Utc>,

    /// When this post was last edited
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Whether the given viewer has liked this post
    pub fn liked_by(&self, viewer: &str) -> bool {
        self.likes.contains(viewer)
    }
}

/// Request to create a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Request to edit a post's content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditPost {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn likes_deduplicate_on_decode() {
        let raw = serde_json::json!({
            "_id": "p1",
            "content": "hello",
            "images": ["a.png", "b.png"],
            "author": { "_id": "u1", "username": "mira", "avatar": "" },
            "likes": ["u2", "u2", "u3"],
            "createdAt": "2026-01-10T08:00:00Z",
            "updatedAt": "2026-01-10T08:00:00Z",
        });

        let post: Post = serde_json::from_value(raw).unwrap();
        assert_eq!(post.likes.len(), 2);
        assert!(post.liked_by("u2"));
        assert!(!post.liked_by("u1"));
        // Image order survives the round through the set-free Vec.
        assert_eq!(post.images, vec!["a.png", "b.png"]);
    }
}
