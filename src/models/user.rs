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

//! User model and follow-state derivation

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A Ripple user account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    #[serde(rename = "_id")]
    pub id: String,

    /// Username (unique handle)
    pub username: String,

    /// Display name
    #[serde(default)]
    pub full_name: Option<String>,

    /// Account email
    pub email: String,

    /// URL to the avatar image
    #[serde(default)]
    pub avatar: String,

    /// Profile bio
    #[serde(default)]
    pub short_description: Option<String>,

    /// Ids of users that follow this user
    #[serde(default)]
    pub followers: HashSet<String>,

    /// Ids of users this user follows
    #[serde(default)]
    pub followings: HashSet<String>,
}

impl User {
    /// Whether this user follows `other`.
    ///
    /// Follow state is derived, never stored redundantly: it holds only
    /// when both sides of the relation agree. One-sided relations
    /// (stale follower entry without the matching following entry, or
    /// vice versa) yield false.
    pub fn follows(&self, other: &User) -> bool {
        other.followers.contains(&self.id) && self.followings.contains(&other.id)
    }
}

/// Profile fields a user may edit
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            username: format!("user_{id}"),
            full_name: None,
            email: format!("{id}@example.com"),
            avatar: String::new(),
            short_description: None,
            followers: HashSet::new(),
            followings: HashSet::new(),
        }
    }

    #[test]
    fn follow_requires_both_sides() {
        let mut a = user("a");
        let mut b = user("b");

        assert!(!a.follows(&b));

        // One-sided: only b's follower list knows about a.
        b.followers.insert("a".to_string());
        assert!(!a.follows(&b));

        // One-sided the other way.
        b.followers.clear();
        a.followings.insert("b".to_string());
        assert!(!a.follows(&b));

        // Both sides agree.
        b.followers.insert("a".to_string());
        assert!(a.follows(&b));
    }

    #[test]
    fn follow_is_directional() {
        let mut a = user("a");
        let mut b = user("b");

        b.followers.insert("a".to_string());
        a.followings.insert("b".to_string());

        assert!(a.follows(&b));
        assert!(!b.follows(&a));
    }

    #[test]
    fn decodes_wire_format() {
        let raw = serde_json::json!({
            "_id": "u1",
            "username": "mira",
            "fullName": "Mira L",
            "email": "mira@example.com",
            "avatar": "https://cdn.example.com/a.png",
            "shortDescription": "hi",
            "followers": ["u2", "u2"],
            "followings": ["u3"],
        });

        let user: User = serde_json::from_value(raw).unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.full_name.as_deref(), Some("Mira L"));
        // Duplicate follower ids collapse into the set.
        assert_eq!(user.followers.len(), 1);
    }
}
