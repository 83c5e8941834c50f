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

//! One-level comment threading
//!
//! Threads are exactly two deep: top-level comments on a post, and
//! replies under a top-level comment. Replies to a reply are rejected
//! upstream, so expansion only ever applies to top-level comments.
//! Reply lists load lazily on first expand and stay cached across
//! collapse/expand cycles.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::api::{ApiClient, ApiError};
use crate::models::Comment;

/// How many replies to pull when a thread expands.
const REPLY_FETCH_LIMIT: u32 = 100;

/// Loads the replies of one top-level comment
#[async_trait]
pub trait ReplySource: Send + Sync {
    async fn replies(&self, post_id: &str, parent_id: &str) -> Result<Vec<Comment>, ApiError>;
}

#[async_trait]
impl ReplySource for ApiClient {
    async fn replies(&self, post_id: &str, parent_id: &str) -> Result<Vec<Comment>, ApiError> {
        self.list_comments(post_id, Some(parent_id), 1, REPLY_FETCH_LIMIT)
            .await
    }
}

/// Expansion state and reply cache for the comments of one post
pub struct CommentThread {
    post_id: String,
    expanded: HashSet<String>,
    replies: HashMap<String, Vec<Comment>>,
}

impl CommentThread {
    pub fn new(post_id: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            expanded: HashSet::new(),
            replies: HashMap::new(),
        }
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn is_expanded(&self, parent_id: &str) -> bool {
        self.expanded.contains(parent_id)
    }

    /// Cached replies of a parent, if that thread has ever been expanded.
    pub fn cached_replies(&self, parent_id: &str) -> Option<&[Comment]> {
        self.replies.get(parent_id).map(Vec::as_slice)
    }

    /// Expand the thread under `parent`, fetching its replies on first use.
    ///
    /// Only top-level comments carry threads; expanding a reply is a
    /// validation error. A failed fetch leaves the thread collapsed and
    /// uncached, so the next expand retries.
    pub async fn expand<S: ReplySource + ?Sized>(
        &mut self,
        parent: &Comment,
        source: &S,
    ) -> Result<&[Comment], ApiError> {
        if parent.parent_id.is_some() {
            return Err(ApiError::Validation(
                "replies cannot be expanded further".to_string(),
            ));
        }

        if !self.replies.contains_key(&parent.id) {
            let fetched = source.replies(&self.post_id, &parent.id).await?;
            self.replies.insert(parent.id.clone(), fetched);
        }

        self.expanded.insert(parent.id.clone());
        Ok(self.replies[&parent.id].as_slice())
    }

    /// Collapse a thread. The reply cache survives for the next expand.
    pub fn collapse(&mut self, parent_id: &str) {
        self.expanded.remove(parent_id);
    }

    /// Append a freshly created reply so it shows without a refetch.
    pub fn push_reply(&mut self, reply: Comment) {
        if let Some(parent_id) = reply.parent_id.clone() {
            self.replies.entry(parent_id).or_default().push(reply);
        }
    }

    /// Drop a cached reply after deletion.
    pub fn remove_reply(&mut self, parent_id: &str, comment_id: &str) {
        if let Some(list) = self.replies.get_mut(parent_id) {
            list.retain(|c| c.id != comment_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn author() -> User {
        User {
            id: "u1".to_string(),
            username: "mira".to_string(),
            full_name: None,
            email: "mira@example.com".to_string(),
            avatar: String::new(),
            short_description: None,
            followers: HashSet::new(),
            followings: HashSet::new(),
        }
    }

    fn comment(id: &str, parent_id: Option<&str>) -> Comment {
        Comment {
            id: id.to_string(),
            content: format!("comment {id}"),
            user: author(),
            post_id: "p1".to_string(),
            parent_id: parent_id.map(str::to_string),
            likes: HashSet::new(),
            depth: if parent_id.is_some() { 1 } else { 0 },
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl ReplySource for CountingSource {
        async fn replies(
            &self,
            _post_id: &str,
            parent_id: &str,
        ) -> Result<Vec<Comment>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ApiError::Backend {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(vec![comment("r1", Some(parent_id))])
        }
    }

    #[tokio::test]
    async fn replies_load_once_and_survive_collapse() {
        let source = CountingSource::new(false);
        let mut thread = CommentThread::new("p1");
        let parent = comment("c1", None);

        let replies = thread.expand(&parent, &source).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert!(thread.is_expanded("c1"));

        thread.collapse("c1");
        assert!(!thread.is_expanded("c1"));
        assert!(thread.cached_replies("c1").is_some());

        thread.expand(&parent, &source).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_reply_has_no_thread_of_its_own() {
        let source = CountingSource::new(false);
        let mut thread = CommentThread::new("p1");
        let reply = comment("r1", Some("c1"));

        let err = thread.expand(&reply, &source).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_thread_collapsed_and_retryable() {
        let source = CountingSource::new(true);
        let mut thread = CommentThread::new("p1");
        let parent = comment("c1", None);

        assert!(thread.expand(&parent, &source).await.is_err());
        assert!(!thread.is_expanded("c1"));
        assert!(thread.cached_replies("c1").is_none());

        // A second expand hits the source again.
        assert!(thread.expand(&parent, &source).await.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn new_reply_appends_to_the_cached_thread() {
        let source = CountingSource::new(false);
        let mut thread = CommentThread::new("p1");
        let parent = comment("c1", None);

        thread.expand(&parent, &source).await.unwrap();
        thread.push_reply(comment("r2", Some("c1")));
        assert_eq!(thread.cached_replies("c1").unwrap().len(), 2);

        thread.remove_reply("c1", "r1");
        assert_eq!(thread.cached_replies("c1").unwrap().len(), 1);
    }
}
