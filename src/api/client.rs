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

//! HTTP client for the Ripple backend
//!
//! The client carries the credential explicitly; nothing reads it from
//! ambient storage. Every endpoint wrapper maps non-success statuses
//! through the [`ApiError`] taxonomy, so a 401 surfaces identically at
//! every call site.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::is_email;
use crate::log_api_call;
use crate::models::{
    Comment, DeleteComment, DirectMessage, EditComment, EditPost, NewComment, NewPost,
    Notification, Post, UpdateProfile, User,
};

use super::ApiError;

/// Issued token envelope returned by the login endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEnvelope {
    pub access_token: String,
}

/// Response from a successful login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: TokenEnvelope,
}

/// Request to register a new account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A file queued for multipart upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Client for the Ripple backend REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create an unauthenticated client
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize_base(base_url),
            token: None,
        }
    }

    /// Create a client carrying a bearer token
    pub fn with_token(base_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize_base(base_url),
            token: Some(token.to_string()),
        }
    }

    /// Get the bearer token (for persistence)
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Get the backend base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ===== AUTH =====

    /// Log in with an email or a username. The identifier is classified
    /// by shape, matching what the backend expects.
    pub async fn login(
        &self,
        email_or_username: &str,
        password: &str,
    ) -> Result<LoginResponse, ApiError> {
        let payload = if is_email(email_or_username) {
            serde_json::json!({ "email": email_or_username, "password": password })
        } else {
            serde_json::json!({ "username": email_or_username, "password": password })
        };

        self.fetch(Method::POST, "/api/v1/auth/login", Some(payload))
            .await
    }

    /// Register a new account
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let body = serde_json::to_value(request)?;
        self.execute(Method::POST, "/api/v1/auth/register", Some(body))
            .await?;
        Ok(())
    }

    /// Request a password-reset email
    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "email": email });
        self.execute(Method::POST, "/api/v1/auth/forgot-password", Some(body))
            .await?;
        Ok(())
    }

    /// Complete a password reset with the emailed token
    pub async fn reset_password(&self, reset_token: &str, password: &str) -> Result<(), ApiError> {
        let path = format!("/api/v1/auth/reset-password/{reset_token}");
        let body = serde_json::json!({ "password": password });
        self.execute(Method::POST, &path, Some(body)).await?;
        Ok(())
    }

    // ===== POSTS =====

    /// Fetch a page of posts, optionally filtered by author
    pub async fn list_posts(
        &self,
        page: u32,
        limit: u32,
        author: Option<&str>,
    ) -> Result<Vec<Post>, ApiError> {
        let mut path = format!("/api/v1/posts?page={page}&limit={limit}");
        if let Some(author) = author {
            path.push_str(&format!("&author={}", urlencoding::encode(author)));
        }
        self.fetch(Method::GET, &path, None).await
    }

    /// Fetch a single post by id
    pub async fn get_post(&self, post_id: &str) -> Result<Post, ApiError> {
        let path = format!("/api/v1/posts/{post_id}");
        self.fetch(Method::GET, &path, None).await
    }

    /// Create a new post
    pub async fn create_post(&self, new_post: &NewPost) -> Result<Post, ApiError> {
        let body = serde_json::to_value(new_post)?;
        self.fetch(Method::POST, "/api/v1/posts", Some(body)).await
    }

    /// Edit a post's content
    pub async fn edit_post(&self, post_id: &str, edit: &EditPost) -> Result<Post, ApiError> {
        let path = format!("/api/v1/posts/{post_id}");
        let body = serde_json::to_value(edit)?;
        self.fetch(Method::PATCH, &path, Some(body)).await
    }

    /// Soft-delete a post
    pub async fn soft_delete_post(&self, post_id: &str) -> Result<(), ApiError> {
        let path = format!("/api/v1/posts/{post_id}/soft-delete");
        self.execute(Method::DELETE, &path, None).await?;
        Ok(())
    }

    /// Like a post
    pub async fn like_post(&self, post_id: &str) -> Result<(), ApiError> {
        let path = format!("/api/v1/posts/{post_id}/like");
        self.execute(Method::POST, &path, None).await?;
        Ok(())
    }

    /// Remove a like from a post
    pub async fn unlike_post(&self, post_id: &str) -> Result<(), ApiError> {
        let path = format!("/api/v1/posts/{post_id}/unLike");
        self.execute(Method::POST, &path, None).await?;
        Ok(())
    }

    // ===== COMMENTS =====

    /// Fetch a page of comments for a post. With `parent_id` this
    /// returns the replies of one top-level comment; without it, the
    /// top-level comments themselves.
    pub async fn list_comments(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Comment>, ApiError> {
        let mut path = format!(
            "/api/v1/comment?postId={}&page={page}&limit={limit}",
            urlencoding::encode(post_id)
        );
        if let Some(parent_id) = parent_id {
            path.push_str(&format!("&parentId={}", urlencoding::encode(parent_id)));
        }
        self.fetch(Method::GET, &path, None).await
    }

    /// Create a comment or a reply
    pub async fn create_comment(&self, new_comment: &NewComment) -> Result<Comment, ApiError> {
        let body = serde_json::to_value(new_comment)?;
        self.fetch(Method::POST, "/api/v1/comment", Some(body)).await
    }

    /// Edit a comment's content
    pub async fn edit_comment(
        &self,
        comment_id: &str,
        edit: &EditComment,
    ) -> Result<Comment, ApiError> {
        let path = format!("/api/v1/comment/{comment_id}");
        let body = serde_json::to_value(edit)?;
        self.fetch(Method::PATCH, &path, Some(body)).await
    }

    /// Delete a comment from its post
    pub async fn delete_comment(&self, request: &DeleteComment) -> Result<(), ApiError> {
        let body = serde_json::to_value(request)?;
        self.execute(Method::DELETE, "/api/v1/comment", Some(body))
            .await?;
        Ok(())
    }

    /// Like a comment
    pub async fn like_comment(&self, comment_id: &str) -> Result<(), ApiError> {
        let path = format!("/api/v1/comment/{comment_id}/like");
        self.execute(Method::POST, &path, None).await?;
        Ok(())
    }

    /// Remove a like from a comment
    pub async fn unlike_comment(&self, comment_id: &str) -> Result<(), ApiError> {
        let path = format!("/api/v1/comment/{comment_id}/unLike");
        self.execute(Method::POST, &path, None).await?;
        Ok(())
    }

    // ===== USERS =====

    /// Fetch the authenticated user
    pub async fn me(&self) -> Result<User, ApiError> {
        self.fetch(Method::GET, "/api/v1/users/me", None).await
    }

    /// Fetch a user by id
    pub async fn get_user(&self, user_id: &str) -> Result<User, ApiError> {
        let path = format!("/api/v1/users/{user_id}");
        self.fetch(Method::GET, &path, None).await
    }

    /// Fetch a user by username
    pub async fn get_user_by_username(&self, username: &str) -> Result<User, ApiError> {
        let path = format!("/api/v1/users/username/{}", urlencoding::encode(username));
        self.fetch(Method::GET, &path, None).await
    }

    /// Update the authenticated user's profile
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: &UpdateProfile,
    ) -> Result<User, ApiError> {
        let path = format!("/api/v1/users/{user_id}");
        let body = serde_json::to_value(update)?;
        self.fetch(Method::PATCH, &path, Some(body)).await
    }

    /// Follow a user
    pub async fn follow(&self, user_id: &str) -> Result<(), ApiError> {
        let path = format!("/api/v1/users/follow/{user_id}");
        self.execute(Method::POST, &path, None).await?;
        Ok(())
    }

    /// Unfollow a user
    pub async fn unfollow(&self, user_id: &str) -> Result<(), ApiError> {
        let path = format!("/api/v1/users/unFollow/{user_id}");
        self.execute(Method::POST, &path, None).await?;
        Ok(())
    }

    /// Fetch the users reachable for direct messaging
    pub async fn connections(&self) -> Result<Vec<User>, ApiError> {
        self.fetch(Method::GET, "/api/v1/users/connection/user", None)
            .await
    }

    /// Search users by text, paginated
    pub async fn search_users(
        &self,
        query: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<User>, ApiError> {
        let path = format!(
            "/api/v1/users/search?q={}&page={page}&limit={limit}",
            urlencoding::encode(query)
        );
        self.fetch(Method::GET, &path, None).await
    }

    // ===== NOTIFICATIONS =====

    /// Fetch a page of notifications
    pub async fn list_notifications(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Notification>, ApiError> {
        let path = format!("/api/v1/notifications?page={page}&limit={limit}");
        self.fetch(Method::GET, &path, None).await
    }

    // ===== MESSAGES =====

    /// Fetch a page of conversation history with a connection
    pub async fn conversation(
        &self,
        connection_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<DirectMessage>, ApiError> {
        let path = format!(
            "/api/v1/message/conversation?connectionId={}&page={page}&limit={limit}",
            urlencoding::encode(connection_id)
        );
        self.fetch(Method::GET, &path, None).await
    }

    // ===== UPLOAD =====

    /// Upload files and get back their public URLs
    pub async fn upload_multiple(&self, files: Vec<UploadFile>) -> Result<Vec<String>, ApiError> {
        let path = "/api/v1/upload/multiple";
        let url = format!("{}{}", self.base_url, path);

        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.content_type)?;
            form = form.part("files", part);
        }

        log_api_call!("POST", path);

        let mut builder = self.http.post(&url).multipart(form);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        log_api_call!("POST", path, status.as_u16());

        if !status.is_success() {
            return Err(ApiError::from_status(status, extract_message(&text)));
        }

        Ok(serde_json::from_str(&text)?)
    }

    // ===== INTERNAL =====

    /// Send a request and decode a typed response
    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let text = self.execute(method, path, body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Send a request, map status codes, return the raw body
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        log_api_call!(method.as_str(), path);

        let mut builder = self.http.request(method.clone(), &url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        log_api_call!(method.as_str(), path, status.as_u16());

        if !status.is_success() {
            return Err(ApiError::from_status(status, extract_message(&text)));
        }

        Ok(text)
    }
}

/// Pull the backend's `message` field from an error body, falling back
/// to the raw body when it is not the usual JSON shape
fn extract_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Normalize a base URL: no trailing slash, scheme defaulted to https
fn normalize_base(url: &str) -> String {
    let url = url.trim();
    let url = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };

    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(normalize_base("api.example.com/"), "https://api.example.com");
        assert_eq!(
            normalize_base("http://localhost:4000"),
            "http://localhost:4000"
        );
        assert_eq!(
            normalize_base("  https://api.example.com// "),
            "https://api.example.com"
        );
    }

    #[test]
    fn error_message_extraction_prefers_backend_field() {
        assert_eq!(
            extract_message(r#"{"message":"Wrong password","statusCode":403}"#),
            "Wrong password"
        );
        assert_eq!(extract_message("gateway timeout\n"), "gateway timeout");
    }

    #[test]
    fn token_is_explicit_state() {
        let anon = ApiClient::new("https://api.example.com");
        assert!(anon.token().is_none());

        let authed = ApiClient::with_token("https://api.example.com", "t0ken");
        assert_eq!(authed.token(), Some("t0ken"));
    }
}
