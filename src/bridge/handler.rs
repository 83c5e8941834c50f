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

//! Bridge message handler

use base64::Engine;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tracing::{error, info, warn};

use crate::api::{ApiClient, ApiError, RegisterRequest, UploadFile};
use crate::auth::{
    self, guard_route, token_status, RouteClass, ValidationError,
};
use crate::channel::{ChannelEvent, ChannelHandle, Inbox};
use crate::feed::{
    BackendSource, CommentThread, FeedEntry, FeedKind, FeedLoader, FetchOutcome, RollbackPolicy,
    Sentinel, ToggleBook, ToggleState,
};
use crate::log_bridge;
use crate::models::{
    error_codes, events, methods, BridgeError, BridgeMessage, Comment, DeleteComment,
    EditComment, EditPost, MessageType, NewComment, NewPost, OutgoingMessage, UpdateProfile, User,
};
use crate::store::SessionStore;

/// Authenticated session: one client bound to one token, plus the
/// viewing user it belongs to.
struct SessionCtx {
    client: Arc<ApiClient>,
    user: User,
}

/// What an optimistic toggle acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToggleTarget {
    PostLike,
    CommentLike,
    Follow,
}

impl ToggleTarget {
    fn id_field(&self) -> &'static str {
        match self {
            ToggleTarget::PostLike => "post_id",
            ToggleTarget::CommentLike => "comment_id",
            ToggleTarget::Follow => "user_id",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ToggleTarget::PostLike => "post_like",
            ToggleTarget::CommentLike => "comment_like",
            ToggleTarget::Follow => "follow",
        }
    }
}

/// An open feed instance: the loader plus its viewport sentinel
struct OpenFeed {
    loader: FeedLoader<FeedEntry, BackendSource>,
    sentinel: Sentinel,
}

/// State shared with spawned settlement and event-forwarding tasks
struct Shared {
    store: Arc<SessionStore>,
    session: RwLock<Option<SessionCtx>>,
    feeds: RwLock<HashMap<String, Arc<Mutex<OpenFeed>>>>,
    threads: Mutex<HashMap<String, CommentThread>>,
    toggles: Mutex<ToggleBook>,
    inbox: Mutex<Inbox>,
    channel: RwLock<Option<ChannelHandle>>,
    events: RwLock<Option<mpsc::Sender<BridgeMessage>>>,
}

impl Shared {
    /// Push an event to the connected UI shell, if any.
    async fn emit(&self, event: BridgeMessage) {
        if let Some(method) = event.method.as_deref() {
            log_bridge!(event, method);
        }
        if let Some(tx) = self.events.read().await.as_ref() {
            let _ = tx.send(event).await;
        }
    }

    /// Tear down the session after the backend rejected its token.
    ///
    /// Every 401, regardless of which call produced it, funnels here:
    /// drop the in-memory session, wipe the persisted one, forget all
    /// open feeds and toggle state, close the channel, and tell the
    /// shell to route to login.
    async fn force_logout(&self) {
        warn!("Session rejected by backend, forcing logout");

        *self.session.write().await = None;
        if let Err(e) = self.store.clear_session().await {
            error!("Failed to clear persisted session: {}", e);
        }
        self.teardown_session_state().await;

        self.emit(BridgeMessage::event(
            events::SESSION_EXPIRED,
            serde_json::json!({ "reason": "unauthorized" }),
        ))
        .await;
    }

    /// Drop all per-session state: open feeds, threads, toggles,
    /// the message inbox, and the live channel.
    async fn teardown_session_state(&self) {
        self.feeds.write().await.clear();
        self.threads.lock().await.clear();
        self.toggles.lock().await.clear();
        self.inbox.lock().await.clear();
        if let Some(channel) = self.channel.write().await.take() {
            channel.disconnect();
        }
    }

    async fn client(&self) -> Option<Arc<ApiClient>> {
        self.session.read().await.as_ref().map(|s| s.client.clone())
    }
}

/// Handles incoming bridge messages and routes them to the backend
pub struct MessageHandler {
    base_url: String,
    channel_addr: String,
    shutdown_tx: broadcast::Sender<()>,
    shared: Arc<Shared>,
}

impl MessageHandler {
    /// Create a new message handler
    pub fn new(
        base_url: &str,
        channel_addr: &str,
        store: Arc<SessionStore>,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            base_url: base_url.to_string(),
            channel_addr: channel_addr.to_string(),
            shutdown_tx,
            shared: Arc::new(Shared {
                store,
                session: RwLock::new(None),
                feeds: RwLock::new(HashMap::new()),
                threads: Mutex::new(HashMap::new()),
                toggles: Mutex::new(ToggleBook::new(RollbackPolicy::Rollback)),
                inbox: Mutex::new(Inbox::new()),
                channel: RwLock::new(None),
                events: RwLock::new(None),
            }),
        }
    }

    /// Register the outbound queue events are pushed to.
    pub async fn set_event_sink(&self, tx: mpsc::Sender<BridgeMessage>) {
        *self.shared.events.write().await = Some(tx);
    }

    /// Handle an incoming bridge message
    pub async fn handle_message(&self, msg: BridgeMessage) -> BridgeMessage {
        if msg.message_type != MessageType::Request {
            return BridgeMessage::response_err(
                &msg.id,
                BridgeError::new(error_codes::INVALID_REQUEST, "Expected a request message"),
            );
        }

        let method = msg.method.as_deref().unwrap_or("unknown").to_string();
        log_bridge!(request, &method, &msg.id);

        let result = match method.as_str() {
            // System methods
            methods::PING => self.handle_ping(&msg).await,
            methods::SHUTDOWN => self.handle_shutdown(&msg).await,

            // Authentication methods
            methods::AUTH_LOGIN => self.handle_auth_login(&msg).await,
            methods::AUTH_REGISTER => self.handle_auth_register(&msg).await,
            methods::AUTH_FORGOT_PASSWORD => self.handle_auth_forgot_password(&msg).await,
            methods::AUTH_RESET_PASSWORD => self.handle_auth_reset_password(&msg).await,
            methods::AUTH_RESTORE => self.handle_auth_restore(&msg).await,
            methods::AUTH_LOGOUT => self.handle_auth_logout(&msg).await,

            // Feed methods
            methods::FEED_OPEN => self.handle_feed_open(&msg).await,
            methods::FEED_NEXT => self.handle_feed_next(&msg).await,
            methods::FEED_VISIBILITY => self.handle_feed_visibility(&msg).await,
            methods::FEED_CLOSE => self.handle_feed_close(&msg).await,

            // Post methods
            methods::POST_GET => self.handle_post_get(&msg).await,
            methods::POST_CREATE => self.handle_post_create(&msg).await,
            methods::POST_EDIT => self.handle_post_edit(&msg).await,
            methods::POST_DELETE => self.handle_post_delete(&msg).await,
            methods::POST_LIKE | methods::POST_UNLIKE => {
                self.handle_toggle(&msg, ToggleTarget::PostLike).await
            }

            // Comment methods
            methods::COMMENT_CREATE => self.handle_comment_create(&msg).await,
            methods::COMMENT_EDIT => self.handle_comment_edit(&msg).await,
            methods::COMMENT_DELETE => self.handle_comment_delete(&msg).await,
            methods::COMMENT_LIKE | methods::COMMENT_UNLIKE => {
                self.handle_toggle(&msg, ToggleTarget::CommentLike).await
            }
            methods::COMMENT_EXPAND => self.handle_comment_expand(&msg).await,
            methods::COMMENT_COLLAPSE => self.handle_comment_collapse(&msg).await,

            // User methods
            methods::USER_ME => self.handle_user_me(&msg).await,
            methods::USER_GET => self.handle_user_get(&msg).await,
            methods::USER_UPDATE => self.handle_user_update(&msg).await,
            methods::USER_FOLLOW | methods::USER_UNFOLLOW => {
                self.handle_toggle(&msg, ToggleTarget::Follow).await
            }
            methods::USER_CONNECTIONS => self.handle_user_connections(&msg).await,

            // Media methods
            methods::MEDIA_UPLOAD => self.handle_media_upload(&msg).await,

            // Channel methods
            methods::CHANNEL_CONNECT => self.handle_channel_connect(&msg).await,
            methods::CHANNEL_SEND => self.handle_channel_send(&msg).await,
            methods::CHANNEL_DISCONNECT => self.handle_channel_disconnect(&msg).await,

            // Local settings
            methods::SETTINGS_GET => self.handle_settings_get(&msg).await,
            methods::SETTINGS_SET => self.handle_settings_set(&msg).await,
            methods::SETTINGS_ALL => self.handle_settings_all(&msg).await,

            // Routing
            methods::ROUTE_CHECK => self.handle_route_check(&msg).await,

            // Unknown method
            _ => {
                warn!("Unknown method: {}", method);
                BridgeMessage::response_err(
                    &msg.id,
                    BridgeError::new(
                        error_codes::METHOD_NOT_FOUND,
                        format!("Unknown method: {method}"),
                    ),
                )
            }
        };

        let success = result.error.is_none();
        log_bridge!(response, &method, &msg.id, success);

        result
    }

    // ===== SYSTEM =====

    async fn handle_ping(&self, msg: &BridgeMessage) -> BridgeMessage {
        BridgeMessage::response_ok(
            &msg.id,
            serde_json::json!({
                "pong": true,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }),
        )
    }

    async fn handle_shutdown(&self, msg: &BridgeMessage) -> BridgeMessage {
        info!("Shutdown requested via bridge");
        let _ = self.shutdown_tx.send(());
        BridgeMessage::response_ok(&msg.id, serde_json::json!({ "status": "shutting_down" }))
    }

    // ===== AUTH =====

    async fn handle_auth_login(&self, msg: &BridgeMessage) -> BridgeMessage {
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let identifier = match require_str(msg, params, "identifier") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let password = match require_str(msg, params, "password") {
            Ok(v) => v,
            Err(e) => return e,
        };

        let anon = ApiClient::new(&self.base_url);
        let login = match anon.login(identifier, password).await {
            Ok(r) => r,
            Err(e) => return self.fail(&msg.id, e).await,
        };

        let token = login.token.access_token;
        let client = Arc::new(ApiClient::with_token(&self.base_url, &token));
        let user = match client.me().await {
            Ok(u) => u,
            Err(e) => return self.fail(&msg.id, e).await,
        };

        if let Err(e) = self
            .shared
            .store
            .save_session(&token, &user.id, &user.username)
            .await
        {
            error!("Failed to persist session: {}", e);
        }

        info!("User {} logged in", user.username);
        let result = serde_json::json!({ "user": user, "token": token });
        *self.shared.session.write().await = Some(SessionCtx { client, user });

        BridgeMessage::response_ok(&msg.id, result)
    }

    async fn handle_auth_register(&self, msg: &BridgeMessage) -> BridgeMessage {
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let request: RegisterRequest = match serde_json::from_value(params.clone()) {
            Ok(r) => r,
            Err(e) => return invalid_params(&msg.id, e),
        };

        if let Some(confirm) = params.get("confirm_password").and_then(|v| v.as_str()) {
            if let Err(e) = auth::validate_password_pair(&request.password, confirm) {
                return validation_err(&msg.id, e);
            }
        }

        match ApiClient::new(&self.base_url).register(&request).await {
            Ok(()) => {
                info!("Account registered: {}", request.username);
                BridgeMessage::response_ok(&msg.id, serde_json::json!({ "success": true }))
            }
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    async fn handle_auth_forgot_password(&self, msg: &BridgeMessage) -> BridgeMessage {
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let email = match require_str(msg, params, "email") {
            Ok(v) => v,
            Err(e) => return e,
        };

        match ApiClient::new(&self.base_url).forgot_password(email).await {
            Ok(()) => BridgeMessage::response_ok(&msg.id, serde_json::json!({ "success": true })),
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    async fn handle_auth_reset_password(&self, msg: &BridgeMessage) -> BridgeMessage {
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let reset_token = match require_str(msg, params, "reset_token") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let password = match require_str(msg, params, "password") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let confirm = match require_str(msg, params, "confirm_password") {
            Ok(v) => v,
            Err(e) => return e,
        };

        if let Err(e) = auth::validate_password_pair(password, confirm) {
            return validation_err(&msg.id, e);
        }

        match ApiClient::new(&self.base_url)
            .reset_password(reset_token, password)
            .await
        {
            Ok(()) => BridgeMessage::response_ok(&msg.id, serde_json::json!({ "success": true })),
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    /// Restore a persisted session on startup. A missing, expired, or
    /// rejected token restores nothing and leaves the store clean.
    async fn handle_auth_restore(&self, msg: &BridgeMessage) -> BridgeMessage {
        let stored = match self.shared.store.load_session().await {
            Ok(Some(s)) => s,
            Ok(None) => {
                return BridgeMessage::response_ok(
                    &msg.id,
                    serde_json::json!({ "restored": false }),
                );
            }
            Err(e) => {
                error!("Failed to load persisted session: {}", e);
                return BridgeMessage::response_err(
                    &msg.id,
                    BridgeError::new(error_codes::INTERNAL_ERROR, e.to_string()),
                );
            }
        };

        if !token_status(&stored.token).is_authenticated() {
            let _ = self.shared.store.clear_session().await;
            return BridgeMessage::response_ok(&msg.id, serde_json::json!({ "restored": false }));
        }

        let client = Arc::new(ApiClient::with_token(&self.base_url, &stored.token));
        match client.me().await {
            Ok(user) => {
                info!("Session restored for {}", user.username);
                let result = serde_json::json!({ "restored": true, "user": user });
                *self.shared.session.write().await = Some(SessionCtx { client, user });
                BridgeMessage::response_ok(&msg.id, result)
            }
            Err(e) if e.is_unauthorized() => {
                let _ = self.shared.store.clear_session().await;
                BridgeMessage::response_ok(&msg.id, serde_json::json!({ "restored": false }))
            }
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    async fn handle_auth_logout(&self, msg: &BridgeMessage) -> BridgeMessage {
        *self.shared.session.write().await = None;
        if let Err(e) = self.shared.store.clear_session().await {
            error!("Failed to clear persisted session: {}", e);
        }
        self.shared.teardown_session_state().await;

        info!("User logged out");
        BridgeMessage::response_ok(&msg.id, serde_json::json!({ "success": true }))
    }

    // ===== FEEDS =====

    async fn handle_feed_open(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let kind: FeedKind = match serde_json::from_value(params.clone()) {
            Ok(k) => k,
            Err(e) => return invalid_params(&msg.id, e),
        };

        let limit = params
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or_else(|| kind.default_limit());

        let feed_id = uuid::Uuid::new_v4().to_string();
        let feed = OpenFeed {
            loader: FeedLoader::new(BackendSource::new(client, kind.clone()), limit),
            sentinel: Sentinel::new(),
        };
        self.shared
            .feeds
            .write()
            .await
            .insert(feed_id.clone(), Arc::new(Mutex::new(feed)));

        info!("Feed opened: {} ({})", feed_id, kind.name());
        BridgeMessage::response_ok(
            &msg.id,
            serde_json::json!({ "feed_id": feed_id, "limit": limit }),
        )
    }

    async fn handle_feed_next(&self, msg: &BridgeMessage) -> BridgeMessage {
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let feed_id = match require_str(msg, params, "feed_id") {
            Ok(v) => v,
            Err(e) => return e,
        };

        let feed = match self.lookup_feed(&msg.id, feed_id).await {
            Ok(f) => f,
            Err(e) => return e,
        };

        let mut feed = feed.lock().await;
        self.advance_feed(&msg.id, &mut feed).await
    }

    /// Sentinel-gated visibility report. Advances the feed only when
    /// the sentinel fires; otherwise answers without touching it.
    async fn handle_feed_visibility(&self, msg: &BridgeMessage) -> BridgeMessage {
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let feed_id = match require_str(msg, params, "feed_id") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let visibility = match params.get("visibility").and_then(|v| v.as_f64()) {
            Some(v) => v,
            None => {
                return BridgeMessage::response_err(
                    &msg.id,
                    BridgeError::new(error_codes::INVALID_PARAMS, "Missing visibility"),
                );
            }
        };

        let feed = match self.lookup_feed(&msg.id, feed_id).await {
            Ok(f) => f,
            Err(e) => return e,
        };

        let mut feed = feed.lock().await;
        if !feed.sentinel.should_fire(visibility, &feed.loader.state()) {
            return BridgeMessage::response_ok(&msg.id, serde_json::json!({ "fired": false }));
        }

        self.advance_feed(&msg.id, &mut feed).await
    }

    async fn handle_feed_close(&self, msg: &BridgeMessage) -> BridgeMessage {
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let feed_id = match require_str(msg, params, "feed_id") {
            Ok(v) => v,
            Err(e) => return e,
        };

        let removed = self.shared.feeds.write().await.remove(feed_id);
        let closed = match removed {
            Some(feed) => {
                // A visibility report already holding the instance must
                // not fire after teardown.
                feed.lock().await.sentinel.detach();
                true
            }
            None => false,
        };

        BridgeMessage::response_ok(&msg.id, serde_json::json!({ "closed": closed }))
    }

    async fn lookup_feed(
        &self,
        msg_id: &str,
        feed_id: &str,
    ) -> Result<Arc<Mutex<OpenFeed>>, BridgeMessage> {
        self.shared
            .feeds
            .read()
            .await
            .get(feed_id)
            .cloned()
            .ok_or_else(|| {
                BridgeMessage::response_err(
                    msg_id,
                    BridgeError::new(
                        error_codes::FEED_NOT_FOUND,
                        format!("No open feed with id {feed_id}"),
                    ),
                )
            })
    }

    /// Fetch the next page of an open feed and shape the response.
    /// Conversation pages also merge into the message inbox so later
    /// live frames with the same ids are not re-announced.
    async fn advance_feed(&self, msg_id: &str, feed: &mut OpenFeed) -> BridgeMessage {
        let before = feed.loader.items().len();
        let outcome = feed.loader.fetch_next_page().await;
        let state = feed.loader.state();

        match outcome {
            FetchOutcome::Appended { added } => {
                let items = &feed.loader.items()[before..];

                let history: Vec<_> = items
                    .iter()
                    .filter_map(|entry| match entry {
                        FeedEntry::Message(m) => Some(m.clone()),
                        _ => None,
                    })
                    .collect();
                if !history.is_empty() {
                    self.shared.inbox.lock().await.merge_history(history);
                }

                BridgeMessage::response_ok(
                    msg_id,
                    serde_json::json!({
                        "outcome": "appended",
                        "added": added,
                        "items": items,
                        "has_more": state.has_more,
                        "initial_load_done": state.initial_load_done,
                        "len": state.len,
                    }),
                )
            }
            FetchOutcome::Busy => BridgeMessage::response_ok(
                msg_id,
                serde_json::json!({ "outcome": "busy", "len": state.len }),
            ),
            FetchOutcome::Exhausted => BridgeMessage::response_ok(
                msg_id,
                serde_json::json!({
                    "outcome": "exhausted",
                    "has_more": false,
                    "len": state.len,
                }),
            ),
            FetchOutcome::Failed { unauthorized } => {
                if unauthorized {
                    self.shared.force_logout().await;
                    return BridgeMessage::response_err(
                        msg_id,
                        BridgeError::new(error_codes::NOT_AUTHENTICATED, "Session expired"),
                    );
                }
                BridgeMessage::response_err(
                    msg_id,
                    BridgeError::new(error_codes::API_ERROR, "Feed page fetch failed"),
                )
            }
        }
    }

    // ===== POSTS =====

    async fn handle_post_get(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let post_id = match require_str(msg, params, "post_id") {
            Ok(v) => v,
            Err(e) => return e,
        };

        match client.get_post(post_id).await {
            Ok(post) => BridgeMessage::response_ok(&msg.id, serde_json::json!(post)),
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    async fn handle_post_create(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let new_post: NewPost = match serde_json::from_value(params.clone()) {
            Ok(p) => p,
            Err(e) => return invalid_params(&msg.id, e),
        };

        if let Err(e) = auth::validate_post_content(&new_post.content, new_post.images.len()) {
            return validation_err(&msg.id, e);
        }

        match client.create_post(&new_post).await {
            Ok(post) => BridgeMessage::response_ok(&msg.id, serde_json::json!(post)),
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    async fn handle_post_edit(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let post_id = match require_str(msg, params, "post_id") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let content = match require_str(msg, params, "content") {
            Ok(v) => v,
            Err(e) => return e,
        };

        if let Err(e) = auth::validate_post_content(content, 0) {
            return validation_err(&msg.id, e);
        }

        let edit = EditPost {
            content: content.to_string(),
        };
        match client.edit_post(post_id, &edit).await {
            Ok(post) => BridgeMessage::response_ok(&msg.id, serde_json::json!(post)),
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    async fn handle_post_delete(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let post_id = match require_str(msg, params, "post_id") {
            Ok(v) => v,
            Err(e) => return e,
        };

        match client.soft_delete_post(post_id).await {
            Ok(()) => BridgeMessage::response_ok(&msg.id, serde_json::json!({ "success": true })),
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    // ===== COMMENTS =====

    async fn handle_comment_create(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let new_comment: NewComment = match serde_json::from_value(params.clone()) {
            Ok(c) => c,
            Err(e) => return invalid_params(&msg.id, e),
        };

        if let Err(e) = auth::validate_comment_content(&new_comment.content) {
            return validation_err(&msg.id, e);
        }

        match client.create_comment(&new_comment).await {
            Ok(comment) => {
                // A new reply lands in its thread's cache so the next
                // expand shows it without a refetch.
                if comment.parent_id.is_some() {
                    if let Some(thread) =
                        self.shared.threads.lock().await.get_mut(&comment.post_id)
                    {
                        thread.push_reply(comment.clone());
                    }
                }
                BridgeMessage::response_ok(&msg.id, serde_json::json!(comment))
            }
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    /// Expand the reply thread under a top-level comment, loading the
    /// replies on first use.
    async fn handle_comment_expand(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let parent: Comment = match params.get("parent").cloned().map(serde_json::from_value) {
            Some(Ok(c)) => c,
            Some(Err(e)) => return invalid_params(&msg.id, e),
            None => {
                return BridgeMessage::response_err(
                    &msg.id,
                    BridgeError::new(error_codes::INVALID_PARAMS, "Missing parent"),
                );
            }
        };

        let mut threads = self.shared.threads.lock().await;
        let thread = threads
            .entry(parent.post_id.clone())
            .or_insert_with(|| CommentThread::new(parent.post_id.clone()));

        match thread.expand(&parent, client.as_ref()).await {
            Ok(replies) => BridgeMessage::response_ok(
                &msg.id,
                serde_json::json!({ "expanded": true, "replies": replies }),
            ),
            Err(e) => {
                drop(threads);
                self.fail(&msg.id, e).await
            }
        }
    }

    async fn handle_comment_collapse(&self, msg: &BridgeMessage) -> BridgeMessage {
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let post_id = match require_str(msg, params, "post_id") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let parent_id = match require_str(msg, params, "parent_id") {
            Ok(v) => v,
            Err(e) => return e,
        };

        if let Some(thread) = self.shared.threads.lock().await.get_mut(post_id) {
            thread.collapse(parent_id);
        }

        BridgeMessage::response_ok(&msg.id, serde_json::json!({ "expanded": false }))
    }

    async fn handle_comment_edit(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let comment_id = match require_str(msg, params, "comment_id") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let content = match require_str(msg, params, "content") {
            Ok(v) => v,
            Err(e) => return e,
        };

        if let Err(e) = auth::validate_comment_content(content) {
            return validation_err(&msg.id, e);
        }

        let edit = EditComment {
            content: content.to_string(),
        };
        match client.edit_comment(comment_id, &edit).await {
            Ok(comment) => BridgeMessage::response_ok(&msg.id, serde_json::json!(comment)),
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    async fn handle_comment_delete(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let request: DeleteComment = match serde_json::from_value(params.clone()) {
            Ok(r) => r,
            Err(e) => return invalid_params(&msg.id, e),
        };

        match client.delete_comment(&request).await {
            Ok(()) => {
                // Deleted replies also leave their thread's cache.
                if let Some(parent_id) = params.get("parent_id").and_then(|v| v.as_str()) {
                    if let Some(thread) =
                        self.shared.threads.lock().await.get_mut(&request.post_id)
                    {
                        thread.remove_reply(parent_id, &request.comment_id);
                    }
                }
                BridgeMessage::response_ok(&msg.id, serde_json::json!({ "success": true }))
            }
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    // ===== OPTIMISTIC TOGGLES =====

    /// Flip a like or follow locally, answer immediately, and settle in
    /// the background. The settlement (and any rollback) arrives as a
    /// `toggle_settled` event keyed by the target and id.
    async fn handle_toggle(&self, msg: &BridgeMessage, target: ToggleTarget) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let entity_id = match require_str(msg, params, target.id_field()) {
            Ok(v) => v.to_string(),
            Err(e) => return e,
        };

        let seed_engaged = params
            .get("engaged")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let seed_count = params.get("count").and_then(|v| v.as_u64()).unwrap_or(0);

        let key = format!("{}:{}", target.name(), entity_id);
        let begun = self
            .shared
            .toggles
            .lock()
            .await
            .begin(&key, ToggleState::new(seed_engaged, seed_count));

        let (op, preview) = match begun {
            Some(pair) => pair,
            // A previous toggle on this item is still unsettled.
            None => {
                return BridgeMessage::response_ok(
                    &msg.id,
                    serde_json::json!({ "accepted": false }),
                );
            }
        };

        let shared = self.shared.clone();
        tokio::spawn(async move {
            let result = match (target, op.now_engaged) {
                (ToggleTarget::PostLike, true) => client.like_post(&entity_id).await,
                (ToggleTarget::PostLike, false) => client.unlike_post(&entity_id).await,
                (ToggleTarget::CommentLike, true) => client.like_comment(&entity_id).await,
                (ToggleTarget::CommentLike, false) => client.unlike_comment(&entity_id).await,
                (ToggleTarget::Follow, true) => client.follow(&entity_id).await,
                (ToggleTarget::Follow, false) => client.unfollow(&entity_id).await,
            };

            let succeeded = result.is_ok();
            let unauthorized = matches!(&result, Err(e) if e.is_unauthorized());
            if let Err(e) = &result {
                warn!("Toggle {} on {} failed: {}", target.name(), entity_id, e);
                if !unauthorized {
                    shared
                        .emit(BridgeMessage::event(
                            events::ERROR,
                            serde_json::json!({
                                "code": error_codes::API_ERROR,
                                "message": e.to_string(),
                            }),
                        ))
                        .await;
                }
            }

            let settled = shared.toggles.lock().await.settle(&key, op, succeeded);
            if let Some(state) = settled {
                shared
                    .emit(BridgeMessage::event(
                        events::TOGGLE_SETTLED,
                        serde_json::json!({
                            "target": target.name(),
                            "id": entity_id,
                            "succeeded": succeeded,
                            "engaged": state.engaged,
                            "count": state.count,
                        }),
                    ))
                    .await;
            }

            if unauthorized {
                shared.force_logout().await;
            }
        });

        BridgeMessage::response_ok(
            &msg.id,
            serde_json::json!({
                "accepted": true,
                "engaged": preview.engaged,
                "count": preview.count,
            }),
        )
    }

    // ===== USERS =====

    async fn handle_user_me(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };

        match client.me().await {
            Ok(user) => {
                let result = serde_json::json!(user);
                if let Some(ctx) = self.shared.session.write().await.as_mut() {
                    ctx.user = user;
                }
                BridgeMessage::response_ok(&msg.id, result)
            }
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    async fn handle_user_get(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let result = if let Some(user_id) = params.get("user_id").and_then(|v| v.as_str()) {
            client.get_user(user_id).await
        } else if let Some(username) = params.get("username").and_then(|v| v.as_str()) {
            client.get_user_by_username(username).await
        } else {
            return BridgeMessage::response_err(
                &msg.id,
                BridgeError::new(
                    error_codes::INVALID_PARAMS,
                    "Missing user_id or username",
                ),
            );
        };

        match result {
            Ok(user) => BridgeMessage::response_ok(&msg.id, serde_json::json!(user)),
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    async fn handle_user_update(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let update: UpdateProfile = match serde_json::from_value(params.clone()) {
            Ok(u) => u,
            Err(e) => return invalid_params(&msg.id, e),
        };

        let user_id = match self.shared.session.read().await.as_ref() {
            Some(ctx) => ctx.user.id.clone(),
            None => {
                return BridgeMessage::response_err(
                    &msg.id,
                    BridgeError::new(error_codes::NOT_AUTHENTICATED, "Not authenticated"),
                );
            }
        };

        match client.update_profile(&user_id, &update).await {
            Ok(user) => {
                let result = serde_json::json!(user);
                if let Some(ctx) = self.shared.session.write().await.as_mut() {
                    ctx.user = user;
                }
                BridgeMessage::response_ok(&msg.id, result)
            }
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    async fn handle_user_connections(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };

        match client.connections().await {
            Ok(users) => BridgeMessage::response_ok(&msg.id, serde_json::json!(users)),
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    // ===== MEDIA =====

    async fn handle_media_upload(&self, msg: &BridgeMessage) -> BridgeMessage {
        let client = match self.require_session(&msg.id).await {
            Ok(c) => c,
            Err(e) => return e,
        };
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };

        #[derive(Deserialize)]
        struct UploadParam {
            file_name: String,
            content_type: String,
            /// Base64-encoded file contents
            data: String,
        }

        let uploads: Vec<UploadParam> =
            match params.get("files").cloned().map(serde_json::from_value) {
                Some(Ok(u)) => u,
                Some(Err(e)) => return invalid_params(&msg.id, e),
                None => {
                    return BridgeMessage::response_err(
                        &msg.id,
                        BridgeError::new(error_codes::INVALID_PARAMS, "Missing files"),
                    );
                }
            };

        let mut files = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let bytes = match base64::engine::general_purpose::STANDARD.decode(&upload.data) {
                Ok(b) => b,
                Err(e) => {
                    return BridgeMessage::response_err(
                        &msg.id,
                        BridgeError::new(
                            error_codes::INVALID_PARAMS,
                            format!("Undecodable file data for {}: {e}", upload.file_name),
                        ),
                    );
                }
            };
            files.push(UploadFile {
                file_name: upload.file_name,
                content_type: upload.content_type,
                bytes,
            });
        }

        match client.upload_multiple(files).await {
            Ok(urls) => BridgeMessage::response_ok(&msg.id, serde_json::json!({ "urls": urls })),
            Err(e) => self.fail(&msg.id, e).await,
        }
    }

    // ===== CHANNEL =====

    async fn handle_channel_connect(&self, msg: &BridgeMessage) -> BridgeMessage {
        let token = match self.shared.session.read().await.as_ref() {
            Some(ctx) => ctx.client.token().unwrap_or_default().to_string(),
            None => {
                return BridgeMessage::response_err(
                    &msg.id,
                    BridgeError::new(error_codes::NOT_AUTHENTICATED, "Not authenticated"),
                );
            }
        };

        if self.shared.channel.read().await.is_some() {
            return BridgeMessage::response_ok(
                &msg.id,
                serde_json::json!({ "connected": true, "already": true }),
            );
        }

        let (event_tx, mut event_rx) = mpsc::channel::<ChannelEvent>(64);
        let handle = match ChannelHandle::connect(&self.channel_addr, &token, event_tx).await {
            Ok(h) => h,
            Err(e) => {
                return BridgeMessage::response_err(
                    &msg.id,
                    BridgeError::new(error_codes::CHANNEL_ERROR, e.to_string()),
                );
            }
        };

        *self.shared.channel.write().await = Some(handle);

        // Forward channel events to the shell until the channel closes.
        let shared = self.shared.clone();
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                match event {
                    ChannelEvent::Connected => {
                        shared
                            .emit(BridgeMessage::event(
                                events::CHANNEL_CONNECTED,
                                serde_json::json!({}),
                            ))
                            .await;
                    }
                    ChannelEvent::NewMessage(message) => {
                        // A live frame whose id already arrived via the
                        // conversation history is not re-announced.
                        if !shared.inbox.lock().await.push_live(message.clone()) {
                            continue;
                        }
                        shared
                            .emit(BridgeMessage::event(
                                events::NEW_MESSAGE,
                                serde_json::json!(message),
                            ))
                            .await;
                    }
                    ChannelEvent::NewNotification(notification) => {
                        shared
                            .emit(BridgeMessage::event(
                                events::NEW_NOTIFICATION,
                                serde_json::json!(notification),
                            ))
                            .await;
                    }
                    ChannelEvent::Disconnected(reason) => {
                        shared.channel.write().await.take();
                        shared
                            .emit(BridgeMessage::event(
                                events::CHANNEL_DISCONNECTED,
                                serde_json::json!({ "reason": reason }),
                            ))
                            .await;
                        break;
                    }
                }
            }
        });

        BridgeMessage::response_ok(&msg.id, serde_json::json!({ "connected": true }))
    }

    async fn handle_channel_send(&self, msg: &BridgeMessage) -> BridgeMessage {
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let outgoing: OutgoingMessage = match serde_json::from_value(params.clone()) {
            Ok(m) => m,
            Err(e) => return invalid_params(&msg.id, e),
        };

        if outgoing.content.trim().is_empty() {
            return BridgeMessage::response_err(
                &msg.id,
                BridgeError::new(error_codes::VALIDATION_FAILED, "Message must not be empty"),
            );
        }

        match self.shared.channel.read().await.as_ref() {
            Some(handle) => match handle.send(&outgoing).await {
                Ok(()) => {
                    BridgeMessage::response_ok(&msg.id, serde_json::json!({ "sent": true }))
                }
                Err(e) => BridgeMessage::response_err(
                    &msg.id,
                    BridgeError::new(error_codes::CHANNEL_ERROR, e.to_string()),
                ),
            },
            None => BridgeMessage::response_err(
                &msg.id,
                BridgeError::new(error_codes::CHANNEL_ERROR, "Channel not connected"),
            ),
        }
    }

    async fn handle_channel_disconnect(&self, msg: &BridgeMessage) -> BridgeMessage {
        let disconnected = match self.shared.channel.write().await.take() {
            Some(handle) => {
                handle.disconnect();
                true
            }
            None => false,
        };

        BridgeMessage::response_ok(
            &msg.id,
            serde_json::json!({ "disconnected": disconnected }),
        )
    }

    // ===== LOCAL SETTINGS =====

    async fn handle_settings_get(&self, msg: &BridgeMessage) -> BridgeMessage {
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let key = match require_str(msg, params, "key") {
            Ok(v) => v,
            Err(e) => return e,
        };

        match self.shared.store.get_setting(key).await {
            Ok(value) => BridgeMessage::response_ok(&msg.id, serde_json::json!({ "value": value })),
            Err(e) => BridgeMessage::response_err(
                &msg.id,
                BridgeError::new(error_codes::INTERNAL_ERROR, e.to_string()),
            ),
        }
    }

    async fn handle_settings_set(&self, msg: &BridgeMessage) -> BridgeMessage {
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let key = match require_str(msg, params, "key") {
            Ok(v) => v,
            Err(e) => return e,
        };
        let value = match require_str(msg, params, "value") {
            Ok(v) => v,
            Err(e) => return e,
        };

        match self.shared.store.set_setting(key, value).await {
            Ok(()) => BridgeMessage::response_ok(&msg.id, serde_json::json!({ "success": true })),
            Err(e) => BridgeMessage::response_err(
                &msg.id,
                BridgeError::new(error_codes::INTERNAL_ERROR, e.to_string()),
            ),
        }
    }

    async fn handle_settings_all(&self, msg: &BridgeMessage) -> BridgeMessage {
        match self.shared.store.get_all_settings().await {
            Ok(settings) => {
                BridgeMessage::response_ok(&msg.id, serde_json::json!({ "settings": settings }))
            }
            Err(e) => BridgeMessage::response_err(
                &msg.id,
                BridgeError::new(error_codes::INTERNAL_ERROR, e.to_string()),
            ),
        }
    }

    // ===== ROUTING =====

    async fn handle_route_check(&self, msg: &BridgeMessage) -> BridgeMessage {
        let params = match require_params(msg) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let route: RouteClass = match params.get("route").cloned().map(serde_json::from_value) {
            Some(Ok(r)) => r,
            Some(Err(e)) => return invalid_params(&msg.id, e),
            None => {
                return BridgeMessage::response_err(
                    &msg.id,
                    BridgeError::new(error_codes::INVALID_PARAMS, "Missing route"),
                );
            }
        };

        let token = match self.shared.session.read().await.as_ref() {
            Some(ctx) => ctx.client.token().map(str::to_string),
            None => match self.shared.store.load_session().await {
                Ok(Some(stored)) => Some(stored.token),
                _ => None,
            },
        };

        let decision = guard_route(route, token.as_deref());
        BridgeMessage::response_ok(
            &msg.id,
            serde_json::json!({ "decision": decision.as_str() }),
        )
    }

    // ===== HELPERS =====

    async fn require_session(&self, id: &str) -> Result<Arc<ApiClient>, BridgeMessage> {
        self.shared.client().await.ok_or_else(|| {
            BridgeMessage::response_err(
                id,
                BridgeError::new(error_codes::NOT_AUTHENTICATED, "Not authenticated"),
            )
        })
    }

    /// Map an API failure to an error response. A 401 additionally
    /// tears the session down before answering.
    async fn fail(&self, id: &str, e: ApiError) -> BridgeMessage {
        if e.is_unauthorized() {
            self.shared.force_logout().await;
            return BridgeMessage::response_err(
                id,
                BridgeError::new(error_codes::NOT_AUTHENTICATED, "Session expired"),
            );
        }

        let code = match &e {
            ApiError::Validation(_) => error_codes::VALIDATION_FAILED,
            ApiError::Network(_) => error_codes::NETWORK_ERROR,
            _ => error_codes::API_ERROR,
        };

        error!("API call failed: {}", e);
        let mut err = BridgeError::new(code, e.to_string());
        if let ApiError::Backend { status, .. } = &e {
            err = err.with_data(serde_json::json!({ "status": status }));
        }
        BridgeMessage::response_err(id, err)
    }
}

fn require_params(msg: &BridgeMessage) -> Result<&serde_json::Value, BridgeMessage> {
    msg.params.as_ref().ok_or_else(|| {
        BridgeMessage::response_err(
            &msg.id,
            BridgeError::new(error_codes::INVALID_PARAMS, "Missing params"),
        )
    })
}

fn require_str<'a>(
    msg: &BridgeMessage,
    params: &'a serde_json::Value,
    field: &str,
) -> Result<&'a str, BridgeMessage> {
    params.get(field).and_then(|v| v.as_str()).ok_or_else(|| {
        BridgeMessage::response_err(
            &msg.id,
            BridgeError::new(error_codes::INVALID_PARAMS, format!("Missing {field}")),
        )
    })
}

fn invalid_params(id: &str, e: serde_json::Error) -> BridgeMessage {
    BridgeMessage::response_err(
        id,
        BridgeError::new(error_codes::INVALID_PARAMS, format!("Invalid params: {e}")),
    )
}

fn validation_err(id: &str, e: ValidationError) -> BridgeMessage {
    BridgeMessage::response_err(id, BridgeError::new(error_codes::VALIDATION_FAILED, e.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::methods;

    async fn handler() -> MessageHandler {
        let store = Arc::new(SessionStore::open_in_memory().await.unwrap());
        let (shutdown_tx, _) = broadcast::channel(1);
        MessageHandler::new("http://localhost:5000", "localhost:5001", store, shutdown_tx)
    }

    #[tokio::test]
    async fn ping_answers_with_the_request_id() {
        let handler = handler().await;
        let req = BridgeMessage::request(methods::PING, None);
        let id = req.id.clone();

        let res = handler.handle_message(req).await;
        assert_eq!(res.id, id);
        assert!(res.error.is_none());
        assert_eq!(res.result.unwrap()["pong"], true);
    }

    #[tokio::test]
    async fn only_request_messages_are_accepted() {
        let handler = handler().await;
        let msg = BridgeMessage::event(events::NEW_MESSAGE, serde_json::json!({}));

        let res = handler.handle_message(msg).await;
        let err = res.error.unwrap();
        assert_eq!(err.code, error_codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn unknown_method_is_rejected() {
        let handler = handler().await;
        let req = BridgeMessage::request("no.such.method", None);

        let res = handler.handle_message(req).await;
        let err = res.error.unwrap();
        assert_eq!(err.code, error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn protected_methods_require_a_session() {
        let handler = handler().await;

        for method in [
            methods::FEED_OPEN,
            methods::POST_CREATE,
            methods::USER_ME,
            methods::POST_LIKE,
        ] {
            let req = BridgeMessage::request(method, Some(serde_json::json!({})));
            let res = handler.handle_message(req).await;
            let err = res.error.expect(method);
            assert_eq!(err.code, error_codes::NOT_AUTHENTICATED, "{method}");
        }
    }

    #[tokio::test]
    async fn register_rejects_incomplete_params() {
        let handler = handler().await;
        let req = BridgeMessage::request(
            methods::AUTH_REGISTER,
            Some(serde_json::json!({ "username": "mira" })),
        );

        let res = handler.handle_message(req).await;
        assert_eq!(res.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn register_rejects_a_mismatched_password_pair() {
        let handler = handler().await;
        let req = BridgeMessage::request(
            methods::AUTH_REGISTER,
            Some(serde_json::json!({
                "username": "mira",
                "email": "mira@example.com",
                "password": "hunter22",
                "confirm_password": "hunter23",
            })),
        );

        let res = handler.handle_message(req).await;
        assert_eq!(res.error.unwrap().code, error_codes::VALIDATION_FAILED);
    }

    #[tokio::test]
    async fn restore_without_a_persisted_session_restores_nothing() {
        let handler = handler().await;
        let req = BridgeMessage::request(methods::AUTH_RESTORE, None);

        let res = handler.handle_message(req).await;
        assert!(res.error.is_none());
        assert_eq!(res.result.unwrap()["restored"], false);
    }

    #[tokio::test]
    async fn restore_discards_an_expired_token() {
        let handler = handler().await;
        // Stored token with an expiry in the past.
        let header = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(r#"{"exp":1000000000,"sub":"u1"}"#);
        let token = format!("{header}.{payload}.sig");
        handler
            .shared
            .store
            .save_session(&token, "u1", "mira")
            .await
            .unwrap();

        let res = handler
            .handle_message(BridgeMessage::request(methods::AUTH_RESTORE, None))
            .await;
        assert_eq!(res.result.unwrap()["restored"], false);
        // The dead session is gone from the store.
        assert!(handler.shared.store.load_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn route_check_redirects_without_a_token() {
        let handler = handler().await;
        let req = BridgeMessage::request(
            methods::ROUTE_CHECK,
            Some(serde_json::json!({ "route": "protected" })),
        );

        let res = handler.handle_message(req).await;
        assert_eq!(res.result.unwrap()["decision"], "redirect_to_login");

        let req = BridgeMessage::request(
            methods::ROUTE_CHECK,
            Some(serde_json::json!({ "route": "auth_only" })),
        );
        let res = handler.handle_message(req).await;
        assert_eq!(res.result.unwrap()["decision"], "allow");
    }

    #[tokio::test]
    async fn settings_round_trip_through_the_bridge() {
        let handler = handler().await;

        let req = BridgeMessage::request(
            methods::SETTINGS_GET,
            Some(serde_json::json!({ "key": "theme" })),
        );
        let res = handler.handle_message(req).await;
        assert_eq!(res.result.unwrap()["value"], serde_json::Value::Null);

        let req = BridgeMessage::request(
            methods::SETTINGS_SET,
            Some(serde_json::json!({ "key": "theme", "value": "dark" })),
        );
        let res = handler.handle_message(req).await;
        assert_eq!(res.result.unwrap()["success"], true);

        let req = BridgeMessage::request(
            methods::SETTINGS_GET,
            Some(serde_json::json!({ "key": "theme" })),
        );
        let res = handler.handle_message(req).await;
        assert_eq!(res.result.unwrap()["value"], "dark");

        let req = BridgeMessage::request(methods::SETTINGS_ALL, None);
        let res = handler.handle_message(req).await;
        assert_eq!(res.result.unwrap()["settings"]["theme"], "dark");
    }

    #[tokio::test]
    async fn feed_next_on_unknown_feed_is_an_error() {
        let handler = handler().await;
        let req = BridgeMessage::request(
            methods::FEED_NEXT,
            Some(serde_json::json!({ "feed_id": "missing" })),
        );

        let res = handler.handle_message(req).await;
        assert_eq!(res.error.unwrap().code, error_codes::FEED_NOT_FOUND);
    }

    #[tokio::test]
    async fn channel_send_without_connection_fails() {
        let handler = handler().await;
        let req = BridgeMessage::request(
            methods::CHANNEL_SEND,
            Some(serde_json::json!({ "receiverId": "u2", "content": "hey" })),
        );

        let res = handler.handle_message(req).await;
        assert_eq!(res.error.unwrap().code, error_codes::CHANNEL_ERROR);
    }
}
