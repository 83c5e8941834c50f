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

//! Direct message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The sender reference embedded in a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSender {
    #[serde(rename = "_id")]
    pub id: String,
}

/// A direct message, delivered either by the conversation history
/// endpoint or live over the socket channel. The id is the
/// de-duplication key when both paths race.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    /// Unique identifier
    #[serde(rename = "_id")]
    pub id: String,

    /// The user that sent this message
    pub sender: MessageSender,

    /// Id of the receiving user
    #[serde(default)]
    pub receiver_id: String,

    /// Text content
    pub content: String,

    /// When this message was sent
    pub created_at: DateTime<Utc>,
}

/// Payload emitted on the socket channel to send a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub receiver_id: String,
    pub content: String,
}
