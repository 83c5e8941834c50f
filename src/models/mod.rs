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

//! Data models for Ripple
//!
//! These models mirror the backend's wire format. The client holds
//! page-scoped copies only; every entity is created, mutated, and
//! deleted exclusively server-side.

mod bridge;
mod comment;
mod message;
mod notification;
mod post;
mod user;

pub use bridge::*;
pub use comment::*;
pub use message::*;
pub use notification::*;
pub use post::*;
pub use user::*;
