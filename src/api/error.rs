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

//! API error taxonomy
//!
//! Validation errors surface inline and block submission; a 401 always
//! invalidates the session (one policy, every call site); everything
//! else is terminal for that user action until manually repeated.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced by backend calls
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the request payload (400)
    #[error("validation failed: {0}")]
    Validation(String),

    /// The credential is missing, expired, or revoked (401)
    #[error("unauthorized")]
    Unauthorized,

    /// The credential is valid but lacks permission (403)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The addressed entity does not exist (404)
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success backend response
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Transport-level failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not match the expected shape
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Map a non-success status and backend message into the taxonomy
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::BAD_REQUEST => ApiError::Validation(message),
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            other => ApiError::Backend {
                status: other.as_u16(),
                message,
            },
        }
    }

    /// Whether this error must force a logout
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_the_taxonomy() {
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "empty content".into()),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, "".into()),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "nope".into()),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, "gone".into()),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom".into()),
            ApiError::Backend { status: 500, .. }
        ));
    }

    #[test]
    fn only_401_forces_logout() {
        assert!(ApiError::Unauthorized.is_unauthorized());
        assert!(!ApiError::Forbidden("x".into()).is_unauthorized());
        assert!(!ApiError::Validation("x".into()).is_unauthorized());
    }
}
