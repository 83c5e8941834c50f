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

//! Session token inspection, route guarding, and input validation
//!
//! The token is inspected client-side for routing only: the `exp`
//! claim is decoded and compared against the clock. Signature
//! verification stays server-side; the backend remains the authority
//! via 401 responses.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// Decoded claims of interest from the access token
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Expiry as a unix timestamp
    pub exp: i64,
    /// Subject (user id), when present
    #[serde(default)]
    pub sub: Option<String>,
}

/// Verdict on a bearer token's usability for routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// Well-formed with a future expiry
    Active,
    /// Well-formed but the `exp` claim is in the past
    Expired,
    /// Not a decodable three-part token
    Malformed,
}

impl TokenStatus {
    /// Whether this token counts as authenticated for routing purposes
    pub fn is_authenticated(&self) -> bool {
        matches!(self, TokenStatus::Active)
    }
}

/// Decode the payload segment of a JWT-shaped token
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    let _signature = segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Inspect a token against the given clock instant
pub fn token_status_at(token: &str, now: DateTime<Utc>) -> TokenStatus {
    match decode_claims(token) {
        Some(claims) => {
            let expiry = Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            if expiry > now {
                TokenStatus::Active
            } else {
                TokenStatus::Expired
            }
        }
        None => TokenStatus::Malformed,
    }
}

/// Inspect a token against the current clock
pub fn token_status(token: &str) -> TokenStatus {
    token_status_at(token, Utc::now())
}

/// Class of route the UI shell is about to enter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Requires an authenticated session (feed, profile, messages)
    Protected,
    /// Only reachable without a session (login, sign-up)
    AuthOnly,
    /// Reachable either way
    Public,
}

/// Routing verdict for a route class and session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToLogin,
    RedirectToHome,
}

impl RouteDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDecision::Allow => "allow",
            RouteDecision::RedirectToLogin => "redirect_to_login",
            RouteDecision::RedirectToHome => "redirect_to_home",
        }
    }
}

/// Decide whether a route may be entered given the current token
pub fn guard_route(route: RouteClass, token: Option<&str>) -> RouteDecision {
    let authenticated = token
        .map(|t| token_status(t).is_authenticated())
        .unwrap_or(false);

    match (route, authenticated) {
        (RouteClass::Protected, false) => RouteDecision::RedirectToLogin,
        (RouteClass::AuthOnly, true) => RouteDecision::RedirectToHome,
        _ => RouteDecision::Allow,
    }
}

/// Shape check used to classify a login identifier as an email
pub fn is_email(input: &str) -> bool {
    let mut parts = input.split('@');
    let local = parts.next().unwrap_or("");
    let domain = match parts.next() {
        Some(d) => d,
        None => return false,
    };
    if parts.next().is_some() {
        return false;
    }

    let has_dotted_domain = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.');

    !local.is_empty()
        && !local.contains(char::is_whitespace)
        && !domain.contains(char::is_whitespace)
        && has_dotted_domain
}

/// Inline validation failure, surfaced to the UI before submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

/// Content must not be empty unless images are attached
pub fn validate_post_content(content: &str, image_count: usize) -> Result<(), ValidationError> {
    if content.trim().is_empty() && image_count == 0 {
        return Err(ValidationError("Content must not be empty".to_string()));
    }
    Ok(())
}

/// Comment content must not be empty
pub fn validate_comment_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError("Content must not be empty".to_string()));
    }
    Ok(())
}

/// Password and confirmation must match and be non-empty
pub fn validate_password_pair(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError("Password must not be empty".to_string()));
    }
    if password != confirm {
        return Err(ValidationError("Passwords do not match".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    /// Build an unsigned token with the given expiry offset from `now`
    fn token_expiring(now: DateTime<Utc>, offset: Duration) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let exp = (now + offset).timestamp();
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp},"sub":"u1"}}"#));
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn future_expiry_is_active() {
        let now = Utc::now();
        let token = token_expiring(now, Duration::hours(1));
        assert_eq!(token_status_at(&token, now), TokenStatus::Active);
        assert!(token_status_at(&token, now).is_authenticated());
    }

    #[test]
    fn past_expiry_is_expired() {
        let now = Utc::now();
        let token = token_expiring(now, Duration::hours(-1));
        assert_eq!(token_status_at(&token, now), TokenStatus::Expired);
        assert!(!token_status_at(&token, now).is_authenticated());
    }

    #[test]
    fn garbage_is_malformed() {
        let now = Utc::now();
        assert_eq!(token_status_at("", now), TokenStatus::Malformed);
        assert_eq!(token_status_at("abc", now), TokenStatus::Malformed);
        assert_eq!(token_status_at("a.b", now), TokenStatus::Malformed);
        assert_eq!(
            token_status_at("not!base64.not!base64.sig", now),
            TokenStatus::Malformed
        );
    }

    #[test]
    fn route_guard_matrix() {
        let now = Utc::now();
        let active = token_expiring(now, Duration::hours(1));
        let expired = token_expiring(now, Duration::hours(-1));

        // Expired or missing token: protected routes redirect to login.
        assert_eq!(
            guard_route(RouteClass::Protected, None),
            RouteDecision::RedirectToLogin
        );
        assert_eq!(
            guard_route(RouteClass::Protected, Some(&expired)),
            RouteDecision::RedirectToLogin
        );

        // Active token: auth-only routes bounce away.
        assert_eq!(
            guard_route(RouteClass::AuthOnly, Some(&active)),
            RouteDecision::RedirectToHome
        );
        assert_eq!(
            guard_route(RouteClass::AuthOnly, None),
            RouteDecision::Allow
        );

        assert_eq!(
            guard_route(RouteClass::Protected, Some(&active)),
            RouteDecision::Allow
        );
        assert_eq!(guard_route(RouteClass::Public, None), RouteDecision::Allow);
    }

    #[test]
    fn email_shape_check() {
        assert!(is_email("mira@example.com"));
        assert!(is_email("a.b+c@sub.example.org"));
        assert!(!is_email("mira"));
        assert!(!is_email("mira@"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("mira@example"));
        assert!(!is_email("mira@@example.com"));
        assert!(!is_email("mi ra@example.com"));
    }

    #[test]
    fn validation_blocks_empty_submissions() {
        assert!(validate_post_content("", 0).is_err());
        assert!(validate_post_content("  \n", 0).is_err());
        // Image-only posts are allowed.
        assert!(validate_post_content("", 2).is_ok());
        assert!(validate_comment_content("").is_err());
        assert!(validate_comment_content("fine").is_ok());
    }

    #[test]
    fn password_confirmation_must_match() {
        assert!(validate_password_pair("hunter2", "hunter2").is_ok());
        assert!(validate_password_pair("hunter2", "hunter3").is_err());
        assert!(validate_password_pair("", "").is_err());
    }
}
