//! Session-cookie authentication for the HTTP surface.
//!
//! Sessions are issued elsewhere; this module only reads the cookie, asks the library to
//! resolve it, and turns a missing or stale session into a redirect to the login page.

use crate::{
    api::ApiState,
    processing::{LibraryApi, LibraryError},
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, header::COOKIE, request::Parts},
    response::{IntoResponse, Redirect, Response},
};

/// Where the session token lives and where anonymous callers are sent.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Name of the cookie carrying the session token.
    pub cookie_name: String,
    /// Redirect target for unauthenticated requests.
    pub login_path: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            cookie_name: "session_token".into(),
            login_path: "/login".into(),
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// Identifier of the session owner.
    pub user_id: String,
}

/// Why a request could not be attributed to a user.
#[derive(Debug)]
pub enum AuthRejection {
    /// No usable session; send the caller to the login page.
    Login(String),
    /// Session lookup itself failed.
    Lookup(LibraryError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Login(path) => Redirect::to(&path).into_response(),
            Self::Lookup(error) => {
                tracing::error!(error = %error, "Session lookup failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<ApiState<S>> for CurrentUser
where
    S: LibraryApi + 'static,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState<S>,
    ) -> Result<Self, Self::Rejection> {
        let login = || AuthRejection::Login(state.auth.login_path.clone());

        let token = session_token(parts, &state.auth.cookie_name).ok_or_else(login)?;
        match state.service.authenticate(&token).await {
            Ok(Some(session)) => Ok(Self {
                user_id: session.user_id,
            }),
            Ok(None) => {
                tracing::debug!(path = %parts.uri.path(), "Rejecting unknown or expired session");
                Err(login())
            }
            Err(error) => Err(AuthRejection::Lookup(error)),
        }
    }
}

fn session_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(cookie: &str) -> Parts {
        let (parts, ()) = Request::builder()
            .uri("/items")
            .header(COOKIE, cookie)
            .body(())
            .expect("request")
            .into_parts();
        parts
    }

    #[test]
    fn finds_named_cookie_among_others() {
        let parts = parts_with("theme=dark; session_token=abc123 ; other=1");
        assert_eq!(
            session_token(&parts, "session_token").as_deref(),
            Some("abc123")
        );
        assert_eq!(session_token(&parts, "missing"), None);
    }

    #[test]
    fn blank_cookie_value_counts_as_missing() {
        let parts = parts_with("session_token=");
        assert_eq!(session_token(&parts, "session_token"), None);
    }

    #[test]
    fn login_rejection_redirects_with_see_other() {
        let response = AuthRejection::Login("/login".into()).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/login")
        );
    }
}
