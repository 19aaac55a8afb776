use super::state::ServerState;
use crate::user::auth::AuthTokenValue;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::convert::Infallible;
use tracing::debug;

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";
/// Cookie minted for visitors who capture a mood without logging in.
pub const COOKIE_MOOD_SESSION_KEY: &str = "mood_session";

pub const GUEST_DISPLAY_NAME: &str = "Guest";

/// An authenticated user, resolved from the session token.
#[derive(Debug)]
pub struct Session {
    pub user_id: usize,
    pub handle: String,
    pub token: String,
}

/// Identifies the caller of the mood endpoints: either an authenticated
/// session or an anonymous one tracked by the mood_session cookie. A
/// brand-new visitor has no key yet.
#[derive(Debug)]
pub struct MoodKey {
    pub token: Option<String>,
    pub display_name: String,
}

pub enum SessionExtractionError {
    AccessDenied,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::AccessDenied => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

async fn extract_session_token_from_cookies(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<String> {
    CookieJar::from_request_parts(parts, &ctx)
        .await
        .expect("Could not read cookies into CookieJar.")
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(Cookie::value)
        .map(|s| s.to_string())
}

fn extract_session_token_from_headers(parts: &mut Parts) -> Option<String> {
    parts
        .headers
        .get(HEADER_SESSION_TOKEN_KEY)
        .map(|v| v.as_bytes().to_owned())
        .map(|b| String::from_utf8_lossy(&b).into_owned())
}

async fn extract_session_from_request_parts(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<Session> {
    let token = match extract_session_token_from_cookies(parts, ctx)
        .await
        .or_else(|| extract_session_token_from_headers(parts))
    {
        None => {
            debug!("No token in cookies nor headers.");
            return None;
        }
        Some(x) => x,
    };

    let user_manager = ctx.user_manager.lock().unwrap();
    let auth_token = match user_manager.get_auth_token(&AuthTokenValue(token.clone())) {
        Ok(Some(auth_token)) => auth_token,
        Ok(None) => {
            debug!("Auth token not found in database");
            return None;
        }
        Err(e) => {
            debug!("Failed to get auth token from database: {}", e);
            return None;
        }
    };

    let handle = match user_manager.get_user_handle(auth_token.user_id) {
        Ok(handle) => handle,
        Err(e) => {
            debug!(
                "Failed to resolve handle for user_id={}: {}",
                auth_token.user_id, e
            );
            return None;
        }
    };

    Some(Session {
        user_id: auth_token.user_id,
        handle,
        token: auth_token.value.0,
    })
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
            .await
            .ok_or(SessionExtractionError::AccessDenied)
    }
}

impl FromRequestParts<ServerState> for Option<Session> {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        Ok(extract_session_from_request_parts(parts, ctx).await)
    }
}

impl FromRequestParts<ServerState> for MoodKey {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(session) = extract_session_from_request_parts(parts, ctx).await {
            return Ok(MoodKey {
                token: Some(session.token),
                display_name: session.handle,
            });
        }

        let token = CookieJar::from_request_parts(parts, &ctx)
            .await
            .expect("Could not read cookies into CookieJar.")
            .get(COOKIE_MOOD_SESSION_KEY)
            .map(Cookie::value)
            .map(|s| s.to_string());

        Ok(MoodKey {
            token,
            display_name: GUEST_DISPLAY_NAME.to_string(),
        })
    }
}
