use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{state::AppState, utils::verify_token};

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
}

/// Resolve the signed-in user from the `auth_token` cookie, falling back to an
/// `Authorization: Bearer` header for non-browser clients.
pub async fn get_current_user(
    cookies: &Cookies,
    headers: &HeaderMap,
    state: &AppState,
) -> Option<CurrentUser> {
    let token = cookies
        .get(AUTH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| bearer_token(headers))?;

    let claims = match verify_token(&token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            log::debug!("rejected session token: {}", e);
            return None;
        }
    };

    let user_id = claims.user_id()?;

    // The account may have been removed since the token was issued.
    let user = match state.store.find_user(user_id).await {
        Ok(user) => user?,
        Err(e) => {
            log::error!("failed to load user {}: {}", user_id, e);
            return None;
        }
    };

    Some(CurrentUser {
        id: user.id,
        email: user.email,
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}
