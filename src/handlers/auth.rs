use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};

use crate::{
    error::{AppError, AppResult},
    middleware::{get_current_user, CurrentUser, AUTH_COOKIE},
    models::{User, UserResponse},
    state::AppState,
    utils::{auth::SESSION_HOURS, create_token, hash_password, verify_password},
};

use super::{required, JsonBody};

#[derive(Deserialize)]
pub struct Credentials {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub message: &'static str,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub user_id: i64,
    pub token: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn read_credentials(form: Credentials) -> AppResult<(String, String)> {
    let email = required(form.email, "email")?.to_lowercase();
    // Passwords are taken verbatim, surrounding spaces included.
    let password = form
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("password is required".to_string()))?;
    Ok((email, password))
}

pub async fn signup(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<Credentials>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    let (email, password) = read_credentials(form)?;

    let cost = state.config.bcrypt_cost;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))?;

    let user = state.store.create_user(&email, &password_hash).await?;
    log::info!("registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created",
            user: user.into(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    JsonBody(form): JsonBody<Credentials>,
) -> AppResult<Json<LoginResponse>> {
    let (email, password) = read_credentials(form)?;
    let user = authenticate_user(&state, &email, password).await?;

    let token = create_token(user.id, user.email.clone(), &state.config.jwt_secret)
        .map_err(|e| AppError::Internal(format!("failed to sign session token: {e}")))?;

    // Set secure HTTP-only cookie with JWT token
    let cookie = Cookie::build((AUTH_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::hours(SESSION_HOURS))
        .build();
    cookies.add(cookie);

    Ok(Json(LoginResponse {
        message: "Login successful",
        user_id: user.id,
        token,
    }))
}

pub async fn logout(cookies: Cookies) -> Json<MessageResponse> {
    cookies.remove(Cookie::build((AUTH_COOKIE, "")).path("/").build());
    Json(MessageResponse {
        message: "Logged out",
    })
}

pub async fn me(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
) -> AppResult<Json<CurrentUser>> {
    get_current_user(&cookies, &headers, &state)
        .await
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized("Not signed in".to_string()))
}

async fn authenticate_user(state: &AppState, email: &str, password: String) -> AppResult<User> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = state.store.find_user_by_email(email).await?.ok_or_else(invalid)?;

    let hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("password check task failed: {e}")))?;

    match verified {
        Ok(true) => Ok(user),
        Ok(false) => Err(invalid()),
        Err(e) => {
            log::error!("unreadable password hash for user {}: {}", user.id, e);
            Err(invalid())
        }
    }
}
