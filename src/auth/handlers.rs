use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, ProfileResponse, PublicUser, RefreshRequest, RegisterRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password, MIN_PASSWORD_LEN},
        repo::owned_counts,
        repo_types::User,
        services::{is_valid_email, is_valid_username, issue_tokens, normalize_login},
    },
    communities,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/profile", get(get_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.email = normalize_login(&payload.email);
    payload.username = normalize_login(&payload.username);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }
    if !is_valid_username(&payload.username) {
        warn!(username = %payload.username, "invalid username");
        return Err(AppError::bad_request(
            "Username must be 3-32 characters of letters, digits, '.', '_' or '-'",
        ));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::bad_request("Password too short"));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::conflict("Email already registered"));
    }
    if User::find_by_username(&state.db, &payload.username).await?.is_some() {
        warn!(username = %payload.username, "username taken");
        return Err(AppError::conflict("Username already taken"));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.username, &payload.email, &hash).await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(issue_tokens(&keys, user)?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let login = normalize_login(&payload.login);

    let found = if login.contains('@') {
        User::find_by_email(&state.db, &login).await?
    } else {
        User::find_by_username(&state.db, &login).await?
    };
    let Some(user) = found else {
        warn!(login = %login, "login unknown account");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    info!(user_id = %user.id, "user logged in");
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(issue_tokens(&keys, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    Ok(Json(issue_tokens(&keys, user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    let joined = communities::repo::list_joined(&state.db, user_id).await?;
    let (items_count, subscriptions_count) = owned_counts(&state.db, user_id).await?;

    Ok(Json(ProfileResponse {
        username: user.username,
        email: user.email,
        communities: joined.into_iter().map(Into::into).collect(),
        items_count,
        subscriptions_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_never_serializes_password_hash() {
        let user = User {
            id: uuid::Uuid::new_v4(),
            username: "ana".into(),
            email: "ana@example.org".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            created_at: time::OffsetDateTime::now_utc(),
        };

        let raw = serde_json::to_string(&user).unwrap();
        assert!(!raw.contains("argon2"));

        let public: PublicUser = user.into();
        let json = serde_json::to_string(&public).unwrap();
        assert!(json.contains("ana@example.org"));
        assert!(json.contains("\"username\":\"ana\""));
    }
}
