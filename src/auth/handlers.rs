use axum::{
    extract::{FromRef, Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MessageResponse, PublicUser, RegisterRequest},
        extractors::{AdminUser, AuthUser},
        jwt::JwtKeys,
        password::{hash_password, is_valid_email, verify_password, MIN_PASSWORD_LEN},
        repo::DuplicateEmail,
        repo_types::{NewUser, Role},
    },
    error::{ApiError, ApiResult},
    history::services::purge_user_images,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
        .route("/auth", get(list_users))
        .route("/auth/", get(list_users))
        .route("/auth/:id", delete(delete_user))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();
    let name = payload.name.trim();

    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long."
        )));
    }

    let role = match payload.role.unwrap_or_default() {
        Role::Admin if !state.config.allow_admin_registration => {
            warn!(email = %payload.email, "admin self-registration refused");
            return Err(ApiError::Forbidden("Admin registration is disabled".into()));
        }
        role => role,
    };

    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(NewUser {
            name,
            email: &payload.email,
            password_hash: &hash,
            role,
        })
        .await
        .map_err(|e| {
            if e.is::<DuplicateEmail>() {
                warn!(email = %payload.email, "email registered concurrently");
                ApiError::Conflict("User already exists".into())
            } else {
                ApiError::from(e)
            }
        })?;

    let token = JwtKeys::from_ref(&state).sign(user.id, user.role)?;

    info!(user_id = %user.id, email = %user.email, role = user.role.as_str(), "user registered");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    let Some(user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::BadRequest("Invalid Credentials".into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::BadRequest("Invalid Credentials".into()));
    }

    let token = JwtKeys::from_ref(&state).sign(user.id, user.role)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let user = state.users.find_by_id(auth.id).await?.ok_or_else(|| {
        warn!(user_id = %auth.id, "token for unknown user");
        ApiError::Unauthorized("User not found".into())
    })?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let not_found = || ApiError::NotFound("User not found".into());
    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;

    if state.users.find_by_id(id).await?.is_none() {
        return Err(not_found());
    }
    let purged = purge_user_images(&state, id).await?;
    if purged > 0 {
        info!(user_id = %id, purged, "stored images purged");
    }

    if !state.users.delete(id).await? {
        return Err(not_found());
    }

    info!(admin_id = %admin.id, user_id = %id, "user removed");
    Ok(Json(MessageResponse::new("User removed")))
}
