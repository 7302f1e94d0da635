use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::auth::{
    dto::{
        AuthResponse, LoginRequest, MessageResponse, RegisterRequest, TokenResponse,
        UpdateDetailsRequest, UpdatePasswordRequest, UserResponse,
    },
    extractors::CurrentUser,
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::User,
};
use crate::error::{conflict_on_unique, ApiError, ApiResult, FieldError};
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/updatedetails", put(update_details))
        .route("/auth/updatepassword", put(update_password))
}

#[instrument(skip_all)]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let payload = payload.validated()?;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict(
            "User already exists with this email".into(),
        ));
    }

    let hash = hash_password(&payload.password)?;
    // unique index catches a concurrent register with the same email
    let user = User::create(&state.db, &payload.name, &payload.email, &hash)
        .await
        .map_err(|e| conflict_on_unique(e, "User already exists with this email"))?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Please provide email and password".into(),
        ));
    }

    let user = User::find_by_email(&state.db, &email).await?.ok_or_else(|| {
        warn!(email = %email, "login with unknown email");
        ApiError::Unauthorized("Invalid credentials".into())
    })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let user = User::touch_last_login(&state.db, user.id).await?;
    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: user.into(),
    }))
}

/// JWTs are stateless; logout just tells the client to drop the token.
#[instrument(skip_all)]
async fn logout(CurrentUser(_user): CurrentUser) -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: "Logged out successfully".into(),
    })
}

#[instrument(skip_all)]
async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse {
        success: true,
        data: user.into(),
    })
}

#[instrument(skip_all)]
async fn update_details(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateDetailsRequest>,
) -> ApiResult<Json<UserResponse>> {
    let (name, email) = payload.merged(&user)?;

    let updated = User::update_details(&state.db, user.id, &name, &email)
        .await
        .map_err(|e| conflict_on_unique(e, "Email already in use"))?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(UserResponse {
        success: true,
        data: updated.into(),
    }))
}

#[instrument(skip_all)]
async fn update_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> ApiResult<Json<TokenResponse>> {
    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(user_id = %user.id, "password change with wrong current password");
        return Err(ApiError::Unauthorized("Current password is incorrect".into()));
    }

    if payload.new_password.chars().count() < 6 {
        return Err(ApiError::Validation(vec![FieldError::new(
            "newPassword",
            "Password must be at least 6 characters",
        )]));
    }

    let hash = hash_password(&payload.new_password)?;
    User::update_password(&state.db, user.id, &hash).await?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, "password updated");

    Ok(Json(TokenResponse {
        success: true,
        token,
    }))
}
