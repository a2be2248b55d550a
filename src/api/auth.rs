//! Registration and login endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{RegisterUser, Role},
    AppState,
};

/// Registration response
#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub username: String,
    pub role: Role,
}

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response carrying the bearer token
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub username: String,
    pub role: Role,
}

/// Register a new borrower or administrator
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Invalid username, password or role"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    state
        .services
        .auth
        .register(&request.username, &request.password, request.role)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            username: request.username,
            role: request.role,
        }),
    ))
}

/// Authenticate and receive a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let actor = state
        .services
        .auth
        .login(&request.username, &request.password)
        .await?;
    let token = state.services.auth.issue_token(&actor)?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        username: actor.username().to_string(),
        role: actor.role(),
    }))
}
