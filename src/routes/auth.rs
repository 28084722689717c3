/// Authentication Routes
///
/// Registration, login, token refresh and logout.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, RegistrationPayload};
use crate::error::AppError;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub user_id: i64,
    pub refresh_token: String,
}

/// Logout request
#[derive(Deserialize)]
pub struct LogoutRequest {
    pub user_id: i64,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub message: String,
}

/// Login response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Refresh response. `refresh_token` is present only when rotation is enabled.
#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: i64,
}

/// POST /auth/register, POST /users
///
/// # Errors
/// - 400: Validation errors (all failing fields listed)
/// - 409: Email already registered
/// - 500: Internal server error
pub async fn register(
    form: web::Json<RegistrationPayload>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let principal = auth.register(form.into_inner()).await?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        id: principal.id,
        message: "User registered successfully.".to_string(),
    }))
}

/// POST /auth/login
///
/// # Errors
/// - 401: Unknown email or wrong password (indistinguishable)
/// - 500: Internal server error; no tokens are returned
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let tokens = auth.login(&form.email, &form.password).await?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: auth.codec().ttl().num_seconds(),
    }))
}

/// POST /auth/refresh
///
/// # Errors
/// - 401: Refresh token expired, mismatched or unknown
/// - 500: Internal server error
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let tokens = auth.refresh(form.user_id, &form.refresh_token).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: auth.codec().ttl().num_seconds(),
    }))
}

/// POST /auth/logout
///
/// **Requires valid access token.** Always 204 unless storage fails.
pub async fn logout(
    form: web::Json<LogoutRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    auth.logout(form.user_id).await?;

    Ok(HttpResponse::NoContent().finish())
}
