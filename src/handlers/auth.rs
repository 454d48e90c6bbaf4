use axum::{
    extract::Extension,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{generate_session_token, verify_password, Claims};
use crate::config;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, SessionUser};
use crate::models::User;
use crate::validate::{FieldKind, FieldRule, Schema};

use super::validated;

fn login_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("email", FieldKind::Email).required())
        .field(FieldRule::new("password", FieldKind::String { min: 1, max: 128 }).required())
}

#[derive(Debug, Deserialize)]
struct LoginInput {
    email: String,
    password: String,
}

/// POST /auth/login - authenticate and issue a session token.
///
/// Credential failures are indistinguishable on purpose: unknown email
/// and wrong password return the same message.
pub async fn login(Json(payload): Json<Value>) -> Result<Response, ApiError> {
    let input: LoginInput = validated(&login_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&input.email)
        .fetch_optional(&pool)
        .await?;

    let user = user.ok_or_else(|| ApiError::unauthenticated("Invalid email or password"))?;

    if !verify_password(&input.password, &user.password_salt, &user.password_hash) {
        tracing::debug!(user = %user.id, "password verification failed");
        return Err(ApiError::unauthenticated("Invalid email or password"));
    }

    let claims = Claims::new(user.id.clone(), user.school_id.clone(), user.role, user.name.clone());
    let token = generate_session_token(claims).map_err(|e| {
        tracing::error!("failed to mint session token: {}", e);
        ApiError::internal("Could not create a session")
    })?;

    let expiry_hours = config::config().security.session_expiry_hours;
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token,
        expiry_hours * 3600
    );

    let mut response = ApiResponse::success(json!({
        "token": token,
        "user": user,
    }))
    .into_response();
    if let Ok(value) = cookie.parse() {
        response.headers_mut().insert("set-cookie", value);
    }
    Ok(response)
}

/// DELETE /auth/session - clear the session cookie. Tokens are
/// stateless, so logout is purely client-side invalidation.
pub async fn logout() -> Response {
    let mut response = ApiResponse::success(json!({ "logged_out": true })).into_response();
    if let Ok(value) = "session=; Path=/; HttpOnly; Max-Age=0".parse() {
        response.headers_mut().insert("set-cookie", value);
    }
    response
}

/// GET /api/auth/whoami - echo the resolved session identity.
pub async fn whoami(Extension(user): Extension<SessionUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "user_id": user.user_id,
        "school_id": user.school_id,
        "role": user.role,
        "name": user.name,
    })))
}
