use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{verify_session_token, Claims};
use crate::error::ApiError;
use crate::types::{ObjectId, Role};

/// Authenticated caller context resolved from the session token.
#[derive(Clone, Debug)]
pub struct SessionUser {
    pub user_id: ObjectId,
    pub school_id: ObjectId,
    pub role: Role,
    pub name: String,
}

impl From<Claims> for SessionUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            school_id: claims.school_id,
            role: claims.role,
            name: claims.name,
        }
    }
}

/// Session authenticator: resolves the caller from the `session`
/// cookie or a bearer token and injects `SessionUser`. Missing or
/// invalid credentials end the pipeline with 401.
pub async fn session_auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| ApiError::unauthenticated("Authentication required"))?;

    let claims = verify_session_token(&token).map_err(|e| {
        tracing::debug!("Session token rejected: {}", e);
        ApiError::unauthenticated("Invalid or expired session")
    })?;

    request.extensions_mut().insert(SessionUser::from(claims));
    Ok(next.run(request).await)
}

/// Session cookie first, then `Authorization: Bearer`.
fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie_header) = headers.get("cookie").and_then(|v| v.to_str().ok()) {
        for pair in cookie_header.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                if name == "session" && !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_token_from_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("theme=dark; session=abc.def.ghi"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn falls_back_to_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer tok123"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn missing_credentials_yield_none() {
        let headers = HeaderMap::new();
        assert!(extract_session_token(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert!(extract_session_token(&headers).is_none());
    }
}
