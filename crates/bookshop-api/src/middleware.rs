use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use bookshop_types::api::Claims;

use crate::auth::{AppState, COOKIE_NAME};
use crate::error::ApiError;

/// Session token from the session cookie, falling back to an
/// `Authorization: Bearer` header.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(COOKIE_NAME) {
        return Some(cookie.value().to_owned());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

/// Decode and validate a session token (signature and expiry).
pub fn verify_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| debug!("Rejected session token: {}", e))
    .ok()
}

/// Reject requests without a valid session; otherwise make the caller's
/// `Identity` available to handlers as an extension.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(&jar, req.headers()).ok_or(ApiError::Unauthorized)?;
    let claims = verify_token(&state.session.secret, &token).ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(claims.identity());
    Ok(next.run(req).await)
}
