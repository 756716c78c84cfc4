use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::de::DeserializeOwned;
use tracing::info;

use bookshop_store::Bookshop;
use bookshop_types::api::{AuthQuery, Claims, LoginRequest, SessionResponse};
use bookshop_types::{NewUser, User};

use crate::error::ApiError;
use crate::middleware::{session_token, verify_token};
use crate::run_blocking;

pub const COOKIE_NAME: &str = "bookshop_session";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub shop: Bookshop,
    pub session: SessionConfig,
}

/// How session tokens are signed and how the cookie is issued.
pub struct SessionConfig {
    pub secret: String,
    pub secure_cookies: bool,
    pub ttl: chrono::Duration,
}

/// `POST /api/auth?action=signup|login`
pub async fn post_auth(
    State(state): State<AppState>,
    Query(query): Query<AuthQuery>,
    jar: CookieJar,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let (status, user) = match query.action.as_deref() {
        Some("signup") => {
            let new_user: NewUser = parse_body(body)?;
            let user = run_blocking(&state, move |shop| shop.users().signup(new_user)).await?;
            (StatusCode::CREATED, user)
        }
        Some("login") => {
            let req: LoginRequest = parse_body(body)?;
            let user = run_blocking(&state, move |shop| {
                shop.users().login(&req.email, &req.password)
            })
            .await?;
            (StatusCode::OK, user)
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Invalid action, use signup or login".into(),
            ));
        }
    };

    let token = create_token(&state.session, &user)?;
    let jar = jar.add(session_cookie(&state.session, token));
    info!("Session issued for {} ({})", user.email, user.role);

    Ok((status, jar, Json(user)).into_response())
}

/// `GET /api/auth`: the current session, or `{ "user": null }`.
pub async fn get_session(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ApiError> {
    let Some(claims) =
        session_token(&jar, &headers).and_then(|token| verify_token(&state.session.secret, &token))
    else {
        return Ok(Json(SessionResponse { user: None }));
    };

    // A token can outlive its user row.
    let user = run_blocking(&state, move |shop| shop.users().get(claims.sub)).await?;
    Ok(Json(SessionResponse {
        user: user.map(|u| u.identity()),
    }))
}

/// `DELETE /api/auth`: expire the session cookie.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<SessionResponse>) {
    let mut cookie = Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();
    cookie.make_removal();

    (jar.add(cookie), Json(SessionResponse { user: None }))
}

fn parse_body<T: DeserializeOwned>(
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<T, ApiError> {
    let Json(value) = body?;
    serde_json::from_value(value).map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn session_cookie(config: &SessionConfig, token: String) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(config.secure_cookies)
        .build()
}

fn create_token(config: &SessionConfig, user: &User) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        exp: (chrono::Utc::now() + config.ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
}
