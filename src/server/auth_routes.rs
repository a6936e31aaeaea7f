//! Login, registration and session endpoints under /v1/auth.

use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::ApiResult;
use super::metrics::record_login_attempt;
use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::state::{GuardedUserManager, ServerState};
use crate::songbook::SongbookError;
use crate::user::auth::{AuthToken, AuthTokenValue};
use crate::user::Permission;

#[derive(Deserialize)]
struct CredentialsBody {
    pub user_handle: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
}

#[derive(Serialize)]
struct SessionResponse {
    user_id: usize,
    handle: String,
    permissions: Vec<Permission>,
}

fn session_cookie(value: String, expired: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build(Cookie::new(COOKIE_SESSION_TOKEN_KEY, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    if expired {
        cookie.set_expires(time::OffsetDateTime::now_utc() - time::Duration::days(1));
    }
    cookie
}

fn token_response(auth_token: AuthToken) -> Response {
    let token = auth_token.value.0;
    (
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(token.clone(), false).to_string())],
        Json(LoginSuccessResponse { token }),
    )
        .into_response()
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<CredentialsBody>,
) -> ApiResult<Response> {
    let start = Instant::now();
    let result = user_manager.login(&body.user_handle, &body.password);
    let status = match &result {
        Ok(Some(_)) => "success",
        Ok(None) => "failure",
        Err(_) => "error",
    };
    record_login_attempt(status, start.elapsed());

    match result? {
        Some(auth_token) => {
            info!("User {} logged in", auth_token.user_id);
            Ok(token_response(auth_token))
        }
        None => {
            debug!("Rejected login for {}", body.user_handle);
            Ok(StatusCode::UNAUTHORIZED.into_response())
        }
    }
}

async fn register(
    State(state): State<ServerState>,
    Json(body): Json<CredentialsBody>,
) -> ApiResult<Response> {
    if !state.config.allow_registration {
        return Err(SongbookError::Forbidden);
    }
    let user_id = state
        .user_manager
        .register_user(&body.user_handle, &body.password)?;
    let auth_token = state.user_manager.generate_auth_token(user_id)?;
    Ok(token_response(auth_token))
}

async fn logout(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> ApiResult<Response> {
    user_manager.delete_auth_token(session.user_id, &AuthTokenValue(session.token))?;
    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session_cookie(String::new(), true).to_string(),
        )],
    )
        .into_response())
}

async fn get_session(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> ApiResult<Json<SessionResponse>> {
    let handle = user_manager
        .get_user_handle(session.user_id)?
        .ok_or_else(|| SongbookError::not_found("user", session.user_id.to_string()))?;
    Ok(Json(SessionResponse {
        user_id: session.user_id,
        handle,
        permissions: session.permissions,
    }))
}

pub fn auth_routes() -> Router<ServerState> {
    Router::new()
        .route("/v1/auth/login", post(login))
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/logout", get(logout))
        .route("/v1/auth/session", get(get_session))
}
