use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use std::net::SocketAddr;

use crate::{
    config::Environment,
    dtos::auth::{MagicLinkRequest, MessageResponse, VerifyQuery},
    error::AppError,
    middleware::{cookies, AuthUser},
    models::{DeviceInfo, SessionInfo, TokenPurpose, User, UserResponse},
    services::{ServiceError, TokenPair},
    utils::{device_info_from_request, ValidatedJson},
    AppState,
};

/// Request a magic link for passwordless login or signup.
///
/// Always answers with the same generic message whether or not the address
/// is known, so this endpoint cannot be used to probe for accounts.
pub async fn request_magic_link(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<MagicLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing = state.db.find_user_by_email(&req.email).await?;

    let should_send = match req.purpose {
        TokenPurpose::Login => existing.is_some(),
        TokenPurpose::Signup => existing.is_none(),
    };

    if should_send {
        state
            .magic_links
            .issue(&req.email, req.purpose, &state.config.app_base_url)
            .await?;
    } else {
        tracing::info!(
            purpose = %req.purpose.as_str(),
            "Magic link request did not match an eligible account, not sending"
        );
    }

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "If the address is eligible, a link has been sent. Check your email."
                .to_string(),
        }),
    ))
}

/// Magic-link landing endpoint: consume the one-time token, mint a session
/// and hand the credential pair to the browser as cookies.
///
/// Every failure collapses into a redirect to the login entry point; no
/// partial identity is ever returned.
pub async fn verify(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<VerifyQuery>,
) -> (CookieJar, Redirect) {
    let device = device_info_from_request(&headers, Some(addr));

    match enroll(&state, &query.token, &device).await {
        Ok(pair) => {
            let jar = cookies::attach_token_pair(
                jar,
                &pair,
                state.jwt.access_ttl_seconds(),
                state.jwt.refresh_ttl_seconds(),
                secure_cookies(&state),
            );
            (jar, Redirect::to(&state.config.app_base_url))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Magic link verification failed");
            let login_url = format!("{}/login?error=invalid_link", state.config.app_base_url);
            (jar, Redirect::to(&login_url))
        }
    }
}

async fn enroll(
    state: &AppState,
    raw_token: &str,
    device: &DeviceInfo,
) -> Result<TokenPair, ServiceError> {
    let (identifier, purpose) = state.magic_links.consume(raw_token).await?;

    let user = match state.db.find_user_by_email(&identifier).await? {
        Some(user) => user,
        None => match purpose {
            // The link itself proved ownership of the address.
            TokenPurpose::Signup => {
                let user = User::new(identifier.clone(), None);
                state.db.insert_user(&user).await?;
                tracing::info!(user_id = %user.id, "User created via signup link");
                user
            }
            TokenPurpose::Login => return Err(ServiceError::UserNotFound),
        },
    };

    let (_, pair) = state.sessions.login(&user, device).await?;
    Ok(pair)
}

/// Exchange the refresh credential for a fresh pair.
///
/// Strongly consistent with revocation: a logged-out session fails here
/// even while its signature and TTL are still intact.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let refresh_token = cookies::refresh_token(&jar)
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Authentication required")))?;

    let pair = state.sessions.refresh(&refresh_token).await?;

    let response = state.jwt.token_response(&pair);
    let jar = cookies::attach_token_pair(
        jar,
        &pair,
        state.jwt.access_ttl_seconds(),
        state.jwt.refresh_ttl_seconds(),
        secure_cookies(&state),
    );

    Ok((jar, Json(response)))
}

/// Revoke the current session and clear the credential cookies.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.logout(user.0.session_id).await?;

    let jar = cookies::clear_token_pair(jar);
    Ok((
        jar,
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

/// Revoke every active session of the subject ("log out everywhere").
pub async fn logout_all(
    State(state): State<AppState>,
    user: AuthUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let revoked = state.sessions.logout_all(user.0.user.id).await?;

    let jar = cookies::clear_token_pair(jar);
    Ok((
        jar,
        Json(MessageResponse {
            message: format!("Logged out of {} session(s)", revoked),
        }),
    ))
}

/// The authenticated subject's profile.
pub async fn get_me(user: AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(user.0.user))
}

/// The subject's live sessions, current one flagged.
pub async fn list_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<SessionInfo>>, AppError> {
    let current_session_id = user.0.session_id;
    let sessions = state.db.list_active_sessions(user.0.user.id).await?;

    let infos = sessions
        .into_iter()
        .map(|s| {
            let mut info = SessionInfo::from(s);
            info.is_current = info.session_id == current_session_id;
            info
        })
        .collect();

    Ok(Json(infos))
}

fn secure_cookies(state: &AppState) -> bool {
    state.config.environment == Environment::Prod
}
