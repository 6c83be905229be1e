use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{dtos::ErrorResponse, middleware::cookies, services::Identity, AppState};

fn unauthenticated() -> (StatusCode, Json<ErrorResponse>) {
    // One response for every failure mode: missing, malformed, forged and
    // expired credentials must be indistinguishable to the caller.
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Authentication required".to_string(),
        }),
    )
}

/// Middleware to require authentication on protected routes.
///
/// Reads the access credential from its cookie (with an Authorization
/// bearer fallback for non-browser clients), resolves it to an identity
/// and stores that in request extensions. No session-store read happens
/// here; a revoked session is rejected once its access credential expires.
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let token = cookies::access_token(&jar).or_else(|| {
        req.headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    });

    let token = match token {
        Some(token) => token,
        None => return Err(unauthenticated()),
    };

    let identity = match state.resolver.resolve(&token).await {
        Ok(Some(identity)) => identity,
        Ok(None) => return Err(unauthenticated()),
        Err(e) => {
            tracing::error!(error = %e, "Identity resolution failed");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Internal server error".to_string(),
                }),
            ));
        }
    };

    // Store the identity in request extensions so handlers can access it
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Extractor to easily get the authenticated identity in handlers.
pub struct AuthUser(pub Identity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts.extensions.get::<Identity>().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Identity missing from request extensions".to_string(),
            }),
        ))?;

        Ok(AuthUser(identity.clone()))
    }
}
