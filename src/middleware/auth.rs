use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::error::AppError;

/// Request-scoped principal resolved from the bearer token
///
/// Handlers read this from request extensions instead of any ambient
/// current-user state.
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub Uuid);

/// Middleware that resolves `Authorization: Bearer <token>` to a user
///
/// Rejects with 401 when the header is missing, malformed, or the token is
/// unknown to the session table. Privilege checks (403) stay with the
/// handlers that need them.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let user_id = state
        .store
        .resolve_token(token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    request.extensions_mut().insert(CurrentUser(user_id));

    Ok(next.run(request).await)
}
