use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderName;

use crate::app::Caller;
use crate::http::AppError;
use crate::AppState;

const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
const ADMIN_HEADER: HeaderName = HeaderName::from_static("x-user-admin");

/// Caller identity forwarded by the upstream auth gateway.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Caller);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing x-user-id header"))?
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::unauthorized("invalid x-user-id header"))?;

        let is_admin = parts
            .headers
            .get(ADMIN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(AuthUser(Caller { user_id, is_admin }))
    }
}
