use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::services::auth::{AuthService, UserInfo};
use crate::AppState;

/// Caller identity resolved from the Authorization bearer token via the
/// identity provider's userinfo endpoint (cached per token fingerprint).
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub info: UserInfo,
}

impl AuthenticatedUser {
    /// Provider email, when the identity carries one.
    pub fn email(&self) -> &str {
        self.info.email.as_deref().unwrap_or("")
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or((StatusCode::UNAUTHORIZED, "Invalid Authorization header format"))?;

        let info = AuthService::resolve_user(
            &state.http,
            &state.userinfo_cache,
            &state.config.auth_domain,
            token,
        )
        .await
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

        Ok(AuthenticatedUser {
            id: info.sub.clone(),
            info,
        })
    }
}
