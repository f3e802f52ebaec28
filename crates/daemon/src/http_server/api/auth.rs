use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::users::User;
use crate::ServiceState;

/// Header carrying a bare API token.
pub const AUTH_HEADER: &str = "x-auth";

/// Query parameter carrying the token, for links opened straight in a browser.
pub const AUTH_PARAM: &str = "auth";

/// The authenticated principal of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Arc<User>);

fn token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if let Some(token) = bearer {
        return Some(token.trim().to_string());
    }

    if let Some(token) = parts.headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(token.trim().to_string());
    }

    let query = parts.uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == AUTH_PARAM)
        .map(|(_, value)| value.into_owned())
}

#[async_trait]
impl FromRequestParts<ServiceState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        let token = token(parts).ok_or(AuthError::MissingToken)?;
        let user = state
            .users()
            .authenticate(&token)
            .ok_or(AuthError::UnknownToken)?;
        tracing::debug!(user = %user.username, "authenticated");
        Ok(CurrentUser(user))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingToken,
    #[error("invalid credentials")]
    UnknownToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::warn!("rejected request: {}", self);
        let msg = serde_json::json!({ "msg": self.to_string() });
        (StatusCode::UNAUTHORIZED, Json(msg)).into_response()
    }
}
