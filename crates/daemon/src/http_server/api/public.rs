//! Credential-free downloads through share links minted by playlist exports.

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use time::OffsetDateTime;

use common::prelude::*;

use super::{disposition, export_status, stream};
use crate::ServiceState;

/// `GET /api/public/dl/:token/*name`. The trailing name is cosmetic, the
/// token alone selects the file.
pub async fn handler(
    State(state): State<ServiceState>,
    Path((token, _name)): Path<(String, String)>,
) -> Result<Response, PublicError> {
    let link = state
        .database()
        .get_share_link(&token)
        .await?
        .ok_or(PublicError::UnknownLink)?;

    if link.is_expired_at(OffsetDateTime::now_utc()) {
        state.database().delete_share_link(&link.hash).await?;
        tracing::debug!(hash = %link.hash, "expired share link removed");
        return Err(PublicError::UnknownLink);
    }

    let owner = state
        .users()
        .find(link.user_id)
        .ok_or(PublicError::UnknownLink)?;
    let fs = owner.filesystem(state.root());
    let node = fs
        .stat(&link.path)
        .map_err(|e| ExportError::io(&link.path, e))?;
    if node.is_dir {
        return Err(PublicError::UnknownLink);
    }

    let content_type = mime_guess::from_path(&node.name).first_or_octet_stream();
    let content_type = HeaderValue::try_from(content_type.as_ref())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = disposition::attachment(&node.name);
    tracing::info!(hash = %link.hash, path = %link.path, "public download");

    let body = stream::spawn_file(fs, node).await?;
    Ok((
        [(CONTENT_TYPE, content_type), (CONTENT_DISPOSITION, disposition)],
        body,
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum PublicError {
    #[error("share link not found")]
    UnknownLink,
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for PublicError {
    fn into_response(self) -> Response {
        let status = match &self {
            PublicError::UnknownLink => StatusCode::NOT_FOUND,
            PublicError::Export(err) => export_status(err),
            PublicError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("PUBLIC DOWNLOAD ERROR: {:?}", self);
        }
        let msg = serde_json::json!({ "msg": self.to_string() });
        (status, Json(msg)).into_response()
    }
}
