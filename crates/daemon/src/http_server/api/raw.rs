//! Raw content: single files, or archive and playlist exports of a directory.

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tokio::runtime::Handle;

use common::path::slash_clean;
use common::prelude::*;

use super::auth::CurrentUser;
use super::{disposition, export_status, stream};
use crate::database::SqliteLinkStore;
use crate::ServiceState;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawQuery {
    /// Comma separated, percent-encoded names relative to the request path
    pub files: Option<String>,
    /// Export format token
    pub algo: Option<String>,
    /// Origin for playlist links
    pub base: Option<String>,
    /// `true` to display a single file inline
    pub inline: Option<String>,
}

pub async fn root_handler(
    State(state): State<ServiceState>,
    user: CurrentUser,
    Query(query): Query<RawQuery>,
) -> Result<Response, RawError> {
    serve(state, user, "/", query).await
}

pub async fn handler(
    State(state): State<ServiceState>,
    user: CurrentUser,
    Path(path): Path<String>,
    Query(query): Query<RawQuery>,
) -> Result<Response, RawError> {
    serve(state, user, &path, query).await
}

async fn serve(
    state: ServiceState,
    CurrentUser(user): CurrentUser,
    path: &str,
    query: RawQuery,
) -> Result<Response, RawError> {
    if !user.download {
        return Ok(StatusCode::ACCEPTED.into_response());
    }

    let path = slash_clean(path);
    if !user.rules.check(&path) {
        return Err(RawError::Forbidden(path));
    }

    let fs = user.filesystem(state.root());
    let node = fs.stat(&path).map_err(|e| ExportError::io(&path, e))?;

    if !node.is_dir {
        let disposition = match query.inline.as_deref() {
            Some("true") => disposition::inline(),
            _ => disposition::attachment(&node.name),
        };
        let content_type = mime_guess::from_path(&node.name).first_or_octet_stream();
        let content_type = HeaderValue::try_from(content_type.as_ref())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        tracing::info!(user = %user.username, path = %path, "raw file download");

        let body = stream::spawn_file(fs, node).await?;
        return Ok((
            [(CONTENT_TYPE, content_type), (CONTENT_DISPOSITION, disposition)],
            body,
        )
            .into_response());
    }

    let format: ExportFormat = query.algo.as_deref().unwrap_or_default().parse()?;
    let target = ExportTarget::resolve(query.files.as_deref(), &path)?;
    let file_name = format.file_name(&node.name);
    tracing::info!(
        user = %user.username,
        path = %path,
        targets = target.len(),
        format = ?format,
        "export requested"
    );

    let body = match format {
        ExportFormat::Archive(archive) => {
            let base = naming_base(&target);
            stream::spawn_export(move |sink| {
                export_archive(&fs, &user.rules, &target, archive, &base, sink).map(|_| ())
            })
            .await?
        }
        ExportFormat::Playlist => {
            let store = SqliteLinkStore::new(state.database().clone(), Handle::current());
            let base_url = query
                .base
                .or_else(|| state.base_url().map(str::to_string))
                .unwrap_or_default();
            stream::spawn_export(move |sink| {
                let issuer = LinkIssuer::new(&store, &OsTokenSource);
                let job = PlaylistExport {
                    fs: &fs,
                    access: &user.rules,
                    classifier: &MimeClassifier,
                    issuer: &issuer,
                    owner: user.id,
                    base_url: &base_url,
                };
                export_playlist(&job, &target, sink).map(|_| ())
            })
            .await?
        }
    };

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static(format.content_type())),
            (CONTENT_DISPOSITION, disposition::attachment(&file_name)),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum RawError {
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("access denied: {0}")]
    Forbidden(String),
}

impl IntoResponse for RawError {
    fn into_response(self) -> Response {
        let status = match &self {
            RawError::Export(err) => export_status(err),
            RawError::Forbidden(_) => StatusCode::FORBIDDEN,
        };
        if status.is_server_error() {
            tracing::error!("RAW ERROR: {:?}", self);
        } else {
            tracing::debug!("raw request rejected: {}", self);
        }
        let msg = serde_json::json!({ "msg": self.to_string() });
        (status, Json(msg)).into_response()
    }
}
