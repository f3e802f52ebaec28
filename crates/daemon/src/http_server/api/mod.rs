use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use http::{HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

use common::prelude::ExportError;

pub mod auth;
pub mod disposition;
pub mod public;
pub mod raw;
pub mod stream;

pub use auth::CurrentUser;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    let cors_layer = CorsLayer::new()
        .allow_methods(vec![Method::GET])
        .allow_headers(vec![
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            ORIGIN,
            HeaderName::from_static(auth::AUTH_HEADER),
        ])
        .allow_origin(Any)
        .allow_credentials(false);

    Router::new()
        .route("/raw", get(raw::root_handler))
        .route("/raw/", get(raw::root_handler))
        .route("/raw/*path", get(raw::handler))
        .route("/public/dl/:token/*name", get(public::handler))
        .with_state(state)
        .layer(cors_layer)
}

/// Status for an export failure discovered before the body started.
pub fn export_status(err: &ExportError) -> StatusCode {
    match err {
        ExportError::MalformedEncoding { .. } | ExportError::UnsupportedFormat(_) => {
            StatusCode::BAD_REQUEST
        }
        ExportError::NotFound { .. } => StatusCode::NOT_FOUND,
        ExportError::Io { source, .. }
            if source.kind() == std::io::ErrorKind::PermissionDenied =>
        {
            StatusCode::FORBIDDEN
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
