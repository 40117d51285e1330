use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::resolver::manifest::ManifestError;

pub type AppResult<T> = Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("missing query parameter: {0}")]
    MissingParameter(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("failed to fetch episode page: {message}")]
    FetchFailed {
        status: Option<u16>,
        message: String,
    },
    #[error("no video manifest found in the episode page")]
    ManifestNotFound,
    #[error("failed to parse the video manifest: {0}")]
    ManifestParseError(String),
    #[error("no video servers found for the episode")]
    NoServersFound,
    #[error("internal server error")]
    InternalServerError,
    #[error("{0}")]
    InternalServerErrorWithContext(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::ManifestNotFound | Self::NoServersFound => {
                StatusCode::NOT_FOUND
            }
            // upstream 5xx is passed through as is, anything else means the upstream is the
            // problem and not us
            Self::FetchFailed { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::ManifestParseError(_)
            | Self::InternalServerError
            | Self::InternalServerErrorWithContext(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ManifestError> for Error {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::NotFound => Self::ManifestNotFound,
            ManifestError::Parse(e) => Self::ManifestParseError(e.to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!("request failed with {}: {}", status, self);
        }

        let body = match &self {
            Self::FetchFailed {
                status: Some(upstream),
                ..
            } => json!({ "error": self.to_string(), "upstreamStatus": upstream }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
