//! Error types for the LanShare server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::paths::PathRole;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// A role was never given a path
    #[error("No {0} path configured")]
    NotConfigured(PathRole),

    #[error("Path {path:?} could not be resolved: {source}")]
    Resolution {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Invalid upload file name: {0:?}")]
    InvalidFileName(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Io(e) => io_status(e),
            AppError::Walk(e) => e.io_error().map(io_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            AppError::Multipart(e) => e.status(),
            AppError::InvalidFileName(_) => StatusCode::BAD_REQUEST,
            AppError::Resolution { .. } | AppError::Archive(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether this error is escalated to the failure signal in fail-fast mode
    pub fn is_fatal(&self) -> bool {
        self.status().is_server_error()
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::NotConfigured(_) => "not_configured",
            AppError::Resolution { .. } => "resolution_error",
            AppError::NotFound(_) => "not_found",
            AppError::Io(_) | AppError::Walk(_) => "io_error",
            AppError::Archive(_) => "archive_error",
            AppError::Multipart(_) => "multipart_error",
            AppError::InvalidFileName(_) => "invalid_file_name",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::NotConfigured(role) => format!("The {} operation is not configured", role),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Multipart(e) => e.body_text(),
            AppError::InvalidFileName(name) => format!("Refusing to write file named {:?}", name),
            AppError::Io(_) | AppError::Walk(_) => match self.status() {
                StatusCode::NOT_FOUND => "Path does not exist".to_string(),
                StatusCode::FORBIDDEN => "Permission denied".to_string(),
                _ => "IO error".to_string(),
            },
            AppError::Resolution { .. } | AppError::Archive(_) | AppError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}

fn io_status(e: &io::Error) -> StatusCode {
    match e.kind() {
        io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Blocking task failed: {}", e))
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.public_message(),
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
