//! Download streaming

use axum::{
    body::{Body, Bytes},
    http::{header, StatusCode},
    response::Response,
};
use futures::Stream;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::archive::{ArchiveBuilder, ArchiveJob};
use crate::error::{AppError, Result};
use crate::paths::{PathRegistry, PathRole};

use super::{content_disposition, OCTET_STREAM};

/// Read buffer for download bodies: 256KB
const DOWNLOAD_BUFFER_SIZE: usize = 256 * 1024;

/// Serve the configured download target.
///
/// Directories are archived first; the archive lives exactly as long as the
/// response body.
pub async fn serve_download(paths: &PathRegistry, builder: &ArchiveBuilder) -> Result<Response> {
    let target = paths.get(PathRole::Download)?;

    let metadata = tokio::fs::metadata(&target).await?;

    if metadata.is_dir() {
        let job = builder.build_blocking(target.clone()).await?;
        let file = File::open(job.path()).await?;
        let len = file.metadata().await?.len();

        tracing::info!(
            source = %target.display(),
            file_name = %job.download_name(),
            size = len,
            "Serving directory archive"
        );

        let content_type = job.format().mime_type();
        let file_name = job.download_name().to_string();
        let stream = ArchiveStream {
            inner: ReaderStream::with_capacity(file, DOWNLOAD_BUFFER_SIZE),
            _job: job,
        };

        respond(content_type, &file_name, len, Body::from_stream(stream))
    } else {
        let file = File::open(&target).await?;
        let file_name = base_name(&target);

        tracing::info!(
            path = %target.display(),
            file_name = %file_name,
            size = metadata.len(),
            "Serving file"
        );

        let stream = ReaderStream::with_capacity(file, DOWNLOAD_BUFFER_SIZE);
        respond(OCTET_STREAM, &file_name, metadata.len(), Body::from_stream(stream))
    }
}

fn respond(content_type: &str, file_name: &str, len: u64, body: Body) -> Result<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, len)
        .header(header::CONTENT_DISPOSITION, content_disposition(file_name))
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string())
}

/// File stream that keeps its temporary archive alive until dropped
struct ArchiveStream {
    inner: ReaderStream<File>,
    _job: ArchiveJob,
}

impl Stream for ArchiveStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
