//! Multipart upload streaming
//!
//! Each file part is written straight to the upload directory through a
//! fixed-size buffer, so memory use does not grow with file size. Parts are
//! independent: a failure leaves earlier files in place.

use axum::extract::multipart::{Field, Multipart};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::{AppError, Result};
use crate::paths::{PathRegistry, PathRole};

/// One file written by an upload request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_name: String,
    pub path: String,
    pub bytes: u64,
}

/// Write every file part of `multipart` into the upload directory.
///
/// Parts without a file name are form fields and are skipped. An empty
/// `filename=""`, as browsers send for an empty file input, counts as none.
/// The upload directory is only looked up once a file part arrives.
pub async fn receive_upload(
    mut multipart: Multipart,
    paths: &PathRegistry,
    chunk_size: usize,
) -> Result<Vec<UploadedFile>> {
    let mut upload_dir: Option<PathBuf> = None;
    let mut written = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        let Some(declared) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            tracing::debug!(field = ?field.name(), "Skipping non-file form field");
            continue;
        };

        let dir = match &upload_dir {
            Some(dir) => dir.clone(),
            None => {
                let dir = paths.get(PathRole::Upload)?;
                upload_dir = Some(dir.clone());
                dir
            }
        };

        let file_name = validate_file_name(&declared)?;
        let destination = dir.join(file_name);

        tracing::debug!(
            file_name = %file_name,
            destination = %destination.display(),
            content_type = ?field.content_type(),
            "Receiving file part"
        );

        let bytes = match write_field(&mut field, &destination, chunk_size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                // Drop the partial file; earlier parts stay committed
                if let Err(cleanup) = tokio::fs::remove_file(&destination).await {
                    tracing::warn!(
                        path = %destination.display(),
                        "Failed to remove partial upload: {}",
                        cleanup
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            file_name = %file_name,
            path = %destination.display(),
            size = bytes,
            "File uploaded"
        );

        written.push(UploadedFile {
            file_name: file_name.to_string(),
            path: destination.to_string_lossy().into_owned(),
            bytes,
        });
    }

    Ok(written)
}

/// Stream one part to `destination`, returning the number of bytes written
async fn write_field(field: &mut Field<'_>, destination: &Path, chunk_size: usize) -> Result<u64> {
    let file = File::create(destination).await?;
    let mut writer = BufWriter::with_capacity(chunk_size, file);
    let mut total: u64 = 0;

    while let Some(chunk) = field.chunk().await? {
        writer.write_all(&chunk).await?;
        total += chunk.len() as u64;
    }

    writer.flush().await?;
    Ok(total)
}

/// Accept only a single plain file name.
///
/// Anything that could land outside the upload directory (`..`, absolute
/// paths, separators of either flavor) is rejected.
pub fn validate_file_name(name: &str) -> Result<&str> {
    let invalid = || AppError::InvalidFileName(name.to_string());

    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return Err(invalid());
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(invalid()),
    }
}
