//! Download and upload streaming
//!
//! - Downloads stream a file (or a freshly built archive) from disk.
//! - Uploads stream multipart file parts to disk through a fixed-size buffer.

pub mod download;
pub mod upload;

pub use download::serve_download;
pub use upload::{receive_upload, validate_file_name, UploadedFile};

/// Content type for raw file downloads
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Build an `attachment` Content-Disposition value for `file_name`.
///
/// `filename` carries a quoted ASCII fallback; names with other characters
/// also get an RFC 5987 `filename*` parameter with the exact name.
pub fn content_disposition(file_name: &str) -> String {
    let mut fallback = String::with_capacity(file_name.len() + 2);
    for ch in file_name.chars() {
        match ch {
            '"' | '\\' => {
                fallback.push('\\');
                fallback.push(ch);
            }
            ' '..='~' => fallback.push(ch),
            _ => fallback.push('_'),
        }
    }

    if file_name.is_ascii() && !file_name.chars().any(|c| c.is_ascii_control()) {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(file_name)
        )
    }
}
