//! HTML pages for the upload endpoint

use crate::transfer::UploadedFile;

const PAGE_STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:40rem;margin:3rem auto;padding:0 1rem}\
li{margin:.25rem 0}code{background:#f2f2f2;padding:0 .25rem}";

/// Form served by `GET /upload`
pub fn upload_form() -> String {
    page(
        "Upload files",
        r#"<h1>Upload files</h1>
<form action="/upload" method="post" enctype="multipart/form-data">
  <input type="file" name="file" multiple required>
  <button type="submit">Upload</button>
</form>"#,
    )
}

/// Confirmation served after `POST /upload`
pub fn upload_complete(files: &[UploadedFile]) -> String {
    let mut body = String::from("<h1>Upload complete</h1>\n");

    if files.is_empty() {
        body.push_str("<p>No files were submitted.</p>\n");
    } else {
        body.push_str(&format!("<p>{} file(s) received:</p>\n<ul>\n", files.len()));
        for file in files {
            body.push_str(&format!(
                "  <li><code>{}</code> ({} bytes)</li>\n",
                html_escape::encode_text(&file.file_name),
                file.bytes
            ));
        }
        body.push_str("</ul>\n");
    }

    body.push_str(r#"<p><a href="/upload">Upload more</a></p>"#);
    page("Upload complete", &body)
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        html_escape::encode_text(title),
        PAGE_STYLE,
        body
    )
}
