//! Content-type lookup by file extension.

use std::path::Path;

/// Content type used when the extension is not recognized.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Returns the content type for `path`, decided by its extension alone.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("mp4") => "video/mp4",
        Some("webp") => "image/webp",
        Some("webm") => "video/webm",
        _ => OCTET_STREAM,
    }
}
