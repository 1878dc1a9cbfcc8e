//! Input image references and their conversion to data URLs.

use base64::{Engine, engine::general_purpose::STANDARD};
use flux_mcp_common::error::Result;
use std::path::Path;
use tracing::debug;

const DATA_URL_PREFIX: &str = "data:";

/// Whether `reference` is already inline data.
pub fn is_data_url(reference: &str) -> bool {
    reference.starts_with(DATA_URL_PREFIX)
}

/// Whether `reference` is an http(s) URL.
pub fn is_remote_url(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Mime type from a file extension, defaulting to PNG.
///
/// `photo.JPG` maps to `image/jpg` rather than `image/jpeg`; the service
/// accepts both.
pub fn mime_type_for_path(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "png".to_string());

    format!("image/{}", extension)
}

/// Encode bytes as a base64 data URL.
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Normalize an image reference for submission.
///
/// Data URLs and http(s) URLs are returned unchanged. A path naming an
/// existing regular file is read and inlined as a data URL. Anything else
/// is returned unchanged for the service to interpret.
///
/// # Errors
/// Returns `Error::Io` if an existing file cannot be read.
pub async fn normalize_image_reference(reference: &str) -> Result<String> {
    if is_data_url(reference) || is_remote_url(reference) {
        return Ok(reference.to_string());
    }

    let path = Path::new(reference);
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => {}
        _ => {
            debug!(reference = %reference, "Not a local file, passing reference through");
            return Ok(reference.to_string());
        }
    }

    let bytes = tokio::fs::read(path).await?;
    let mime_type = mime_type_for_path(path);
    debug!(path = %path.display(), mime_type = %mime_type, size = bytes.len(), "Inlined local image");

    Ok(to_data_url(&mime_type, &bytes))
}
