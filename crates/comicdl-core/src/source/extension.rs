//! File extension resolution for fetched images.

/// Extensions the downloader produces and recognizes when checking for
/// already-downloaded issues.
pub const KNOWN_EXTENSIONS: &[&str] = &[".jpeg", ".jpg", ".png", ".gif", ".webp"];

/// Used when neither the URL nor the content type gives a known extension.
pub const DEFAULT_EXTENSION: &str = ".jpeg";

pub fn is_known_extension(ext: &str) -> bool {
    KNOWN_EXTENSIONS.iter().any(|k| k.eq_ignore_ascii_case(ext))
}

/// Resolve the extension from the URL path suffix, then the `Content-Type`
/// header, then fall back to [`DEFAULT_EXTENSION`].
pub fn resolve_extension(url_path: &str, content_type: Option<&str>) -> String {
    if let Some(ext) = path_extension(url_path) {
        if is_known_extension(&ext) {
            return ext;
        }
    }
    content_type
        .and_then(extension_for_mime)
        .unwrap_or(DEFAULT_EXTENSION)
        .to_string()
}

fn path_extension(url_path: &str) -> Option<String> {
    let name = url_path.rsplit('/').next()?;
    let dot = name.rfind('.')?;
    let ext = &name[dot..];
    if ext.len() < 2 {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(".jpeg"),
        "image/png" => Some(".png"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        _ => None,
    }
}
