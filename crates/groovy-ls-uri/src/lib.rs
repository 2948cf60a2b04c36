//! URI <-> filesystem path conversion and normalization utilities.
//!
//! The document store, workspace indexer and external boundary all need a single,
//! consistent notion of "the same document" regardless of how its URI was spelled by
//! the client. This crate is the one place that logic lives (see the position-math
//! centralization note in `SPEC_FULL.md` §9, which applies equally to URI math).
//!
//! Most functions are unavailable on `wasm32` targets since they require filesystem
//! access; `uri_key`, `is_file_uri`, `is_special_scheme` and `uri_extension` are pure
//! string operations and work everywhere.

use url::Url;

/// Convert a `file://` URI to a filesystem path.
///
/// Returns `None` if the URI is not a valid `file://` URI.
#[cfg(not(target_arch = "wasm32"))]
pub fn uri_to_fs_path(uri: &str) -> Option<std::path::PathBuf> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}

/// Convert a filesystem path to a `file://` URI.
///
/// # Errors
///
/// Returns an error if the path cannot be made absolute or converted to a URI.
#[cfg(not(target_arch = "wasm32"))]
pub fn fs_path_to_uri<P: AsRef<std::path::Path>>(path: P) -> Result<String, String> {
    let path = path.as_ref();
    let abs_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| format!("failed to get current directory: {e}"))?
            .join(path)
    };
    Url::from_file_path(&abs_path)
        .map(|url| url.to_string())
        .map_err(|()| format!("failed to convert path to URI: {}", abs_path.display()))
}

/// Normalize a URI to a consistent string form.
///
/// Valid URIs are re-serialized; bare file paths are converted to `file://` URIs;
/// special schemes (`untitled:`, `git:`, ...) are preserved as-is.
#[cfg(not(target_arch = "wasm32"))]
pub fn normalize_uri(uri: &str) -> String {
    if let Ok(url) = Url::parse(uri) {
        return url.to_string();
    }

    let path = std::path::Path::new(uri);
    if let Ok(uri_string) = fs_path_to_uri(path) {
        return uri_string;
    }

    if uri.starts_with("file://") {
        if let Some(fs_path) = uri_to_fs_path(uri) {
            if let Ok(normalized) = fs_path_to_uri(&fs_path) {
                return normalized;
            }
        }
    }

    uri.to_string()
}

/// Normalize a URI to a consistent string form (`wasm32`: no filesystem access).
#[cfg(target_arch = "wasm32")]
pub fn normalize_uri(uri: &str) -> String {
    if let Ok(url) = Url::parse(uri) { url.to_string() } else { uri.to_string() }
}

/// Normalize a URI to a consistent key for map lookups.
///
/// Windows drive letters are lowercased (`file:///C:/foo` -> `file:///c:/foo`) so the
/// document store and workspace index treat both spellings as the same URI.
pub fn uri_key(uri: &str) -> String {
    if let Ok(u) = Url::parse(uri) {
        let s = u.as_str().to_string();
        if let Some(rest) = s.strip_prefix("file:///") {
            if rest.len() > 1 && rest.as_bytes()[1] == b':' && rest.as_bytes()[0].is_ascii_alphabetic() {
                return format!("file:///{}{}", rest[0..1].to_ascii_lowercase(), &rest[1..]);
            }
        }
        s
    } else {
        uri.to_string()
    }
}

/// Whether a URI uses the `file://` scheme.
pub fn is_file_uri(uri: &str) -> bool {
    uri.starts_with("file://")
}

/// Whether a URI uses a scheme other than `file://` (`untitled:`, `git:`, ...).
pub fn is_special_scheme(uri: &str) -> bool {
    if let Ok(url) = Url::parse(uri) {
        url.scheme() != "file"
    } else {
        uri.starts_with("untitled:") || uri.starts_with("git:") || uri.starts_with("vscode-notebook:")
    }
}

/// Extract the file extension from a URI's last path segment, ignoring query/fragment.
pub fn uri_extension(uri: &str) -> Option<&str> {
    let path_part = uri.rsplit('/').next()?;
    let path_part = path_part.split('?').next()?;
    let path_part = path_part.split('#').next()?;
    let dot_pos = path_part.rfind('.')?;
    let ext = &path_part[dot_pos + 1..];
    if ext.is_empty() { None } else { Some(ext) }
}

/// Whether a URI's extension marks it as a Groovy-family source file.
///
/// Matches the workspace indexer's source-root scan (`SPEC_FULL.md` §4.8): `.groovy`,
/// `.java`, and the Gradle-script variants that embed Groovy.
pub fn is_groovy_source(uri: &str) -> bool {
    matches!(
        uri_extension(uri).map(str::to_ascii_lowercase).as_deref(),
        Some("groovy" | "gvy" | "gy" | "gsh" | "java")
    )
}
