//! Origin-location markers to filesystem paths
//!
//! History markers name their file as a URI. Supported forms:
//! - `file:///abs/path` (and `file:///c%3A/...` on Windows)
//! - `vscode-remote://<authority>/abs/path` (authority is discarded)
//! - a bare absolute path

use std::path::PathBuf;

use percent_encoding::percent_decode_str;

const FILE_SCHEME: &str = "file";
const REMOTE_SCHEME: &str = "vscode-remote";

/// Convert a marker `resource` value to a local path.
///
/// Returns `None` for empty values, unknown schemes and relative bare paths.
pub fn normalize_resource(raw: &str) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match split_scheme(raw) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case(FILE_SCHEME) => uri_path(rest),
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case(REMOTE_SCHEME) => uri_path(rest),
        Some((scheme, _)) => {
            tracing::debug!("Unsupported resource scheme '{}' in {}", scheme, raw);
            None
        }
        None => {
            let path = PathBuf::from(raw);
            if path.is_absolute() || raw.starts_with('/') || has_drive_prefix(raw) {
                Some(path)
            } else {
                None
            }
        }
    }
}

/// Find an embedded `file://` URI in a line of text
pub fn find_file_uri(line: &str) -> Option<&str> {
    let start = line.find("file://")?;
    let tail = &line[start..];
    let end = tail
        .find(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>' | ')' | '`'))
        .unwrap_or(tail.len());
    let uri = &tail[..end];
    if uri.len() > "file://".len() {
        Some(uri)
    } else {
        None
    }
}

/// `scheme://rest` -> `(scheme, rest)`
fn split_scheme(raw: &str) -> Option<(&str, &str)> {
    let idx = raw.find("://")?;
    let scheme = &raw[..idx];
    let valid = !scheme.is_empty()
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if valid {
        Some((scheme, &raw[idx + 3..]))
    } else {
        None
    }
}

/// Path part of `authority/path?query#fragment`, percent-decoded
fn uri_path(after_scheme: &str) -> Option<PathBuf> {
    let without_suffix = after_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(after_scheme);

    // Everything before the first slash is the authority (empty for file:///)
    let path_part = &without_suffix[without_suffix.find('/')?..];
    let decoded = percent_decode_str(path_part).decode_utf8_lossy();

    // "/c:/Users/x" -> "c:/Users/x"
    let trimmed = match decoded.strip_prefix('/') {
        Some(rest) if has_drive_prefix(rest) => rest,
        _ => &*decoded,
    };

    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

fn has_drive_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_uri() {
        assert_eq!(
            normalize_resource("file:///ws/dir/deleted.txt"),
            Some(PathBuf::from("/ws/dir/deleted.txt"))
        );
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(
            normalize_resource("file:///ws/my%20notes/caf%C3%A9.md"),
            Some(PathBuf::from("/ws/my notes/café.md"))
        );
    }

    #[test]
    fn test_remote_uri_drops_host() {
        assert_eq!(
            normalize_resource("vscode-remote://ssh-remote%2Bbox/home/me/ws/a.rs"),
            Some(PathBuf::from("/home/me/ws/a.rs"))
        );
    }

    #[test]
    fn test_windows_drive_form() {
        assert_eq!(
            normalize_resource("file:///c%3A/Users/me/a.txt"),
            Some(PathBuf::from("c:/Users/me/a.txt"))
        );
    }

    #[test]
    fn test_bare_and_unknown() {
        assert_eq!(normalize_resource("/ws/a.txt"), Some(PathBuf::from("/ws/a.txt")));
        assert_eq!(normalize_resource("relative/a.txt"), None);
        assert_eq!(normalize_resource("untitled://Untitled-1"), None);
        assert_eq!(normalize_resource("   "), None);
    }

    #[test]
    fn test_find_embedded_uri() {
        assert_eq!(
            find_file_uri("// origin: \"file:///ws/src/main.rs\" saved"),
            Some("file:///ws/src/main.rs")
        );
        assert_eq!(find_file_uri("no marker here"), None);
        assert_eq!(find_file_uri("file:// "), None);
    }
}
