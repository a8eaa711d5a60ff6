//! Link classification and artifact naming.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::JobKind;

/// Runs of characters that are not safe in an artifact file name.
static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

const STREAM_PLAYLIST_EXT: &str = ".m3u8";
const STREAM_OUTPUT_EXT: &str = ".mp4";
const FALLBACK_BASENAME: &str = "file";
const FALLBACK_BATCH_DIR: &str = "batch";

/// Last non-empty path segment of a link, still percent-encoded.
///
/// Inputs that do not parse as an absolute URL are treated as a bare path.
fn last_segment(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or("")
            .to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or("")
            .split('/')
            .filter(|s| !s.is_empty())
            .last()
            .unwrap_or("")
            .to_string(),
    }
}

/// Replaces unsafe runs with `_` and strips leading/trailing `_` and `.`.
fn sanitize(raw: &str) -> String {
    let sanitized = UNSAFE_CHARS.replace_all(raw, "_");
    sanitized.trim_matches(|c| c == '_' || c == '.').to_string()
}

/// Classifies a link: streaming playlists are remuxed, everything else is
/// downloaded as-is.
pub fn detect_kind(url: &str) -> JobKind {
    if last_segment(url)
        .to_ascii_lowercase()
        .ends_with(STREAM_PLAYLIST_EXT)
    {
        JobKind::Stream
    } else {
        JobKind::Plain
    }
}

/// Directory name for one batch inside the working directory.
pub fn batch_dir_name(batch_id: &str) -> String {
    let name = sanitize(batch_id);
    if name.is_empty() {
        FALLBACK_BATCH_DIR.to_string()
    } else {
        name
    }
}

/// Derives a filesystem-safe base name from the last URL path segment.
///
/// Stream artifacts always end in `.mp4`, replacing a `.m3u8` extension.
pub fn artifact_basename(url: &str, kind: JobKind) -> String {
    let segment = last_segment(url);
    let decoded = urlencoding::decode(&segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.clone());

    let sanitized = sanitize(&decoded);
    let mut name = if sanitized.is_empty() {
        FALLBACK_BASENAME.to_string()
    } else {
        sanitized
    };

    if kind == JobKind::Stream {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(STREAM_PLAYLIST_EXT) {
            name.truncate(name.len() - STREAM_PLAYLIST_EXT.len());
        }
        if !name.to_ascii_lowercase().ends_with(STREAM_OUTPUT_EXT) {
            name.push_str(STREAM_OUTPUT_EXT);
        }
    }

    name
}
