//! Utility functions for turning remote names into safe path segments

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Maximum length of a sanitized path segment in bytes
///
/// Leaves headroom for suffixes appended by callers (` (ARCHIVED)`, ` 12.md`,
/// ` (Card Cover)`) without hitting the common 255-byte file name limit.
pub const MAX_SEGMENT_LEN: usize = 240;

/// Fallback file name when a download URL has no usable path segment
pub const UNKNOWN_FILE_NAME: &str = "UnknownFile";

#[allow(clippy::expect_used)]
static ILLEGAL_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[<>:"/\\|?*\x00-\x1F\x7F]"#).expect("static pattern is valid")
});

fn is_edge_char(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | '_' | '-')
}

/// Sanitize a remote display name into a single safe path segment
///
/// Characters that are illegal on common filesystems (`< > : " / \ | ? *`) and ASCII
/// control characters become `-`. Leading and trailing spaces, dots, underscores and
/// dashes are trimmed so the segment is never hidden or empty. The result is capped at
/// [`MAX_SEGMENT_LEN`] bytes on a character boundary.
///
/// # Arguments
///
/// * `name` - Board, list, card, checklist or attachment name as delivered by the API
///
/// # Returns
///
/// A non-empty segment. Names that sanitize to nothing become
/// `Unnamed-{YYYYmmdd-HHMMSS}` (local time), and a warning is logged.
///
/// # Examples
///
/// ```
/// use trello_dump::utils::sanitize_path_name;
///
/// assert_eq!(sanitize_path_name("Q3: Plan/Review?"), "Q3- Plan-Review");
/// assert_eq!(sanitize_path_name("  .hidden  "), "hidden");
/// ```
pub fn sanitize_path_name(name: &str) -> String {
    let replaced = ILLEGAL_CHARS.replace_all(name, "-");
    let trimmed = replaced.trim_matches(is_edge_char);

    if trimmed.is_empty() {
        let fallback = format!("Unnamed-{}", chrono::Local::now().format("%Y%m%d-%H%M%S"));
        tracing::warn!(
            original = name,
            fallback = %fallback,
            "name sanitized to empty string, using fallback"
        );
        return fallback;
    }

    let truncated = truncate_on_char_boundary(trimmed, MAX_SEGMENT_LEN);
    truncated.trim_end_matches(is_edge_char).to_string()
}

fn truncate_on_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Last non-empty path segment of a URL, or [`UNKNOWN_FILE_NAME`]
///
/// Percent-encoding in the segment is decoded. Used to name downloaded board
/// backgrounds.
///
/// # Examples
///
/// ```
/// use trello_dump::utils::file_name_from_url;
///
/// assert_eq!(file_name_from_url("https://img.example.com/bg/sky%20blue.jpg"), "sky blue.jpg");
/// assert_eq!(file_name_from_url("https://img.example.com/"), "UnknownFile");
/// ```
pub fn file_name_from_url(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return UNKNOWN_FILE_NAME.to_string();
    };

    parsed
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_FILE_NAME.to_string())
}

/// Insert a suffix before a file name's extension
///
/// `photo.jpg` + ` (Card Cover)` becomes `photo (Card Cover).jpg`. Names without an
/// extension (or dot-files) get the suffix appended.
pub fn with_name_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => {
            let (stem, ext) = file_name.split_at(idx);
            format!("{stem}{suffix}{ext}")
        }
        _ => format!("{file_name}{suffix}"),
    }
}

/// Hands out names that are unique within one scope (a card, a list, a directory)
///
/// Repeats are numbered with a counter shared by every name in the scope that only
/// grows: `Tasks`, `Tasks`, `Notes`, `Notes` become `Tasks`, `Tasks 1`, `Notes`,
/// `Notes 2`. A numbered candidate that is already taken is skipped.
#[derive(Debug, Default)]
pub struct UniqueNames {
    used: HashSet<String>,
    counter: usize,
}

impl UniqueNames {
    /// Mark a name as taken without numbering it
    pub fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    /// Claim `name`, numbering it as `{name} {n}` when already taken
    pub fn claim(&mut self, name: &str) -> String {
        self.claim_with(name, |n| format!("{name} {n}"))
    }

    /// Claim a file name, numbering it before the extension (`image 1.png`)
    pub fn claim_file(&mut self, file_name: &str) -> String {
        self.claim_with(file_name, |n| with_name_suffix(file_name, &format!(" {n}")))
    }

    fn claim_with(&mut self, name: &str, numbered: impl Fn(usize) -> String) -> String {
        let mut candidate = name.to_string();
        while self.used.contains(&candidate) {
            self.counter += 1;
            candidate = numbered(self.counter);
        }
        self.used.insert(candidate.clone());
        candidate
    }
}
