//! Destination file names.
//!
//! Photos and videos become `YYYYMMDD_HHMMSS_<sanitized stem>.<lowercase ext>`;
//! every other category keeps its original name untouched.

use crate::file_category::Category;
use crate::timestamp::MediaTimestamp;
use std::ffi::OsString;
use std::path::Path;

/// Whitespace for naming purposes: Unicode `White_Space` plus the ASCII
/// separator controls U+001C..U+001F.
fn is_fold_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Folds whitespace in a filename fragment.
///
/// Trims the ends, turns each whitespace run into one underscore, then
/// collapses underscore runs. Other characters pass through unchanged.
///
/// # Examples
///
/// ```
/// use media_sorter::naming::sanitize;
///
/// assert_eq!(sanitize("  my   holiday photo "), "my_holiday_photo");
/// assert_eq!(sanitize("a _ b"), "a_b");
/// ```
pub fn sanitize(raw: &str) -> String {
    let spaced = raw
        .split(is_fold_space)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let mut out = String::with_capacity(spaced.len());
    for c in spaced.chars() {
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Builds the date-prefixed name for a photo or video.
pub fn media_file_name(source: &Path, timestamp: &MediaTimestamp) -> OsString {
    let stem = source
        .file_stem()
        .map(|s| sanitize(&s.to_string_lossy()))
        .unwrap_or_default();

    let mut name = OsString::from(format!("{}_{}", timestamp.name_part(), stem));
    if let Some(ext) = source.extension() {
        name.push(".");
        name.push(ext.to_string_lossy().to_lowercase());
    }
    name
}

/// Chooses the destination name for `source`.
///
/// `timestamp` is only consulted for media categories, which callers resolve
/// beforehand.
pub fn destination_name(
    source: &Path,
    category: Category,
    timestamp: Option<&MediaTimestamp>,
) -> OsString {
    match (category.is_media(), timestamp) {
        (true, Some(ts)) => media_file_name(source, ts),
        _ => source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default(),
    }
}
