use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());

/// Check if a folder name is a bare 4-digit year
pub fn is_year_folder(name: &str) -> bool {
    YEAR_RE.is_match(name)
}

/// Year encoded in a directory of `path`, e.g. `photos/2019/img.jpg` -> 2019.
///
/// Only directory segments count, never the file name. Both `/` and `\` are
/// treated as separators so copied Windows paths behave the same. When several
/// segments qualify, the one nearest the root wins.
pub fn folder_year_hint(path: &Path) -> Option<i32> {
    let text = path.to_string_lossy();
    let mut segments: Vec<&str> = text.split(['/', '\\']).collect();
    segments.pop();
    segments
        .into_iter()
        .find(|s| is_year_folder(s))
        .and_then(|s| s.parse().ok())
}
