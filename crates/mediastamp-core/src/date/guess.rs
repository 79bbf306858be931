use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

/// Date (and optional time) digits pulled out of a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameDate {
    /// Always exactly 8 digits, `YYYYMMDD`.
    pub date: String,
    /// Exactly 6 digits, `HHMMSS`, when the convention carries a time.
    pub time: Option<String>,
}

/// How a pattern exposes its date and time captures.
enum Layout {
    /// `date` group only.
    DateOnly,
    /// `date` and `time` groups, both contiguous digits.
    DateTime,
    /// Separate `y`/`m`/`d` and `hh`/`mm`/`ss` groups that get joined.
    Split,
}

struct FilenamePattern {
    name: &'static str,
    regex: &'static LazyLock<Regex>,
    layout: Layout,
}

static RE_WHATSAPP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:IMG|VID)-(?P<date>\d{8})-WA\d+").unwrap());
static RE_PIXEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^PXL_(?P<date>\d{8})_(?P<time>\d{6})").unwrap());
static RE_DEVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<date>\d{8})[_-](?P<time>\d{6})").unwrap());
static RE_EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<y>\d{4})[-_](?P<m>\d{2})[-_](?P<d>\d{2})[ _T.-](?P<hh>\d{2})[.\-_:](?P<mm>\d{2})[.\-_:](?P<ss>\d{2})",
    )
    .unwrap()
});
static RE_LEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?P<date>\d{8})").unwrap());

// Order matters: the bare leading date would also match the device convention.
static PATTERNS: &[FilenamePattern] = &[
    FilenamePattern { name: "whatsapp", regex: &RE_WHATSAPP, layout: Layout::DateOnly },
    FilenamePattern { name: "pixel", regex: &RE_PIXEL, layout: Layout::DateTime },
    FilenamePattern { name: "device", regex: &RE_DEVICE, layout: Layout::DateTime },
    FilenamePattern { name: "export", regex: &RE_EXPORT, layout: Layout::Split },
    FilenamePattern { name: "leading-date", regex: &RE_LEADING, layout: Layout::DateOnly },
];

impl FilenamePattern {
    fn extract(&self, caps: &Captures) -> (Option<String>, Option<String>) {
        let group = |name: &str| caps.name(name).map(|m| m.as_str());
        match self.layout {
            Layout::DateOnly => (group("date").map(str::to_string), None),
            Layout::DateTime => (
                group("date").map(str::to_string),
                group("time").map(str::to_string),
            ),
            Layout::Split => {
                let date = match (group("y"), group("m"), group("d")) {
                    (Some(y), Some(m), Some(d)) => Some(format!("{y}{m}{d}")),
                    _ => None,
                };
                let time = match (group("hh"), group("mm"), group("ss")) {
                    (Some(h), Some(m), Some(s)) => Some(format!("{h}{m}{s}")),
                    _ => None,
                };
                (date, time)
            }
        }
    }
}

fn all_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

/// Match a file stem (no extension) against the known naming conventions.
/// The first pattern that matches with a valid 8-digit date wins.
pub fn match_stem(stem: &str) -> Option<FilenameDate> {
    for pat in PATTERNS {
        let Some(caps) = pat.regex.captures(stem) else {
            continue;
        };
        let (date, time) = pat.extract(&caps);
        let Some(date) = date.filter(|d| all_digits(d, 8)) else {
            continue;
        };
        // A malformed time degrades to date-only rather than rejecting the match.
        let time = time.filter(|t| all_digits(t, 6));
        log::trace!("filename {stem:?} matched {} convention", pat.name);
        return Some(FilenameDate { date, time });
    }

    None
}

/// Match a file name or path; the directory part and extension are ignored.
pub fn guess_from_filename(filename: &str) -> Option<FilenameDate> {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    match_stem(stem)
}
