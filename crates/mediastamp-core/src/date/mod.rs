pub mod exif;
pub mod guess;

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

pub use guess::FilenameDate;

/// Where a resolved timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    EmbeddedTag,
    Filename,
    FilesystemHeuristic,
    /// Folder-year cap replaced a filesystem time.
    Default,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provenance::EmbeddedTag => "embedded tag",
            Provenance::Filename => "filename",
            Provenance::FilesystemHeuristic => "file time",
            Provenance::Default => "folder year",
        };
        f.write_str(s)
    }
}

/// A naive local instant plus the signal it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateTimestamp {
    pub instant: NaiveDateTime,
    pub provenance: Provenance,
}

impl CandidateTimestamp {
    pub fn new(instant: NaiveDateTime, provenance: Provenance) -> Self {
        Self { instant, provenance }
    }

    /// `YYYY:MM:DD HH:MM:SS`, the embedded-tag convention.
    pub fn exif_string(&self) -> String {
        self.instant.format("%Y:%m:%d %H:%M:%S").to_string()
    }

    /// `YYYY-MM-DDTHH:MM:SS`, used for sidecars and container metadata.
    pub fn iso_string(&self) -> String {
        self.instant.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// Time of day to use when a filename only carries a date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeDefault {
    #[default]
    Zero,
    Noon,
    KeepMtime,
}

impl FromStr for TimeDefault {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero" => Ok(TimeDefault::Zero),
            "noon" => Ok(TimeDefault::Noon),
            "keep-mtime" => Ok(TimeDefault::KeepMtime),
            other => Err(format!("unknown time default '{other}' (expected zero, noon or keep-mtime)")),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("filename date {0} is not a valid calendar date")]
    InvalidDate(String),
    #[error("filename time {0} is not a valid time of day")]
    InvalidTime(String),
}

fn digits(s: &str, range: std::ops::Range<usize>) -> Option<u32> {
    s.get(range)?.parse().ok()
}

fn parse_date(d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(digits(d, 0..4)? as i32, digits(d, 4..6)?, digits(d, 6..8)?)
}

fn parse_time(t: &str) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(digits(t, 0..2)?, digits(t, 2..4)?, digits(t, 4..6)?)
}

/// Build an instant from filename digits, filling a missing time from `time_default`.
pub fn compose_datetime(
    candidate: &FilenameDate,
    time_default: TimeDefault,
    fs_modified: NaiveDateTime,
) -> Result<NaiveDateTime, ResolveError> {
    let date = parse_date(&candidate.date)
        .ok_or_else(|| ResolveError::InvalidDate(candidate.date.clone()))?;

    let time = match &candidate.time {
        Some(t) => parse_time(t).ok_or_else(|| ResolveError::InvalidTime(t.clone()))?,
        None => match time_default {
            TimeDefault::Zero => NaiveTime::default(),
            TimeDefault::Noon => NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default(),
            TimeDefault::KeepMtime => {
                let t = fs_modified.time();
                NaiveTime::from_hms_opt(t.hour(), t.minute(), t.second()).unwrap_or_default()
            }
        },
    };

    Ok(date.and_time(time))
}

/// The earlier of the filesystem created and modified times.
pub fn best_file_time(fs_created: NaiveDateTime, fs_modified: NaiveDateTime) -> NaiveDateTime {
    fs_created.min(fs_modified)
}

/// Pick the canonical instant for one file.
///
/// Precedence: a filename-derived date (when supplied) beats the best file time.
/// Only a file-time result is subject to the folder-year cap: if its year is
/// later than the hint, it becomes the last second of the hint year.
pub fn resolve(
    fs_created: NaiveDateTime,
    fs_modified: NaiveDateTime,
    folder_year_hint: Option<i32>,
    filename_candidate: Option<&FilenameDate>,
    time_default: TimeDefault,
) -> Result<CandidateTimestamp, ResolveError> {
    if let Some(candidate) = filename_candidate {
        let instant = compose_datetime(candidate, time_default, fs_modified)?;
        return Ok(CandidateTimestamp::new(instant, Provenance::Filename));
    }

    let best = best_file_time(fs_created, fs_modified);
    if let Some(year) = folder_year_hint {
        if best.year() > year {
            if let Some(capped) = NaiveDate::from_ymd_opt(year, 12, 31).and_then(|d| d.and_hms_opt(23, 59, 59)) {
                return Ok(CandidateTimestamp::new(capped, Provenance::Default));
            }
        }
    }

    Ok(CandidateTimestamp::new(best, Provenance::FilesystemHeuristic))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn fname(date: &str, time: Option<&str>) -> FilenameDate {
        FilenameDate {
            date: date.to_string(),
            time: time.map(str::to_string),
        }
    }

    #[test]
    fn test_filename_date_with_zero_default() {
        let c = fname("20210704", None);
        let r = resolve(dt("2022-03-01 10:00:00"), dt("2022-03-01 10:00:00"), None, Some(&c), TimeDefault::Zero).unwrap();
        assert_eq!(r.instant, dt("2021-07-04 00:00:00"));
        assert_eq!(r.provenance, Provenance::Filename);
    }

    #[test]
    fn test_time_default_policies() {
        let c = fname("20210704", None);
        let mtime = dt("2022-03-01 17:45:12");
        let noon = resolve(mtime, mtime, None, Some(&c), TimeDefault::Noon).unwrap();
        assert_eq!(noon.instant, dt("2021-07-04 12:00:00"));
        let keep = resolve(mtime, mtime, None, Some(&c), TimeDefault::KeepMtime).unwrap();
        assert_eq!(keep.instant, dt("2021-07-04 17:45:12"));
    }

    #[test]
    fn test_filename_time_wins_over_default() {
        let c = fname("20230115", Some("143000"));
        let r = resolve(dt("2024-01-01 00:00:00"), dt("2024-01-01 00:00:00"), None, Some(&c), TimeDefault::Noon).unwrap();
        assert_eq!(r.instant, dt("2023-01-15 14:30:00"));
    }

    #[test]
    fn test_best_file_time_is_earlier() {
        let r = resolve(dt("2020-05-05 08:00:00"), dt("2019-01-01 09:00:00"), None, None, TimeDefault::Zero).unwrap();
        assert_eq!(r.instant, dt("2019-01-01 09:00:00"));
        assert_eq!(r.provenance, Provenance::FilesystemHeuristic);
    }

    #[test]
    fn test_folder_year_caps_file_time() {
        let r = resolve(dt("2023-06-01 10:00:00"), dt("2023-07-01 10:00:00"), Some(2019), None, TimeDefault::Zero).unwrap();
        assert_eq!(r.instant, dt("2019-12-31 23:59:59"));
        assert_eq!(r.provenance, Provenance::Default);
    }

    #[test]
    fn test_folder_year_does_not_raise_older_times() {
        let r = resolve(dt("2017-06-01 10:00:00"), dt("2017-07-01 10:00:00"), Some(2019), None, TimeDefault::Zero).unwrap();
        assert_eq!(r.instant, dt("2017-06-01 10:00:00"));
        let same = resolve(dt("2019-06-01 10:00:00"), dt("2019-07-01 10:00:00"), Some(2019), None, TimeDefault::Zero).unwrap();
        assert_eq!(same.provenance, Provenance::FilesystemHeuristic);
    }

    #[test]
    fn test_folder_year_never_overrides_filename() {
        let c = fname("20230115", Some("143000"));
        let r = resolve(dt("2023-06-01 10:00:00"), dt("2023-06-01 10:00:00"), Some(2019), Some(&c), TimeDefault::Zero).unwrap();
        assert_eq!(r.instant, dt("2023-01-15 14:30:00"));
    }

    #[test]
    fn test_invalid_calendar_values_fail() {
        let mtime = dt("2022-03-01 10:00:00");
        let bad_month = fname("20211345", None);
        assert_eq!(
            resolve(mtime, mtime, None, Some(&bad_month), TimeDefault::Zero),
            Err(ResolveError::InvalidDate("20211345".to_string()))
        );
        let bad_time = fname("20210101", Some("250000"));
        assert_eq!(
            resolve(mtime, mtime, None, Some(&bad_time), TimeDefault::Zero),
            Err(ResolveError::InvalidTime("250000".to_string()))
        );
    }

    #[test]
    fn test_formatting_per_sink() {
        let c = CandidateTimestamp::new(dt("2021-07-04 08:09:10"), Provenance::Filename);
        assert_eq!(c.exif_string(), "2021:07:04 08:09:10");
        assert_eq!(c.iso_string(), "2021-07-04T08:09:10");
    }

    #[test]
    fn test_time_default_from_str() {
        assert_eq!("keep-mtime".parse::<TimeDefault>(), Ok(TimeDefault::KeepMtime));
        assert!("midnight".parse::<TimeDefault>().is_err());
    }
}
