use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDateTime;

/// Extension-based classification that picks the write strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaClass {
    /// JPEG/TIFF: embedded EXIF tags.
    Photo,
    /// PNG/BMP/GIF/WebP: XMP sidecar next to the file.
    SidecarNeeded,
    /// AVI: full transcode to a modern container.
    LegacyContainer,
    /// MP4/MOV/M4V/3GP: metadata-only remux.
    ModernVideo,
    Unsupported,
}

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "tif", "tiff"];
const SIDECAR_EXTENSIONS: &[&str] = &["png", "bmp", "gif", "webp"];
const LEGACY_EXTENSIONS: &[&str] = &["avi"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "3gp", "3g2"];

impl MediaClass {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let Some(ext) = ext else {
            return MediaClass::Unsupported;
        };
        let ext = ext.as_str();

        if PHOTO_EXTENSIONS.contains(&ext) {
            MediaClass::Photo
        } else if SIDECAR_EXTENSIONS.contains(&ext) {
            MediaClass::SidecarNeeded
        } else if LEGACY_EXTENSIONS.contains(&ext) {
            MediaClass::LegacyContainer
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            MediaClass::ModernVideo
        } else {
            MediaClass::Unsupported
        }
    }

    pub fn is_video(self) -> bool {
        matches!(self, MediaClass::LegacyContainer | MediaClass::ModernVideo)
    }
}

impl fmt::Display for MediaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaClass::Photo => "photo",
            MediaClass::SidecarNeeded => "sidecar",
            MediaClass::LegacyContainer => "avi",
            MediaClass::ModernVideo => "video",
            MediaClass::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// Snapshot of a file taken once, right before dispatch.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub class: MediaClass,
    /// Filesystem creation time (falls back to modified where unsupported).
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
}

fn to_local(time: SystemTime) -> NaiveDateTime {
    let datetime: chrono::DateTime<chrono::Local> = time.into();
    datetime.naive_local()
}

impl MediaFile {
    pub fn new(path: PathBuf, class: MediaClass, created: NaiveDateTime, modified: NaiveDateTime) -> Self {
        Self {
            path,
            class,
            created,
            modified,
        }
    }

    /// Stat the file and classify it by extension.
    pub fn snapshot(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let modified = metadata.modified()?;
        let created = metadata.created().unwrap_or(modified);

        Ok(Self::new(
            path.to_path_buf(),
            MediaClass::from_path(path),
            to_local(created),
            to_local(modified),
        ))
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;

    #[test]
    fn test_classification_by_extension() {
        assert_eq!(MediaClass::from_path(Path::new("a.JPG")), MediaClass::Photo);
        assert_eq!(MediaClass::from_path(Path::new("a.tiff")), MediaClass::Photo);
        assert_eq!(MediaClass::from_path(Path::new("a.webp")), MediaClass::SidecarNeeded);
        assert_eq!(MediaClass::from_path(Path::new("a.Avi")), MediaClass::LegacyContainer);
        assert_eq!(MediaClass::from_path(Path::new("a.3g2")), MediaClass::ModernVideo);
        assert_eq!(MediaClass::from_path(Path::new("a.mov")), MediaClass::ModernVideo);
        assert_eq!(MediaClass::from_path(Path::new("a.png.xmp")), MediaClass::Unsupported);
        assert_eq!(MediaClass::from_path(Path::new("README")), MediaClass::Unsupported);
    }

    #[test]
    fn test_snapshot_reads_file_times() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"x").unwrap();
        let mtime = NaiveDateTime::parse_from_str("2022-03-01 10:20:30", "%Y-%m-%d %H:%M:%S").unwrap();
        let local = mtime.and_local_timezone(chrono::Local).single().unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(local.timestamp(), 0)).unwrap();

        let file = MediaFile::snapshot(&path).unwrap();
        assert_eq!(file.class, MediaClass::ModernVideo);
        assert_eq!(file.modified, mtime);
        assert!(file.created >= file.modified);
        assert_eq!(file.file_name(), "clip.mp4");
    }
}
