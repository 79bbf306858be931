//! Embedded tag access for photos.
//!
//! Reading goes through `kamadak-exif`; writing goes through `little_exif`,
//! which rewrites the EXIF segment in place.

use std::path::Path;

use anyhow::Context;
use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata;

use crate::date::exif::{read_exif_dates, ExifDates};

/// Load/mutate/dump access to a photo's embedded date tags.
pub trait TagStore {
    /// Read the current date fields.
    fn read_dates(&self, path: &Path) -> anyhow::Result<ExifDates>;

    /// Set DateTimeOriginal, DateTimeDigitized and DateTime to `value`
    /// (already formatted as `YYYY:MM:DD HH:MM:SS`).
    fn write_dates(&self, path: &Path, value: &str) -> anyhow::Result<()>;

    /// Whether the authoritative capture-date tag is present.
    /// Unreadable tags count as absent.
    fn has_capture_date(&self, path: &Path) -> bool {
        match self.read_dates(path) {
            Ok(dates) => dates.has_capture_date(),
            Err(e) => {
                log::debug!("could not read tags from {}: {e:#}", path.display());
                false
            }
        }
    }
}

/// EXIF tag store backed by the image file itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifTagStore;

impl TagStore for ExifTagStore {
    fn read_dates(&self, path: &Path) -> anyhow::Result<ExifDates> {
        read_exif_dates(path).with_context(|| format!("Failed to read EXIF from {}", path.display()))
    }

    fn write_dates(&self, path: &Path, value: &str) -> anyhow::Result<()> {
        let mut metadata = Metadata::new_from_path(path)
            .with_context(|| format!("Failed to load EXIF from {}", path.display()))?;
        metadata.set_tag(ExifTag::DateTimeOriginal(value.to_string()));
        metadata.set_tag(ExifTag::CreateDate(value.to_string()));
        metadata.set_tag(ExifTag::ModifyDate(value.to_string()));
        metadata
            .write_to_file(path)
            .with_context(|| format!("Failed to write EXIF to {}", path.display()))?;
        Ok(())
    }
}
