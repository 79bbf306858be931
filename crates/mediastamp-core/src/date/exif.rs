use exif::{In, Reader, Tag};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// The three EXIF date fields, as raw text. `None` means missing or blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifDates {
    pub date_time_original: Option<String>,
    pub date_time_digitized: Option<String>,
    pub date_time: Option<String>,
}

impl ExifDates {
    /// DateTimeOriginal is the authoritative capture-date tag.
    pub fn has_capture_date(&self) -> bool {
        self.date_time_original.is_some()
    }
}

/// Read the date fields from an image file.
/// EXIF datetimes have no timezone info - they are local time as-is.
pub fn read_exif_dates(path: &Path) -> anyhow::Result<ExifDates> {
    let file = File::open(path)?;
    let exif = Reader::new().read_from_container(&mut BufReader::new(file))?;

    let field_text = |tag: Tag| -> Option<String> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        let text = match &field.value {
            exif::Value::Ascii(parts) => parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).into_owned())
                .collect::<Vec<_>>()
                .join(" "),
            _ => field.display_value().to_string(),
        };
        let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0').to_string();
        (!text.is_empty()).then_some(text)
    };

    Ok(ExifDates {
        date_time_original: field_text(Tag::DateTimeOriginal),
        date_time_digitized: field_text(Tag::DateTimeDigitized),
        date_time: field_text(Tag::DateTime),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_capture_date_requires_original() {
        let dates = ExifDates {
            date_time_original: None,
            date_time_digitized: Some("2020:01:01 00:00:00".to_string()),
            date_time: None,
        };
        assert!(!dates.has_capture_date());
    }

    #[test]
    fn test_non_image_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a jpeg").unwrap();
        assert!(read_exif_dates(file.path()).is_err());
    }
}
