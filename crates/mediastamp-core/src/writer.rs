use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use log::{info, warn};

use crate::config::TranscodeSettings;
use crate::date::{self, guess, CandidateTimestamp, ResolveError, TimeDefault};
use crate::folder_classify::folder_year_hint;
use crate::media::{MediaClass, MediaFile};
use crate::sidecar;
use crate::tags::TagStore;
use crate::transcoder::{TranscodeError, Transcoder};

/// Whether the run mutates anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Log intent and count outcomes, touch nothing.
    Simulate,
    #[default]
    Apply,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Simulate => f.write_str("DRY-RUN (no changes made)"),
            RunMode::Apply => f.write_str("APPLY (files modified)"),
        }
    }
}

/// Per-run switches that shape every write decision.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub mode: RunMode,
    /// Overwrite an existing authoritative date.
    pub force: bool,
    /// Remove a legacy container after a successful conversion.
    pub delete_originals: bool,
    /// Prefer a date parsed from the file name over file times.
    pub from_filename: bool,
    pub time_default: TimeDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Authoritative date already present and not forcing.
    AlreadyDated,
    /// Probe found no valid media stream.
    Broken,
    Unsupported,
    /// Metadata was only displayed.
    ShowMeta,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::AlreadyDated => "already dated",
            SkipReason::Broken => "broken",
            SkipReason::Unsupported => "unsupported format",
            SkipReason::ShowMeta => "show-meta",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("failed to set EXIF date: {0}")]
    Tags(String),
    #[error("failed to write sidecar {path}: {source}")]
    Sidecar {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
    #[error("refusing to convert {path}: output extension '{ext}' matches the source")]
    SameContainer { path: PathBuf, ext: String },
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WriteError {
    pub(crate) fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        WriteError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Outcome of one file. Every processed file produces exactly one.
#[derive(Debug)]
pub enum WriteResult {
    Applied,
    Skipped(SkipReason),
    Failed(WriteError),
}

impl From<Result<(), WriteError>> for WriteResult {
    fn from(result: Result<(), WriteError>) -> Self {
        match result {
            Ok(()) => WriteResult::Applied,
            Err(e) => WriteResult::Failed(e),
        }
    }
}

/// `dir/name.ext` -> `dir/name.tmp.<ext>`, always in the same directory.
pub fn temp_path(path: &Path, ext: &str) -> PathBuf {
    let mut name: OsString = path.file_stem().map(|s| s.to_owned()).unwrap_or_default();
    name.push(".tmp.");
    name.push(ext);
    path.with_file_name(name)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Best-effort removal of a leftover temp artifact.
fn remove_temp(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("[WARN] Could not remove temp file {}: {}", path.display(), e);
        }
    }
}

fn restore_times(path: &Path, atime: FileTime, mtime: FileTime) {
    if let Err(e) = filetime::set_file_times(path, atime, mtime) {
        warn!("[WARN] Could not restore file times on {}: {}", path.display(), e);
    }
}

/// Routes each file to the write strategy for its media class.
pub struct Dispatcher<'a> {
    tags: &'a dyn TagStore,
    transcoder: &'a dyn Transcoder,
    settings: &'a TranscodeSettings,
    options: WriteOptions,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        tags: &'a dyn TagStore,
        transcoder: &'a dyn Transcoder,
        settings: &'a TranscodeSettings,
        options: WriteOptions,
    ) -> Self {
        Self {
            tags,
            transcoder,
            settings,
            options,
        }
    }

    fn simulate(&self) -> bool {
        self.options.mode == RunMode::Simulate
    }

    /// Resolve the canonical timestamp for `file`.
    pub fn resolve(&self, file: &MediaFile) -> Result<CandidateTimestamp, ResolveError> {
        let from_name = if self.options.from_filename {
            guess::guess_from_filename(file.file_name())
        } else {
            None
        };
        date::resolve(
            file.created,
            file.modified,
            folder_year_hint(&file.path),
            from_name.as_ref(),
            self.options.time_default,
        )
    }

    /// Existence check and probe. `Some` means the file stops here.
    fn precheck(&self, file: &MediaFile) -> Result<Option<SkipReason>, WriteError> {
        let path = file.path.as_path();
        match file.class {
            MediaClass::Photo => {
                if !self.options.force && self.tags.has_capture_date(path) {
                    info!("[SKIP][PHOTO] {} already has DateTimeOriginal", path.display());
                    return Ok(Some(SkipReason::AlreadyDated));
                }
                Ok(None)
            }
            MediaClass::ModernVideo => {
                let report = self.transcoder.probe(path)?;
                if !report.has_streams {
                    warn!("[BROKEN][VIDEO] {} (no valid streams)", path.display());
                    return Ok(Some(SkipReason::Broken));
                }
                if !self.options.force && report.is_dated() {
                    info!(
                        "[SKIP][VIDEO] {} already has creation_time {}",
                        path.display(),
                        report.creation_time.as_deref().unwrap_or_default()
                    );
                    return Ok(Some(SkipReason::AlreadyDated));
                }
                Ok(None)
            }
            MediaClass::SidecarNeeded | MediaClass::LegacyContainer => Ok(None),
            MediaClass::Unsupported => Ok(Some(SkipReason::Unsupported)),
        }
    }

    /// Classified -> (skip | resolve -> write).
    pub fn dispatch(&self, file: &MediaFile) -> WriteResult {
        if file.class == MediaClass::Unsupported {
            info!("[SKIP] {} (unsupported format)", file.path.display());
            return WriteResult::Skipped(SkipReason::Unsupported);
        }

        match self.precheck(file) {
            Ok(Some(reason)) => return WriteResult::Skipped(reason),
            Ok(None) => {}
            Err(e) => return WriteResult::Failed(e),
        }

        match self.resolve(file) {
            Ok(ts) => self.write(file, &ts),
            Err(e) => WriteResult::Failed(e.into()),
        }
    }

    /// Apply an already-resolved timestamp using the class strategy.
    pub fn write(&self, file: &MediaFile, ts: &CandidateTimestamp) -> WriteResult {
        match file.class {
            MediaClass::Photo => self.write_photo(&file.path, ts).into(),
            MediaClass::SidecarNeeded => self.write_sidecar(&file.path, ts).into(),
            MediaClass::ModernVideo => self.remux_video(&file.path, ts).into(),
            MediaClass::LegacyContainer => self.convert_legacy(&file.path, ts).into(),
            MediaClass::Unsupported => WriteResult::Skipped(SkipReason::Unsupported),
        }
    }

    fn write_photo(&self, path: &Path, ts: &CandidateTimestamp) -> Result<(), WriteError> {
        let formatted = ts.exif_string();
        if self.simulate() {
            info!(
                "[DRY-RUN][PHOTO] Would set DateTimeOriginal for {} -> {} (from {})",
                path.display(),
                formatted,
                ts.provenance
            );
            return Ok(());
        }

        let meta = fs::metadata(path).map_err(|e| WriteError::io("Failed to stat", path, e))?;
        let atime = FileTime::from_last_access_time(&meta);
        let mtime = FileTime::from_last_modification_time(&meta);

        self.tags
            .write_dates(path, &formatted)
            .map_err(|e| WriteError::Tags(format!("{e:#}")))?;
        restore_times(path, atime, mtime);

        info!(
            "[PHOTO] Set DateTimeOriginal for {} -> {} (from {})",
            path.display(),
            formatted,
            ts.provenance
        );
        Ok(())
    }

    fn write_sidecar(&self, path: &Path, ts: &CandidateTimestamp) -> Result<(), WriteError> {
        let formatted = ts.iso_string();
        let target = sidecar::sidecar_path(path);
        if self.simulate() {
            info!(
                "[DRY-RUN][SIDECAR] Would create {} -> {} (from {})",
                target.display(),
                formatted,
                ts.provenance
            );
            return Ok(());
        }

        sidecar::write_sidecar(path, &formatted)
            .map_err(|source| WriteError::Sidecar { path: target.clone(), source })?;
        info!("[SIDECAR] Created {} -> {} (from {})", target.display(), formatted, ts.provenance);
        Ok(())
    }

    fn remux_video(&self, path: &Path, ts: &CandidateTimestamp) -> Result<(), WriteError> {
        let formatted = ts.iso_string();
        if self.simulate() {
            info!(
                "[DRY-RUN][VIDEO] Would set creation_time for {} -> {} (from {})",
                path.display(),
                formatted,
                ts.provenance
            );
            return Ok(());
        }

        let meta = fs::metadata(path).map_err(|e| WriteError::io("Failed to stat", path, e))?;
        let atime = FileTime::from_last_access_time(&meta);
        let mtime = FileTime::from_last_modification_time(&meta);
        let tmp = temp_path(path, &extension_of(path));

        if let Err(e) = self.transcoder.remux(path, &tmp, &formatted) {
            remove_temp(&tmp);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, path) {
            remove_temp(&tmp);
            return Err(WriteError::io("Failed to replace", path, e));
        }
        restore_times(path, atime, mtime);

        info!(
            "[VIDEO] Set creation_time for {} -> {} (from {})",
            path.display(),
            formatted,
            ts.provenance
        );
        Ok(())
    }

    fn convert_legacy(&self, path: &Path, ts: &CandidateTimestamp) -> Result<(), WriteError> {
        let formatted = ts.iso_string();
        let ext = self.settings.output_extension.as_str();
        // The converted file sits next to the source, never on top of it.
        if extension_of(path).eq_ignore_ascii_case(ext) {
            return Err(WriteError::SameContainer {
                path: path.to_path_buf(),
                ext: ext.to_string(),
            });
        }
        let output = path.with_extension(ext);

        if self.simulate() {
            info!(
                "[DRY-RUN][AVI] Would convert {} -> {} (date={}, from {})",
                path.display(),
                output.display(),
                formatted,
                ts.provenance
            );
            if self.options.delete_originals {
                info!("[DRY-RUN][CLEANUP] Would delete original {}", path.display());
            }
            return Ok(());
        }

        let tmp = temp_path(path, ext);
        if let Err(e) = self.transcoder.transcode(path, &tmp, self.settings, &formatted) {
            remove_temp(&tmp);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &output) {
            remove_temp(&tmp);
            return Err(WriteError::io("Failed to move converted file to", &output, e));
        }
        info!(
            "[AVI] Converted {} -> {} (date={}, from {})",
            path.display(),
            output.display(),
            formatted,
            ts.provenance
        );

        if self.options.delete_originals && output != path {
            match fs::remove_file(path) {
                Ok(()) => info!("[CLEANUP] Deleted original {}", path.display()),
                Err(e) => warn!("[WARN] Could not delete {}: {}", path.display(), e),
            }
        }
        Ok(())
    }

    /// Human-readable report of what a file currently carries. Never mutates.
    pub fn describe(&self, file: &MediaFile) -> String {
        let stamp = |dt: chrono::NaiveDateTime| dt.format("%Y-%m-%d %H:%M:%S").to_string();
        let mut out = format!(
            "SHOW-META {}\n  Class:               {}\n  Filesystem Created:  {}\n  Filesystem Modified: {}",
            file.path.display(),
            file.class,
            stamp(file.created),
            stamp(file.modified)
        );
        let none = || "None".to_string();

        match file.class {
            MediaClass::Photo => match self.tags.read_dates(&file.path) {
                Ok(dates) => {
                    out.push_str(&format!(
                        "\n  DateTimeOriginal:    {}\n  DateTimeDigitized:   {}\n  DateTime (0th):      {}",
                        dates.date_time_original.unwrap_or_else(none),
                        dates.date_time_digitized.unwrap_or_else(none),
                        dates.date_time.unwrap_or_else(none)
                    ));
                }
                Err(e) => out.push_str(&format!("\n  EXIF:                unreadable ({e})")),
            },
            MediaClass::ModernVideo | MediaClass::LegacyContainer => match self.transcoder.probe(&file.path) {
                Ok(report) => {
                    out.push_str(&format!(
                        "\n  Streams:             {}\n  creation_time:       {}",
                        if report.has_streams { "yes" } else { "none" },
                        report.creation_time.unwrap_or_else(none)
                    ));
                }
                Err(e) => out.push_str(&format!("\n  Probe:               failed ({e})")),
            },
            MediaClass::SidecarNeeded => {
                let target = sidecar::sidecar_path(&file.path);
                out.push_str(&format!(
                    "\n  Sidecar:             {} ({})",
                    target.display(),
                    if target.exists() { "exists" } else { "missing" }
                ));
            }
            MediaClass::Unsupported => {}
        }
        out
    }
}
