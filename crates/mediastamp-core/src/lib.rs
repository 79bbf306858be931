pub mod cancel;
pub mod config;
pub mod date;
pub mod folder_classify;
pub mod media;
pub mod scan;
pub mod sidecar;
pub mod tags;
pub mod transcoder;
pub mod writer;

use std::path::{Path, PathBuf};

use log::{error, info, warn};

pub use cancel::{CancellationToken, CancelledError};
pub use config::{Config, TranscodeSettings};
pub use date::{CandidateTimestamp, Provenance, TimeDefault};
pub use media::{MediaClass, MediaFile};
pub use tags::{ExifTagStore, TagStore};
pub use transcoder::{FfmpegTranscoder, Transcoder};
pub use writer::{Dispatcher, RunMode, SkipReason, WriteError, WriteOptions, WriteResult};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub folder: PathBuf,
    pub recursive: bool,
    /// Only report current metadata; never write.
    pub show_meta: bool,
    pub write: WriteOptions,
    pub transcode: TranscodeSettings,
}

/// Run counters. `scanned` equals the sum of the other four.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub scanned: u64,
    pub photos_changed: u64,
    pub videos_changed: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl RunStats {
    /// Count one file outcome.
    pub fn record(&mut self, class: MediaClass, result: &WriteResult) {
        self.scanned += 1;
        match result {
            WriteResult::Applied if class.is_video() => self.videos_changed += 1,
            WriteResult::Applied => self.photos_changed += 1,
            WriteResult::Skipped(_) => self.skipped += 1,
            WriteResult::Failed(_) => self.errors += 1,
        }
    }
}

#[derive(Debug)]
pub struct ProcessResult {
    pub stats: RunStats,
    pub mode: RunMode,
    /// Stopped early by a cancellation request.
    pub interrupted: bool,
}

/// Control options for process execution.
#[derive(Debug, Clone, Default)]
pub struct ProcessControl {
    /// Checked between files.
    pub cancel_token: Option<CancellationToken>,
}

impl ProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }
}

/// Run the batch over `options.folder`.
pub fn process(
    options: &RunOptions,
    tags: &dyn TagStore,
    transcoder: &dyn Transcoder,
) -> anyhow::Result<ProcessResult> {
    process_with_control(options, tags, transcoder, &ProcessControl::default())
}

/// Run the batch with cancellation support.
pub fn process_with_control(
    options: &RunOptions,
    tags: &dyn TagStore,
    transcoder: &dyn Transcoder,
    control: &ProcessControl,
) -> anyhow::Result<ProcessResult> {
    if !options.folder.is_dir() {
        anyhow::bail!("Not a directory: {}", options.folder.display());
    }

    let dispatcher = Dispatcher::new(tags, transcoder, &options.transcode, options.write.clone());
    let paths = scan::discover(&options.folder, options.recursive);
    info!(
        "Found {} files in {}{}",
        paths.len(),
        options.folder.display(),
        if options.recursive { " (recursive)" } else { "" }
    );

    let mut stats = RunStats::default();
    let mut interrupted = false;

    for (i, path) in paths.iter().enumerate() {
        if let Some(ref token) = control.cancel_token {
            if token.check().is_err() {
                warn!("[WARN] Interrupted; {} files left untouched", paths.len() - i);
                interrupted = true;
                break;
            }
        }

        let (class, result) = process_path(&dispatcher, path, options.show_meta);
        if let WriteResult::Failed(ref e) = result {
            error!("[ERROR] {}: {}", path.display(), e);
        }
        stats.record(class, &result);
    }

    Ok(ProcessResult {
        stats,
        mode: options.write.mode,
        interrupted,
    })
}

fn process_path(dispatcher: &Dispatcher<'_>, path: &Path, show_meta: bool) -> (MediaClass, WriteResult) {
    let file = match MediaFile::snapshot(path) {
        Ok(f) => f,
        Err(e) => {
            return (
                MediaClass::from_path(path),
                WriteResult::Failed(WriteError::io("Failed to stat", path, e)),
            )
        }
    };

    if !show_meta {
        return (file.class, dispatcher.dispatch(&file));
    }

    if file.class == MediaClass::Unsupported {
        info!("[SKIP] {} (unsupported format)", path.display());
        return (file.class, WriteResult::Skipped(SkipReason::Unsupported));
    }
    println!("{}\n", dispatcher.describe(&file));
    (file.class, WriteResult::Skipped(SkipReason::ShowMeta))
}
