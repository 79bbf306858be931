use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use mediastamp_core::{
    CancellationToken, Config, ExifTagStore, FfmpegTranscoder, ProcessControl, ProcessResult, RunMode, RunOptions,
    TimeDefault, WriteOptions,
};

#[derive(Parser)]
#[command(name = "mediastamp", version, about = "Restore capture dates on photos and videos")]
struct Cli {
    /// Folder containing the media files
    folder: PathBuf,

    /// Show what would change without modifying anything
    #[arg(long)]
    dry_run: bool,

    /// Descend into subfolders
    #[arg(short, long)]
    recursive: bool,

    /// Take the date from recognized file name patterns when present
    #[arg(long)]
    from_filename: bool,

    /// Time of day for date-only file names: zero, noon or keep-mtime
    #[arg(long, default_value = "zero")]
    time_default: TimeDefault,

    /// Overwrite dates that are already present
    #[arg(long)]
    force: bool,

    /// Print current metadata and exit without writing
    #[arg(long)]
    show_meta: bool,

    /// Delete AVI originals after a successful conversion
    #[arg(long)]
    delete_originals: bool,

    /// Configuration file (TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn print_summary(result: &ProcessResult) {
    let stats = &result.stats;
    println!("\n=== SUMMARY ===");
    println!("Files scanned:     {}", stats.scanned);
    println!("Photos updated:    {}", stats.photos_changed);
    println!("Videos updated:    {}", stats.videos_changed);
    println!("Skipped (had date or not supported): {}", stats.skipped);
    println!("Errors:            {}", stats.errors);
    println!("Mode:              {}", result.mode);
    if result.interrupted {
        println!("Interrupted before all files were processed");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    let cfg = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let t_total = std::time::Instant::now();

    let token = CancellationToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, finishing current file...");
        handler_token.cancel();
    }) {
        warn!("[WARN] Could not install interrupt handler: {}", e);
    }

    let options = RunOptions {
        folder: cli.folder,
        recursive: cli.recursive,
        show_meta: cli.show_meta,
        write: WriteOptions {
            mode: if cli.dry_run { RunMode::Simulate } else { RunMode::Apply },
            force: cli.force,
            delete_originals: cli.delete_originals,
            from_filename: cli.from_filename,
            time_default: cli.time_default,
        },
        transcode: cfg.transcode,
    };

    let transcoder = FfmpegTranscoder::new(cfg.ffmpeg_bin);
    let control = ProcessControl::new().with_cancel_token(token);
    let result = mediastamp_core::process_with_control(&options, &ExifTagStore, &transcoder, &control)?;

    print_summary(&result);
    info!("Finished in {:.2}s", t_total.elapsed().as_secs_f64());

    Ok(())
}
