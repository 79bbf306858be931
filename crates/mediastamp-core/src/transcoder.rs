use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::config::TranscodeSettings;

/// Marker ffmpeg prints once per stream it could open.
const STREAM_MARKER: &str = "Stream #";

/// What an inspect-only run found in a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// At least one readable media stream.
    pub has_streams: bool,
    /// First `creation_time` metadata value, if any.
    pub creation_time: Option<String>,
}

impl ProbeReport {
    /// A creation_time that actually dates the file. Zero container times
    /// (1904/1970 epochs) don't count.
    pub fn is_dated(&self) -> bool {
        self.creation_time
            .as_deref()
            .and_then(|t| t.get(0..4))
            .and_then(|y| y.parse::<i32>().ok())
            .is_some_and(|year| year > 1970)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("failed to run {bin}: {source}")]
    Spawn {
        bin: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("ffmpeg exited with code {code}: {detail}")]
    Failed { code: i32, detail: String },
}

/// Blocking access to the external transcoder.
pub trait Transcoder {
    /// Inspect a file without writing anything.
    fn probe(&self, input: &Path) -> Result<ProbeReport, TranscodeError>;

    /// Stream-copy `input` into `output`, setting container `creation_time`.
    fn remux(&self, input: &Path, output: &Path, creation_time: &str) -> Result<(), TranscodeError>;

    /// Re-encode into a normalized container at `output`, setting `creation_time`.
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        settings: &TranscodeSettings,
        creation_time: &str,
    ) -> Result<(), TranscodeError>;
}

/// Parse the stderr of `ffmpeg -i <file>`.
pub fn parse_probe_output(stderr: &str) -> ProbeReport {
    let has_streams = stderr.contains(STREAM_MARKER);
    let creation_time = stderr.lines().find_map(|line| {
        let (key, value) = line.trim().split_once(':')?;
        if key.trim() != "creation_time" {
            return None;
        }
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    });

    ProbeReport {
        has_streams,
        creation_time,
    }
}

fn metadata_arg(creation_time: &str) -> OsString {
    format!("creation_time={creation_time}").into()
}

pub fn remux_args(input: &Path, output: &Path, creation_time: &str) -> Vec<OsString> {
    vec![
        "-i".into(),
        input.into(),
        "-metadata".into(),
        metadata_arg(creation_time),
        "-codec".into(),
        "copy".into(),
        output.into(),
        "-y".into(),
    ]
}

pub fn transcode_args(
    input: &Path,
    output: &Path,
    settings: &TranscodeSettings,
    creation_time: &str,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-i".into(),
        input.into(),
        "-c:v".into(),
        settings.video_codec.as_str().into(),
        "-crf".into(),
        settings.crf.to_string().into(),
        "-preset".into(),
        settings.preset.as_str().into(),
        "-vf".into(),
        format!("format={}", settings.pixel_format).into(),
        "-c:a".into(),
        settings.audio_codec.as_str().into(),
        "-b:a".into(),
        settings.audio_bitrate.as_str().into(),
        "-ac".into(),
        settings.audio_channels.to_string().into(),
    ];
    if settings.faststart {
        args.push("-movflags".into());
        args.push("+faststart".into());
    }
    args.push("-metadata".into());
    args.push(metadata_arg(creation_time));
    args.push(output.into());
    args.push("-y".into());
    args
}

/// Last few lines of ffmpeg's stderr; the banner above them is noise.
fn stderr_tail(stderr: &str, lines: usize) -> String {
    let all: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    all[all.len().saturating_sub(lines)..].join(" | ")
}

/// Runs a real `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    pub ffmpeg_bin: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_bin: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
        }
    }

    fn run(&self, args: &[OsString]) -> Result<std::process::Output, TranscodeError> {
        debug!(
            "Executing {} {}",
            self.ffmpeg_bin.display(),
            args.iter().map(|a| a.to_string_lossy()).collect::<Vec<_>>().join(" ")
        );
        Command::new(&self.ffmpeg_bin)
            .arg("-hide_banner")
            .args(args)
            .output()
            .map_err(|source| TranscodeError::Spawn {
                bin: self.ffmpeg_bin.clone(),
                source,
            })
    }

    fn run_checked(&self, args: &[OsString]) -> Result<(), TranscodeError> {
        let output = self.run(args)?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(TranscodeError::Failed {
            code: output.status.code().unwrap_or(-1),
            detail: stderr_tail(&stderr, 5),
        })
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Transcoder for FfmpegTranscoder {
    fn probe(&self, input: &Path) -> Result<ProbeReport, TranscodeError> {
        // Without an output file ffmpeg always exits non-zero; only stderr matters.
        let args: [OsString; 2] = ["-i".into(), input.into()];
        let output = self.run(&args)?;
        Ok(parse_probe_output(&String::from_utf8_lossy(&output.stderr)))
    }

    fn remux(&self, input: &Path, output: &Path, creation_time: &str) -> Result<(), TranscodeError> {
        self.run_checked(&remux_args(input, output, creation_time))
    }

    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        settings: &TranscodeSettings,
        creation_time: &str,
    ) -> Result<(), TranscodeError> {
        self.run_checked(&transcode_args(input, output, settings, creation_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_STDERR: &str = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'clip.mp4':
  Metadata:
    major_brand     : isom
    creation_time   : 2021-07-04T10:11:12.000000Z
  Duration: 00:00:05.00, start: 0.000000, bitrate: 1205 kb/s
  Stream #0:0[0x1](und): Video: h264 (High) (avc1 / 0x31637661), yuv420p, 1280x720
At least one output file must be specified";

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_parse_probe_output() {
        let report = parse_probe_output(PROBE_STDERR);
        assert!(report.has_streams);
        assert_eq!(report.creation_time.as_deref(), Some("2021-07-04T10:11:12.000000Z"));
        assert!(report.is_dated());
    }

    #[test]
    fn test_parse_probe_output_broken_file() {
        let report = parse_probe_output("clip.mp4: Invalid data found when processing input");
        assert!(!report.has_streams);
        assert_eq!(report.creation_time, None);
        assert!(!report.is_dated());
    }

    #[test]
    fn test_epoch_creation_time_is_not_dated() {
        let report = ProbeReport {
            has_streams: true,
            creation_time: Some("1970-01-01T00:00:00.000000Z".to_string()),
        };
        assert!(!report.is_dated());
    }

    #[test]
    fn test_remux_args_copy_streams() {
        let args = strings(&remux_args(Path::new("a.mp4"), Path::new("a.tmp.mp4"), "2021-07-04T00:00:00"));
        assert_eq!(
            args,
            [
                "-i", "a.mp4", "-metadata", "creation_time=2021-07-04T00:00:00",
                "-codec", "copy", "a.tmp.mp4", "-y",
            ]
        );
    }

    #[test]
    fn test_transcode_args_follow_settings() {
        let settings = TranscodeSettings::default();
        let args = strings(&transcode_args(
            Path::new("old.avi"),
            Path::new("old.tmp.mp4"),
            &settings,
            "2009-05-01T12:00:00",
        ));
        let joined = args.join(" ");
        assert!(joined.starts_with("-i old.avi -c:v libx264 -crf 20 -preset slow -vf format=yuv420p"));
        assert!(joined.contains("-c:a aac -b:a 192k -ac 2"));
        assert!(joined.contains("-movflags +faststart"));
        assert!(joined.ends_with("-metadata creation_time=2009-05-01T12:00:00 old.tmp.mp4 -y"));

        let no_faststart = TranscodeSettings {
            faststart: false,
            ..TranscodeSettings::default()
        };
        let args = strings(&transcode_args(Path::new("a.avi"), Path::new("a.mp4"), &no_faststart, "x"));
        assert!(!args.iter().any(|a| a == "-movflags"));
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        assert_eq!(stderr_tail("a\nb\n\nc\nd", 2), "c | d");
        assert_eq!(stderr_tail("only", 5), "only");
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let t = FfmpegTranscoder::new("/nonexistent/ffmpeg-binary");
        let err = t.probe(Path::new("clip.mp4")).unwrap_err();
        assert!(matches!(err, TranscodeError::Spawn { .. }));
    }
}
