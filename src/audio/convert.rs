//! Audio format conversion through ffmpeg.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::AudioError;

/// Bitrate used for MP3 export, in kbps.
pub const MP3_BITRATE_KBPS: u32 = 320;

/// Converts audio files between container formats.
///
/// Conversion is best-effort: callers fall back to WAV when it fails.
#[cfg_attr(test, mockall::automock)]
pub trait AudioConverter {
    /// Whether the conversion tool can be used at all.
    fn is_available(&self) -> bool;

    /// Decode any supported input into a WAV file at `dst`.
    fn to_wav(&self, src: &Path, dst: &Path) -> Result<(), AudioError>;

    /// Encode a WAV file into an MP3 at `dst`.
    fn to_mp3(&self, src: &Path, dst: &Path, bitrate_kbps: u32) -> Result<(), AudioError>;
}

/// Converter backed by the `ffmpeg` executable.
pub struct FfmpegConverter {
    program: Option<PathBuf>,
}

impl FfmpegConverter {
    /// Locate `ffmpeg` on `PATH`.
    pub fn new() -> Self {
        Self {
            program: which::which("ffmpeg").ok(),
        }
    }

    /// Use a specific ffmpeg binary.
    #[cfg(test)]
    pub(crate) fn with_program(program: PathBuf) -> Self {
        Self {
            program: Some(program),
        }
    }

    fn run(&self, args: &[&OsStr]) -> Result<(), AudioError> {
        let program = self.program.as_ref().ok_or(AudioError::ConverterUnavailable)?;
        debug!(?args, "running {}", program.display());

        let output = Command::new(program).args(args).output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().last().unwrap_or("").trim().to_string();
            return Err(AudioError::ConversionFailed(format!(
                "ffmpeg exited with {}: {}",
                output.status, last_line
            )));
        }

        Ok(())
    }
}

impl Default for FfmpegConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioConverter for FfmpegConverter {
    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    fn to_wav(&self, src: &Path, dst: &Path) -> Result<(), AudioError> {
        self.run(&[
            OsStr::new("-y"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            OsStr::new("-i"),
            src.as_os_str(),
            OsStr::new("-f"),
            OsStr::new("wav"),
            dst.as_os_str(),
        ])
    }

    fn to_mp3(&self, src: &Path, dst: &Path, bitrate_kbps: u32) -> Result<(), AudioError> {
        let bitrate = format!("{bitrate_kbps}k");
        self.run(&[
            OsStr::new("-y"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            OsStr::new("-i"),
            src.as_os_str(),
            OsStr::new("-codec:a"),
            OsStr::new("libmp3lame"),
            OsStr::new("-b:a"),
            OsStr::new(&bitrate),
            OsStr::new("-f"),
            OsStr::new("mp3"),
            dst.as_os_str(),
        ])
    }
}
