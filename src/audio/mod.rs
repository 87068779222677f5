//! Audio handling around the model: reference clip normalization, waveform
//! decoding and output writing.
//!
//! Format conversion is delegated to an external tool (ffmpeg) behind the
//! [`AudioConverter`] trait. Every conversion is best-effort and falls back
//! to plain WAV.

mod convert;
mod output;
mod reference;
mod waveform;

use std::path::Path;

use thiserror::Error;

pub use convert::{AudioConverter, FfmpegConverter, MP3_BITRATE_KBPS};
pub use output::write_output;
pub use reference::{ReferenceAudio, normalize_reference, temp_wav};
pub use waveform::{WavInfo, Waveform, wav_info};

#[cfg(test)]
pub use convert::MockAudioConverter;

/// Errors that can occur while reading, writing or converting audio.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    WavError(#[from] hound::Error),

    #[error("Audio converter is not available")]
    ConverterUnavailable,

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Model returned an empty waveform")]
    EmptyWaveform,
}

/// Case-insensitive extension check.
pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
