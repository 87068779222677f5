//! Reference audio normalization.

use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, error, info, warn};

use super::{AudioConverter, AudioError, has_extension};

/// Reference clip as handed to the model.
///
/// Holds the temporary WAV produced by conversion, if any. The file is
/// removed when this value is dropped.
#[derive(Debug)]
pub struct ReferenceAudio {
    path: PathBuf,
    temp: Option<TempPath>,
}

impl ReferenceAudio {
    /// Path to pass to the model.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the path points at a converted temporary file.
    #[cfg(test)]
    pub(crate) fn is_converted(&self) -> bool {
        self.temp.is_some()
    }
}

impl Drop for ReferenceAudio {
    fn drop(&mut self) {
        if let Some(temp) = self.temp.take() {
            let path = temp.to_path_buf();
            match temp.close() {
                Ok(()) => debug!("Removed temporary reference file: {}", path.display()),
                Err(e) => warn!("Could not remove temp file {}: {e}", path.display()),
            }
        }
    }
}

/// Create an empty `.wav` temporary file that is deleted on drop.
pub fn temp_wav() -> Result<TempPath, AudioError> {
    let file = tempfile::Builder::new()
        .prefix("qwen-clone-")
        .suffix(".wav")
        .tempfile()?;
    Ok(file.into_temp_path())
}

/// Make the reference clip readable as WAV.
///
/// WAV input is used as-is. Anything else is converted to a temporary WAV
/// when the converter is available. Conversion problems are logged and the
/// original path is used instead.
pub fn normalize_reference<C: AudioConverter + ?Sized>(
    path: &Path,
    converter: &C,
) -> ReferenceAudio {
    let original = ReferenceAudio {
        path: path.to_path_buf(),
        temp: None,
    };

    if has_extension(path, "wav") {
        return original;
    }

    if !converter.is_available() {
        warn!(
            "ffmpeg not found. If the model does not support {} natively, install ffmpeg.",
            path.display()
        );
        return original;
    }

    info!("Converting reference audio {} to temporary WAV...", path.display());

    let converted = temp_wav().and_then(|temp| {
        converter.to_wav(path, &temp)?;
        Ok(temp)
    });

    match converted {
        Ok(temp) => {
            info!("Converted to {}", temp.display());
            ReferenceAudio {
                path: temp.to_path_buf(),
                temp: Some(temp),
            }
        }
        Err(e) => {
            error!("Failed to convert reference audio: {e}");
            original
        }
    }
}
