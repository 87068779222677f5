//! Writing the generated waveform to disk.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::reference::temp_wav;
use super::{AudioConverter, AudioError, MP3_BITRATE_KBPS, Waveform, has_extension};

/// Write `waveform` to `out`, returning the path actually written.
///
/// `.mp3` targets go through a temporary WAV and the converter. When the
/// converter is missing or fails, a WAV is written next to the requested
/// path instead.
pub fn write_output<C: AudioConverter + ?Sized>(
    waveform: &Waveform,
    out: &Path,
    converter: &C,
) -> Result<PathBuf, AudioError> {
    if !has_extension(out, "mp3") {
        waveform.write_wav(out)?;
        info!("Audio saved to {}", out.display());
        return Ok(out.to_path_buf());
    }

    let fallback = out.with_extension("wav");

    if !converter.is_available() {
        warn!("ffmpeg not found. Saving as WAV instead (install ffmpeg for MP3 support).");
        waveform.write_wav(&fallback)?;
        info!("Audio saved to {}", fallback.display());
        return Ok(fallback);
    }

    // Dropping the guard removes the intermediate WAV on every path below
    let tmp = temp_wav()?;
    waveform.write_wav(&tmp)?;

    match converter.to_mp3(&tmp, out, MP3_BITRATE_KBPS) {
        Ok(()) => {
            info!(
                "Audio converted and saved to {} ({MP3_BITRATE_KBPS}k bitrate)",
                out.display()
            );
            Ok(out.to_path_buf())
        }
        Err(e) => {
            error!("Failed to export to MP3: {e}");
            if out.exists() {
                match std::fs::remove_file(out) {
                    Ok(()) => warn!("Removed incomplete MP3: {}", out.display()),
                    Err(e) => warn!("Could not remove incomplete MP3 {}: {e}", out.display()),
                }
            }
            waveform.write_wav(&fallback)?;
            info!("Saved as WAV instead: {}", fallback.display());
            Ok(fallback)
        }
    }
}
