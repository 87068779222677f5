//! Waveform buffer and WAV encoding.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::AudioError;

/// Mono audio samples in `[-1, 1]` with their sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Basic properties of a WAV file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub frames: u32,
}

impl WavInfo {
    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

impl std::fmt::Display for WavInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Hz, {} channel(s), {}-bit, {:.2}s",
            self.sample_rate,
            self.channels,
            self.bits_per_sample,
            self.duration_secs()
        )
    }
}

/// Read the header of a WAV file.
pub fn wav_info(path: &Path) -> Result<WavInfo, AudioError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        frames: reader.duration(),
    })
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Decode WAV bytes returned by the model.
    ///
    /// A multi-channel response is treated as a batch and only the first
    /// channel is kept.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, AudioError> {
        let reader = WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
            SampleFormat::Int => {
                let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / max_val))
                    .collect::<Result<_, _>>()?
            }
        };

        if interleaved.is_empty() {
            return Err(AudioError::EmptyWaveform);
        }

        let channels = spec.channels.max(1) as usize;
        let samples = if channels > 1 {
            interleaved.into_iter().step_by(channels).collect()
        } else {
            interleaved
        };

        Ok(Self::new(samples, spec.sample_rate))
    }

    fn spec(&self) -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    fn write_samples<W>(&self, writer: &mut WavWriter<W>) -> Result<(), AudioError>
    where
        W: std::io::Write + std::io::Seek,
    {
        for &sample in &self.samples {
            let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(scaled)?;
        }
        Ok(())
    }

    /// Write as 16-bit PCM mono WAV.
    pub fn write_wav(&self, path: &Path) -> Result<(), AudioError> {
        let mut writer = WavWriter::create(path, self.spec())?;
        self.write_samples(&mut writer)?;
        writer.finalize()?;
        Ok(())
    }

    /// Encode as 16-bit PCM mono WAV bytes.
    #[cfg(test)]
    pub(crate) fn to_wav_bytes(&self) -> Result<Vec<u8>, AudioError> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut buffer, self.spec())?;
            self.write_samples(&mut writer)?;
            writer.finalize()?;
        }
        Ok(buffer.into_inner())
    }
}
