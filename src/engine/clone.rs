//! Voice clone engine implementation.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::audio::{
    AudioConverter, AudioError, Waveform, normalize_reference, wav_info, write_output,
};
use crate::backend::{
    AttnImplementation, Backend, BackendError, LoadRequest, ModelInfo, VoiceCloneRequest,
};
use crate::cli::{ArgsError, CloneOptions};

/// Errors that can occur during a cloning run.
#[derive(Error, Debug)]
pub enum CloneError {
    #[error(transparent)]
    InvalidArgs(#[from] ArgsError),

    #[error(transparent)]
    BackendError(#[from] BackendError),

    #[error("Failed to load model")]
    ModelLoad(#[source] BackendError),

    #[error("Error during synthesis")]
    Synthesis(#[source] BackendError),

    #[error(transparent)]
    AudioError(#[from] AudioError),
}

/// Orchestrates reference preparation, model loading, generation and output.
pub struct CloneEngine<B: Backend, C: AudioConverter> {
    backend: B,
    converter: C,
}

impl<B: Backend, C: AudioConverter> CloneEngine<B, C> {
    /// Create a new clone engine.
    pub fn new(backend: B, converter: C) -> Self {
        Self { backend, converter }
    }

    /// Pick the compute device.
    ///
    /// An explicit device wins; otherwise `cuda` when the backend reports it,
    /// else `cpu`.
    pub fn resolve_device(&self, requested: Option<&str>) -> Result<String, CloneError> {
        if let Some(device) = requested {
            return Ok(device.to_string());
        }

        let health = self.backend.health()?;
        let device = if health.cuda_available { "cuda" } else { "cpu" };
        if let Some(gpu) = &health.gpu {
            info!("Backend GPU: {gpu}");
        }
        Ok(device.to_string())
    }

    /// Load the pretrained model on `device`.
    pub fn load_model(
        &self,
        model_id: &str,
        device: &str,
        flash_attn: bool,
    ) -> Result<ModelInfo, CloneError> {
        info!("Loading model {model_id} on {device}...");

        if !flash_attn {
            info!("Flash Attention 2 disabled by user request.");
        }

        let request = LoadRequest::for_device(model_id, device, flash_attn);

        match self.backend.load_model(&request) {
            Ok(model) => {
                info!("Model loaded successfully.");
                Ok(model)
            }
            Err(e) => {
                if request.attn_implementation == AttnImplementation::FlashAttention2 {
                    info!("Try running with --no-flash-attn if the error is related to Flash Attention.");
                }
                Err(CloneError::ModelLoad(e))
            }
        }
    }

    /// Run one clone from validated options, returning the written path.
    ///
    /// Any temporary reference WAV is removed before this returns, on
    /// success and on error alike.
    pub fn clone_voice(&self, options: &CloneOptions) -> Result<PathBuf, CloneError> {
        if !options.ref_audio.exists() {
            return Err(ArgsError::RefAudioNotFound(options.ref_audio.clone()).into());
        }

        let reference = normalize_reference(&options.ref_audio, &self.converter);

        match wav_info(reference.path()) {
            Ok(wav) => info!("Ref audio info: {wav}"),
            Err(e) => warn!("Could not read reference audio info: {e}"),
        }

        let device = self.resolve_device(options.device.as_deref())?;
        self.load_model(&options.model_id, &device, options.flash_attn)?;

        let mut request = VoiceCloneRequest::new(
            options.text.clone(),
            options.language.clone(),
            reference.path().to_path_buf(),
        )
        .with_sampling(options.temperature, options.top_p, options.repetition_penalty);

        if options.x_vector_only {
            request = request.x_vector_only();
        } else if let Some(ref_text) = &options.ref_text {
            request = request.with_ref_text(ref_text.clone());
        }

        info!("Synthesizing text: '{}' in {}...", options.text, options.language);
        info!("Starting generation (this might take a few seconds/minutes)...");

        let audio = self
            .backend
            .generate_voice_clone(&request)
            .map_err(CloneError::Synthesis)?;

        let waveform = Waveform::from_wav_bytes(&audio)?;
        info!(
            "Generated {:.2}s of audio at {} Hz",
            waveform.duration_secs(),
            waveform.sample_rate
        );

        Ok(write_output(&waveform, &options.out, &self.converter)?)
    }
}
